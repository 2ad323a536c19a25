//! Reading and in place edition of the headers of a FITS file, under advisory file locks.

use std::{
  collections::HashSet,
  path::{Path, PathBuf},
  time::Instant,
};

use log::debug;

use crate::{
  common::item::HeaderItem,
  edit::{
    delete::DeleteReport,
    lock::{LockMode, LockedFile},
    update::{HeaderUpdate, UpdateReport},
  },
  error::Error,
  hdu::{data::Rounding, header::Header},
  read::scan,
};

pub mod delete;
pub mod lock;
pub mod shift;
pub mod update;

/// Header editor of one FITS file.
///
/// Each call opens the file, takes a lock (shared to read, exclusive to modify) and releases it
/// before returning, whether the call succeeds or fails.
///
/// # Example
/// ```no_run
/// use fitsedit::{Hedit, HeaderItem};
///
/// let hedit = Hedit::new("image.fits");
/// hedit.update_primary([HeaderItem::new_string("OBJECT", "M31", Some("Andromeda")).unwrap()])?;
/// let header = hedit.read_primary(None)?;
/// assert_eq!(header.get("OBJECT").and_then(|item| item.value()), Some("M31"));
/// # Ok::<(), fitsedit::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Hedit {
  path: PathBuf,
  rounding: Rounding,
}

impl Hedit {
  pub fn new<P: AsRef<Path>>(path: P) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      rounding: Rounding::default(),
    }
  }

  /// Sets the rounding used to compute the size of the data sections skipped to reach
  /// extensions.
  pub fn with_rounding(mut self, rounding: Rounding) -> Self {
    self.rounding = rounding;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn rounding(&self) -> Rounding {
    self.rounding
  }

  /// Reads the primary header.
  /// # Params
  /// * `keywords`: if set, only the cards having one of the given keywords are returned.
  pub fn read_primary(&self, keywords: Option<&HashSet<String>>) -> Result<Header, Error> {
    self.read_header(keywords, 0)
  }

  /// Reads the header of given index: 0 for the primary header, N for the Nth extension.
  pub fn read_header(&self, keywords: Option<&HashSet<String>>, index: usize) -> Result<Header, Error> {
    let start = Instant::now();
    let mut file = LockedFile::open(&self.path, LockMode::Shared)?;
    let header = scan::read_header(&mut *file, keywords, index, self.rounding)?;
    debug!(
      "Header {} of '{}' read in {:?}",
      index,
      self.path.display(),
      start.elapsed()
    );
    Ok(header)
  }

  /// Reads the primary header and all the extension headers.
  pub fn read_all_headers(&self) -> Result<Vec<Header>, Error> {
    let start = Instant::now();
    let mut file = LockedFile::open(&self.path, LockMode::Shared)?;
    let headers = scan::read_all_headers(&mut *file, self.rounding)?;
    debug!(
      "{} headers of '{}' read in {:?}",
      headers.len(),
      self.path.display(),
      start.elapsed()
    );
    Ok(headers)
  }

  /// Same as `update_header(updates, 0)`.
  pub fn update_primary<I>(&self, updates: I) -> Result<UpdateReport, Error>
  where
    I: IntoIterator<Item = HeaderItem>,
  {
    self.update_header(updates, 0)
  }

  /// Updates the header of given index.
  ///
  /// For each update, the first card having the same keyword is overwritten in place.
  /// Updates of keywords not in the header are appended at the end of the header, in the
  /// free slots of its last record and, if needed, in new records inserted in the file.
  /// If several updates share a keyword, only the last one is applied.
  ///
  /// Without update, the file is not even opened.
  pub fn update_header<I>(&self, updates: I, index: usize) -> Result<UpdateReport, Error>
  where
    I: IntoIterator<Item = HeaderItem>,
  {
    let update = HeaderUpdate::new(updates, index, self.rounding)?;
    if update.is_empty() {
      debug!("No update of '{}'", self.path.display());
      return Ok(UpdateReport::default());
    }
    let start = Instant::now();
    let n_updates = update.len();
    let mut file = LockedFile::open(&self.path, LockMode::Exclusive)?;
    let report = update.apply(&mut *file)?;
    debug!(
      "Header {} of '{}' updated in {:?}: {} keywords, {:?}",
      index,
      self.path.display(),
      start.elapsed(),
      n_updates,
      report
    );
    Ok(report)
  }

  /// Removes from the header of given index all the cards having one of the given keywords.
  ///
  /// Without keyword, the file is not even opened.
  pub fn delete_keywords(&self, keywords: &HashSet<String>, index: usize) -> Result<DeleteReport, Error> {
    if keywords.is_empty() {
      debug!("No keyword to delete from '{}'", self.path.display());
      return Ok(DeleteReport::default());
    }
    let start = Instant::now();
    let mut file = LockedFile::open(&self.path, LockMode::Exclusive)?;
    let report = delete::delete_keywords(&mut *file, keywords, index, self.rounding)?;
    debug!(
      "Header {} of '{}' edited in {:?}: {:?}",
      index,
      self.path.display(),
      start.elapsed(),
      report
    );
    Ok(report)
  }
}
