//! Advisory file lock held for the duration of one read or one update.

use std::{
  fs::{File, OpenOptions},
  ops::{Deref, DerefMut},
  path::{Path, PathBuf},
};

use log::{error, trace};

use crate::error::{Error, new_io_err};

/// Kind of lock taken on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  /// Read only access, the file may be shared with other readers.
  Shared,
  /// Read and write access, no other process holding a lock can access the file.
  Exclusive,
}

/// An open file locked until dropped.
///
/// The lock is released when the value goes out of scope, including when an error is being
/// propagated. A failure to release the lock can not be returned from `drop`: it is logged.
#[derive(Debug)]
pub struct LockedFile {
  file: File,
  path: PathBuf,
  mode: LockMode,
}

impl LockedFile {
  /// Opens the file and blocks until the lock is acquired.
  pub fn open<P: AsRef<Path>>(path: P, mode: LockMode) -> Result<Self, Error> {
    let path = path.as_ref();
    let file = match mode {
      LockMode::Shared => File::open(path),
      LockMode::Exclusive => OpenOptions::new().read(true).write(true).open(path),
    }
    .map_err(new_io_err)?;
    match mode {
      LockMode::Shared => file.lock_shared(),
      LockMode::Exclusive => file.lock(),
    }
    .map_err(new_io_err)?;
    trace!("{:?} lock acquired on '{}'", mode, path.display());
    Ok(Self {
      file,
      path: path.to_path_buf(),
      mode,
    })
  }

  pub fn mode(&self) -> LockMode {
    self.mode
  }
}

impl Deref for LockedFile {
  type Target = File;

  fn deref(&self) -> &Self::Target {
    &self.file
  }
}

impl DerefMut for LockedFile {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.file
  }
}

impl Drop for LockedFile {
  fn drop(&mut self) {
    match self.file.unlock() {
      Ok(()) => trace!("{:?} lock released on '{}'", self.mode, self.path.display()),
      Err(e) => error!("Could not unlock cleanly '{}': {}", self.path.display(), e),
    }
  }
}
