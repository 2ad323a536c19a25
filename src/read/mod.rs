//! Reading of a FITS file: logical records and, on top of them, whole headers.

use std::io::{Seek, SeekFrom};

use crate::error::{Error, new_io_err};

pub mod record;
pub mod scan;

/// Returns the total length, in bytes, of a seekable source.
/// The source position is left at the end of the source.
pub(crate) fn stream_len<S: Seek + ?Sized>(source: &mut S) -> Result<u64, Error> {
  source.seek(SeekFrom::End(0)).map_err(new_io_err)
}
