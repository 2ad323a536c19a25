//! Byte-shifting file edition: inserting or removing bytes in the middle of a file by moving
//! its tail.

use std::{
  fs::File,
  io::{self, Cursor, Read, Seek, SeekFrom, Write},
};

use log::trace;

use crate::{
  error::{Error, new_io_err, new_out_of_file_err},
  read::stream_len,
};

/// Size of the chunks used to move the tail of a file.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// A file (or file-like object) whose length can be reduced.
pub trait Truncate {
  fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
  fn truncate(&mut self, len: u64) -> io::Result<()> {
    self.set_len(len)
  }
}

impl Truncate for Cursor<Vec<u8>> {
  fn truncate(&mut self, len: u64) -> io::Result<()> {
    let len = usize::try_from(len).map_err(io::Error::other)?;
    self.get_mut().truncate(len);
    Ok(())
  }
}

impl<T: Truncate + ?Sized> Truncate for &mut T {
  fn truncate(&mut self, len: u64) -> io::Result<()> {
    (**self).truncate(len)
  }
}

/// Fills `buf` with the bytes starting at `offset`.
/// # Errors
/// If the file ends before `buf` is full.
pub fn read_buf<F: Read + Seek + ?Sized>(file: &mut F, buf: &mut [u8], offset: u64) -> Result<(), Error> {
  file
    .seek(SeekFrom::Start(offset))
    .and_then(|_| file.read_exact(buf))
    .map_err(new_io_err)
}

/// Writes all the bytes of `buf` starting at `offset`.
pub fn write_buf<F: Write + Seek + ?Sized>(file: &mut F, buf: &[u8], offset: u64) -> Result<(), Error> {
  file
    .seek(SeekFrom::Start(offset))
    .and_then(|_| file.write_all(buf))
    .map_err(new_io_err)
}

/// Inserts `bytes` at offset `at`, moving every byte at or after `at` forward by `bytes.len()`.
///
/// The tail is moved chunk by chunk starting from the end of the file, so a chunk is always
/// read before the region it is written to is overwritten.
///
/// # Errors
/// `OffsetOutOfFile` if `at` is past the end of the file.
pub fn insert<F: Read + Write + Seek + ?Sized>(file: &mut F, bytes: &[u8], at: u64) -> Result<(), Error> {
  let file_len = stream_len(file)?;
  if at > file_len {
    return Err(new_out_of_file_err(at, file_len));
  }
  let shift = bytes.len() as u64;
  let mut buf = vec![0_u8; CHUNK_SIZE];
  let mut end = file_len;
  while end > at {
    let start = end.saturating_sub(CHUNK_SIZE as u64).max(at);
    let chunk = &mut buf[..(end - start) as usize];
    read_buf(file, chunk, start)?;
    write_buf(file, chunk, start + shift)?;
    trace!("Moved [{}, {}) to {}", start, end, start + shift);
    end = start;
  }
  write_buf(file, bytes, at)
}

/// Removes the `len` bytes starting at offset `at`, moving every following byte backward,
/// and truncates the file accordingly.
///
/// The tail is moved chunk by chunk starting from its beginning.
///
/// # Errors
/// `OffsetOutOfFile` if the range to be removed goes past the end of the file.
pub fn remove<F: Read + Write + Seek + Truncate + ?Sized>(
  file: &mut F,
  at: u64,
  len: u64,
) -> Result<(), Error> {
  let file_len = stream_len(file)?;
  let from = at.saturating_add(len);
  if from > file_len {
    return Err(new_out_of_file_err(from, file_len));
  }
  let mut buf = vec![0_u8; CHUNK_SIZE];
  let mut start = from;
  while start < file_len {
    let end = start.saturating_add(CHUNK_SIZE as u64).min(file_len);
    let chunk = &mut buf[..(end - start) as usize];
    read_buf(file, chunk, start)?;
    write_buf(file, chunk, start - len)?;
    trace!("Moved [{}, {}) to {}", start, end, start - len);
    start = end;
  }
  file.truncate(file_len - len).map_err(new_io_err)
}
