//! Logical record reader: iterates on the 2880-byte records of a seekable source.

use std::io::{ErrorKind, IoSliceMut, Read, Seek, SeekFrom};

use log::{trace, warn};

use crate::{
  common::{CARD_SIZE, RECORD_SIZE},
  error::{Error, new_io_err},
};

const RECORD_LEN: u64 = RECORD_SIZE as u64;

/// A 2880-byte record, tagged with its absolute offset in the file.
/// Borrowed from the reader buffers: valid until the next call to `RecordReader::next_record`.
#[derive(Debug, Clone, Copy)]
pub struct LogicalRecord<'a> {
  offset: u64,
  bytes: &'a [u8; RECORD_SIZE],
}

impl<'a> LogicalRecord<'a> {
  /// Offset, in the file, of the first byte of the record (a multiple of 2880).
  pub fn offset(&self) -> u64 {
    self.offset
  }

  pub fn bytes(&self) -> &'a [u8; RECORD_SIZE] {
    self.bytes
  }

  /// The 36 card images of the record.
  pub fn cards(&self) -> &'a [[u8; CARD_SIZE]] {
    self.bytes.as_chunks::<CARD_SIZE>().0
  }

  /// Offset, in the file, of the card of given index in the record.
  pub fn card_offset(&self, i: usize) -> u64 {
    self.offset + (i * CARD_SIZE) as u64
  }
}

/// Reads a source by chunks of 2880 bytes aligned on multiples of 2880 bytes.
///
/// Two record buffers are owned by the reader and refilled together by a single scattering
/// read once both have been consumed, so sequential scanning costs one read call every two
/// records. The source position is set explicitly before each refill: the caller is free to
/// write in the source (through `get_mut`) between two calls to `next_record`.
///
/// A partial trailing record (truncated file) is ignored: iteration simply stops.
pub struct RecordReader<R: Read + Seek> {
  reader: R,
  buffers: [Box<[u8; RECORD_SIZE]>; 2],
  /// Offset, in the source, of the first byte of `buffers[0]`.
  fill_offset: u64,
  /// Number of complete records currently held in the buffers.
  n_loaded: usize,
  /// Index, in the buffers, of the next record to be returned.
  next: usize,
  eof: bool,
}

impl<R: Read + Seek> RecordReader<R> {
  /// Starts reading at the current position of `reader`, realigned downward to the nearest
  /// record boundary if needed.
  pub fn new(mut reader: R) -> Result<Self, Error> {
    let pos = reader.stream_position().map_err(new_io_err)?;
    let fill_offset = pos - pos % RECORD_LEN;
    if fill_offset != pos {
      trace!("Position {} realigned on record boundary {}", pos, fill_offset);
    }
    Ok(Self {
      reader,
      buffers: [Box::new([b' '; RECORD_SIZE]), Box::new([b' '; RECORD_SIZE])],
      fill_offset,
      n_loaded: 0,
      next: 0,
      eof: false,
    })
  }

  /// Returns the next record, or `None` once the end of the source is reached.
  pub fn next_record(&mut self) -> Result<Option<LogicalRecord<'_>>, Error> {
    if self.next == self.n_loaded {
      if self.eof {
        return Ok(None);
      }
      self.fill()?;
      if self.n_loaded == 0 {
        return Ok(None);
      }
    }
    let i = self.next;
    self.next += 1;
    let offset = self.fill_offset + i as u64 * RECORD_LEN;
    trace!("Record read at offset {}", offset);
    Ok(Some(LogicalRecord {
      offset,
      bytes: &self.buffers[i],
    }))
  }

  /// Offset following the last record returned by `next_record`
  /// (the starting offset if no record has been returned yet).
  pub fn offset_after(&self) -> u64 {
    self.fill_offset + self.next as u64 * RECORD_LEN
  }

  pub fn get_mut(&mut self) -> &mut R {
    &mut self.reader
  }

  pub fn into_inner(self) -> R {
    self.reader
  }

  /// Refills both buffers from the offset following the records already loaded.
  fn fill(&mut self) -> Result<(), Error> {
    self.fill_offset += self.n_loaded as u64 * RECORD_LEN;
    self.n_loaded = 0;
    self.next = 0;
    self
      .reader
      .seek(SeekFrom::Start(self.fill_offset))
      .map_err(new_io_err)?;
    let mut n_read = 0;
    while n_read < 2 * RECORD_SIZE {
      let [first, second] = &mut self.buffers;
      let res = if n_read < RECORD_SIZE {
        self.reader.read_vectored(&mut [
          IoSliceMut::new(&mut first[n_read..]),
          IoSliceMut::new(&mut second[..]),
        ])
      } else {
        self
          .reader
          .read_vectored(&mut [IoSliceMut::new(&mut second[n_read - RECORD_SIZE..])])
      };
      match res {
        Ok(0) => {
          self.eof = true;
          break;
        }
        Ok(n) => n_read += n,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => return Err(new_io_err(e)),
      }
    }
    self.n_loaded = n_read / RECORD_SIZE;
    let n_partial = n_read % RECORD_SIZE;
    if n_partial != 0 {
      warn!(
        "Truncated file: partial record of {} bytes ignored at offset {}",
        n_partial,
        self.fill_offset + (self.n_loaded * RECORD_SIZE) as u64
      );
      self.eof = true;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::{Cursor, Write};

  use super::*;

  fn records(n: usize) -> Vec<u8> {
    (0..n)
      .flat_map(|i| std::iter::repeat_n(b'a' + i as u8, RECORD_SIZE))
      .collect()
  }

  fn read_all<R: Read + Seek>(reader: &mut RecordReader<R>) -> Vec<(u64, u8)> {
    let mut res = Vec::new();
    while let Some(rec) = reader.next_record().unwrap() {
      assert!(rec.bytes().iter().all(|&b| b == rec.bytes()[0]));
      res.push((rec.offset(), rec.bytes()[0]));
    }
    res
  }

  #[test]
  fn test_three_records() {
    let mut reader = RecordReader::new(Cursor::new(records(3))).unwrap();
    assert_eq!(
      read_all(&mut reader),
      vec![(0, b'a'), (2880, b'b'), (5760, b'c')]
    );
    assert_eq!(reader.offset_after(), 3 * 2880);
    // Exhausted
    assert!(reader.next_record().unwrap().is_none());
  }

  #[test]
  fn test_realign_downward() {
    let mut cursor = Cursor::new(records(4));
    cursor.set_position(2880 + 100);
    let mut reader = RecordReader::new(cursor).unwrap();
    assert_eq!(
      read_all(&mut reader),
      vec![(2880, b'b'), (5760, b'c'), (8640, b'd')]
    );
  }

  #[test]
  fn test_partial_trailing_record() {
    let mut bytes = records(2);
    bytes.extend_from_slice(&[b'z'; 100]);
    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(read_all(&mut reader), vec![(0, b'a'), (2880, b'b')]);
    let mut reader = RecordReader::new(Cursor::new(vec![b' '; 2000])).unwrap();
    assert!(reader.next_record().unwrap().is_none());
  }

  #[test]
  fn test_cards() {
    let mut reader = RecordReader::new(Cursor::new(records(1))).unwrap();
    let rec = reader.next_record().unwrap().unwrap();
    assert_eq!(rec.cards().len(), 36);
    assert_eq!(rec.card_offset(35), 35 * 80);
  }

  #[test]
  fn test_write_between_records() {
    let mut reader = RecordReader::new(Cursor::new(records(3))).unwrap();
    let first = reader.next_record().unwrap().unwrap().offset();
    // Overwrite the beginning of the third record, not yet loaded
    let cursor = reader.get_mut();
    cursor.set_position(first + 2 * 2880);
    cursor.write_all(&[b'x'; RECORD_SIZE]).unwrap();
    assert_eq!(reader.next_record().unwrap().unwrap().bytes()[0], b'b');
    assert_eq!(reader.next_record().unwrap().unwrap().bytes()[0], b'x');
    assert!(reader.next_record().unwrap().is_none());
  }
}
