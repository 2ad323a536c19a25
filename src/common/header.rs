//! Writing of whole header records.

use std::io::Write;

use crate::{
  common::{CARD_SIZE, END_CARD, RECORD_SIZE, item::HeaderItem},
  error::{Error, new_io_err},
};

/// Writes card images record by record, the last record ending with the `END` card and
/// being space padded.
/// Internally use a buffer of 2880 bytes to write to the underlying `Write`
/// (thus **no need for a buffered write**, a buffered write will add a useless copy of the data).
pub struct RecordWriter<'a, W: Write> {
  /// Destination
  writer: &'a mut W,
  /// Record overwritten in memory before being written in the `writer`
  /// (to minimize the number of calls of possibly faillible I/O operations).
  record: Box<[u8; RECORD_SIZE]>,
  /// Current position in the record of 36 card images of 80 bytes each.
  position: usize,
  /// Number of records already written in `writer`.
  n_records: usize,
}

impl<'a, W: Write> RecordWriter<'a, W> {
  pub fn new(writer: &'a mut W) -> Self {
    Self {
      writer,
      record: Box::new([b' '; RECORD_SIZE]),
      position: 0,
      n_records: 0,
    }
  }

  fn flush(&mut self) -> Result<(), Error> {
    let res = self
      .writer
      .write_all(self.record.as_slice())
      .map_err(new_io_err);
    self.position = 0;
    self.n_records += 1;
    self.record.fill(b' ');
    res
  }

  /// Appends a card image, writing the current record if it is full.
  pub fn write_card(&mut self, card: &[u8; CARD_SIZE]) -> Result<(), Error> {
    if self.position == RECORD_SIZE {
      self.flush()?;
    }
    let new_pos = self.position + CARD_SIZE;
    self.record[self.position..new_pos].copy_from_slice(card);
    self.position = new_pos;
    Ok(())
  }

  pub fn write_item(&mut self, item: &HeaderItem) -> Result<(), Error> {
    self.write_card(&item.to_card())
  }

  /// Write the `END` card, the current (last) record and returns the total number of records
  /// written.
  pub fn finalize(mut self) -> Result<usize, Error> {
    self.write_card(END_CARD)?;
    self.flush().map(|()| self.n_records)
  }
}
