//! In place update of the cards of a header.
//!
//! An update goes through the following stages:
//! * `Locate`: skip the headers (and data sections) preceding the target header;
//! * `ScanPatch`: overwrite, in place, the first card of each updated keyword;
//! * `FillSlack`: write the cards of the new keywords in the free slots of the last record,
//!   moving the `END` card after them;
//! * `InsertRecords`: if the slack is not large enough, insert whole new records after the
//!   last header record, shifting the rest of the file.
//!
//! Only the modified cards are read in memory: the header is never fully parsed.

use std::{
  collections::HashMap,
  io::{Read, Seek, SeekFrom, Write},
};

use log::{debug, trace};

use crate::{
  common::{
    CARD_SIZE, CARDS_PER_RECORD, END_CARD, RECORD_SIZE, card_keyword, header::RecordWriter,
    is_end_card, item::HeaderItem, read::bytes2str,
  },
  edit::shift::{insert, write_buf},
  error::{Error, new_invalid_keyword_err, new_io_err, new_missing_end_err},
  hdu::data::Rounding,
  read::{record::RecordReader, scan::seek_header},
};

/// What an update did to the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
  /// Number of existing cards overwritten in place.
  pub n_replaced: usize,
  /// Number of new cards written in the free slots of the last header record.
  pub n_in_slack: usize,
  /// Number of new cards written in inserted records.
  pub n_in_new_records: usize,
  /// Number of records inserted in the file.
  pub n_new_records: usize,
}

impl UpdateReport {
  pub fn file_grown(&self) -> bool {
    self.n_new_records > 0
  }
}

/// Location of the `END` card of a header.
#[derive(Debug, Clone, Copy)]
struct EndCard {
  /// Offset of the record containing the `END` card.
  record_offset: u64,
  /// Index of the `END` card in its record, in `[0, 36[`.
  slot: usize,
}

impl EndCard {
  fn offset(&self) -> u64 {
    self.record_offset + (self.slot * CARD_SIZE) as u64
  }

  /// Number of card slots, from the `END` card (included) to the end of the record.
  fn n_free_slots(&self) -> usize {
    CARDS_PER_RECORD - self.slot
  }
}

enum Stage {
  Locate,
  ScanPatch { header_offset: u64 },
  FillSlack { end: EndCard },
  InsertRecords { at: u64, items: Vec<HeaderItem> },
  Done,
}

/// Set of pending updates of one header.
///
/// If several updates share a keyword, the last one wins but it keeps the position of the
/// first one among the cards to be appended.
pub struct HeaderUpdate {
  index: usize,
  rounding: Rounding,
  /// Updates, in order of first appearance of their keyword; `None` once written.
  items: Vec<Option<HeaderItem>>,
  /// Keyword of each update not yet written, with its position in `items`.
  pending: HashMap<String, usize>,
}

impl HeaderUpdate {
  /// # Errors
  /// `InvalidKeyword` if an update has the `END` keyword.
  pub fn new<I>(updates: I, index: usize, rounding: Rounding) -> Result<Self, Error>
  where
    I: IntoIterator<Item = HeaderItem>,
  {
    let mut items: Vec<Option<HeaderItem>> = Vec::new();
    let mut pending = HashMap::new();
    for item in updates {
      if item.keyword() == "END" {
        return Err(new_invalid_keyword_err(item.keyword()));
      }
      match pending.get(item.keyword()) {
        Some(&i) => items[i] = Some(item),
        None => {
          pending.insert(item.keyword().to_string(), items.len());
          items.push(Some(item));
        }
      }
    }
    Ok(Self {
      index,
      rounding,
      items,
      pending,
    })
  }

  /// Number of distinct keywords to be updated.
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Applies the updates to the file.
  pub fn apply<F: Read + Write + Seek + ?Sized>(mut self, file: &mut F) -> Result<UpdateReport, Error> {
    let mut report = UpdateReport::default();
    let mut stage = Stage::Locate;
    loop {
      stage = match stage {
        Stage::Locate => Stage::ScanPatch {
          header_offset: seek_header(file, self.index, self.rounding)?,
        },
        Stage::ScanPatch { header_offset } => {
          match self.scan_patch(file, header_offset, &mut report)? {
            _ if self.pending.is_empty() => Stage::Done,
            Some(end) => Stage::FillSlack { end },
            None => return Err(new_missing_end_err(header_offset)),
          }
        }
        Stage::FillSlack { end } => self.fill_slack(file, end, &mut report)?,
        Stage::InsertRecords { at, items } => {
          Self::insert_records(file, at, &items, &mut report)?;
          Stage::Done
        }
        Stage::Done => return Ok(report),
      }
    }
  }

  /// Overwrites the first card of each pending keyword, up to the `END` card.
  /// Returns the location of the `END` card, or `None` if either all updates have been done
  /// before reaching it or if the file ends before it.
  fn scan_patch<F: Read + Write + Seek + ?Sized>(
    &mut self,
    file: &mut F,
    header_offset: u64,
    report: &mut UpdateReport,
  ) -> Result<Option<EndCard>, Error> {
    file
      .seek(SeekFrom::Start(header_offset))
      .map_err(new_io_err)?;
    let mut records = RecordReader::new(&mut *file)?;
    let mut patches: Vec<(u64, [u8; CARD_SIZE])> = Vec::new();
    let mut end = None;
    while let Some(record) = records.next_record()? {
      for (slot, card) in record.cards().iter().enumerate() {
        if is_end_card(card) {
          end = Some(EndCard {
            record_offset: record.offset(),
            slot,
          });
          break;
        }
        let keyword = bytes2str(card_keyword(card));
        if let Some(i) = self.pending.remove(keyword.as_ref()) {
          if let Some(item) = self.items[i].take() {
            patches.push((record.card_offset(slot), item.to_card()));
          }
        }
      }
      // Patches only touch the current record, already in memory
      for (offset, card) in patches.drain(..) {
        trace!("Card replaced at offset {}: {}", offset, bytes2str(&card));
        write_buf(records.get_mut(), &card, offset)?;
        report.n_replaced += 1;
      }
      if end.is_some() || self.pending.is_empty() {
        break;
      }
    }
    Ok(end)
  }

  /// Writes the remaining updates in place of the `END` card and of the blank slots following
  /// it in the last record, then a new `END` card if there is still room.
  fn fill_slack<F: Write + Seek + ?Sized>(
    &mut self,
    file: &mut F,
    end: EndCard,
    report: &mut UpdateReport,
  ) -> Result<Stage, Error> {
    let mut remaining: Vec<HeaderItem> = self.items.iter_mut().filter_map(Option::take).collect();
    self.pending.clear();
    let n_free = end.n_free_slots();
    let n_fit = n_free.min(remaining.len());
    let mut bytes = Vec::with_capacity((n_fit + 1) * CARD_SIZE);
    for item in &remaining[..n_fit] {
      bytes.extend_from_slice(&item.to_card());
    }
    if n_fit < n_free {
      bytes.extend_from_slice(END_CARD);
    }
    write_buf(file, &bytes, end.offset())?;
    report.n_in_slack += n_fit;
    trace!("{} cards written at offset {}", n_fit, end.offset());
    if n_fit < n_free {
      Ok(Stage::Done)
    } else {
      Ok(Stage::InsertRecords {
        at: end.record_offset + RECORD_SIZE as u64,
        items: remaining.split_off(n_fit),
      })
    }
  }

  /// Inserts, at offset `at`, the records holding the given items followed by the `END` card.
  fn insert_records<F: Read + Write + Seek + ?Sized>(
    file: &mut F,
    at: u64,
    items: &[HeaderItem],
    report: &mut UpdateReport,
  ) -> Result<(), Error> {
    let mut bytes: Vec<u8> = Vec::new();
    let mut writer = RecordWriter::new(&mut bytes);
    for item in items {
      writer.write_item(item)?;
    }
    let n_records = writer.finalize()?;
    insert(file, &bytes, at)?;
    debug!("{} records inserted at offset {}", n_records, at);
    report.n_in_new_records += items.len();
    report.n_new_records += n_records;
    Ok(())
  }
}
