//! Removal of cards from a header.

use std::{
  collections::HashSet,
  io::{Read, Seek, Write},
};

use log::debug;

use crate::{
  common::{CARD_SIZE, RECORD_SIZE, card_keyword, header::RecordWriter, is_end_card, read::bytes2str},
  edit::shift::{Truncate, remove, write_buf},
  error::{Error, new_missing_end_err},
  hdu::data::Rounding,
  read::{record::RecordReader, scan::seek_header},
};

/// What a deletion did to the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
  /// Number of cards removed from the header.
  pub n_deleted: usize,
  /// Number of records removed from the file.
  pub n_removed_records: usize,
}

/// Removes every card having one of the given keywords from the header of given index.
///
/// The kept cards are written back, unchanged, from the beginning of the header, followed by
/// the `END` card and blank cards. Header records left unused are then removed from the file,
/// so the data section directly follows the shortened header.
pub fn delete_keywords<F>(
  file: &mut F,
  keywords: &HashSet<String>,
  index: usize,
  rounding: Rounding,
) -> Result<DeleteReport, Error>
where
  F: Read + Write + Seek + Truncate + ?Sized,
{
  seek_header(file, index, rounding)?;
  let mut records = RecordReader::new(&mut *file)?;
  let header_offset = records.offset_after();
  let mut kept: Vec<[u8; CARD_SIZE]> = Vec::new();
  let mut n_deleted = 0;
  let mut complete = false;
  let mut n_records = 0;
  'records: while let Some(record) = records.next_record()? {
    n_records += 1;
    for card in record.cards() {
      if is_end_card(card) {
        complete = true;
        break 'records;
      }
      if keywords.contains(bytes2str(card_keyword(card)).as_ref()) {
        n_deleted += 1;
      } else {
        kept.push(*card);
      }
    }
  }
  if !complete {
    return Err(new_missing_end_err(header_offset));
  }
  if n_deleted == 0 {
    return Ok(DeleteReport::default());
  }
  let mut bytes: Vec<u8> = Vec::with_capacity(n_records * RECORD_SIZE);
  let mut writer = RecordWriter::new(&mut bytes);
  for card in &kept {
    writer.write_card(card)?;
  }
  let n_new_records = writer.finalize()?;
  write_buf(file, &bytes, header_offset)?;
  let n_removed_records = n_records - n_new_records;
  if n_removed_records > 0 {
    remove(
      file,
      header_offset + bytes.len() as u64,
      (n_removed_records * RECORD_SIZE) as u64,
    )?;
  }
  debug!(
    "{} cards deleted from header {}, {} records removed",
    n_deleted, index, n_removed_records
  );
  Ok(DeleteReport {
    n_deleted,
    n_removed_records,
  })
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::{
    common::item::HeaderItem,
    error::FitsError,
    hdu::header::Header,
    read::scan::read_header,
  };

  fn int(kw: &str, v: i64) -> HeaderItem {
    HeaderItem::from_int(kw, v, None).unwrap()
  }

  fn kws(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_delete_in_one_record() {
    let header = Header::from_items(
      0,
      [
        HeaderItem::from_bool("SIMPLE", true, None).unwrap(),
        int("BITPIX", 8),
        int("NAXIS", 0),
        HeaderItem::new_comment("HISTORY", Some("a")).unwrap(),
        int("FOO", 1),
        HeaderItem::new_comment("HISTORY", Some("b")).unwrap(),
      ],
    );
    let mut cursor = Cursor::new(header.to_bytes());
    let report = delete_keywords(&mut cursor, &kws(&["HISTORY", "NONE"]), 0, Rounding::Standard)
      .unwrap();
    assert_eq!(report.n_deleted, 2);
    assert_eq!(report.n_removed_records, 0);
    let h = read_header(&mut cursor, None, 0, Rounding::Standard).unwrap();
    assert_eq!(h.len(), 4);
    assert!(h.get("HISTORY").is_none());
    assert_eq!(h.get_at(3).unwrap().keyword(), "FOO");
    assert_eq!(cursor.into_inner().len(), RECORD_SIZE);
  }

  #[test]
  fn test_delete_shrinks_file() {
    // 40 cards + END: 2 records, followed by a 1-record data section
    let mut items = vec![
      HeaderItem::from_bool("SIMPLE", true, None).unwrap(),
      int("BITPIX", 8),
      int("NAXIS", 1),
      int("NAXIS1", 2880),
    ];
    items.extend((0..36).map(|i| HeaderItem::new_comment("HISTORY", Some(&i.to_string())).unwrap()));
    let mut bytes = Header::from_items(0, items).to_bytes();
    assert_eq!(bytes.len(), 2 * RECORD_SIZE);
    bytes.extend_from_slice(&[b'd'; RECORD_SIZE]);
    let mut cursor = Cursor::new(bytes);
    let report = delete_keywords(&mut cursor, &kws(&["HISTORY"]), 0, Rounding::Standard).unwrap();
    assert_eq!(report.n_deleted, 36);
    assert_eq!(report.n_removed_records, 1);
    let bytes = cursor.into_inner();
    assert_eq!(bytes.len(), 2 * RECORD_SIZE);
    assert!(is_end_card(&bytes[4 * CARD_SIZE..5 * CARD_SIZE]));
    assert!(bytes[RECORD_SIZE..].iter().all(|&b| b == b'd'));
  }

  #[test]
  fn test_nothing_to_delete() {
    let bytes = Header::from_items(0, [int("NAXIS", 0)]).to_bytes();
    let mut cursor = Cursor::new(bytes.clone());
    let report = delete_keywords(&mut cursor, &kws(&["FOO"]), 0, Rounding::Standard).unwrap();
    assert_eq!(report, DeleteReport::default());
    assert_eq!(cursor.into_inner(), bytes);
  }

  #[test]
  fn test_missing_end() {
    let mut bytes = Header::from_items(0, [int("NAXIS", 0)]).to_bytes();
    bytes[CARD_SIZE..CARD_SIZE + 3].copy_from_slice(b"   ");
    let mut cursor = Cursor::new(bytes);
    let err = delete_keywords(&mut cursor, &kws(&["NAXIS"]), 0, Rounding::Standard).unwrap_err();
    assert!(matches!(err.root(), FitsError::MissingEndCard { .. }));
  }
}
