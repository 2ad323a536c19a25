//! Header scanning: builds `Header`s from the card images of the logical records, and skips
//! data sections to reach extensions.

use std::{
  collections::HashSet,
  io::{Read, Seek, SeekFrom},
};

use log::{debug, warn};

use crate::{
  common::{RECORD_SIZE, card_keyword, is_end_card, read::{bytes2str, parse_card}},
  error::{Error, new_header_not_found_err, new_io_err},
  hdu::{
    data::{Rounding, data_size},
    header::Header,
  },
  read::{record::RecordReader, stream_len},
};

/// Result of the scan of one header.
#[derive(Debug)]
pub struct ScannedHeader {
  /// The (possibly keyword filtered) header.
  pub header: Header,
  /// Offset of the first record of the header.
  pub offset: u64,
  /// Offset following the record holding the `END` card, i.e. the offset of the data section.
  /// If no `END` card was found, offset following the last record read.
  pub data_offset: u64,
  /// Number of records read.
  pub n_records: usize,
  /// `false` if the end of the file was reached before the `END` card.
  pub complete: bool,
}

/// Reads the header starting at the current position of `reader` (realigned downward to a
/// record boundary), stopping at the `END` card.
///
/// # Params
/// * `keywords`: if set, only the cards having one of the given keywords are parsed and kept.
/// * `index`: index of the header in the file, stored in the returned `Header`.
///
/// # Errors
/// If a card can not be parsed, or on I/O error. Reaching the end of the file before the
/// `END` card is not an error, see `ScannedHeader::complete`.
pub fn scan_header<R: Read + Seek + ?Sized>(
  reader: &mut R,
  keywords: Option<&HashSet<String>>,
  index: usize,
) -> Result<ScannedHeader, Error> {
  let mut records = RecordReader::new(&mut *reader)?;
  let offset = records.offset_after();
  let mut header = Header::new(index);
  let mut n_records = 0;
  let mut complete = false;
  'records: while let Some(record) = records.next_record()? {
    n_records += 1;
    for card in record.cards() {
      if is_end_card(card) {
        complete = true;
        break 'records;
      }
      let selected =
        keywords.is_none_or(|kws| kws.contains(bytes2str(card_keyword(card)).as_ref()));
      if selected {
        header.push(parse_card(card)?);
      }
    }
  }
  let data_offset = records.offset_after();
  debug!(
    "Header {} at offset {}: {} records, {} cards kept{}",
    index,
    offset,
    n_records,
    header.len(),
    if complete { "" } else { ", no END card" }
  );
  Ok(ScannedHeader {
    header,
    offset,
    data_offset,
    n_records,
    complete,
  })
}

/// Moves `reader` to the beginning of the header of given index (0 for the primary header),
/// skipping the previous headers and their data sections.
/// Returns the offset the reader has been moved to.
///
/// # Errors
/// `HeaderNotFound` if the file ends before the header of given index.
pub fn seek_header<R: Read + Seek + ?Sized>(
  reader: &mut R,
  index: usize,
  rounding: Rounding,
) -> Result<u64, Error> {
  let file_len = stream_len(reader)?;
  let mut offset = 0;
  for i in 0..index {
    reader.seek(SeekFrom::Start(offset)).map_err(new_io_err)?;
    let scanned = scan_header(reader, None, i)?;
    if !scanned.complete {
      return Err(new_header_not_found_err(index, i));
    }
    offset = scanned
      .data_offset
      .saturating_add(data_size(&scanned.header, rounding)?);
    if offset - offset % RECORD_SIZE as u64 >= file_len {
      return Err(new_header_not_found_err(index, i + 1));
    }
  }
  reader.seek(SeekFrom::Start(offset)).map_err(new_io_err)
}

/// Reads the header of given index, see `scan_header` and `seek_header`.
pub fn read_header<R: Read + Seek + ?Sized>(
  reader: &mut R,
  keywords: Option<&HashSet<String>>,
  index: usize,
  rounding: Rounding,
) -> Result<Header, Error> {
  seek_header(reader, index, rounding)?;
  let scanned = scan_header(reader, keywords, index)?;
  if !scanned.complete && scanned.n_records > 0 {
    warn!("No END card found in header {}: header truncated", index);
  }
  Ok(scanned.header)
}

/// Reads all the headers of a file, from the primary header to the last extension.
///
/// A truncated primary header (no `END` card) is returned as is. Past the primary header, a
/// block of records with no `END` card ends the scan and is not returned.
pub fn read_all_headers<R: Read + Seek + ?Sized>(
  reader: &mut R,
  rounding: Rounding,
) -> Result<Vec<Header>, Error> {
  let file_len = stream_len(reader)?;
  let mut headers = Vec::new();
  let mut offset = 0;
  while offset < file_len {
    reader.seek(SeekFrom::Start(offset)).map_err(new_io_err)?;
    let scanned = scan_header(reader, None, headers.len())?;
    if scanned.n_records == 0 {
      break;
    }
    if !scanned.complete {
      if headers.is_empty() {
        warn!("No END card found in header 0: header truncated");
        headers.push(scanned.header);
      } else {
        warn!(
          "No END card found after header {} at offset {}: stop reading",
          headers.len() - 1,
          scanned.offset
        );
      }
      break;
    }
    offset = scanned
      .data_offset
      .saturating_add(data_size(&scanned.header, rounding)?);
    headers.push(scanned.header);
  }
  Ok(headers)
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::{common::item::HeaderItem, error::FitsError};

  fn int(kw: &str, v: i64) -> HeaderItem {
    HeaderItem::from_int(kw, v, None).unwrap()
  }

  /// Primary header with no data followed by an image extension of `n` bytes.
  fn two_headers(n: i64) -> Vec<u8> {
    let primary = Header::from_items(
      0,
      [
        HeaderItem::from_bool("SIMPLE", true, None).unwrap(),
        int("BITPIX", 8),
        int("NAXIS", 0),
        HeaderItem::from_bool("EXTEND", true, None).unwrap(),
      ],
    );
    let ext = Header::from_items(
      1,
      [
        HeaderItem::new_string("XTENSION", "IMAGE", None).unwrap(),
        int("BITPIX", 8),
        int("NAXIS", 1),
        int("NAXIS1", n),
        int("PCOUNT", 0),
        int("GCOUNT", 1),
      ],
    );
    let mut bytes = primary.to_bytes();
    bytes.extend(ext.to_bytes());
    bytes.extend(std::iter::repeat_n(7_u8, n as usize));
    bytes.resize(bytes.len().next_multiple_of(RECORD_SIZE), 0);
    bytes
  }

  #[test]
  fn test_scan_with_filter() {
    let mut cursor = Cursor::new(two_headers(10));
    let kws: HashSet<String> = ["NAXIS".to_string(), "FOO".to_string()].into();
    let scanned = scan_header(&mut cursor, Some(&kws), 0).unwrap();
    assert!(scanned.complete);
    assert_eq!(scanned.header.len(), 1);
    assert_eq!(scanned.header.get("NAXIS").unwrap().as_int().unwrap(), 0);
    assert_eq!(scanned.data_offset, 2880);
    assert_eq!(scanned.n_records, 1);
  }

  #[test]
  fn test_read_extension() {
    let mut cursor = Cursor::new(two_headers(3000));
    let h = read_header(&mut cursor, None, 1, Rounding::Standard).unwrap();
    assert_eq!(h.header_index(), 1);
    assert_eq!(h.get("XTENSION").unwrap().value(), Some("IMAGE"));
    assert_eq!(h.get("NAXIS1").unwrap().as_int().unwrap(), 3000);
    let err = read_header(&mut cursor, None, 2, Rounding::Standard).unwrap_err();
    assert!(
      matches!(err.root(), FitsError::HeaderNotFound { index: 2, found: 2 }),
      "{}",
      err
    );
  }

  #[test]
  fn test_read_all() {
    for rounding in [Rounding::Standard, Rounding::Legacy] {
      let mut cursor = Cursor::new(two_headers(1500));
      let headers = read_all_headers(&mut cursor, rounding).unwrap();
      assert_eq!(headers.len(), 2);
      assert_eq!(headers[0].header_index(), 0);
      assert_eq!(headers[1].header_index(), 1);
      assert_eq!(headers[1].len(), 6);
    }
  }

  #[test]
  fn test_legacy_rounding_small_last_data() {
    // 100 bytes of data: the legacy rounding skips 200 bytes and lands in the data record
    let mut cursor = Cursor::new(two_headers(100));
    for rounding in [Rounding::Standard, Rounding::Legacy] {
      let headers = read_all_headers(&mut cursor, rounding).unwrap();
      assert_eq!(headers.len(), 2);
      assert_eq!(headers[1].get("NAXIS1").unwrap().as_int().unwrap(), 100);
    }
  }

  #[test]
  fn test_legacy_rounding_misses_extension() {
    // 4000 bytes of data: 1 record + 1120 bytes, the legacy rounding only skips 5120 bytes
    let mut bytes = two_headers(4000);
    bytes.extend(Header::from_items(2, [int("BITPIX", 8), int("NAXIS", 0)]).to_bytes());
    let mut cursor = Cursor::new(bytes);
    let standard = read_all_headers(&mut cursor, Rounding::Standard).unwrap();
    assert_eq!(standard.len(), 3);
    assert_eq!(standard[2].len(), 2);
    // In legacy mode, the third header starts at the second data record
    let legacy = read_all_headers(&mut cursor, Rounding::Legacy).unwrap();
    assert_eq!(legacy.len(), 3);
    assert_eq!(legacy[2].len(), 36 + 2);
  }

  #[test]
  fn test_empty_and_truncated() {
    let mut cursor = Cursor::new(Vec::new());
    assert!(read_all_headers(&mut cursor, Rounding::Standard).unwrap().is_empty());
    assert!(read_header(&mut cursor, None, 0, Rounding::Standard).unwrap().is_empty());
    // No END card
    let mut bytes = Header::from_items(0, [int("NAXIS", 0)]).to_bytes();
    bytes[80..83].copy_from_slice(b"   ");
    let mut cursor = Cursor::new(bytes);
    let scanned = scan_header(&mut cursor, None, 0).unwrap();
    assert!(!scanned.complete);
    assert_eq!(scanned.header.len(), 36);
    let headers = read_all_headers(&mut cursor, Rounding::Standard).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].len(), 36);
    let err = seek_header(&mut cursor, 1, Rounding::Standard).unwrap_err();
    assert!(matches!(err.root(), FitsError::HeaderNotFound { index: 1, found: 0 }));
  }
}
