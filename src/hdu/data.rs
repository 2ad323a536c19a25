//! Size of the data section following a header, used to skip from one header to the next.

use log::{debug, warn};

use crate::{
  common::RECORD_SIZE,
  error::{Error, new_data_size_overflow_err, new_missing_kw_err, new_negative_count_err},
  hdu::header::Header,
};

const RECORD_LEN: u64 = RECORD_SIZE as u64;

/// How the raw byte size of a data section is rounded to the record size.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
  /// Round up to the next multiple of 2880 bytes, as the FITS standard requires.
  /// A header without axis (`NAXIS = 0`) has no data section, not a one element one.
  #[default]
  Standard,
  /// Add `size % 2880` to the size, and consider that a header without axis (`NAXIS = 0`)
  /// still has a data section of one element.
  /// Kept to reproduce the header positions computed by older tools: it is exact only for
  /// record-aligned sizes. Since the record reader realigns a misaligned position downward,
  /// it also lands on the right record when the remainder is at least half a record, or
  /// when the header has no axis.
  Legacy,
}

impl Rounding {
  /// Rounds the raw byte size of a data section.
  pub fn round(self, n_bytes: u64) -> Result<u64, Error> {
    match self {
      Self::Standard => n_bytes.checked_next_multiple_of(RECORD_LEN),
      Self::Legacy => n_bytes.checked_add(n_bytes % RECORD_LEN),
    }
    .ok_or_else(new_data_size_overflow_err)
  }
}

/// Computes the size, in bytes, of the data section following the given header, from the
/// values of `BITPIX`, `NAXIS`, `NAXISn`, `PCOUNT` (default 0) and `GCOUNT` (default 1):
/// `|BITPIX| / 8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`, rounded according to `rounding`.
///
/// A header without any card has no data section.
/// With the standard rounding, a random groups header (`GROUPS = T`, `NAXIS1 = 0`) does not
/// take `NAXIS1` into account.
///
/// # Errors
/// * if `BITPIX`, `NAXIS` or one of the `NAXISn` keywords is missing or not an integer;
/// * if a count is negative.
pub fn data_size(header: &Header, rounding: Rounding) -> Result<u64, Error> {
  if header.is_empty() {
    return Ok(0);
  }
  let bitpix = header
    .get("BITPIX")
    .ok_or_else(|| new_missing_kw_err("BITPIX"))?
    .as_int()?;
  let naxis = count(header, "NAXIS")?;
  let mut axis_product: u64 = match (naxis, rounding) {
    (0, Rounding::Standard) => 0,
    _ => 1,
  };
  let random_groups = rounding == Rounding::Standard && is_random_groups(header);
  for i in 1..=naxis {
    let n = count(header, &format!("NAXIS{}", i))?;
    if i == 1 && random_groups {
      continue;
    }
    axis_product = axis_product
      .checked_mul(n)
      .ok_or_else(new_data_size_overflow_err)?;
  }
  let pcount = optional_count(header, "PCOUNT", 0)?;
  let gcount = optional_count(header, "GCOUNT", 1)?;
  let n_bytes = axis_product
    .checked_add(pcount)
    .and_then(|n| n.checked_mul(gcount))
    .and_then(|n| n.checked_mul(bitpix.unsigned_abs() / 8))
    .ok_or_else(new_data_size_overflow_err)?;
  let size = rounding.round(n_bytes)?;
  if rounding == Rounding::Legacy {
    let standard = data_size(header, Rounding::Standard)?;
    if standard != size {
      warn!(
        "Legacy rounding of the data section of header {}: {} bytes instead of {}.",
        header.header_index(),
        size,
        standard
      );
    }
  }
  debug!(
    "Data section of header {}: {} bytes ({} before rounding).",
    header.header_index(),
    size,
    n_bytes
  );
  Ok(size)
}

fn is_random_groups(header: &Header) -> bool {
  header
    .get("GROUPS")
    .and_then(|item| item.as_bool().ok())
    .unwrap_or(false)
    && header
      .get("NAXIS1")
      .and_then(|item| item.as_int().ok())
      .is_some_and(|n| n == 0)
}

/// Value of a mandatory non-negative integer keyword.
fn count(header: &Header, keyword: &str) -> Result<u64, Error> {
  let item = header
    .get(keyword)
    .ok_or_else(|| new_missing_kw_err(keyword))?;
  let value = item.as_int()?;
  u64::try_from(value).map_err(|_| new_negative_count_err(keyword, value))
}

fn optional_count(header: &Header, keyword: &str, default: u64) -> Result<u64, Error> {
  if header.contains_keyword(keyword) {
    count(header, keyword)
  } else {
    Ok(default)
  }
}
