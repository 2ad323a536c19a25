//! Card codec, format side: from a `HeaderItem` to an 80-byte card image.

use log::warn;

use crate::common::{
  CARD_SIZE, KEYWORD_SIZE, VALUE_COMMENT_SEPARATOR, VALUE_INDICATOR,
  item::{CardKind, HeaderItem},
};

/// Width of the fixed-format value field (card bytes 11 to 30).
const VALUE_FIELD_WIDTH: usize = 20;
/// Minimum number of characters between the quotes of a string value.
const MIN_STRING_WIDTH: usize = 8;
/// Number of fractional digits above which a real is written in scientific notation.
const MAX_FRACTION_DIGITS: usize = 18;

/// Formats an item into its card image.
///
/// * keyword left justified on 8 bytes;
/// * commentary card: 2 spaces then the comment;
/// * string value: `= '` value `'`, the value left justified on at least 8 characters,
///   the whole padded up to byte 30;
/// * other values: `= ` then the value right justified on 20 characters (up to 70);
/// * then, if any, ` / ` followed by the comment, truncated to fit in the 80 bytes.
///
/// The item checked its keyword and value lengths at construction, so the result is always
/// a valid 80-byte card.
pub fn format_card(item: &HeaderItem) -> [u8; CARD_SIZE] {
  let mut card = [b' '; CARD_SIZE];
  let (kw, tail) = card.split_at_mut(KEYWORD_SIZE);
  write_bytes(kw, item.keyword().as_bytes());
  let (indicator, value_comment) = tail.split_at_mut(VALUE_INDICATOR.len());
  match (item.kind(), item.value()) {
    (CardKind::StringValue, Some(value)) => {
      indicator.copy_from_slice(VALUE_INDICATOR);
      let quoted = format!("'{:<w$}'", encode_string(value), w = MIN_STRING_WIDTH);
      let n = write_bytes(value_comment, quoted.as_bytes());
      write_comment(&mut value_comment[n.max(VALUE_FIELD_WIDTH)..], item);
    }
    (CardKind::Value, Some(value)) => {
      indicator.copy_from_slice(VALUE_INDICATOR);
      let field = format!("{:>w$}", value, w = VALUE_FIELD_WIDTH);
      let n = write_bytes(value_comment, field.as_bytes());
      write_comment(&mut value_comment[n..], item);
    }
    _ => {
      if let Some(comment) = item.comment() {
        let n = write_bytes(value_comment, comment.as_bytes());
        if n < comment.len() {
          warn!(
            "Comment of '{}' truncated to '{}'",
            item.keyword(),
            String::from_utf8_lossy(&comment.as_bytes()[..n])
          );
        }
      }
    }
  }
  card
}

/// Copies as many bytes of `src` as possible at the beginning of `dest`.
/// Returns the number of bytes copied.
fn write_bytes(dest: &mut [u8], src: &[u8]) -> usize {
  let n = src.len().min(dest.len());
  dest[..n].copy_from_slice(&src[..n]);
  n
}

/// Writes the value/comment separator and the comment, truncated if it does not fit in `dest`.
/// Nothing is written if there is no room for a single comment character.
fn write_comment(dest: &mut [u8], item: &HeaderItem) {
  if let Some(comment) = item.comment() {
    if dest.len() > VALUE_COMMENT_SEPARATOR.len() {
      let (sep, tail) = dest.split_at_mut(VALUE_COMMENT_SEPARATOR.len());
      sep.copy_from_slice(VALUE_COMMENT_SEPARATOR);
      let n = write_bytes(tail, comment.as_bytes());
      if n < comment.len() {
        warn!(
          "Comment of '{}' truncated to '{}'",
          item.keyword(),
          String::from_utf8_lossy(&comment.as_bytes()[..n])
        );
      }
    } else {
      warn!("No room left for the comment of '{}'", item.keyword());
    }
  }
}

/// Encodes a string value for writing between quotes: every `'` becomes `''`.
pub fn encode_string(value: &str) -> String {
  value.replace('\'', "''")
}

/// Writes a real in its shortest decimal form, always with a fractional part
/// (`2` is written `2.0`). Values needing more than 18 fractional digits, or more than the
/// 20 characters of the fixed-format value field, are written in scientific notation.
pub fn format_real(value: f64) -> String {
  let mut s = value.to_string();
  if !s.contains('.') {
    s.push_str(".0");
  }
  let n_fraction_digits = s.len() - s.find('.').map_or(s.len(), |i| i + 1);
  if n_fraction_digits > MAX_FRACTION_DIGITS || s.len() > VALUE_FIELD_WIDTH {
    format!("{:E}", value)
  } else {
    s
  }
}
