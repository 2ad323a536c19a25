//! Card codec, parse side: from an 80-byte card image to a `HeaderItem`.

use std::borrow::Cow;

use crate::{
  common::{CARD_SIZE, KEYWORD_SIZE, VC_RANGE, card_keyword, item::HeaderItem},
  error::{Error, new_unterminated_quote_err, new_wrong_card_length_err},
};

// Utility methods
pub(crate) fn bytes2str(bytes: &[u8]) -> Cow<'_, str> {
  String::from_utf8_lossy(bytes)
}

fn non_empty(bytes: &[u8]) -> Option<String> {
  if bytes.is_empty() {
    None
  } else {
    Some(bytes2str(bytes).into_owned())
  }
}

/// Returns `true` if byte 9 (index 8) of the card holds the `=` of the value indicator.
pub(crate) fn has_value_indicator(card: &[u8; CARD_SIZE]) -> bool {
  card[KEYWORD_SIZE] == b'='
}

/// Parses a card image.
///
/// * Keyword: bytes 1 to 8, trimmed.
/// * No `=` in byte 9: commentary card, the trimmed remainder (minus a leading `/`, if any)
///   is the comment.
/// * Value starting with `'`: string value, a doubled `''` stands for a literal quote;
///   what follows the closing quote (minus a leading `/`) is the comment.
/// * Else: the value is everything up to the first `/`, the comment everything after.
///
/// # Errors
/// * `WrongCardLength` if the card is not exactly 80 bytes long;
/// * `UnterminatedQuote` if a string value has no closing quote.
pub fn parse_card(card: &[u8]) -> Result<HeaderItem, Error> {
  let card: &[u8; CARD_SIZE] = card
    .try_into()
    .map_err(|_| new_wrong_card_length_err(card.len()))?;
  let keyword = bytes2str(card_keyword(card)).into_owned();
  if !has_value_indicator(card) {
    let text = card[KEYWORD_SIZE..].trim_ascii();
    let text = text
      .strip_prefix(b"/")
      .map(<[u8]>::trim_ascii_start)
      .unwrap_or(text);
    return Ok(HeaderItem::from_parts(keyword, None, non_empty(text), false));
  }
  let value_comment = card[VC_RANGE].trim_ascii_start();
  if value_comment.starts_with(b"'") {
    let (value, tail) =
      parse_string_value(value_comment).map_err(|e| e.card_context(card.as_slice()))?;
    Ok(HeaderItem::from_parts(
      keyword,
      Some(value),
      parse_string_comment(tail),
      true,
    ))
  } else {
    let (value, comment) = match value_comment.iter().position(|&b| b == b'/') {
      Some(i) => (&value_comment[..i], non_empty(value_comment[i + 1..].trim_ascii())),
      None => (value_comment, None),
    };
    Ok(HeaderItem::from_parts(
      keyword,
      Some(bytes2str(value.trim_ascii()).into_owned()),
      comment,
      false,
    ))
  }
}

/// Parse a string value enclosed between two single quotes `'`, the first byte being the
/// opening quote.
/// Inside, a single quote `'` is encoded by two successive single quotes `''`.
/// Leading spaces are significant; trailing spaces are not.
///
/// # return
/// * the decoded value;
/// * the remaining, unparsed, part of the card.
pub(crate) fn parse_string_value(part_of_card: &[u8]) -> Result<(String, &[u8]), Error> {
  let mut res = String::new();
  let mut sub = match part_of_card {
    [b'\'', tail @ ..] => tail,
    _ => return Err(new_unterminated_quote_err(part_of_card)),
  };
  loop {
    match sub.iter().position(|&b| b == b'\'') {
      Some(i) if sub.get(i + 1) == Some(&b'\'') => {
        // includes one of the two single quotes
        res.push_str(&bytes2str(&sub[..=i]));
        sub = &sub[i + 2..];
      }
      Some(i) => {
        res.push_str(&bytes2str(&sub[..i]));
        res.truncate(res.trim_end().len());
        return Ok((res, &sub[i + 1..]));
      }
      None => return Err(new_unterminated_quote_err(part_of_card)),
    }
  }
}

/// Comment following the closing quote of a string value: optional `/`, then the text.
fn parse_string_comment(tail: &[u8]) -> Option<String> {
  let tail = tail.trim_ascii();
  let tail = tail
    .strip_prefix(b"/")
    .map(<[u8]>::trim_ascii)
    .unwrap_or(tail);
  non_empty(tail)
}

/// Decodes the content of a quoted string value (enclosing quotes already removed):
/// every `''` becomes `'`.
pub fn decode_string(encoded: &str) -> String {
  encoded.replace("''", "'")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{common::item::CardKind, error::FitsError};

  fn card(s: &str) -> Vec<u8> {
    format!("{:<80}", s).into_bytes()
  }

  #[test]
  fn test_wrong_length() {
    let err = parse_card(b"SIMPLE  =                    T").unwrap_err();
    assert!(matches!(err.root(), FitsError::WrongCardLength { len: 30 }));
    let mut too_long = card("SIMPLE  =                    T");
    too_long.push(b' ');
    let err = parse_card(&too_long).unwrap_err();
    assert!(matches!(err.root(), FitsError::WrongCardLength { len: 81 }));
  }

  #[test]
  fn test_value_card() {
    let item = parse_card(&card("BITPIX  =                   16 / Data element bit size")).unwrap();
    assert_eq!(item.keyword(), "BITPIX");
    assert_eq!(item.value(), Some("16"));
    assert_eq!(item.comment(), Some("Data element bit size"));
    assert_eq!(item.kind(), CardKind::Value);
    assert_eq!(item.as_int().unwrap(), 16);
  }

  #[test]
  fn test_value_card_no_comment() {
    let item = parse_card(&card("SIMPLE  =                    T")).unwrap();
    assert_eq!(item.value(), Some("T"));
    assert_eq!(item.comment(), None);
    assert!(item.as_bool().unwrap());
  }

  #[test]
  fn test_string_card() {
    let item = parse_card(&card("OBJECT  = 'M31     '           / Andromeda")).unwrap();
    assert_eq!(item.keyword(), "OBJECT");
    assert_eq!(item.value(), Some("M31"));
    assert_eq!(item.comment(), Some("Andromeda"));
    assert!(item.is_string_value());
  }

  #[test]
  fn test_string_card_with_quotes_and_slash() {
    let item = parse_card(&card("OBSERVER= 'O''Brien''s / team' / who")).unwrap();
    assert_eq!(item.value(), Some("O'Brien's / team"));
    assert_eq!(item.comment(), Some("who"));
  }

  #[test]
  fn test_string_ending_with_quote() {
    let item = parse_card(&card("K       = 'abc'''")).unwrap();
    assert_eq!(item.value(), Some("abc'"));
    let item = parse_card(&card("K       = ''")).unwrap();
    assert_eq!(item.value(), Some(""));
    assert!(item.is_string_value());
  }

  #[test]
  fn test_unterminated_quote() {
    let err = parse_card(&card("OBJECT  = 'M31 / no closing quote")).unwrap_err();
    assert!(matches!(err.root(), FitsError::UnterminatedQuote { .. }), "{}", err);
    let err = parse_card(&card("OBJECT  = 'it''")).unwrap_err();
    assert!(matches!(err.root(), FitsError::UnterminatedQuote { .. }));
  }

  #[test]
  fn test_comment_cards() {
    let item = parse_card(&card("COMMENT   FITS (Flexible Image Transport System)")).unwrap();
    assert_eq!(item.keyword(), "COMMENT");
    assert_eq!(item.value(), None);
    assert_eq!(item.comment(), Some("FITS (Flexible Image Transport System)"));
    assert_eq!(item.kind(), CardKind::Commentary);

    let item = parse_card(&card("HISTORY / slash led")).unwrap();
    assert_eq!(item.comment(), Some("slash led"));

    let item = parse_card(&card("")).unwrap();
    assert_eq!(item.keyword(), "");
    assert_eq!(item.comment(), None);
  }

  #[test]
  fn test_empty_value() {
    let item = parse_card(&card("UNDEF   =                      / undefined")).unwrap();
    assert_eq!(item.value(), Some(""));
    assert_eq!(item.comment(), Some("undefined"));
    assert!(item.as_int().is_err());
  }

  #[test]
  fn test_decode_string() {
    assert_eq!(decode_string("O''Brien''s"), "O'Brien's");
    assert_eq!(decode_string("plain"), "plain");
  }
}
