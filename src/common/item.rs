//! Defines `HeaderItem`, the structured form of one card image.

use std::fmt::{self, Display};

use crate::{
  common::{KEYWORD_SIZE, read, write},
  error::{
    Error, new_empty_val_err, new_invalid_bool_val_err, new_invalid_commentary_err,
    new_invalid_int_val_err, new_invalid_keyword_err, new_invalid_real_val_err,
    new_invalid_value_err, new_keyword_too_long_err, new_non_ascii_err, new_not_finite_real_err,
    new_value_too_long_err,
  },
};

/// Maximum number of characters of a non-string value (card bytes 11 to 80).
pub const MAX_VALUE_LEN: usize = 70;
/// Maximum number of characters of an *encoded* string value, i.e. once the single quotes it
/// contains have been doubled, not counting the enclosing quotes.
pub const MAX_STRING_VALUE_LEN: usize = MAX_VALUE_LEN - 2;

/// The three kinds of card images the codec knows how to parse and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
  /// `KEYWORD = 'value' / comment`
  StringValue,
  /// `KEYWORD =                value / comment`, the value being a number, a logical, ...
  Value,
  /// `KEYWORD  comment`, no value indicator.
  Commentary,
}

/// One logical header entry.
///
/// Items are immutable: editing a header means building new items.
/// Equality and hash are structural over the keyword, the value, the comment and the
/// string flag, so two items read from different places of a file compare equal if
/// their card images carry the same information.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderItem {
  keyword: String,
  value: Option<String>,
  comment: Option<String>,
  is_string: bool,
}

impl HeaderItem {
  /// Creates a card holding a character string value.
  /// Trailing spaces of the value are not significant in FITS and are removed.
  /// # Errors
  /// * if the keyword is longer than 8 characters or contains non-printable characters;
  /// * if the value, once its quotes are doubled, is longer than 68 characters.
  pub fn new_string(keyword: &str, value: &str, comment: Option<&str>) -> Result<Self, Error> {
    let keyword = check_keyword(keyword)?;
    let value = value.trim_end();
    check_ascii(value)?;
    let encoded_len = value.len() + value.matches('\'').count();
    if encoded_len > MAX_STRING_VALUE_LEN {
      return Err(new_value_too_long_err(keyword, encoded_len, MAX_STRING_VALUE_LEN));
    }
    Self::checked(keyword, Some(value.into()), comment, true)
  }

  /// Creates a card holding a non-string value given in its textual form,
  /// e.g. `T`, `42` or `1.5D3`. The text is interpreted only on demand
  /// (see `as_int`, `as_real`, `as_bool`).
  /// The text can neither start with a quote nor contain a `/`: it would not be read back
  /// as the same value.
  pub fn new_value(keyword: &str, value: &str, comment: Option<&str>) -> Result<Self, Error> {
    let keyword = check_keyword(keyword)?;
    let value = value.trim();
    check_ascii(value)?;
    if value.starts_with('\'') || value.contains('/') {
      return Err(new_invalid_value_err(keyword, value));
    }
    if value.len() > MAX_VALUE_LEN {
      return Err(new_value_too_long_err(keyword, value.len(), MAX_VALUE_LEN));
    }
    Self::checked(keyword, Some(value.into()), comment, false)
  }

  /// Creates a commentary card (`COMMENT`, `HISTORY`, blank keyword, ...), i.e. a card
  /// without value indicator. Leading and trailing spaces of the text are not kept.
  ///
  /// # Errors
  /// If the text starts with `/`, which is read back as a comment separator.
  pub fn new_comment(keyword: &str, comment: Option<&str>) -> Result<Self, Error> {
    let keyword = check_keyword(keyword)?;
    if let Some(text) = comment.map(str::trim).filter(|text| text.starts_with('/')) {
      return Err(new_invalid_commentary_err(keyword, text));
    }
    Self::checked(keyword, None, comment, false)
  }

  pub fn from_int(keyword: &str, value: i64, comment: Option<&str>) -> Result<Self, Error> {
    Self::new_value(keyword, &value.to_string(), comment)
  }

  /// # Errors
  /// If the value is NaN or infinite, which FITS can not represent.
  pub fn from_real(keyword: &str, value: f64, comment: Option<&str>) -> Result<Self, Error> {
    if value.is_finite() {
      Self::new_value(keyword, &write::format_real(value), comment)
    } else {
      Err(new_not_finite_real_err(value).kw_context(keyword.trim()))
    }
  }

  pub fn from_bool(keyword: &str, value: bool, comment: Option<&str>) -> Result<Self, Error> {
    Self::new_value(keyword, if value { "T" } else { "F" }, comment)
  }

  /// Parses a card image, see `read::parse_card`.
  pub fn parse(card: &[u8]) -> Result<Self, Error> {
    read::parse_card(card)
  }

  /// Formats this item into a card image, see `write::format_card`.
  pub fn to_card(&self) -> [u8; 80] {
    write::format_card(self)
  }

  fn checked(
    keyword: &str,
    value: Option<String>,
    comment: Option<&str>,
    is_string: bool,
  ) -> Result<Self, Error> {
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    if let Some(c) = comment {
      check_ascii(c)?;
    }
    Ok(Self::from_parts(
      keyword.into(),
      value,
      comment.map(String::from),
      is_string,
    ))
  }

  /// No check is performed: reserved to the parser, which reads the parts from a card image
  /// (so they necessarily fit in a card).
  pub(crate) fn from_parts(
    keyword: String,
    value: Option<String>,
    comment: Option<String>,
    is_string: bool,
  ) -> Self {
    Self {
      keyword,
      value,
      comment,
      is_string,
    }
  }

  pub fn keyword(&self) -> &str {
    &self.keyword
  }

  /// The value, as written in the card for non-string values, or decoded (enclosing quotes
  /// removed, doubled quotes unescaped) for string values.
  /// `None` for commentary cards.
  pub fn value(&self) -> Option<&str> {
    self.value.as_deref()
  }

  pub fn comment(&self) -> Option<&str> {
    self.comment.as_deref()
  }

  pub fn is_string_value(&self) -> bool {
    self.is_string
  }

  pub fn kind(&self) -> CardKind {
    match (&self.value, self.is_string) {
      (None, _) => CardKind::Commentary,
      (Some(_), true) => CardKind::StringValue,
      (Some(_), false) => CardKind::Value,
    }
  }

  fn non_empty_value(&self, expected: &'static str) -> Result<&str, Error> {
    match self.value.as_deref().map(str::trim) {
      Some(v) if !v.is_empty() => Ok(v),
      _ => Err(new_empty_val_err(expected).kw_context(&self.keyword)),
    }
  }

  /// Interprets the value as an integer.
  pub fn as_int(&self) -> Result<i64, Error> {
    self.non_empty_value("integer").and_then(|v| {
      v.parse::<i64>()
        .map_err(|err| new_invalid_int_val_err(err, v).kw_context(&self.keyword))
    })
  }

  /// Interprets the value as a real, accepting the FITS `D` exponent notation.
  pub fn as_real(&self) -> Result<f64, Error> {
    self.non_empty_value("real").and_then(|v| {
      v.replace(['D', 'd'], "E")
        .parse::<f64>()
        .map_err(|err| new_invalid_real_val_err(err, v).kw_context(&self.keyword))
    })
  }

  /// Interprets the value as a FITS logical, `T` or `F`.
  pub fn as_bool(&self) -> Result<bool, Error> {
    self.non_empty_value("logical").and_then(|v| match v {
      "T" => Ok(true),
      "F" => Ok(false),
      _ => Err(new_invalid_bool_val_err(v).kw_context(&self.keyword)),
    })
  }
}

impl Display for HeaderItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&String::from_utf8_lossy(&self.to_card()))
  }
}

/// Returns the trimmed keyword if valid.
fn check_keyword(keyword: &str) -> Result<&str, Error> {
  let keyword = keyword.trim();
  if keyword.len() > KEYWORD_SIZE {
    Err(new_keyword_too_long_err(keyword))
  } else if !keyword.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
    Err(new_invalid_keyword_err(keyword))
  } else {
    Ok(keyword)
  }
}

fn check_ascii(text: &str) -> Result<(), Error> {
  if text.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
    Ok(())
  } else {
    Err(new_non_ascii_err(text))
  }
}
