use std::{
  io,
  num::{ParseFloatError, ParseIntError},
};

use thiserror::Error;

/// An error that can be produced while parsing, formatting, reading or editing a FITS header.
pub type Error = Box<FitsError>;

fn bytes2str(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into()
}

pub(crate) fn new_io_err(err: io::Error) -> Error {
  FitsError::Io(err).into()
}

// Card format

pub(crate) fn new_wrong_card_length_err(len: usize) -> Error {
  FitsError::WrongCardLength { len }.into()
}

pub(crate) fn new_unterminated_quote_err(card: &[u8]) -> Error {
  let card = bytes2str(card);
  FitsError::UnterminatedQuote { card }.into()
}

pub(crate) fn new_keyword_too_long_err(keyword: &str) -> Error {
  FitsError::KeywordTooLong {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_invalid_keyword_err(keyword: &str) -> Error {
  FitsError::InvalidKeyword {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_non_ascii_err(text: &str) -> Error {
  FitsError::NonAsciiText { text: text.into() }.into()
}

pub(crate) fn new_value_too_long_err(keyword: &str, len: usize, max: usize) -> Error {
  FitsError::ValueTooLong {
    keyword: keyword.into(),
    len,
    max,
  }
  .into()
}

pub(crate) fn new_invalid_commentary_err(keyword: &str, text: &str) -> Error {
  FitsError::InvalidCommentary {
    keyword: keyword.into(),
    text: text.into(),
  }
  .into()
}

pub(crate) fn new_invalid_value_err(keyword: &str, value: &str) -> Error {
  FitsError::InvalidValue {
    keyword: keyword.into(),
    value: value.into(),
  }
  .into()
}

// Value interpretation

pub(crate) fn new_empty_val_err(expected: &'static str) -> Error {
  FitsError::EmptyValue { expected }.into()
}

pub(crate) fn new_invalid_int_val_err(err: ParseIntError, value: &str) -> Error {
  FitsError::InvalidInteger {
    err,
    value: value.into(),
  }
  .into()
}

pub(crate) fn new_invalid_real_val_err(err: ParseFloatError, value: &str) -> Error {
  FitsError::InvalidReal {
    err,
    value: value.into(),
  }
  .into()
}

pub(crate) fn new_invalid_bool_val_err(value: &str) -> Error {
  FitsError::InvalidLogical {
    value: value.into(),
  }
  .into()
}

pub(crate) fn new_not_finite_real_err(value: f64) -> Error {
  FitsError::NotFiniteReal { value }.into()
}

// Structure

pub(crate) fn new_missing_kw_err(keyword: &str) -> Error {
  FitsError::MissingKeyword {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_negative_count_err(keyword: &str, value: i64) -> Error {
  FitsError::NegativeCount {
    keyword: keyword.into(),
    value,
  }
  .into()
}

pub(crate) fn new_data_size_overflow_err() -> Error {
  FitsError::DataSizeOverflow.into()
}

pub(crate) fn new_missing_end_err(offset: u64) -> Error {
  FitsError::MissingEndCard { offset }.into()
}

pub(crate) fn new_header_not_found_err(index: usize, found: usize) -> Error {
  FitsError::HeaderNotFound { index, found }.into()
}

pub(crate) fn new_out_of_file_err(offset: u64, file_len: u64) -> Error {
  FitsError::OffsetOutOfFile { offset, file_len }.into()
}

#[derive(Error, Debug)]
pub enum FitsError {
  // IO related
  #[error("I/O error: {0}.")]
  Io(#[from] io::Error),

  // Card format
  #[error("Wrong card image length. Expected: 80 bytes. Actual: {len} bytes.")]
  WrongCardLength { len: usize },
  #[error("Unterminated quoted string value: closing single quote not found in \"{card}\".")]
  UnterminatedQuote { card: String },
  #[error("Keyword '{keyword}' too long. Expected: at most 8 characters.")]
  KeywordTooLong { keyword: String },
  #[error("Invalid keyword '{keyword}': only printable ASCII characters are allowed.")]
  InvalidKeyword { keyword: String },
  #[error("Invalid text \"{text}\": only printable ASCII characters are allowed in a card.")]
  NonAsciiText { text: String },
  #[error("Value of keyword '{keyword}' too long. Expected: at most {max} characters. Actual: {len}.")]
  ValueTooLong {
    keyword: String,
    len: usize,
    max: usize,
  },
  #[error(
    "Invalid value '{value}' of keyword '{keyword}': a non-string value can neither start with a quote nor contain '/'."
  )]
  InvalidValue { keyword: String, value: String },
  #[error("Invalid text '{text}' of commentary keyword '{keyword}': it can not start with '/'.")]
  InvalidCommentary { keyword: String, text: String },

  // Value interpretation
  #[error("Wrong keyword value. Expected: {expected}. Actual: empty.")]
  EmptyValue { expected: &'static str },
  #[error("Invalid integer value. Error: '{err:?}'. In '{value}'.")]
  InvalidInteger { err: ParseIntError, value: String },
  #[error("Invalid real value. Error: '{err:?}'. In '{value}'.")]
  InvalidReal { err: ParseFloatError, value: String },
  #[error("Invalid logical value. Expected: 'T' or 'F'. Actual: '{value}'.")]
  InvalidLogical { value: String },
  #[error("Real value {value} can not be written in a FITS card.")]
  NotFiniteReal { value: f64 },

  // Structure
  #[error("Missing mandatory keyword '{keyword}'.")]
  MissingKeyword { keyword: String },
  #[error("Wrong value of '{keyword}'. Expected: positive integer. Actual: {value}.")]
  NegativeCount { keyword: String, value: i64 },
  #[error("Data section size overflow: wrong BITPIX, NAXISn, PCOUNT or GCOUNT value.")]
  DataSizeOverflow,
  #[error("No END card found in the header starting at byte {offset}.")]
  MissingEndCard { offset: u64 },
  #[error("Header of index {index} not found: the file contains only {found} header(s).")]
  HeaderNotFound { index: usize, found: usize },
  #[error("Offset {offset} is past the end of the file (length: {file_len}).")]
  OffsetOutOfFile { offset: u64, file_len: u64 },

  // Context
  #[error("Error: {source}\nKeyword context: {keyword}.")]
  WithKeywordContext { keyword: String, source: Error },
  #[error("Error: {source}\nCard context: {card}.")]
  WithCardContext { card: String, source: Error },
}

impl FitsError {
  /// Add to the error the keyword on which the error occurs.
  pub(crate) fn kw_context(self, keyword: &str) -> Error {
    Self::WithKeywordContext {
      keyword: keyword.into(),
      source: self.into(),
    }
    .into()
  }
  /// Add to the error the full card image on which the error occurs.
  pub(crate) fn card_context(self, card: &[u8]) -> Error {
    Self::WithCardContext {
      card: bytes2str(card),
      source: self.into(),
    }
    .into()
  }

  /// Walks down the context wrappers, if any, and returns the underlying error.
  pub fn root(&self) -> &FitsError {
    match self {
      Self::WithKeywordContext { source, .. } | Self::WithCardContext { source, .. } => {
        source.root()
      }
      _ => self,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_wrong_length() {
    let e = new_wrong_card_length_err(79);
    assert_eq!(
      e.to_string(),
      "Wrong card image length. Expected: 80 bytes. Actual: 79 bytes."
    );
  }

  #[test]
  fn test_root_through_contexts() {
    let e = new_missing_kw_err("NAXIS")
      .kw_context("NAXIS")
      .card_context(b"NAXIS   =");
    assert!(matches!(e.root(), FitsError::MissingKeyword { keyword } if keyword == "NAXIS"));
    assert!(e.to_string().contains("Card context: NAXIS   ="));
  }

  #[test]
  fn test_io_from() {
    let e: FitsError = io::Error::other("oops").into();
    assert!(matches!(e, FitsError::Io(_)));
  }
}
