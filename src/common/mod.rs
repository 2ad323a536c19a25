//! Card and record level building blocks: the card codec and the header item it produces.

use std::ops::Range;

pub mod header;
pub mod item;
pub mod read;
pub mod write;

/// Size, in bytes, of a card image (a keyword record).
pub const CARD_SIZE: usize = 80;
/// Size, in bytes, of a logical record.
pub const RECORD_SIZE: usize = 2880;
/// Number of card images in a logical record.
pub const CARDS_PER_RECORD: usize = RECORD_SIZE / CARD_SIZE;
/// Maximum number of characters in a keyword.
pub const KEYWORD_SIZE: usize = 8;

/// The card closing a header, space padded to 80 bytes.
pub const END_CARD: &[u8; CARD_SIZE] = &end_card();

const fn end_card() -> [u8; CARD_SIZE] {
  let mut card = [b' '; CARD_SIZE];
  card[0] = b'E';
  card[1] = b'N';
  card[2] = b'D';
  card
}

/// Value of the value indicator, if present.
const VALUE_INDICATOR: &[u8; 2] = b"= ";
/// Value of the separator between a value and the comment, if present.
const VALUE_COMMENT_SEPARATOR: &[u8; 3] = b" / ";

/// Value plus comment byte range in a card image holding a value.
pub(crate) const VC_RANGE: Range<usize> = 10..CARD_SIZE;

/// Returns the keyword of the given card image, without its trailing spaces.
/// No check is performed on the card length beyond the first 8 bytes
/// (a shorter slice returns the trimmed slice itself).
pub fn card_keyword(card: &[u8]) -> &[u8] {
  let end = card.len().min(KEYWORD_SIZE);
  card[..end].trim_ascii()
}

/// Returns `true` if the given card image is the `END` card.
pub fn is_end_card(card: &[u8]) -> bool {
  card_keyword(card) == b"END"
}

/// Returns the number of logical records needed to store `n_cards` card images.
pub const fn n_records(n_cards: usize) -> usize {
  n_cards.div_ceil(CARDS_PER_RECORD)
}
