//! The `Header` index: an ordered list of header items, addressable both by position and by
//! keyword.

use std::{
  collections::{HashMap, HashSet},
  io::Write,
  ops::Index,
  slice::Iter,
};

use crate::{
  common::{END_CARD, RECORD_SIZE, header::RecordWriter, item::HeaderItem, n_records},
  error::Error,
};

/// Ordered sequence of header items (the on-disk order of the cards, `END` excluded),
/// plus the index of the header in its file (0 for the primary header, N for the Nth extension).
///
/// Keyword lookups go through an internal multimap `keyword -> sorted positions`, so they do
/// not depend on the header size. Inserting or removing at interior positions renumbers the
/// positions of all following items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
  index: usize,
  items: Vec<HeaderItem>,
  positions: HashMap<String, Vec<usize>>,
}

impl Header {
  /// Creates an empty header having the given index in its file.
  pub fn new(index: usize) -> Self {
    Self {
      index,
      ..Default::default()
    }
  }

  pub fn from_items<I>(index: usize, items: I) -> Self
  where
    I: IntoIterator<Item = HeaderItem>,
  {
    let mut header = Self::new(index);
    header.extend(items);
    header
  }

  /// Index of this header in its file: 0 for the primary header, N for the Nth extension.
  pub fn header_index(&self) -> usize {
    self.index
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Returns the first item having the given keyword.
  pub fn get(&self, keyword: &str) -> Option<&HeaderItem> {
    self
      .positions
      .get(keyword)
      .and_then(|pos| pos.first())
      .map(|&i| &self.items[i])
  }

  /// Returns the last item having the given keyword.
  pub fn get_last(&self, keyword: &str) -> Option<&HeaderItem> {
    self
      .positions
      .get(keyword)
      .and_then(|pos| pos.last())
      .map(|&i| &self.items[i])
  }

  /// Returns all items having the given keyword, in header order,
  /// or `None` if the keyword is not in the header.
  pub fn get_all(&self, keyword: &str) -> Option<Vec<&HeaderItem>> {
    self
      .positions
      .get(keyword)
      .map(|pos| pos.iter().map(|&i| &self.items[i]).collect())
  }

  /// Set of distinct keywords in the header.
  pub fn keywords(&self) -> HashSet<&str> {
    self.positions.keys().map(String::as_str).collect()
  }

  pub fn contains_keyword(&self, keyword: &str) -> bool {
    self.positions.contains_key(keyword)
  }

  /// Returns the item at the given position.
  pub fn get_at(&self, i: usize) -> Option<&HeaderItem> {
    self.items.get(i)
  }

  /// Position of the first item structurally equal to the given one.
  pub fn index_of(&self, item: &HeaderItem) -> Option<usize> {
    self
      .positions
      .get(item.keyword())
      .and_then(|pos| pos.iter().copied().find(|&i| &self.items[i] == item))
  }

  pub fn contains(&self, item: &HeaderItem) -> bool {
    self.index_of(item).is_some()
  }

  /// Appends an item at the end of the header.
  pub fn push(&mut self, item: HeaderItem) {
    let i = self.items.len();
    self
      .positions
      .entry(item.keyword().to_string())
      .or_default()
      .push(i);
    self.items.push(item);
  }

  /// Inserts an item at position `i`, shifting all following items.
  /// # Panics
  /// If `i > len`.
  pub fn insert(&mut self, i: usize, item: HeaderItem) {
    assert!(i <= self.items.len(), "Insertion index {} out of bounds", i);
    self.shift_positions(i, |p| p + 1);
    self.add_position(item.keyword(), i);
    self.items.insert(i, item);
  }

  /// Removes and returns the item at position `i`, shifting all following items.
  /// # Panics
  /// If `i >= len`.
  pub fn remove(&mut self, i: usize) -> HeaderItem {
    let item = self.items.remove(i);
    self.remove_position(item.keyword(), i);
    self.shift_positions(i, |p| p - 1);
    item
  }

  /// Removes the first item structurally equal to the given one.
  /// Returns `false` if no such item is found.
  pub fn remove_item(&mut self, item: &HeaderItem) -> bool {
    match self.index_of(item) {
      Some(i) => {
        self.remove(i);
        true
      }
      None => false,
    }
  }

  /// Replaces the item at position `i`, returning the previous one.
  /// # Panics
  /// If `i >= len`.
  pub fn set(&mut self, i: usize, item: HeaderItem) -> HeaderItem {
    if self.items[i].keyword() != item.keyword() {
      let old_keyword = self.items[i].keyword().to_string();
      self.remove_position(&old_keyword, i);
      self.add_position(item.keyword(), i);
    }
    std::mem::replace(&mut self.items[i], item)
  }

  pub fn iter(&self) -> Iter<'_, HeaderItem> {
    self.items.iter()
  }

  pub fn as_slice(&self) -> &[HeaderItem] {
    &self.items
  }

  /// Writes the header cards, followed by the `END` card and by the space padding up to the
  /// record boundary. Returns the number of records written.
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize, Error> {
    let mut records = RecordWriter::new(writer);
    for item in &self.items {
      records.write_item(item)?;
    }
    records.finalize()
  }

  /// Renders the header into its record-aligned byte block.
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(n_records(self.items.len() + 1) * RECORD_SIZE);
    for item in &self.items {
      bytes.extend_from_slice(&item.to_card());
    }
    bytes.extend_from_slice(END_CARD);
    bytes.resize(bytes.len().next_multiple_of(RECORD_SIZE), b' ');
    bytes
  }

  /// Applies `f` to every stored position greater or equal to `from`.
  fn shift_positions<F: Fn(usize) -> usize>(&mut self, from: usize, f: F) {
    for pos in self.positions.values_mut() {
      for p in pos.iter_mut().filter(|p| **p >= from) {
        *p = f(*p);
      }
    }
  }

  fn add_position(&mut self, keyword: &str, i: usize) {
    let pos = self.positions.entry(keyword.to_string()).or_default();
    let at = pos.partition_point(|&p| p < i);
    pos.insert(at, i);
  }

  fn remove_position(&mut self, keyword: &str, i: usize) {
    if let Some(pos) = self.positions.get_mut(keyword) {
      if let Ok(at) = pos.binary_search(&i) {
        pos.remove(at);
      }
      if pos.is_empty() {
        self.positions.remove(keyword);
      }
    }
  }
}

impl Extend<HeaderItem> for Header {
  fn extend<T: IntoIterator<Item = HeaderItem>>(&mut self, iter: T) {
    for item in iter {
      self.push(item);
    }
  }
}

impl Index<usize> for Header {
  type Output = HeaderItem;

  fn index(&self, i: usize) -> &Self::Output {
    &self.items[i]
  }
}

impl<'a> IntoIterator for &'a Header {
  type Item = &'a HeaderItem;
  type IntoIter = Iter<'a, HeaderItem>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::common::{CARD_SIZE, read::parse_card};

  fn int(kw: &str, v: i64) -> HeaderItem {
    HeaderItem::from_int(kw, v, None).unwrap()
  }

  fn history(text: &str) -> HeaderItem {
    HeaderItem::new_comment("HISTORY", Some(text)).unwrap()
  }

  fn sample() -> Header {
    Header::from_items(
      0,
      [
        HeaderItem::from_bool("SIMPLE", true, None).unwrap(),
        int("BITPIX", 8),
        history("first"),
        int("NAXIS", 0),
        history("second"),
      ],
    )
  }

  /// Checks that every lookup agrees with a linear scan of the items.
  fn assert_consistent(h: &Header) {
    for (i, item) in h.iter().enumerate() {
      let all = h.get_all(item.keyword()).unwrap();
      assert!(all.contains(&item));
      let first = h.iter().position(|it| it.keyword() == item.keyword());
      assert_eq!(h.get(item.keyword()), first.map(|j| &h[j]));
      assert!(h.index_of(item).unwrap() <= i);
    }
    let n: usize = h.positions.values().map(Vec::len).sum();
    assert_eq!(n, h.len());
  }

  #[test]
  fn test_lookup() {
    let h = sample();
    assert_eq!(h.len(), 5);
    assert_eq!(h.get("BITPIX").unwrap().as_int().unwrap(), 8);
    assert_eq!(h.get("HISTORY").unwrap().comment(), Some("first"));
    assert_eq!(h.get_last("HISTORY").unwrap().comment(), Some("second"));
    assert_eq!(h.get_all("HISTORY").unwrap().len(), 2);
    assert!(h.get_all("NAXIS1").is_none());
    assert!(h.get("NAXIS1").is_none());
    assert_eq!(
      h.keywords(),
      ["SIMPLE", "BITPIX", "HISTORY", "NAXIS"].into_iter().collect()
    );
    assert_consistent(&h);
  }

  #[test]
  fn test_structural_index_of() {
    let h = sample();
    assert_eq!(h.index_of(&history("second")), Some(4));
    assert_eq!(h.index_of(&int("BITPIX", 8)), Some(1));
    assert_eq!(h.index_of(&int("BITPIX", 16)), None);
    assert!(h.contains(&history("first")));
  }

  #[test]
  fn test_insert_renumbers() {
    let mut h = sample();
    h.insert(1, history("zeroth"));
    assert_eq!(h.get("HISTORY").unwrap().comment(), Some("zeroth"));
    assert_eq!(h.index_of(&int("NAXIS", 0)), Some(4));
    assert_eq!(h.get_all("HISTORY").unwrap().len(), 3);
    h.insert(h.len(), int("EXTEND", 1));
    assert_eq!(h.get_at(6).unwrap().keyword(), "EXTEND");
    assert_consistent(&h);
  }

  #[test]
  fn test_remove_renumbers() {
    let mut h = sample();
    let removed = h.remove(1);
    assert_eq!(removed.keyword(), "BITPIX");
    assert!(h.get("BITPIX").is_none());
    assert!(!h.contains_keyword("BITPIX"));
    assert_eq!(h.index_of(&history("second")), Some(3));
    assert!(h.remove_item(&history("first")));
    assert!(!h.remove_item(&history("first")));
    assert_eq!(h.get("HISTORY").unwrap().comment(), Some("second"));
    assert_eq!(h.len(), 3);
    assert_consistent(&h);
  }

  #[test]
  fn test_set() {
    let mut h = sample();
    let old = h.set(2, int("NAXIS1", 10));
    assert_eq!(old, history("first"));
    assert_eq!(h.get_all("HISTORY").unwrap().len(), 1);
    assert_eq!(h.get("NAXIS1").unwrap().as_int().unwrap(), 10);
    h.set(1, int("BITPIX", 16));
    assert_eq!(h.get("BITPIX").unwrap().as_int().unwrap(), 16);
    assert_consistent(&h);
  }

  #[test]
  fn test_to_bytes() {
    let h = sample();
    let bytes = h.to_bytes();
    assert_eq!(bytes.len(), RECORD_SIZE);
    let cards: Vec<&[u8]> = bytes.chunks(CARD_SIZE).collect();
    assert_eq!(&cards[5][..], END_CARD);
    for (card, item) in cards.iter().zip(h.iter()) {
      assert_eq!(&parse_card(card).unwrap(), item);
    }
    let mut written: Vec<u8> = Vec::new();
    assert_eq!(h.write(&mut written).unwrap(), 1);
    assert_eq!(written, bytes);
    // 35 cards + END fill exactly one record
    let full = Header::from_items(0, (0..35).map(|i| int(&format!("K{}", i), i)));
    assert_eq!(full.to_bytes().len(), RECORD_SIZE);
    let spill = Header::from_items(0, (0..36).map(|i| int(&format!("K{}", i), i)));
    assert_eq!(spill.to_bytes().len(), 2 * RECORD_SIZE);
  }
}
