use std::{error::Error, path::PathBuf};

use clap::Args;
use log::info;

use fitsedit::{HeaderItem, common::KEYWORD_SIZE, parse_card};

use crate::HduArgs;

#[derive(Debug, Clone, Args)]
pub struct Update {
  /// Path of the file to be modified.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  #[command(flatten)]
  pub hdu_args: HduArgs,
  /// Cards to be written, e.g. "OBJECT = 'M31' / Andromeda", "NAXIS = 2" or "HISTORY text".
  /// An existing card with the same keyword is overwritten, else the card is appended.
  #[clap(value_name = "CARD", required = true)]
  pub cards: Vec<String>,
}

impl Update {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    let items = self
      .cards
      .iter()
      .map(|card| parse_card_arg(card))
      .collect::<Result<Vec<HeaderItem>, _>>()?;
    let report = self
      .hdu_args
      .hedit(&self.input)
      .update_header(items, self.hdu_args.index())?;
    info!(
      "'{}' updated: {} cards replaced, {} appended, {} records inserted",
      self.input.display(),
      report.n_replaced,
      report.n_in_slack + report.n_in_new_records,
      report.n_new_records
    );
    Ok(())
  }
}

/// Parses a card given on the command line.
///
/// `KEYWORD = VALUE / COMMENT` is laid out as a card image, `=` in byte 9, before being parsed.
/// Without `=`, or if what precedes the first `=` is not a keyword, the first word is the
/// keyword of a commentary card and the rest its text.
pub fn parse_card_arg(arg: &str) -> Result<HeaderItem, Box<dyn Error>> {
  match arg.split_once('=') {
    Some((keyword, value_comment))
      if keyword.trim().len() <= KEYWORD_SIZE && !keyword.trim().contains(' ') =>
    {
      let card = format!("{:<8}= {}", keyword.trim(), value_comment.trim());
      if card.len() > 80 {
        return Err(format!("Card longer than 80 characters: {}", card).into());
      }
      Ok(parse_card(format!("{:<80}", card).as_bytes())?)
    }
    _ => {
      let arg = arg.trim();
      let (keyword, text) = arg.split_once(' ').unwrap_or((arg, ""));
      let text = text.trim();
      Ok(HeaderItem::new_comment(
        keyword,
        (!text.is_empty()).then_some(text),
      )?)
    }
  }
}
