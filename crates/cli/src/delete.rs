use std::{collections::HashSet, error::Error, path::PathBuf};

use clap::Args;
use log::info;

use crate::HduArgs;

#[derive(Debug, Clone, Args)]
pub struct Delete {
  /// Path of the file to be modified.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  #[command(flatten)]
  pub hdu_args: HduArgs,
  /// Keywords of the cards to be removed
  #[clap(value_name = "KEYWORD", required = true)]
  pub keywords: Vec<String>,
}

impl Delete {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    let keywords: HashSet<String> = self
      .keywords
      .iter()
      .map(|kw| kw.trim().to_string())
      .collect();
    let report = self
      .hdu_args
      .hedit(&self.input)
      .delete_keywords(&keywords, self.hdu_args.index())?;
    info!(
      "{} cards deleted from '{}', {} records removed",
      report.n_deleted,
      self.input.display(),
      report.n_removed_records
    );
    Ok(())
  }
}
