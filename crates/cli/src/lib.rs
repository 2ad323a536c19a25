extern crate log;

pub mod delete;
pub mod head;
pub mod update;

use clap::Args;

use fitsedit::{Hedit, Rounding};

/// Options common to all the commands.
#[derive(Debug, Clone, Args)]
pub struct HduArgs {
  /// Index of the header: 0 for the primary header, N for the Nth extension
  #[arg(long = "hdu", value_name = "N")]
  pub hdu: Option<usize>,
  /// Compute the size of data sections with the `size + size % 2880` legacy rounding
  #[arg(long)]
  pub legacy_rounding: bool,
}

impl HduArgs {
  pub fn hedit<P: AsRef<std::path::Path>>(&self, path: P) -> Hedit {
    let rounding = if self.legacy_rounding {
      Rounding::Legacy
    } else {
      Rounding::Standard
    };
    Hedit::new(path).with_rounding(rounding)
  }

  /// Index of the header to be modified, the primary header by default.
  pub fn index(&self) -> usize {
    self.hdu.unwrap_or(0)
  }
}
