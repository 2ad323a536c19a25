extern crate fitsedit_cli;

use std::error::Error;

use clap::Parser;

use fitsedit_cli::{delete::Delete, head::Head, update::Update};

/// Read and edit in place the headers of FITS files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Args {
  /// Print the cards of one header, or of all the headers of a FITS file
  #[clap(name = "head")]
  Head(Head),
  /// Overwrite or append cards in a header
  #[clap(name = "update")]
  Update(Update),
  /// Remove the cards having the given keywords from a header
  #[clap(name = "delete")]
  Delete(Delete),
}

impl Args {
  fn exec(self) -> Result<(), Box<dyn Error>> {
    match self {
      Self::Head(args) => args.exec(),
      Self::Update(args) => args.exec(),
      Self::Delete(args) => args.exec(),
    }
  }
}

fn main() -> Result<(), Box<dyn Error>> {
  env_logger::init();
  let args = Args::parse();
  match args.exec() {
    Ok(()) => Ok(()),
    Err(e) => {
      eprintln!("Error: {}", e);
      Err(e)
    }
  }
}
