use std::{collections::HashSet, error::Error, path::PathBuf};

use clap::Args;

use fitsedit::Header;

use crate::HduArgs;

#[derive(Debug, Clone, Args)]
pub struct Head {
  /// Path of the input file.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  #[command(flatten)]
  pub hdu_args: HduArgs,
  /// Only print the cards having the given keyword (option can be repeated)
  #[clap(short = 'k', long = "keyword", value_name = "KW")]
  pub keywords: Vec<String>,
}

impl Head {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    let hedit = self.hdu_args.hedit(&self.input);
    let keywords: Option<HashSet<String>> = if self.keywords.is_empty() {
      None
    } else {
      Some(self.keywords.iter().map(|kw| kw.trim().to_string()).collect())
    };
    match self.hdu_args.hdu {
      Some(index) => print_header(&hedit.read_header(keywords.as_ref(), index)?),
      None => {
        for header in hedit.read_all_headers()? {
          match &keywords {
            Some(kws) => print_header(&Header::from_items(
              header.header_index(),
              header
                .iter()
                .filter(|item| kws.contains(item.keyword()))
                .cloned(),
            )),
            None => print_header(&header),
          }
        }
      }
    }
    Ok(())
  }
}

fn print_header(header: &Header) {
  println!("HDU[{}]:", header.header_index());
  for item in header {
    println!("{}", item);
  }
  println!();
}
