//! Reading, indexing and in place edition of FITS headers.
//!
//! * `common`: card images and the card codec (`HeaderItem`, `parse_card`, `format_card`);
//! * `hdu`: the `Header` index and the size of the data section following a header;
//! * `read`: the logical record reader and header scanning;
//! * `edit`: byte shifting, file locking and the `Hedit` header editor.

pub mod common;
pub mod edit;
pub mod error;
pub mod hdu;
pub mod read;

pub use common::{
  item::{CardKind, HeaderItem},
  read::parse_card,
  write::format_card,
};
pub use edit::{Hedit, delete::DeleteReport, update::UpdateReport};
pub use hdu::{data::Rounding, header::Header};
