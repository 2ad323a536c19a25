//! Header and Data Unit: the in-memory header index and the size of the data section that
//! follows it.

pub mod data;
pub mod header;
