//! Unicode utilities: grapheme clusters are the unit text layout places.

pub mod graphemes;

pub use graphemes::graphemes;
