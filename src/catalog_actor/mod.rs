//! Catalog items, their priced options and the quote calculation.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
