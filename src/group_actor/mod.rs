//! Group orders: one order split into per-person payment shares.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
