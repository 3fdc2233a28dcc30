//! Order store: the system of record for orders, plus the status rules.

mod actions;
pub mod entity;
pub mod error;
pub mod state_machine;

pub use actions::*;
pub use error::*;
pub use state_machine::*;
