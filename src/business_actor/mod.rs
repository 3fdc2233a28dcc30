//! In-process business directory used when no users service is configured.

pub mod entity;
pub mod error;

pub use error::*;
