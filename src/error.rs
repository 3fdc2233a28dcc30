//! Error taxonomy shared by every component.
//!
//! Each component keeps its own `thiserror` enum; `ErrorKind` is the coarse
//! classification callers map to user-visible behavior (400 / 404 / retry).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, illegal transition, unknown variant/modifier. Never retried.
    Validation,
    /// Unknown order, item, business or group.
    NotFound,
    /// Timeouts and lost connections. Safe to retry the whole request.
    Transient,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Transient => write!(f, "transient"),
        }
    }
}
