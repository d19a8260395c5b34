use thiserror::Error;

use crate::element::Kind;

/// Failures surfaced by [`Element`](crate::Element) extraction and
/// [`Object`](crate::Object) access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// `at`/`at_mut` on a key with no entry.
    #[error("no entry for key")]
    NotFound,
    /// The element's kind cannot be read as the requested type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: Kind,
    },
    /// An integer element does not fit the requested integer type.
    #[error("integer {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },
    /// The allocator refused a slot buffer or string payload.
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailure { bytes: usize },
}
