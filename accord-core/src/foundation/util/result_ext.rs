//! Result/Option helper traits.
//!
//! Storage lookups return `Result<Option<T>>`; most callers want "missing" to be a
//! structured error instead.

use crate::foundation::AccordError;

/// Extension for converting `Result<Option<T>>` into `Result<T>`.
pub trait ResultExt<T> {
    /// Convert `Ok(None)` into an error.
    fn required(self, error: impl FnOnce() -> AccordError) -> Result<T, AccordError>;
}

impl<T> ResultExt<T> for Result<Option<T>, AccordError> {
    fn required(self, error: impl FnOnce() -> AccordError) -> Result<T, AccordError> {
        self?.ok_or_else(error)
    }
}
