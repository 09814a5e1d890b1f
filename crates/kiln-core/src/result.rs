//! Convenience result type alias for kiln.

use crate::error::BuildError;

/// A specialized `Result` type for kiln operations.
///
/// Defined as a convenience so that every crate does not need to write
/// `Result<T, BuildError>` explicitly.
pub type BuildResult<T> = Result<T, BuildError>;
