//! Error types for the layout engine.

use thiserror::Error;

/// Caller bugs the engine refuses to coerce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A per-character width lookup received something other than one char.
    #[error("width lookup expects exactly one character, got {0:?}")]
    NotASingleCharacter(String),

    /// The font family is not known to the measurement provider.
    #[error("font family not loaded: {0}")]
    UnknownFont(String),
}
