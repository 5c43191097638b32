use thiserror::Error;

use crate::codes::CodeSpace;

/// Errors raised inside the relay engine.
///
/// None of these reach a peer directly: handlers log them and drop the
/// offending message.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Every generation attempt collided with a live code
    #[error("no free {space} code after {attempts} attempts")]
    CodeSpaceExhausted { space: CodeSpace, attempts: u32 },

    /// The connection's outbound half is gone
    #[error("connection {0} is closed")]
    ConnectionClosed(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration value could not be parsed
    #[error("invalid value {value:?} for {key}")]
    Config { key: &'static str, value: String },
}
