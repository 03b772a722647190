//! Type token errors

use thiserror::Error;

/// Errors that can occur while parsing type tokens
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// An empty alternative, e.g. `string|` or `?`
    #[error("Empty type token in `{declaration}`")]
    EmptyToken {
        /// The declaration that contained the empty alternative
        declaration: String,
    },

    /// A class token that is not a valid (optionally namespaced) identifier
    #[error("Invalid type identifier: {token}")]
    InvalidIdentifier {
        /// The offending token
        token: String,
    },
}
