//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when constructing protocol values.
///
/// Decoding inbound packets does not produce errors: a packet that is not of
/// the kind a decoder handles yields `None` so other decoders can be tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Public key string has the wrong length.
    #[error("invalid public key length: expected {expected} hex characters, got {actual}")]
    InvalidKeyLength {
        /// Expected number of characters.
        expected: usize,
        /// Actual number of characters.
        actual: usize,
    },

    /// Public key string contains non-hex characters.
    #[error("public key is not valid hex")]
    InvalidKeyEncoding,
}
