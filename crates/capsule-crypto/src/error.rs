//! # Digest Engine Errors

use thiserror::Error;

/// Errors from digest engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Merkle aggregation was asked to reduce zero digests.
    #[error("cannot aggregate an empty digest sequence")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_display() {
        assert!(CryptoError::EmptyInput.to_string().contains("empty"));
    }
}
