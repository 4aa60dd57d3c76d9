//! Module: Error
//! But: Error taxonomy shared by the generator, its collaborators and the CLI.
//!
//! *Signed: kryon.kas*

use thiserror::Error;

/// Errors raised by wallet generation and its side effects.
///
/// Messages never carry key material or seed words.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The OS secure random source could not be read.
    #[error("Secure entropy source unavailable: {0}")]
    EntropySourceUnavailable(String),

    /// The mnemonic or key derivation library rejected its input.
    #[error("Key derivation failed: {0}")]
    DerivationFailure(String),

    #[error("Clipboard write failed: {0}")]
    ClipboardWriteFailure(String),

    #[error("Export failed: {0}")]
    ExportFailure(String),

    /// Another `generate()` call has not completed yet.
    #[error("A wallet generation is already in progress")]
    GenerationInProgress,

    #[error("No wallet has been generated yet")]
    NoWallet,

    #[error("Invalid derivation path '{path}': {reason}")]
    InvalidDerivationPath { path: String, reason: String },

    #[error("Unknown field '{0}' (expected seed, public or private)")]
    InvalidField(String),
}

impl WalletError {
    pub fn derivation<S: Into<String>>(msg: S) -> Self {
        Self::DerivationFailure(msg.into())
    }

    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::ExportFailure(msg.into())
    }
}

/// Result type alias using WalletError
pub type Result<T> = std::result::Result<T, WalletError>;
