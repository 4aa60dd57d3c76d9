//! Module: Wallet
//! But: Local wallet generation (BIP39 seed phrase, BIP32 key pair) with
//! clipboard and JSON backup side effects.
//!
//! Entropy, mnemonic encoding and key derivation are delegated to the
//! `rand`, `bip39` and `bip32` crates through [`KeyDerivationService`].
//!
//! *Signed: kryon.kas*

pub mod clipboard;
pub mod derivation;
pub mod error;
pub mod export;
pub mod generator;
pub mod record;

pub use clipboard::{ClipboardService, SystemClipboard};
pub use derivation::{
    Bip44Derivation, DEFAULT_DERIVATION_PATH, EntropySource, KeyDerivationService, KeyPair,
    OsEntropy,
};
pub use error::{Result, WalletError};
pub use export::{DirectoryExport, ExportSink};
pub use generator::{COPY_FEEDBACK_WINDOW, Pacing, Stage, WalletGenerator};
pub use record::{ExportDocument, Field, WalletRecord};
