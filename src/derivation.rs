//! Module: Derivation
//! But: Secure entropy, BIP39 encoding and BIP32 key derivation.
//!
//! The wallet libraries do the cryptography. This module only wires them
//! behind [`KeyDerivationService`] so the generator can swap them out.
//!
//! *Signed: kryon.kas*

use std::fmt;
use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, WalletError};

// --- Constantes ---

/// 128 bits of entropy, i.e. a 12-word mnemonic.
pub const ENTROPY_LEN: usize = 16;

/// Number of words in a generated seed phrase.
pub const WORD_COUNT: usize = 12;

/// First account, first external address (coin type 60).
/// Same default as the common EVM wallet libraries.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

pub type Entropy = Zeroizing<[u8; ENTROPY_LEN]>;

// --- Entropie ---

/// A cryptographically secure random byte source.
///
/// Implementations must fail rather than fall back to a weaker generator.
pub trait EntropySource {
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| WalletError::EntropySourceUnavailable(e.to_string()))
    }
}

// --- Clés ---

/// A derived key pair as fixed-format hex strings.
///
/// `public_key` is `0x` + 33-byte compressed SEC1 point,
/// `private_key` is `0x` + 32-byte scalar.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Wallet library capabilities the generator relies on.
pub trait KeyDerivationService {
    /// Draws [`ENTROPY_LEN`] bytes from a secure source.
    fn random_entropy(&self) -> Result<Entropy>;

    /// Encodes entropy as an English BIP39 phrase.
    fn entropy_to_phrase(&self, entropy: &[u8]) -> Result<Zeroizing<String>>;

    /// Derives the key pair of `phrase`. Pure function of the phrase and path.
    fn derive_keys(&self, phrase: &str) -> Result<KeyPair>;

    fn derivation_path(&self) -> &str;
}

// --- Dérivation ---

/// BIP39 + BIP32 derivation along a BIP44-style path, empty passphrase.
#[derive(Debug, Clone)]
pub struct Bip44Derivation<E = OsEntropy> {
    entropy: E,
    path: String,
}

impl Bip44Derivation<OsEntropy> {
    pub fn new() -> Self {
        Self::with_entropy(OsEntropy)
    }
}

impl Default for Bip44Derivation<OsEntropy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntropySource> Bip44Derivation<E> {
    pub fn with_entropy(entropy: E) -> Self {
        Self {
            entropy,
            path: DEFAULT_DERIVATION_PATH.to_string(),
        }
    }

    /// Replaces the derivation path. The path is validated immediately.
    pub fn with_path(mut self, path: &str) -> Result<Self> {
        parse_path(path)?;
        self.path = path.to_string();
        Ok(self)
    }
}

impl<E: EntropySource> KeyDerivationService for Bip44Derivation<E> {
    fn random_entropy(&self) -> Result<Entropy> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        self.entropy.fill(&mut entropy[..])?;
        Ok(entropy)
    }

    fn entropy_to_phrase(&self, entropy: &[u8]) -> Result<Zeroizing<String>> {
        if entropy.len() != ENTROPY_LEN {
            return Err(WalletError::derivation(format!(
                "expected {ENTROPY_LEN} bytes of entropy, got {}",
                entropy.len()
            )));
        }
        let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)
            .map_err(|e| WalletError::derivation(format!("mnemonic encoding failed: {e}")))?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }

    fn derive_keys(&self, phrase: &str) -> Result<KeyPair> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| WalletError::derivation(format!("invalid mnemonic: {e}")))?;

        // Seed generation (no passphrase)
        let seed = Zeroizing::new(mnemonic.to_seed(""));
        let path = parse_path(&self.path)?;

        let child = XPrv::derive_from_path(seed.as_slice(), &path)
            .map_err(|e| WalletError::derivation(format!("key derivation failed: {e}")))?;

        let private_bytes = Zeroizing::new(child.private_key().to_bytes().to_vec());
        let private_hex = Zeroizing::new(hex::encode(&*private_bytes));

        // Compression
        let public_point = child.public_key().public_key().to_encoded_point(true);

        debug!(path = %self.path, "key pair derived");

        Ok(KeyPair {
            public_key: format!("0x{}", hex::encode(public_point.as_bytes())),
            private_key: format!("0x{}", private_hex.as_str()),
        })
    }

    fn derivation_path(&self) -> &str {
        &self.path
    }
}

// --- Helpers ---

fn parse_path(path: &str) -> Result<DerivationPath> {
    DerivationPath::from_str(path).map_err(|e| WalletError::InvalidDerivationPath {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Lowercases a phrase and collapses its whitespace to single spaces.
pub fn normalize_phrase(phrase: &str) -> Zeroizing<String> {
    Zeroizing::new(
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// True if `word` belongs to the BIP39 English wordlist.
pub fn is_english_word(word: &str) -> bool {
    Language::English.word_list().iter().any(|w| *w == word)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    pub(crate) const ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
                                          abandon abandon abandon abandon abandon about";

    /// Always returns the same bytes.
    pub(crate) struct FixedEntropy(pub u8);

    impl EntropySource for FixedEntropy {
        fn fill(&self, dest: &mut [u8]) -> Result<()> {
            dest.fill(self.0);
            Ok(())
        }
    }

    /// Simulates an inaccessible random device.
    pub(crate) struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn fill(&self, _dest: &mut [u8]) -> Result<()> {
            Err(WalletError::EntropySourceUnavailable(
                "random device missing".to_string(),
            ))
        }
    }

    #[test]
    fn test_zero_entropy_vector() {
        let derivation = Bip44Derivation::new();
        let phrase = derivation.entropy_to_phrase(&[0u8; ENTROPY_LEN]).unwrap();
        assert_eq!(phrase.as_str(), ZERO_PHRASE);
    }

    #[test]
    fn test_zero_vector_private_key() {
        let keys = Bip44Derivation::new().derive_keys(ZERO_PHRASE).unwrap();
        assert_eq!(
            keys.private_key,
            "0x1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
    }

    #[test]
    fn test_public_key_matches_private_key() {
        let derivation = Bip44Derivation::new();
        let phrase = derivation
            .entropy_to_phrase(derivation.random_entropy().unwrap().as_slice())
            .unwrap();
        let keys = derivation.derive_keys(&phrase).unwrap();

        assert_eq!(keys.private_key.len(), 2 + 64);
        assert_eq!(keys.public_key.len(), 2 + 66);
        assert!(keys.public_key.starts_with("0x02") || keys.public_key.starts_with("0x03"));

        let secret = hex::decode(&keys.private_key[2..]).unwrap();
        let signing_key = SigningKey::from_slice(&secret).unwrap();
        let expected = signing_key.verifying_key().to_encoded_point(true);
        assert_eq!(keys.public_key[2..], hex::encode(expected.as_bytes()));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let derivation = Bip44Derivation::new();
        let first = derivation.derive_keys(ZERO_PHRASE).unwrap();
        let second = derivation.derive_keys(ZERO_PHRASE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_phrase_uses_english_wordlist() {
        let derivation = Bip44Derivation::new();
        for _ in 0..20 {
            let entropy = derivation.random_entropy().unwrap();
            let phrase = derivation.entropy_to_phrase(entropy.as_slice()).unwrap();
            let words: Vec<&str> = phrase.split(' ').collect();
            assert_eq!(words.len(), WORD_COUNT);
            assert!(words.iter().all(|w| is_english_word(w)));
        }
    }

    #[test]
    fn test_os_entropy_is_not_repeated() {
        let derivation = Bip44Derivation::new();
        let a = derivation.random_entropy().unwrap();
        let b = derivation.random_entropy().unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_broken_entropy_is_reported() {
        let derivation = Bip44Derivation::with_entropy(BrokenEntropy);
        assert!(matches!(
            derivation.random_entropy(),
            Err(WalletError::EntropySourceUnavailable(_))
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        let derivation = Bip44Derivation::new();
        assert!(matches!(
            derivation.entropy_to_phrase(&[0u8; 15]),
            Err(WalletError::DerivationFailure(_))
        ));
        assert!(matches!(
            derivation.derive_keys("not a valid mnemonic phrase"),
            Err(WalletError::DerivationFailure(_))
        ));
    }

    #[test]
    fn test_custom_path() {
        let default_keys = Bip44Derivation::new().derive_keys(ZERO_PHRASE).unwrap();
        let custom = Bip44Derivation::new().with_path("m/44'/60'/0'/0/1").unwrap();
        assert_eq!(custom.derivation_path(), "m/44'/60'/0'/0/1");
        let custom_keys = custom.derive_keys(ZERO_PHRASE).unwrap();
        assert_ne!(default_keys.private_key, custom_keys.private_key);

        assert!(matches!(
            Bip44Derivation::new().with_path("m/not/a/path"),
            Err(WalletError::InvalidDerivationPath { .. })
        ));
    }

    #[test]
    fn test_normalize_phrase() {
        let messy = "  Abandon abandon\tabandon abandon abandon abandon abandon abandon \
                     abandon abandon abandon ABOUT ";
        assert_eq!(normalize_phrase(messy).as_str(), ZERO_PHRASE);
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let keys = Bip44Derivation::new().derive_keys(ZERO_PHRASE).unwrap();
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains(&keys.private_key[2..]));
        assert!(rendered.contains("<redacted>"));
    }
}
