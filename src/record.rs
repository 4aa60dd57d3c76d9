//! Module: Record
//! But: The generated wallet and its JSON backup document.
//!
//! *Signed: kryon.kas*

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::derivation::KeyPair;
use crate::error::{Result, WalletError};

/// Width of the placeholder shown instead of a hidden private key.
pub const MASK_WIDTH: usize = 64;

/// Bullet placeholder for a hidden private key.
pub fn masked_private_key() -> String {
    "\u{2022}".repeat(MASK_WIDTH)
}

// --- Enregistrement ---

/// One generated wallet. All three fields are set together or not at all.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WalletRecord {
    seed_phrase: String,
    public_key: String,
    private_key: String,
}

impl WalletRecord {
    pub(crate) fn new(seed_phrase: &str, mut keys: KeyPair) -> Self {
        Self {
            seed_phrase: seed_phrase.to_string(),
            public_key: std::mem::take(&mut keys.public_key),
            private_key: std::mem::take(&mut keys.private_key),
        }
    }

    pub fn seed_phrase(&self) -> &str {
        &self.seed_phrase
    }

    /// Seed words in order, for numbered rendering.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.seed_phrase.split(' ')
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Seed => self.seed_phrase(),
            Field::Public => self.public_key(),
            Field::Private => self.private_key(),
        }
    }

    /// Snapshot for export, stamped with `created_at`.
    pub fn to_document(&self, created_at: DateTime<Utc>) -> ExportDocument {
        ExportDocument {
            seed_phrase: self.seed_phrase.clone(),
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("seed_phrase", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

// --- Champs ---

/// A copyable field of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Seed,
    Public,
    Private,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Seed, Field::Public, Field::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Seed => "seed",
            Field::Public => "public",
            Field::Private => "private",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "seed" | "mnemonic" => Ok(Field::Seed),
            "public" | "pub" => Ok(Field::Public),
            "private" | "priv" => Ok(Field::Private),
            other => Err(WalletError::InvalidField(other.to_string())),
        }
    }
}

// --- Export ---

/// JSON backup schema.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub seed_phrase: String,
    pub public_key: String,
    pub private_key: String,
    /// ISO-8601, UTC, captured at export time.
    pub created_at: String,
}

impl ExportDocument {
    /// Pretty JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WalletError::export(format!("serialization failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::tests::ZERO_PHRASE;
    use crate::derivation::{Bip44Derivation, KeyDerivationService};

    fn zero_record() -> WalletRecord {
        let keys = Bip44Derivation::new().derive_keys(ZERO_PHRASE).unwrap();
        WalletRecord::new(ZERO_PHRASE, keys)
    }

    #[test]
    fn test_words_split() {
        let record = zero_record();
        let words: Vec<&str> = record.words().collect();
        assert_eq!(words.len(), 12);
        assert_eq!(words[0], "abandon");
        assert_eq!(words[11], "about");
    }

    #[test]
    fn test_field_lookup_and_parse() {
        let record = zero_record();
        assert_eq!(record.field(Field::Seed), ZERO_PHRASE);
        assert_eq!(record.field(Field::Public), record.public_key());
        assert_eq!(record.field(Field::Private), record.private_key());

        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
        }
        assert_eq!(" PRIV ".parse::<Field>().unwrap(), Field::Private);
        assert!(matches!(
            "address".parse::<Field>(),
            Err(WalletError::InvalidField(_))
        ));
    }

    #[test]
    fn test_document_round_trip() {
        let record = zero_record();
        let now = Utc::now();
        let json = record.to_document(now).to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 4);
        for key in ["seedPhrase", "publicKey", "privateKey", "createdAt"] {
            assert!(object.contains_key(key), "missing {key}");
        }

        let parsed: ExportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seed_phrase, record.seed_phrase());
        assert_eq!(parsed.public_key, record.public_key());
        assert_eq!(parsed.private_key, record.private_key());

        let created_at = DateTime::parse_from_rfc3339(&parsed.created_at).unwrap();
        assert_eq!(created_at.timestamp_millis(), now.timestamp_millis());
        assert!(parsed.created_at.ends_with('Z'));
    }

    #[test]
    fn test_pretty_json_indent() {
        let json = zero_record().to_document(Utc::now()).to_json().unwrap();
        assert!(json.starts_with("{\n  \"seedPhrase\": "));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let record = zero_record();
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("abandon"));
        assert!(!rendered.contains(&record.private_key()[2..]));
    }

    #[test]
    fn test_mask_width() {
        let mask = masked_private_key();
        assert_eq!(mask.chars().count(), MASK_WIDTH);
        assert!(mask.chars().all(|c| c == '\u{2022}'));
    }
}
