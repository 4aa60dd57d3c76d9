//! Module: Generator
//! But: One generation cycle and the ephemeral state a front-end observes.
//!
//! Single-threaded by construction: state lives in `Cell`/`RefCell`, the
//! workflow suspends on `tokio::time` only, and at most one generation is
//! in flight at a time.
//!
//! *Signed: kryon.kas*

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::clipboard::ClipboardService;
use crate::derivation::{KeyDerivationService, WORD_COUNT, normalize_phrase};
use crate::error::{Result, WalletError};
use crate::export::{ExportSink, export_file_name};
use crate::record::{Field, WalletRecord, masked_private_key};

/// How long a field stays marked as copied.
pub const COPY_FEEDBACK_WINDOW: Duration = Duration::from_secs(2);

// --- Étapes ---

/// Progress of the current generation, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Stage {
    #[default]
    Idle,
    EntropyGenerated,
    MnemonicCreated,
    KeysDerived,
}

impl Stage {
    /// Stages a successful generation walks through, in order.
    pub const STEPS: [Stage; 3] = [
        Stage::EntropyGenerated,
        Stage::MnemonicCreated,
        Stage::KeysDerived,
    ];

    pub fn label(self) -> Option<&'static str> {
        match self {
            Stage::Idle => None,
            Stage::EntropyGenerated => Some("Entropy generated"),
            Stage::MnemonicCreated => Some("Mnemonic phrase created"),
            Stage::KeysDerived => Some("Keys derived"),
        }
    }
}

/// Cosmetic delays after each stage. They carry no cryptographic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub entropy: Duration,
    pub mnemonic: Duration,
    pub keys: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            entropy: Duration::ZERO,
            mnemonic: Duration::ZERO,
            keys: Duration::ZERO,
        }
    }

    pub fn total(&self) -> Duration {
        self.entropy + self.mnemonic + self.keys
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            entropy: Duration::from_millis(800),
            mnemonic: Duration::from_millis(600),
            keys: Duration::from_millis(400),
        }
    }
}

/// Released on drop, so an abandoned generation does not wedge the trigger.
/// A watched stage falls back to `Idle` unless the run completed.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
    stage: Option<&'a watch::Sender<Stage>>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            return Err(WalletError::GenerationInProgress);
        }
        Ok(Self { flag, stage: None })
    }

    fn watching(mut self, stage: &'a watch::Sender<Stage>) -> Self {
        self.stage = Some(stage);
        self
    }

    fn complete(mut self) {
        self.stage = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(stage) = self.stage {
            stage.send_replace(Stage::Idle);
        }
        self.flag.set(false);
    }
}

// --- Générateur ---

pub struct WalletGenerator {
    deriver: Box<dyn KeyDerivationService>,
    clipboard: Box<dyn ClipboardService>,
    sink: Box<dyn ExportSink>,
    pacing: Pacing,

    record: RefCell<Option<WalletRecord>>,
    revealed: Cell<bool>,
    copied: RefCell<HashMap<Field, Instant>>,
    generating: Cell<bool>,
    stage: watch::Sender<Stage>,
    last_export_millis: Cell<i64>,
}

impl WalletGenerator {
    pub fn new(
        deriver: impl KeyDerivationService + 'static,
        clipboard: impl ClipboardService + 'static,
        sink: impl ExportSink + 'static,
    ) -> Self {
        let (stage, _) = watch::channel(Stage::Idle);
        Self {
            deriver: Box::new(deriver),
            clipboard: Box::new(clipboard),
            sink: Box::new(sink),
            pacing: Pacing::default(),
            record: RefCell::new(None),
            revealed: Cell::new(false),
            copied: RefCell::new(HashMap::new()),
            generating: Cell::new(false),
            stage,
            last_export_millis: Cell::new(0),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    // --- Génération ---

    /// Runs entropy → mnemonic → keys and publishes the record.
    ///
    /// Fails with [`WalletError::GenerationInProgress`] while another call
    /// is pending. On error nothing is published and the previous record,
    /// if any, stays live.
    pub async fn generate(&self) -> Result<WalletRecord> {
        let in_flight = InFlight::acquire(&self.generating)?.watching(&self.stage);

        match self.run_generation().await {
            Ok(record) => {
                in_flight.complete();
                Ok(self.publish(record))
            }
            Err(e) => {
                warn!(error = %e, "wallet generation aborted");
                Err(e)
            }
        }
    }

    async fn run_generation(&self) -> Result<WalletRecord> {
        let entropy = self.deriver.random_entropy()?;
        self.advance(Stage::EntropyGenerated, self.pacing.entropy).await;

        let phrase = self.deriver.entropy_to_phrase(entropy.as_slice())?;
        drop(entropy);
        self.advance(Stage::MnemonicCreated, self.pacing.mnemonic).await;

        let keys = self.deriver.derive_keys(&phrase)?;
        let record = WalletRecord::new(&phrase, keys);
        self.advance(Stage::KeysDerived, self.pacing.keys).await;

        Ok(record)
    }

    async fn advance(&self, stage: Stage, delay: Duration) {
        self.stage.send_replace(stage);
        debug!(?stage, "generation stage");
        if !delay.is_zero() {
            time::sleep(delay).await;
        }
    }

    /// Re-derives the record of an existing 12-word phrase and publishes it.
    pub fn restore(&self, phrase: &str) -> Result<WalletRecord> {
        let _in_flight = InFlight::acquire(&self.generating)?;

        let phrase = normalize_phrase(phrase);
        let count = phrase.split_whitespace().count();
        if count != WORD_COUNT {
            return Err(WalletError::derivation(format!(
                "expected {WORD_COUNT} words, got {count}"
            )));
        }

        let keys = self.deriver.derive_keys(&phrase)?;
        self.stage.send_replace(Stage::KeysDerived);
        Ok(self.publish(WalletRecord::new(&phrase, keys)))
    }

    fn publish(&self, record: WalletRecord) -> WalletRecord {
        let previous = self.record.replace(Some(record.clone()));
        self.revealed.set(false);
        self.copied.borrow_mut().clear();
        info!(
            public_key = %record.public_key(),
            replaced = previous.is_some(),
            "wallet published"
        );
        record
    }

    /// Drops the record and every piece of feedback state.
    pub fn reset(&self) {
        self.record.replace(None);
        self.revealed.set(false);
        self.copied.borrow_mut().clear();
        self.stage.send_replace(Stage::Idle);
        debug!("wallet reset");
    }

    // --- Observation ---

    pub fn record(&self) -> Option<WalletRecord> {
        self.record.borrow().clone()
    }

    pub fn has_wallet(&self) -> bool {
        self.record.borrow().is_some()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.get()
    }

    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    pub fn derivation_path(&self) -> &str {
        self.deriver.derivation_path()
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    // --- Affichage ---

    pub fn is_revealed(&self) -> bool {
        self.revealed.get()
    }

    /// Flips the reveal flag. Stays hidden while there is no wallet.
    pub fn toggle_reveal(&self) -> bool {
        let revealed = self.has_wallet() && !self.revealed.get();
        self.revealed.set(revealed);
        revealed
    }

    /// The private key, or bullets while it is hidden.
    pub fn private_key_display(&self) -> Option<String> {
        let record = self.record.borrow();
        let record = record.as_ref()?;
        Some(if self.revealed.get() {
            record.private_key().to_string()
        } else {
            masked_private_key()
        })
    }

    // --- Presse-papiers ---

    /// Copies a field of the live record.
    pub fn copy_field(&self, field: Field) -> Result<()> {
        let record = self.record.borrow();
        let record = record.as_ref().ok_or(WalletError::NoWallet)?;
        self.copy_value(record.field(field), field)
    }

    /// Copies `value` and marks `field` as copied for [`COPY_FEEDBACK_WINDOW`].
    pub fn copy_value(&self, value: &str, field: Field) -> Result<()> {
        match self.clipboard.write_text(value) {
            Ok(()) => {
                self.copied
                    .borrow_mut()
                    .insert(field, Instant::now() + COPY_FEEDBACK_WINDOW);
                debug!(%field, "field copied");
                Ok(())
            }
            Err(e) => {
                self.copied.borrow_mut().remove(&field);
                warn!(%field, error = %e, "copy failed");
                Err(e)
            }
        }
    }

    pub fn is_copied(&self, field: Field) -> bool {
        self.prune_copied();
        self.copied.borrow().contains_key(&field)
    }

    fn prune_copied(&self) {
        let now = Instant::now();
        self.copied.borrow_mut().retain(|_, until| *until > now);
    }

    // --- Export ---

    /// Exports the live record. See [`WalletGenerator::export`].
    pub fn export_record(&self) -> Result<PathBuf> {
        let record = self.record.borrow();
        let record = record.as_ref().ok_or(WalletError::NoWallet)?;
        self.export(record)
    }

    /// Writes `record` as `wallet-<epoch-millis>.json`, stamped with the
    /// current time. Names are strictly increasing per generator.
    pub fn export(&self, record: &WalletRecord) -> Result<PathBuf> {
        let now = Utc::now();
        let millis = now
            .timestamp_millis()
            .max(self.last_export_millis.get() + 1);

        let result = record
            .to_document(now)
            .to_json()
            .map(Zeroizing::new)
            .and_then(|json| self.sink.save(&export_file_name(millis), &json));

        match result {
            Ok(path) => {
                self.last_export_millis.set(millis);
                Ok(path)
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                Err(e)
            }
        }
    }
}
