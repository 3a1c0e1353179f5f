//! Deterministic deposit addresses and batch sweeping.
//!
//! A [`Generator`] turns a 128-bit identifier into a deposit address that only
//! the custody operator can spend. A [`Collector`] later drains the deposit
//! addresses of a batch of identifiers into one destination.
//!
//! - UTXO chains ([`btc`]): P2SH deposit scripts tagged with the identifier and
//!   locked to the collector key.
//! - Account chains ([`eth`]): per-identifier keys spliced from the master key,
//!   pre-funded with gas before they are emptied.
//!
//! Chain access is supplied by the caller through the traits in [`client`].

pub mod btc;
pub mod client;
pub mod config;
pub mod error;
pub mod eth;
pub mod fee;
pub mod poll;
pub mod types;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use btc::{BtcCollector, BtcGenerator};
pub use config::{AccountConfig, GasConfig, PollConfig, UtxoConfig};
pub use error::SweepError;
pub use eth::{EthCollector, EthGenerator};
pub use types::{Chain, ChainFamily, SweepState};

// ─── Facade ──────────────────────────────────────────────────────────

/// Derives the deposit address of an identifier. Pure and repeatable.
pub trait Generator {
    fn generate_address(&self, identifier: Uuid) -> Result<String, SweepError>;
}

/// Moves the funds held for a batch of identifiers to `destination`.
///
/// Identifiers are processed in order and the first failure ends the batch,
/// reported as [`SweepError::Identifier`]. Identifiers already swept stay
/// swept, so a failed batch can be rerun as-is.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        destination: &str,
        identifiers: &[Uuid],
    ) -> Result<(), SweepError>;
}

/// A generator for any supported chain, built from JSON settings.
///
/// The JSON must hold a UTXO-family or account-family config matching the
/// family of its `chain` field.
pub fn generator_from_json(json: &str) -> Result<Box<dyn Generator + Send + Sync>, SweepError> {
    #[derive(serde::Deserialize)]
    struct ChainField {
        chain: Chain,
    }

    let header: ChainField = serde_json::from_str(json)?;
    match header.chain.family() {
        ChainFamily::Utxo => Ok(Box::new(BtcGenerator::from_config(&UtxoConfig::from_json_str(
            json,
        )?)?)),
        ChainFamily::Account => Ok(Box::new(EthGenerator::from_config(
            &AccountConfig::from_json_str(json)?,
        )?)),
    }
}
