//! JSON-loadable settings for generators and collectors.
//!
//! Everything here is checked when a generator or collector is built, never
//! per call.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::SweepError;
use crate::fee::{DEFAULT_BTC_FEE_SAT, DEFAULT_GAS_PER_TRANSFER, DEFAULT_GAS_PRICE_WEI};
use crate::poll::Poller;
use crate::types::Chain;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_FUNDING_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_WITHDRAW_TIMEOUT_SECS: u64 = 300;

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Poll cadence and deadlines for the UTXO sweep loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// How long to wait for a deposit to exceed the fee before skipping it.
    /// `null` waits until cancelled.
    pub funding_timeout_secs: Option<u64>,
    /// How long to wait for a broadcast sweep to be spent. `null` waits until cancelled.
    pub settlement_timeout_secs: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            funding_timeout_secs: Some(DEFAULT_FUNDING_TIMEOUT_SECS),
            settlement_timeout_secs: None,
        }
    }
}

impl PollConfig {
    /// Rejects a zero poll interval, which would turn every wait into a busy loop.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.interval_ms == 0 {
            return Err(SweepError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    pub fn funding_poller(&self) -> Poller {
        Poller::new(
            Duration::from_millis(self.interval_ms),
            self.funding_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn settlement_poller(&self) -> Poller {
        Poller::new(
            Duration::from_millis(self.interval_ms),
            self.settlement_timeout_secs.map(Duration::from_secs),
        )
    }
}

/// Gas settings for pre-funding deposit accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub gas_per_transfer: u64,
    /// Fixed gas price in wei, 1 gwei unless configured. `null` asks the fee
    /// payer's node once per batch.
    pub gas_price_wei: Option<u64>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gas_per_transfer: DEFAULT_GAS_PER_TRANSFER,
            gas_price_wei: Some(DEFAULT_GAS_PRICE_WEI),
        }
    }
}

/// Settings for a UTXO-family generator or collector.
///
/// A generator needs `collector_address` or `collector_wif`; a collector
/// needs `collector_wif`, and when both are given they must name the same key.
#[derive(Debug, Deserialize)]
pub struct UtxoConfig {
    pub chain: Chain,
    #[serde(default)]
    pub collector_address: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub collector_wif: Option<SecretString>,
    #[serde(default = "default_fee_sat")]
    pub fee_sat: u64,
    #[serde(default)]
    pub min_confirmations: u32,
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_fee_sat() -> u64 {
    DEFAULT_BTC_FEE_SAT
}

impl UtxoConfig {
    /// Generator-only settings around a collector address.
    pub fn new(chain: Chain, collector_address: impl Into<String>) -> Self {
        Self {
            chain,
            collector_address: Some(collector_address.into()),
            collector_wif: None,
            fee_sat: DEFAULT_BTC_FEE_SAT,
            min_confirmations: 0,
            poll: PollConfig::default(),
        }
    }

    /// Collector settings around a WIF-encoded collector key.
    pub fn with_wif(chain: Chain, wif: impl Into<String>) -> Self {
        let wif: String = wif.into();
        Self {
            chain,
            collector_address: None,
            collector_wif: Some(SecretString::from(wif)),
            fee_sat: DEFAULT_BTC_FEE_SAT,
            min_confirmations: 0,
            poll: PollConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SweepError> {
        let config: Self = serde_json::from_str(json)?;
        config.poll.validate()?;
        Ok(config)
    }
}

/// Settings for an account-family generator or collector.
#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    pub chain: Chain,
    /// Hex private key of the master account, which also pays for gas.
    #[serde(deserialize_with = "secret")]
    pub master_key: SecretString,
    /// Base URL of the chain node.
    #[serde(default)]
    pub endpoint: String,
    /// Token contract addresses or aliases to sweep, in order.
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default = "default_withdraw_timeout_secs")]
    pub withdraw_timeout_secs: u64,
}

fn default_withdraw_timeout_secs() -> u64 {
    DEFAULT_WITHDRAW_TIMEOUT_SECS
}

impl AccountConfig {
    pub fn new(chain: Chain, master_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let master_key: String = master_key.into();
        Self {
            chain,
            master_key: SecretString::from(master_key),
            endpoint: endpoint.into(),
            tokens: Vec::new(),
            gas: GasConfig::default(),
            withdraw_timeout_secs: DEFAULT_WITHDRAW_TIMEOUT_SECS,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SweepError> {
        let config: Self = serde_json::from_str(json)?;
        if config.withdraw_timeout_secs == 0 {
            return Err(SweepError::Config("withdraw timeout must be positive".into()));
        }
        Ok(config)
    }

    pub fn withdraw_timeout(&self) -> Duration {
        Duration::from_secs(self.withdraw_timeout_secs)
    }
}
