use std::str::FromStr;

use chain_btc::network::BtcNetwork;
use chain_eth::network::EthNetwork;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Supported chain and environment pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    Ethereum,
    Sepolia,
}

/// How a chain tracks value, which decides the derivation and sweep scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    /// Script-hash deposit addresses spent with the collector key.
    Utxo,
    /// Per-identifier accounts holding their own derived key.
    Account,
}

impl Chain {
    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => ChainFamily::Utxo,
            Chain::Ethereum | Chain::Sepolia => ChainFamily::Account,
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "Bitcoin",
            Chain::BitcoinTestnet => "Bitcoin Testnet",
            Chain::Ethereum => "Ethereum",
            Chain::Sepolia => "Sepolia Testnet",
        }
    }

    /// Native token symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => "BTC",
            Chain::Ethereum | Chain::Sepolia => "ETH",
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Chain::BitcoinTestnet | Chain::Sepolia)
    }

    pub fn btc_network(&self) -> Result<BtcNetwork, SweepError> {
        match self {
            Chain::Bitcoin => Ok(BtcNetwork::Mainnet),
            Chain::BitcoinTestnet => Ok(BtcNetwork::Testnet),
            other => Err(SweepError::InvalidNetwork(format!(
                "{} is not a UTXO chain",
                other.display_name()
            ))),
        }
    }

    pub fn eth_network(&self) -> Result<EthNetwork, SweepError> {
        match self {
            Chain::Ethereum => Ok(EthNetwork::Mainnet),
            Chain::Sepolia => Ok(EthNetwork::Testnet),
            other => Err(SweepError::InvalidNetwork(format!(
                "{} is not an account chain",
                other.display_name()
            ))),
        }
    }
}

impl FromStr for Chain {
    type Err = SweepError;

    /// Accepts `<chain>` or `<chain>:<network>`, e.g. `bitcoin:testnet3` or
    /// `ethereum:mainnet`. The network defaults to mainnet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (chain, network) = lower.split_once(':').unwrap_or((lower.as_str(), "mainnet"));
        match chain {
            "bitcoin" | "btc" => Ok(match network.parse::<BtcNetwork>()? {
                BtcNetwork::Mainnet => Chain::Bitcoin,
                BtcNetwork::Testnet => Chain::BitcoinTestnet,
            }),
            "ethereum" | "eth" => Ok(match network.parse::<EthNetwork>()? {
                EthNetwork::Mainnet => Chain::Ethereum,
                EthNetwork::Testnet => Chain::Sepolia,
            }),
            "sepolia" => Ok(Chain::Sepolia),
            other => Err(SweepError::InvalidNetwork(format!("unsupported chain: {other}"))),
        }
    }
}

/// Progress of one identifier through a UTXO sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Pending,
    AwaitingFunds,
    Submitted,
    AwaitingSettlement,
    Done,
    /// Funds never exceeded the fee before the funding deadline.
    Skipped,
    Failed,
}

impl std::fmt::Display for SweepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SweepState::Pending => "pending",
            SweepState::AwaitingFunds => "awaiting_funds",
            SweepState::Submitted => "submitted",
            SweepState::AwaitingSettlement => "awaiting_settlement",
            SweepState::Done => "done",
            SweepState::Skipped => "skipped",
            SweepState::Failed => "failed",
        };
        f.write_str(name)
    }
}
