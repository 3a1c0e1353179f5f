use std::str::FromStr;

use crate::error::EthError;

/// Definition of an EVM network deposits can be collected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub explorer_url: &'static str,
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    explorer_url: "https://etherscan.io",
};

/// Sepolia Testnet (chain ID 11155111).
pub const SEPOLIA: EvmChain = EvmChain {
    chain_id: 11155111,
    name: "Sepolia",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Account-family networks selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EthNetwork {
    Mainnet,
    Testnet,
}

impl EthNetwork {
    pub fn chain(self) -> &'static EvmChain {
        match self {
            EthNetwork::Mainnet => &ETHEREUM,
            EthNetwork::Testnet => &SEPOLIA,
        }
    }

    pub fn chain_id(self) -> u64 {
        self.chain().chain_id
    }

    /// Human-readable summary of a broadcast transaction.
    pub fn format_transaction_view(self, message: &str, tx_hash: &str) -> String {
        format!("{message}: {}/tx/{tx_hash}", self.chain().explorer_url)
    }
}

impl FromStr for EthNetwork {
    type Err = EthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" => Ok(EthNetwork::Mainnet),
            "testnet" | "sepolia" => Ok(EthNetwork::Testnet),
            other => Err(EthError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for EthNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EthNetwork::Mainnet => write!(f, "mainnet"),
            EthNetwork::Testnet => write!(f, "testnet"),
        }
    }
}
