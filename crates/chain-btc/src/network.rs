use std::str::FromStr;

use bitcoin::secp256k1::PublicKey as SecpPublicKey;
use bitcoin::{Network, PublicKey};

use crate::error::BtcError;

/// Block explorer for Bitcoin mainnet.
pub const MAINNET_EXPLORER: &str = "https://blockstream.info";

/// Block explorer for Bitcoin testnet.
pub const TESTNET_EXPLORER: &str = "https://blockstream.info/testnet";

/// Bitcoin networks deposit addresses can be generated for.
///
/// Only these two are supported because each one fixes how the collector's
/// public key is serialized (see [`BtcNetwork::public_key`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
        }
    }

    /// Serialize a collector key the way addresses on this network commit to it.
    ///
    /// Mainnet uses the 33-byte compressed form, testnet the 65-byte
    /// uncompressed form. Signatures only verify against deposit addresses
    /// derived with the same choice.
    pub fn public_key(self, key: SecpPublicKey) -> PublicKey {
        match self {
            BtcNetwork::Mainnet => PublicKey::new(key),
            BtcNetwork::Testnet => PublicKey::new_uncompressed(key),
        }
    }

    /// Link to a transaction on this network's block explorer.
    pub fn tx_url(self, txid: &str) -> String {
        let base = match self {
            BtcNetwork::Mainnet => MAINNET_EXPLORER,
            BtcNetwork::Testnet => TESTNET_EXPLORER,
        };
        format!("{base}/tx/{txid}")
    }
}

impl FromStr for BtcNetwork {
    type Err = BtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(BtcNetwork::Mainnet),
            "testnet" | "testnet3" => Ok(BtcNetwork::Testnet),
            other => Err(BtcError::InvalidNetwork(format!(
                "unsupported network: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtcNetwork::Mainnet => write!(f, "mainnet"),
            BtcNetwork::Testnet => write!(f, "testnet"),
        }
    }
}
