//! Capabilities the sweep engines need from chain nodes.
//!
//! Node RPC, token contract calls and transaction signing for account chains
//! live behind these traits. The engines only decide *what* to move and in
//! which order.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use chain_btc::utxo::Utxo;
use chain_eth::deposit::AccountKey;

use crate::error::SweepError;

/// Read and broadcast access to a UTXO chain.
#[async_trait]
pub trait UtxoClient: Send + Sync {
    /// Confirmed balance at `address`, in satoshis.
    async fn balance(&self, address: &str, min_confirmations: u32) -> Result<u64, SweepError>;

    /// Every unspent output paying to `address`.
    async fn unspent_outputs(
        &self,
        address: &str,
        min_confirmations: u32,
    ) -> Result<Vec<Utxo>, SweepError>;

    /// Submit a consensus-serialized transaction, returning its txid.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String, SweepError>;

    /// Whether every output the sweep consumed from `address` is now spent.
    async fn is_spent(&self, address: &str, txid: &str) -> Result<bool, SweepError>;
}

/// Opens accounts on an account chain.
#[async_trait]
pub trait AccountConnector: Send + Sync {
    async fn connect(&self, endpoint: &str, key: &AccountKey) -> Result<Box<dyn Account>, SweepError>;
}

/// A key-controlled account able to sign its own transfers.
///
/// Transfer amounts of `None` move the whole balance, leaving whatever the
/// node charges for gas.
#[async_trait]
pub trait Account: Send + Sync {
    fn address(&self) -> Address;

    async fn native_balance(&self) -> Result<U256, SweepError>;

    /// Balance of the token known as `token` (contract address or alias).
    async fn token_balance(&self, token: &str) -> Result<U256, SweepError>;

    async fn transfer_native(&self, to: Address, amount: Option<U256>) -> Result<TxHash, SweepError>;

    async fn transfer_token(
        &self,
        token: &str,
        to: Address,
        amount: Option<U256>,
    ) -> Result<TxHash, SweepError>;

    /// Gas price the node currently suggests, in wei.
    async fn suggest_gas_price(&self) -> Result<U256, SweepError>;
}
