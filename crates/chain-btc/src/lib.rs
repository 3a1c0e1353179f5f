//! Bitcoin chain support for the deposit collector.
//!
//! Provides P2PKH collector-address decoding, the uniqueness-tagged P2SH
//! deposit script, and construction, signing and verification of the legacy
//! transactions that sweep a deposit address back to custody.

pub mod address;
pub mod deposit;
pub mod error;
pub mod network;
pub mod transaction;
pub mod utxo;
