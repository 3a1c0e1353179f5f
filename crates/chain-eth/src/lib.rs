//! Ethereum/EVM chain support for the deposit collector.
//!
//! This crate provides:
//! - Deposit keys spliced from an identifier and the master private key
//! - EIP-55 address parsing and formatting
//! - Network definitions with explorer links for transaction summaries

pub mod address;
pub mod deposit;
pub mod error;
pub mod network;
