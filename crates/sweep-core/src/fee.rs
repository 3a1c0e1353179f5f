//! Fee policies for both chain families.

use alloy_primitives::U256;

/// Fixed fee deducted from every UTXO sweep, in satoshis.
pub const DEFAULT_BTC_FEE_SAT: u64 = 10_000;

/// Gas reserved per token transfer out of a deposit account.
pub const DEFAULT_GAS_PER_TRANSFER: u64 = 1_200_000;

/// Default fixed gas price for pre-funding: 1 gwei.
pub const DEFAULT_GAS_PRICE_WEI: u64 = 1_000_000_000;

/// Absolute fee for UTXO sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoFeePolicy {
    fee_sat: u64,
}

impl UtxoFeePolicy {
    pub fn new(fee_sat: u64) -> Self {
        Self { fee_sat }
    }

    pub fn fee_sat(&self) -> u64 {
        self.fee_sat
    }

    /// Amount paid to the destination for `balance_sat`, if a sweep is worth making.
    ///
    /// `None` whenever the payout would be zero or negative.
    pub fn payout(&self, balance_sat: u64) -> Option<u64> {
        balance_sat.checked_sub(self.fee_sat).filter(|payout| *payout > 0)
    }

    pub fn is_sweepable(&self, balance_sat: u64) -> bool {
        self.payout(balance_sat).is_some()
    }
}

impl Default for UtxoFeePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BTC_FEE_SAT)
    }
}

/// Native currency each deposit account receives before token withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBudget {
    gas_per_transfer: u64,
}

impl GasBudget {
    pub fn new(gas_per_transfer: u64) -> Self {
        Self { gas_per_transfer }
    }

    pub fn gas_per_transfer(&self) -> u64 {
        self.gas_per_transfer
    }

    /// `gas_per_transfer * token_count * gas_price_wei`, funded as one transfer per account.
    pub fn prefund_amount(&self, token_count: usize, gas_price_wei: U256) -> U256 {
        U256::from(self.gas_per_transfer)
            .saturating_mul(U256::from(token_count))
            .saturating_mul(gas_price_wei)
    }
}

impl Default for GasBudget {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_PER_TRANSFER)
    }
}
