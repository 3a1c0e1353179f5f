//! In-memory chain clients shared by the engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use bitcoin::{OutPoint, Transaction};
use chain_btc::utxo::Utxo;
use chain_eth::deposit::AccountKey;
use sweep_core::client::{Account, AccountConnector, UtxoClient};
use sweep_core::SweepError;

// ─── UTXO chain ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoCall {
    Balance(String),
    Unspent(String),
    Broadcast(String),
    IsSpent(String),
}

impl UtxoCall {
    pub fn address(&self) -> &str {
        match self {
            UtxoCall::Balance(a) | UtxoCall::Unspent(a) | UtxoCall::Broadcast(a) | UtxoCall::IsSpent(a) => a,
        }
    }
}

#[derive(Default)]
struct UtxoState {
    utxos: HashMap<String, Vec<Utxo>>,
    /// Deposits that appear after the address has been polled this many times.
    pending: HashMap<String, (u32, Vec<Utxo>)>,
    rejected: HashSet<String>,
    /// `None` keeps broadcast sweeps unspent forever.
    settle_after: Option<u32>,
    spent_polls: HashMap<String, u32>,
    broadcasts: Vec<(String, Transaction)>,
    calls: Vec<UtxoCall>,
    next_txid: u64,
}

/// A UTXO node holding deposits in memory and recording every call.
#[derive(Clone)]
pub struct MockUtxoClient {
    state: Arc<Mutex<UtxoState>>,
}

impl Default for MockUtxoClient {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(UtxoState {
                settle_after: Some(0),
                ..UtxoState::default()
            })),
        }
    }
}

impl MockUtxoClient {
    fn outputs(state: &mut UtxoState, address: &str, amounts: &[u64]) -> Vec<Utxo> {
        let script_pubkey = address
            .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
            .unwrap()
            .assume_checked()
            .script_pubkey()
            .to_bytes();
        amounts
            .iter()
            .map(|&amount_sat| {
                state.next_txid += 1;
                Utxo {
                    txid: format!("{:064x}", state.next_txid),
                    vout: 0,
                    amount_sat,
                    script_pubkey: script_pubkey.clone(),
                }
            })
            .collect()
    }

    pub fn fund(&self, address: &str, amounts: &[u64]) {
        let mut state = self.state.lock().unwrap();
        let outputs = Self::outputs(&mut state, address, amounts);
        state.utxos.entry(address.to_string()).or_default().extend(outputs);
    }

    /// Fund `address` once its balance has been queried `polls` times.
    pub fn fund_after(&self, address: &str, polls: u32, amounts: &[u64]) {
        let mut state = self.state.lock().unwrap();
        let outputs = Self::outputs(&mut state, address, amounts);
        state.pending.insert(address.to_string(), (polls, outputs));
    }

    pub fn reject_broadcasts_from(&self, address: &str) {
        self.state.lock().unwrap().rejected.insert(address.to_string());
    }

    pub fn accept_all_broadcasts(&self) {
        self.state.lock().unwrap().rejected.clear();
    }

    pub fn settle_after(&self, polls: Option<u32>) {
        self.state.lock().unwrap().settle_after = polls;
    }

    pub fn calls(&self) -> Vec<UtxoCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn touched(&self, address: &str) -> bool {
        self.calls().iter().any(|call| call.address() == address)
    }

    /// Successful broadcasts as `(deposit address, transaction)`.
    pub fn broadcasts(&self) -> Vec<(String, Transaction)> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        let state = self.state.lock().unwrap();
        state
            .utxos
            .get(address)
            .map(|utxos| utxos.iter().map(|u| u.amount_sat).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl UtxoClient for MockUtxoClient {
    async fn balance(&self, address: &str, _min_confirmations: u32) -> Result<u64, SweepError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(UtxoCall::Balance(address.to_string()));

        let arrived = match state.pending.get_mut(address) {
            Some((0, _)) => true,
            Some((polls, _)) => {
                *polls -= 1;
                false
            }
            None => false,
        };
        if arrived {
            if let Some((_, outputs)) = state.pending.remove(address) {
                state.utxos.entry(address.to_string()).or_default().extend(outputs);
            }
        }

        Ok(state
            .utxos
            .get(address)
            .map(|utxos| utxos.iter().map(|u| u.amount_sat).sum())
            .unwrap_or(0))
    }

    async fn unspent_outputs(
        &self,
        address: &str,
        _min_confirmations: u32,
    ) -> Result<Vec<Utxo>, SweepError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(UtxoCall::Unspent(address.to_string()));
        Ok(state.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String, SweepError> {
        let tx: Transaction = bitcoin::consensus::deserialize(raw_tx)
            .map_err(|e| SweepError::Client(format!("undecodable transaction: {e}")))?;
        let spent: HashSet<OutPoint> = tx.input.iter().map(|i| i.previous_output).collect();

        let mut state = self.state.lock().unwrap();
        let address = state
            .utxos
            .iter()
            .find(|(_, utxos)| utxos.iter().any(|u| spent.contains(&u.outpoint().unwrap())))
            .map(|(address, _)| address.clone())
            .ok_or_else(|| SweepError::Client("inputs are missing or spent".into()))?;
        state.calls.push(UtxoCall::Broadcast(address.clone()));

        if state.rejected.contains(&address) {
            return Err(SweepError::Client(format!("node rejected sweep of {address}")));
        }

        if let Some(utxos) = state.utxos.get_mut(&address) {
            utxos.retain(|u| !spent.contains(&u.outpoint().unwrap()));
        }
        let txid = tx.compute_txid().to_string();
        state.broadcasts.push((address, tx));
        Ok(txid)
    }

    async fn is_spent(&self, address: &str, txid: &str) -> Result<bool, SweepError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(UtxoCall::IsSpent(address.to_string()));
        let known = state
            .broadcasts
            .iter()
            .any(|(_, tx)| tx.compute_txid().to_string() == txid);
        let polls = {
            let count = state.spent_polls.entry(address.to_string()).or_default();
            *count += 1;
            *count
        };
        Ok(known && state.settle_after.is_some_and(|after| polls > after))
    }
}

// ─── Account chain ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Connect(Address),
    GasPrice,
    Native { from: Address, to: Address, amount: U256 },
    Token { token: String, from: Address, to: Address, amount: U256 },
}

#[derive(Default)]
struct Ledger {
    native: HashMap<Address, U256>,
    tokens: HashMap<(String, Address), U256>,
    gas_cost: U256,
    suggested_gas_price: U256,
    failing: HashSet<Address>,
    stalled: HashSet<Address>,
    stalled_balances: HashSet<Address>,
    events: Vec<LedgerEvent>,
    next_tx: u64,
}

impl Ledger {
    fn tx_hash(&mut self) -> TxHash {
        self.next_tx += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&self.next_tx.to_be_bytes());
        TxHash::from(bytes)
    }

    fn pay_gas(&mut self, from: Address) -> Result<(), SweepError> {
        let balance = self.native.get(&from).copied().unwrap_or_default();
        if balance < self.gas_cost {
            return Err(SweepError::Client(format!("{from} cannot pay for gas")));
        }
        self.native.insert(from, balance - self.gas_cost);
        Ok(())
    }
}

/// Accounts over one shared in-memory ledger. Every transfer costs `gas_cost`.
#[derive(Clone)]
pub struct MockConnector {
    ledger: Arc<Mutex<Ledger>>,
}

impl MockConnector {
    pub fn new(gas_cost: U256, suggested_gas_price: U256) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger {
                gas_cost,
                suggested_gas_price,
                ..Ledger::default()
            })),
        }
    }

    pub fn set_native(&self, address: Address, amount: U256) {
        self.ledger.lock().unwrap().native.insert(address, amount);
    }

    pub fn set_token(&self, token: &str, address: Address, amount: U256) {
        self.ledger
            .lock()
            .unwrap()
            .tokens
            .insert((token.to_string(), address), amount);
    }

    pub fn native(&self, address: Address) -> U256 {
        self.ledger.lock().unwrap().native.get(&address).copied().unwrap_or_default()
    }

    pub fn token(&self, token: &str, address: Address) -> U256 {
        self.ledger
            .lock()
            .unwrap()
            .tokens
            .get(&(token.to_string(), address))
            .copied()
            .unwrap_or_default()
    }

    pub fn fail_transfers_from(&self, address: Address) {
        self.ledger.lock().unwrap().failing.insert(address);
    }

    pub fn stall_transfers_from(&self, address: Address) {
        self.ledger.lock().unwrap().stalled.insert(address);
    }

    pub fn stall_balances_of(&self, address: Address) {
        self.ledger.lock().unwrap().stalled_balances.insert(address);
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.ledger.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl AccountConnector for MockConnector {
    async fn connect(&self, _endpoint: &str, key: &AccountKey) -> Result<Box<dyn Account>, SweepError> {
        self.ledger
            .lock()
            .unwrap()
            .events
            .push(LedgerEvent::Connect(key.address()));
        Ok(Box::new(MockAccount {
            address: key.address(),
            ledger: self.ledger.clone(),
        }))
    }
}

struct MockAccount {
    address: Address,
    ledger: Arc<Mutex<Ledger>>,
}

impl MockAccount {
    async fn balance_gate(&self) {
        let stalled = self
            .ledger
            .lock()
            .unwrap()
            .stalled_balances
            .contains(&self.address);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    async fn gate(&self) -> Result<(), SweepError> {
        let (failing, stalled) = {
            let ledger = self.ledger.lock().unwrap();
            (
                ledger.failing.contains(&self.address),
                ledger.stalled.contains(&self.address),
            )
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        if failing {
            return Err(SweepError::Client(format!("transfer from {} rejected", self.address)));
        }
        Ok(())
    }
}

#[async_trait]
impl Account for MockAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn native_balance(&self) -> Result<U256, SweepError> {
        self.balance_gate().await;
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .native
            .get(&self.address)
            .copied()
            .unwrap_or_default())
    }

    async fn token_balance(&self, token: &str) -> Result<U256, SweepError> {
        self.balance_gate().await;
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .tokens
            .get(&(token.to_string(), self.address))
            .copied()
            .unwrap_or_default())
    }

    async fn transfer_native(&self, to: Address, amount: Option<U256>) -> Result<TxHash, SweepError> {
        self.gate().await?;
        let mut ledger = self.ledger.lock().unwrap();
        ledger.pay_gas(self.address)?;
        let balance = ledger.native.get(&self.address).copied().unwrap_or_default();
        let amount = amount.unwrap_or(balance);
        if amount > balance {
            return Err(SweepError::Client(format!("{} has insufficient funds", self.address)));
        }
        ledger.native.insert(self.address, balance - amount);
        *ledger.native.entry(to).or_default() += amount;
        ledger.events.push(LedgerEvent::Native {
            from: self.address,
            to,
            amount,
        });
        Ok(ledger.tx_hash())
    }

    async fn transfer_token(
        &self,
        token: &str,
        to: Address,
        amount: Option<U256>,
    ) -> Result<TxHash, SweepError> {
        self.gate().await?;
        let mut ledger = self.ledger.lock().unwrap();
        ledger.pay_gas(self.address)?;
        let key = (token.to_string(), self.address);
        let balance = ledger.tokens.get(&key).copied().unwrap_or_default();
        let amount = amount.unwrap_or(balance);
        if amount > balance {
            return Err(SweepError::Client(format!("{} has insufficient {token}", self.address)));
        }
        ledger.tokens.insert(key, balance - amount);
        *ledger.tokens.entry((token.to_string(), to)).or_default() += amount;
        ledger.events.push(LedgerEvent::Token {
            token: token.to_string(),
            from: self.address,
            to,
            amount,
        });
        Ok(ledger.tx_hash())
    }

    async fn suggest_gas_price(&self) -> Result<U256, SweepError> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.events.push(LedgerEvent::GasPrice);
        Ok(ledger.suggested_gas_price)
    }
}
