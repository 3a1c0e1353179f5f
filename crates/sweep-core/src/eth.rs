//! Account-family generator and collector.
//!
//! Every identifier owns an account whose key is spliced from the identifier
//! and the master key. Collection pre-funds those accounts with gas from the
//! master account, then empties them into the destination: tokens first,
//! native currency last.

use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use chain_eth::address::parse_address;
use chain_eth::deposit::{derive_deposit_key, parse_master_key, AccountKey, PRIVATE_KEY_LEN};
use chain_eth::network::EthNetwork;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::client::{Account, AccountConnector};
use crate::config::AccountConfig;
use crate::error::SweepError;
use crate::fee::GasBudget;
use crate::poll::{bounded, cancellable};
use crate::types::Chain;
use crate::{Collector, Generator};

/// Derives deposit accounts from the master private key.
pub struct EthGenerator {
    network: EthNetwork,
    master: Zeroizing<[u8; PRIVATE_KEY_LEN]>,
}

impl EthGenerator {
    /// Fails with `InvalidKeyMaterial` unless `master_key` is a valid 32-byte hex key.
    pub fn new(master_key: &SecretString, chain: Chain) -> Result<Self, SweepError> {
        let network = chain.eth_network()?;
        let master = parse_master_key(master_key.expose_secret())?;
        AccountKey::from_bytes(&master)?;
        Ok(Self { network, master })
    }

    pub fn from_config(config: &AccountConfig) -> Result<Self, SweepError> {
        Self::new(&config.master_key, config.chain)
    }

    pub fn network(&self) -> EthNetwork {
        self.network
    }

    /// The master account, which pays for pre-funding.
    pub fn master_account(&self) -> Result<AccountKey, SweepError> {
        Ok(AccountKey::from_bytes(&self.master)?)
    }

    /// Fails, tagged with `identifier`, when the spliced key is not a valid scalar.
    pub fn deposit_key(&self, identifier: Uuid) -> Result<AccountKey, SweepError> {
        derive_deposit_key(identifier.as_bytes(), &self.master)
            .map_err(|e| SweepError::from(e).for_identifier(identifier))
    }
}

impl Generator for EthGenerator {
    fn generate_address(&self, identifier: Uuid) -> Result<String, SweepError> {
        self.deposit_key(identifier).map(|key| key.checksummed())
    }
}

impl std::fmt::Debug for EthGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthGenerator")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Empties deposit accounts into a destination address.
pub struct EthCollector<K> {
    connector: K,
    generator: EthGenerator,
    endpoint: String,
    tokens: Vec<String>,
    gas: GasBudget,
    gas_price_wei: Option<U256>,
    withdraw_timeout: Duration,
}

impl<K: AccountConnector> EthCollector<K> {
    pub fn new(connector: K, config: &AccountConfig) -> Result<Self, SweepError> {
        let generator = EthGenerator::from_config(config)?;
        if config.endpoint.trim().is_empty() {
            return Err(SweepError::Config("a chain endpoint is required".into()));
        }
        if config.withdraw_timeout_secs == 0 {
            return Err(SweepError::Config("withdraw timeout must be positive".into()));
        }
        Ok(Self {
            connector,
            generator,
            endpoint: config.endpoint.clone(),
            tokens: config.tokens.clone(),
            gas: GasBudget::new(config.gas.gas_per_transfer),
            gas_price_wei: config.gas.gas_price_wei.map(U256::from),
            withdraw_timeout: config.withdraw_timeout(),
        })
    }

    pub fn generator(&self) -> &EthGenerator {
        &self.generator
    }

    async fn connect(
        &self,
        cancel: &CancellationToken,
        key: &AccountKey,
    ) -> Result<Box<dyn Account>, SweepError> {
        cancellable(cancel, self.connector.connect(&self.endpoint, key)).await
    }

    fn summary(&self, message: &str, tx_hash: impl ToString) -> String {
        self.generator
            .network
            .format_transaction_view(message, &tx_hash.to_string())
    }

    /// Send every deposit account its gas budget, one transfer at a time from the payer.
    async fn prefund(
        &self,
        cancel: &CancellationToken,
        payer: &dyn Account,
        accounts: &[(Uuid, Box<dyn Account>)],
    ) -> Result<(), SweepError> {
        if self.tokens.is_empty() {
            debug!("no tokens configured, skipping pre-funding");
            return Ok(());
        }

        let gas_price = match self.gas_price_wei {
            Some(price) => price,
            None => cancellable(cancel, payer.suggest_gas_price()).await?,
        };
        let amount = self.gas.prefund_amount(self.tokens.len(), gas_price);
        debug!(
            tokens = self.tokens.len(),
            gas_per_transfer = self.gas.gas_per_transfer(),
            %gas_price,
            %amount,
            "pre-funding deposit accounts"
        );

        for (identifier, account) in accounts {
            let tx = bounded(
                cancel,
                self.withdraw_timeout,
                "pre-funding transfer",
                payer.transfer_native(account.address(), Some(amount)),
            )
            .await
            .map_err(|e| e.for_identifier(*identifier))?;
            info!(%identifier, "{}", self.summary("pre-funded deposit account", tx));
        }
        Ok(())
    }

    /// Withdraw the whole `token` balance, with the balance query and the
    /// transfer sharing one time limit.
    async fn withdraw_token(
        &self,
        cancel: &CancellationToken,
        account: &dyn Account,
        token: &str,
        destination: Address,
    ) -> Result<(), SweepError> {
        let drained = bounded(
            cancel,
            self.withdraw_timeout,
            "token withdrawal",
            drain_token(account, token, destination),
        )
        .await?;
        match drained {
            Some((balance, tx)) => {
                info!(token, %balance, "{}", self.summary("withdrew token", tx))
            }
            None => debug!(account = %account.address(), token, "no token balance"),
        }
        Ok(())
    }

    async fn withdraw_native(
        &self,
        cancel: &CancellationToken,
        account: &dyn Account,
        destination: Address,
    ) -> Result<(), SweepError> {
        let drained = bounded(
            cancel,
            self.withdraw_timeout,
            "native withdrawal",
            drain_native(account, destination),
        )
        .await?;
        match drained {
            Some((balance, tx)) => {
                info!(%balance, "{}", self.summary("withdrew native balance", tx))
            }
            None => debug!(account = %account.address(), "no native balance"),
        }
        Ok(())
    }
}

/// Move the whole token balance, or nothing when it is zero.
async fn drain_token(
    account: &dyn Account,
    token: &str,
    destination: Address,
) -> Result<Option<(U256, TxHash)>, SweepError> {
    let balance = account.token_balance(token).await?;
    if balance.is_zero() {
        return Ok(None);
    }
    let tx = account
        .transfer_token(token, destination, Some(balance))
        .await?;
    Ok(Some((balance, tx)))
}

async fn drain_native(
    account: &dyn Account,
    destination: Address,
) -> Result<Option<(U256, TxHash)>, SweepError> {
    let balance = account.native_balance().await?;
    if balance.is_zero() {
        return Ok(None);
    }
    let tx = account.transfer_native(destination, None).await?;
    Ok(Some((balance, tx)))
}

#[async_trait]
impl<K: AccountConnector> Collector for EthCollector<K> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        destination: &str,
        identifiers: &[Uuid],
    ) -> Result<(), SweepError> {
        let destination = parse_address(destination)?;
        let payer = self.connect(cancel, &self.generator.master_account()?).await?;

        let mut accounts = Vec::with_capacity(identifiers.len());
        for &identifier in identifiers {
            let key = self.generator.deposit_key(identifier)?;
            let account = self
                .connect(cancel, &key)
                .await
                .map_err(|e| e.for_identifier(identifier))?;
            debug!(%identifier, account = %account.address(), "opened deposit account");
            accounts.push((identifier, account));
        }

        self.prefund(cancel, payer.as_ref(), &accounts)
            .await
            .inspect_err(|e| warn!(error = %e, "pre-funding failed, aborting batch"))?;

        for token in &self.tokens {
            for (identifier, account) in &accounts {
                self.withdraw_token(cancel, account.as_ref(), token, destination)
                    .await
                    .map_err(|e| {
                        warn!(%identifier, token = %token, error = %e, "aborting batch");
                        e.for_identifier(*identifier)
                    })?;
            }
        }

        for (identifier, account) in &accounts {
            self.withdraw_native(cancel, account.as_ref(), destination)
                .await
                .map_err(|e| {
                    warn!(%identifier, error = %e, "aborting batch");
                    e.for_identifier(*identifier)
                })?;
        }

        let network = self.generator.network;
        info!(
            chain = network.chain().name,
            chain_id = network.chain_id(),
            accounts = accounts.len(),
            tokens = self.tokens.len(),
            destination = %destination,
            "collection finished"
        );
        Ok(())
    }
}
