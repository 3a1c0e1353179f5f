//! UTXO-family generator and collector.
//!
//! Deposit addresses are P2SH addresses over a script tagged with the
//! identifier and locked to the collector's key hash. The collector key alone
//! spends every one of them, so no per-identifier key exists.

use async_trait::async_trait;
use bitcoin::address::Address;
use bitcoin::secp256k1::SecretKey;
use bitcoin::PubkeyHash;
use chain_btc::address::{collector_key_from_wif, collector_public_key, decode_address, decode_p2pkh};
use chain_btc::deposit::{derive_deposit, DepositScript};
use chain_btc::network::BtcNetwork;
use chain_btc::transaction::{build_sweep_transaction, sign_sweep_transaction, verify_sweep_input};
use chain_btc::utxo::{total_value, Utxo};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::UtxoClient;
use crate::config::UtxoConfig;
use crate::error::SweepError;
use crate::fee::UtxoFeePolicy;
use crate::poll::{cancellable, Poller};
use crate::types::{Chain, SweepState};
use crate::{Collector, Generator};

/// Derives deposit addresses from a collector's P2PKH address.
#[derive(Debug, Clone)]
pub struct BtcGenerator {
    network: BtcNetwork,
    collector_pubkey_hash: PubkeyHash,
}

impl BtcGenerator {
    /// Fails with `InvalidAddressKind` unless `collector_address` is P2PKH on `chain`.
    pub fn new(collector_address: &str, chain: Chain) -> Result<Self, SweepError> {
        let network = chain.btc_network()?;
        let collector_pubkey_hash = decode_p2pkh(collector_address, network)?;
        Ok(Self {
            network,
            collector_pubkey_hash,
        })
    }

    /// Uses `collector_address` when present, otherwise the address of `collector_wif`.
    pub fn from_config(config: &UtxoConfig) -> Result<Self, SweepError> {
        let network = config.chain.btc_network()?;
        match (&config.collector_address, &config.collector_wif) {
            (Some(address), _) => Self::new(address, config.chain),
            (None, Some(wif)) => {
                let secret = collector_key_from_wif(wif.expose_secret(), network)?;
                Ok(Self {
                    network,
                    collector_pubkey_hash: collector_public_key(&secret, network).pubkey_hash(),
                })
            }
            (None, None) => Err(SweepError::Config(
                "a collector address or WIF key is required".into(),
            )),
        }
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    /// Deposit address and redeem script for `identifier`.
    pub fn deposit(&self, identifier: Uuid) -> Result<(String, DepositScript), SweepError> {
        Ok(derive_deposit(
            *identifier.as_bytes(),
            self.collector_pubkey_hash,
            self.network,
        )?)
    }
}

impl Generator for BtcGenerator {
    fn generate_address(&self, identifier: Uuid) -> Result<String, SweepError> {
        self.deposit(identifier).map(|(address, _)| address)
    }
}

/// One identifier's unit of sweep work. Lives only for the duration of its sweep.
#[derive(Debug)]
struct SweepPlan<'a> {
    identifier: Uuid,
    deposit_address: String,
    script: DepositScript,
    destination: &'a Address,
}

/// Sweeps deposit addresses back to a destination with the collector key.
pub struct BtcCollector<C> {
    client: C,
    generator: BtcGenerator,
    secret_key: SecretKey,
    fee: UtxoFeePolicy,
    min_confirmations: u32,
    funding: Poller,
    settlement: Poller,
}

impl<C: UtxoClient> BtcCollector<C> {
    /// Requires `collector_wif` for `config.chain`. A configured
    /// `collector_address` must belong to the same key.
    pub fn new(client: C, config: &UtxoConfig) -> Result<Self, SweepError> {
        let network = config.chain.btc_network()?;
        config.poll.validate()?;
        let wif = config
            .collector_wif
            .as_ref()
            .ok_or_else(|| SweepError::Config("collecting requires the collector WIF key".into()))?;
        let secret_key = collector_key_from_wif(wif.expose_secret(), network)?;
        let collector_pubkey_hash = collector_public_key(&secret_key, network).pubkey_hash();

        if let Some(address) = &config.collector_address {
            if decode_p2pkh(address, network)? != collector_pubkey_hash {
                return Err(SweepError::Config(format!(
                    "collector address {address} does not belong to the collector key"
                )));
            }
        }

        Ok(Self {
            client,
            generator: BtcGenerator {
                network,
                collector_pubkey_hash,
            },
            secret_key,
            fee: UtxoFeePolicy::new(config.fee_sat),
            min_confirmations: config.min_confirmations,
            funding: config.poll.funding_poller(),
            settlement: config.poll.settlement_poller(),
        })
    }

    pub fn generator(&self) -> &BtcGenerator {
        &self.generator
    }

    /// Deposit address of `identifier`, identical to what the generator hands out.
    pub fn deposit_address(&self, identifier: Uuid) -> Result<String, SweepError> {
        self.generator.generate_address(identifier)
    }

    fn plan<'a>(&self, identifier: Uuid, destination: &'a Address) -> Result<SweepPlan<'a>, SweepError> {
        let (deposit_address, script) = self.generator.deposit(identifier)?;
        Ok(SweepPlan {
            identifier,
            deposit_address,
            script,
            destination,
        })
    }

    /// The deposit's outputs once they are worth more than the fee.
    async fn sweepable_outputs(&self, plan: &SweepPlan<'_>) -> Result<Option<Vec<Utxo>>, SweepError> {
        let balance = self
            .client
            .balance(&plan.deposit_address, self.min_confirmations)
            .await?;
        if !self.fee.is_sweepable(balance) {
            return Ok(None);
        }

        let utxos = self
            .client
            .unspent_outputs(&plan.deposit_address, self.min_confirmations)
            .await?;
        Ok(self.fee.is_sweepable(total_value(&utxos)?).then_some(utxos))
    }

    async fn sweep(
        &self,
        cancel: &CancellationToken,
        identifier: Uuid,
        destination: &Address,
    ) -> Result<SweepState, SweepError> {
        let network = self.generator.network;
        debug!(%identifier, state = %SweepState::Pending, "deriving deposit script");
        let plan = self.plan(identifier, destination)?;

        debug!(
            %identifier,
            state = %SweepState::AwaitingFunds,
            address = %plan.deposit_address,
            "waiting for funds above the fee"
        );
        let outputs = {
            let this = self;
            let plan = &plan;
            self.funding
                .wait_for(cancel, "funds", move || this.sweepable_outputs(plan))
                .await
        };
        let utxos = match outputs {
            Ok(utxos) => utxos,
            Err(SweepError::Timeout(_)) => {
                warn!(
                    %identifier,
                    state = %SweepState::Skipped,
                    address = %plan.deposit_address,
                    fee_sat = self.fee.fee_sat(),
                    "deposit never exceeded the fee"
                );
                return Ok(SweepState::Skipped);
            }
            Err(e) => return Err(e),
        };

        let unsigned = build_sweep_transaction(&utxos, plan.destination, self.fee.fee_sat())?;
        let signed = sign_sweep_transaction(&unsigned, &plan.script, &self.secret_key, network)?;
        for (index, prevout) in unsigned.prevouts.iter().enumerate() {
            verify_sweep_input(&signed.tx, index, prevout)?;
        }

        let txid = cancellable(cancel, self.client.broadcast(&signed.raw_tx)).await?;
        info!(
            identifier = %plan.identifier,
            state = %SweepState::Submitted,
            %txid,
            inputs = utxos.len(),
            amount_sat = signed.tx.output.iter().map(|o| o.value.to_sat()).sum::<u64>(),
            url = %network.tx_url(&txid),
            "sweep broadcast"
        );

        debug!(%identifier, state = %SweepState::AwaitingSettlement, %txid, "waiting for settlement");
        {
            let client = &self.client;
            let address = plan.deposit_address.as_str();
            let txid = txid.as_str();
            self.settlement
                .wait_for(cancel, "settlement", move || async move {
                    Ok::<_, SweepError>(client.is_spent(address, txid).await?.then_some(()))
                })
                .await?;
        }

        debug!(%identifier, state = %SweepState::Done, %txid, "sweep settled");
        Ok(SweepState::Done)
    }
}

#[async_trait]
impl<C: UtxoClient> Collector for BtcCollector<C> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        destination: &str,
        identifiers: &[Uuid],
    ) -> Result<(), SweepError> {
        let destination = decode_address(destination, self.generator.network)?;

        let mut swept = 0usize;
        for &identifier in identifiers {
            match self.sweep(cancel, identifier, &destination).await {
                Ok(SweepState::Done) => swept += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(%identifier, state = %SweepState::Failed, error = %e, "aborting batch");
                    return Err(e.for_identifier(identifier));
                }
            }
        }

        info!(
            requested = identifiers.len(),
            swept,
            destination = %destination,
            "collection finished"
        );
        Ok(())
    }
}

impl<C> Drop for BtcCollector<C> {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}
