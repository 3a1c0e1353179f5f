use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};

use crate::error::BtcError;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Transaction ID as a hex string (big-endian / display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// The locking script (scriptPubKey) serialized bytes.
    pub script_pubkey: Vec<u8>,
}

impl Utxo {
    pub fn outpoint(&self) -> Result<OutPoint, BtcError> {
        let txid: Txid = self
            .txid
            .parse()
            .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid {}: {e}", self.txid)))?;
        Ok(OutPoint::new(txid, self.vout))
    }

    pub fn tx_out(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount_sat),
            script_pubkey: ScriptBuf::from(self.script_pubkey.clone()),
        }
    }
}

/// Sum of all UTXO values, failing on overflow.
pub fn total_value(utxos: &[Utxo]) -> Result<u64, BtcError> {
    utxos.iter().try_fold(0u64, |acc, utxo| {
        acc.checked_add(utxo.amount_sat)
            .ok_or_else(|| BtcError::TransactionBuildError("utxo total overflows u64".into()))
    })
}
