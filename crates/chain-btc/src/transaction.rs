use bitcoin::absolute::LockTime;
use bitcoin::address::Address;
use bitcoin::ecdsa::Signature as EcdsaSignature;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, Instruction, PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, PublicKey, ScriptHash, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::deposit::DepositScript;
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::{total_value, Utxo};

/// A sweep transaction with empty scriptSigs, ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedBtcTx {
    pub tx: Transaction,
    /// The outputs being spent, in input order.
    pub prevouts: Vec<TxOut>,
}

/// A signed sweep transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedBtcTx {
    pub tx: Transaction,
    /// Consensus-serialized transaction bytes.
    pub raw_tx: Vec<u8>,
    /// Transaction ID in display order.
    pub txid: String,
}

/// Build a transaction spending every UTXO of a deposit address to `destination`.
///
/// The single output carries `total - fee_sat`. A sweep whose balance does not
/// strictly exceed the fee is refused, so no zero or negative payout is ever
/// constructed.
pub fn build_sweep_transaction(
    utxos: &[Utxo],
    destination: &Address,
    fee_sat: u64,
) -> Result<UnsignedBtcTx, BtcError> {
    if utxos.is_empty() {
        return Err(BtcError::TransactionBuildError("no UTXOs to sweep".into()));
    }

    let total = total_value(utxos)?;
    if total <= fee_sat {
        return Err(BtcError::InsufficientFunds {
            balance: total,
            fee: fee_sat,
        });
    }

    let mut inputs = Vec::with_capacity(utxos.len());
    let mut prevouts = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        inputs.push(TxIn {
            previous_output: utxo.outpoint()?,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
        prevouts.push(utxo.tx_out());
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: vec![TxOut {
            value: Amount::from_sat(total - fee_sat),
            script_pubkey: destination.script_pubkey(),
        }],
    };

    Ok(UnsignedBtcTx { tx, prevouts })
}

/// Sign every input of a sweep with the collector key.
///
/// Each input gets the scriptSig `<sig> <pubkey> <redeem script>`, with the
/// public key serialized per `network` so that its HASH160 matches the hash
/// committed in the deposit script. A key whose hash does not match is
/// rejected before anything is signed.
pub fn sign_sweep_transaction(
    unsigned: &UnsignedBtcTx,
    deposit: &DepositScript,
    secret_key: &SecretKey,
    network: BtcNetwork,
) -> Result<SignedBtcTx, BtcError> {
    let secp = Secp256k1::new();
    let public_key = network.public_key(secret_key.public_key(&secp));
    if public_key.pubkey_hash() != *deposit.pubkey_hash() {
        return Err(BtcError::SigningError(
            "collector key does not match the deposit script".into(),
        ));
    }
    sign_inputs(unsigned, deposit, secret_key, &public_key)
}

fn sign_inputs(
    unsigned: &UnsignedBtcTx,
    deposit: &DepositScript,
    secret_key: &SecretKey,
    public_key: &PublicKey,
) -> Result<SignedBtcTx, BtcError> {
    let secp = Secp256k1::new();
    let redeem_push = push_bytes(deposit.script().to_bytes(), "redeem script")?;
    let pubkey_push = push_bytes(public_key.to_bytes(), "public key")?;

    let cache = SighashCache::new(&unsigned.tx);
    let mut script_sigs = Vec::with_capacity(unsigned.tx.input.len());
    for input_index in 0..unsigned.tx.input.len() {
        let sighash = cache
            .legacy_signature_hash(input_index, deposit.script(), EcdsaSighashType::All.to_u32())
            .map_err(|e| BtcError::SigningError(format!("sighash computation failed: {e}")))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = EcdsaSignature {
            signature: secp.sign_ecdsa(&msg, secret_key),
            sighash_type: EcdsaSighashType::All,
        };

        script_sigs.push(
            Builder::new()
                .push_slice(push_bytes(signature.to_vec(), "signature")?)
                .push_slice(&pubkey_push)
                .push_slice(&redeem_push)
                .into_script(),
        );
    }

    let mut tx = unsigned.tx.clone();
    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(SignedBtcTx {
        raw_tx: bitcoin::consensus::serialize(&tx),
        txid: tx.compute_txid().to_string(),
        tx,
    })
}

/// Check that input `input_index` of `tx` validly spends `prevout` through a deposit script.
///
/// Mirrors script execution for the deposit layout: the revealed redeem
/// script must hash to the P2SH output, the pushed public key must hash to
/// the key hash inside it, and the signature must verify under that key.
pub fn verify_sweep_input(
    tx: &Transaction,
    input_index: usize,
    prevout: &TxOut,
) -> Result<(), BtcError> {
    let input = tx.input.get(input_index).ok_or_else(|| {
        BtcError::VerificationFailed(format!("input {input_index} does not exist"))
    })?;

    let mut pushes = Vec::with_capacity(3);
    for instruction in input.script_sig.instructions() {
        match instruction.map_err(|e| BtcError::VerificationFailed(e.to_string()))? {
            Instruction::PushBytes(bytes) => pushes.push(bytes.as_bytes().to_vec()),
            Instruction::Op(op) => {
                return Err(BtcError::VerificationFailed(format!(
                    "unexpected {op} in scriptSig"
                )))
            }
        }
    }
    let [sig_bytes, pubkey_bytes, redeem_bytes]: [Vec<u8>; 3] = pushes
        .try_into()
        .map_err(|_| BtcError::VerificationFailed("scriptSig must hold three pushes".into()))?;

    let redeem = ScriptBuf::from_bytes(redeem_bytes);
    let p2sh = ScriptBuf::new_p2sh(&ScriptHash::hash(redeem.as_bytes()));
    if p2sh != prevout.script_pubkey {
        return Err(BtcError::VerificationFailed(
            "redeem script does not match the spent output".into(),
        ));
    }
    let deposit = DepositScript::parse(&redeem)?;

    let public_key = PublicKey::from_slice(&pubkey_bytes)
        .map_err(|e| BtcError::VerificationFailed(format!("bad public key: {e}")))?;
    if public_key.pubkey_hash() != *deposit.pubkey_hash() {
        return Err(BtcError::VerificationFailed(
            "public key does not match the deposit key hash".into(),
        ));
    }

    let signature = EcdsaSignature::from_slice(&sig_bytes)
        .map_err(|e| BtcError::VerificationFailed(format!("bad signature encoding: {e}")))?;
    let sighash = SighashCache::new(tx)
        .legacy_signature_hash(input_index, &redeem, signature.sighash_type.to_u32())
        .map_err(|e| BtcError::VerificationFailed(e.to_string()))?;
    let msg = Message::from_digest(sighash.to_byte_array());

    Secp256k1::verification_only()
        .verify_ecdsa(&msg, &signature.signature, &public_key.inner)
        .map_err(|e| BtcError::VerificationFailed(format!("signature check failed: {e}")))
}

fn push_bytes(bytes: Vec<u8>, what: &str) -> Result<PushBytesBuf, BtcError> {
    PushBytesBuf::try_from(bytes).map_err(|e| BtcError::SigningError(format!("{what} push: {e}")))
}
