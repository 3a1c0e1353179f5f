//! The per-identifier deposit script.
//!
//! A deposit script is `<tag> OP_DROP OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY
//! OP_CHECKSIG`. The 16-byte tag is pushed and immediately dropped, so it has
//! no effect on who may spend: exactly the holder of the key behind `pkh`.
//! It only changes the script bytes, and therefore the P2SH address, for
//! every distinct tag.

use bitcoin::address::Address;
use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DROP, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
use bitcoin::script::{Builder, Instruction, PushBytesBuf, Script, ScriptBuf};
use bitcoin::PubkeyHash;

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// Length of the uniqueness tag carried by every deposit script.
pub const TAG_LEN: usize = 16;

/// A redeem script tying one identifier to the collector's key hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositScript {
    tag: [u8; TAG_LEN],
    pubkey_hash: PubkeyHash,
    script: ScriptBuf,
}

impl DepositScript {
    /// Build the deposit script for `tag` paying to the collector's `pubkey_hash`.
    pub fn new(tag: [u8; TAG_LEN], pubkey_hash: PubkeyHash) -> Result<Self, BtcError> {
        let tag_push = PushBytesBuf::try_from(tag.to_vec())
            .map_err(|e| BtcError::InvalidScript(format!("tag push: {e}")))?;
        let hash_push = PushBytesBuf::try_from(pubkey_hash.to_byte_array().to_vec())
            .map_err(|e| BtcError::InvalidScript(format!("pubkey hash push: {e}")))?;

        let script = Builder::new()
            .push_slice(tag_push)
            .push_opcode(OP_DROP)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(hash_push)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .into_script();

        Ok(Self {
            tag,
            pubkey_hash,
            script,
        })
    }

    /// Recover a deposit script from its serialized bytes.
    ///
    /// Fails unless the bytes have exactly the deposit layout.
    pub fn parse(script: &Script) -> Result<Self, BtcError> {
        let mut instructions = script.instructions();
        let mut next = || {
            instructions
                .next()
                .ok_or_else(|| BtcError::InvalidScript("script ended early".into()))?
                .map_err(|e| BtcError::InvalidScript(e.to_string()))
        };

        let tag: [u8; TAG_LEN] = match next()? {
            Instruction::PushBytes(bytes) => bytes
                .as_bytes()
                .try_into()
                .map_err(|_| BtcError::InvalidScript("tag must be 16 bytes".into()))?,
            _ => return Err(BtcError::InvalidScript("expected tag push".into())),
        };
        for expected in [OP_DROP, OP_DUP, OP_HASH160] {
            if next()? != Instruction::Op(expected) {
                return Err(BtcError::InvalidScript(format!("expected {expected}")));
            }
        }
        let pubkey_hash = match next()? {
            Instruction::PushBytes(bytes) => PubkeyHash::from_slice(bytes.as_bytes())
                .map_err(|_| BtcError::InvalidScript("pubkey hash must be 20 bytes".into()))?,
            _ => return Err(BtcError::InvalidScript("expected pubkey hash push".into())),
        };
        for expected in [OP_EQUALVERIFY, OP_CHECKSIG] {
            if next()? != Instruction::Op(expected) {
                return Err(BtcError::InvalidScript(format!("expected {expected}")));
            }
        }
        if script.instructions().count() != 7 {
            return Err(BtcError::InvalidScript("trailing data after OP_CHECKSIG".into()));
        }

        Self::new(tag, pubkey_hash)
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    pub fn pubkey_hash(&self) -> &PubkeyHash {
        &self.pubkey_hash
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// The P2SH address committing to this script on `network`.
    pub fn address(&self, network: BtcNetwork) -> Result<Address, BtcError> {
        Address::p2sh(&self.script, network.to_bitcoin_network())
            .map_err(|e| BtcError::InvalidScript(format!("p2sh: {e}")))
    }
}

/// Derive the deposit address and redeem script for one identifier.
pub fn derive_deposit(
    tag: [u8; TAG_LEN],
    collector_pubkey_hash: PubkeyHash,
    network: BtcNetwork,
) -> Result<(String, DepositScript), BtcError> {
    let script = DepositScript::new(tag, collector_pubkey_hash)?;
    let address = script.address(network)?;
    Ok((address.to_string(), script))
}
