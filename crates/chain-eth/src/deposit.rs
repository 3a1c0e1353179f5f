//! Deposit keys for account-family chains.
//!
//! A deposit key is the 32-byte scalar `identifier || master[16..32]`: the
//! 16-byte identifier becomes the high half, the low half of the master
//! private key the low half. Every deposit key of one master therefore shares
//! its low 128 bits, and only the identifier separates two deposit keys. The
//! layout must not change, or previously issued deposit addresses stop being
//! reproducible.

use alloy_primitives::Address;
use k256::SecretKey;
use zeroize::Zeroizing;

use crate::address::{address_from_secret, checksum_address};
use crate::error::EthError;

/// Length of the identifier spliced into the high half of a deposit key.
pub const TAG_LEN: usize = 16;

/// Length of a secp256k1 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Decode a hex private key (optionally 0x-prefixed) into exactly 32 bytes.
pub fn parse_master_key(hex_key: &str) -> Result<Zeroizing<[u8; PRIVATE_KEY_LEN]>, EthError> {
    let trimmed = hex_key.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = Zeroizing::new(
        hex::decode(stripped).map_err(|e| EthError::InvalidPrivateKey(format!("invalid hex: {e}")))?,
    );
    if bytes.len() != PRIVATE_KEY_LEN {
        return Err(EthError::InvalidPrivateKey(format!(
            "expected {PRIVATE_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// A private key and the account address it controls.
#[derive(Clone)]
pub struct AccountKey {
    secret: SecretKey,
    address: Address,
}

impl AccountKey {
    /// Wrap raw private key bytes, rejecting zero and out-of-range scalars.
    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self, EthError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| EthError::InvalidPrivateKey("scalar out of range".into()))?;
        let address = address_from_secret(&secret);
        Ok(Self { secret, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// EIP-55 form of the account address.
    pub fn checksummed(&self) -> String {
        checksum_address(&self.address)
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("address", &self.checksummed())
            .finish_non_exhaustive()
    }
}

/// Derive the deposit key for `tag` from the master private key.
pub fn derive_deposit_key(
    tag: &[u8; TAG_LEN],
    master: &[u8; PRIVATE_KEY_LEN],
) -> Result<AccountKey, EthError> {
    let mut spliced = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    spliced[..TAG_LEN].copy_from_slice(tag);
    spliced[TAG_LEN..].copy_from_slice(&master[TAG_LEN..]);
    AccountKey::from_bytes(&spliced)
}
