use bitcoin::address::{Address, AddressType, NetworkUnchecked};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{NetworkKind, PrivateKey, PubkeyHash, PublicKey};

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// Parse an address string and require it to belong to `network`.
pub fn decode_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse address {address}: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|_| {
            BtcError::InvalidAddress(format!(
                "address {address} is not intended for use on {network}"
            ))
        })
}

/// Decode a P2PKH address on `network` and return the public-key hash it pays to.
///
/// Any other address kind (P2SH, SegWit, Taproot) is rejected with
/// [`BtcError::InvalidAddressKind`], since deposit scripts embed a
/// HASH160 check against exactly this hash.
pub fn decode_p2pkh(address: &str, network: BtcNetwork) -> Result<PubkeyHash, BtcError> {
    let parsed = decode_address(address, network)?;
    if parsed.address_type() != Some(AddressType::P2pkh) {
        return Err(BtcError::InvalidAddressKind(format!(
            "{address} is not a p2pkh address"
        )));
    }
    parsed
        .pubkey_hash()
        .ok_or_else(|| BtcError::InvalidAddressKind(format!("{address} is not a p2pkh address")))
}

/// P2PKH address for a collector key, as shown to operators configuring a generator.
pub fn p2pkh_address(public_key: &PublicKey, network: BtcNetwork) -> String {
    Address::p2pkh(public_key.pubkey_hash(), network.to_bitcoin_network()).to_string()
}

/// Decode a WIF collector key, requiring it to be encoded for `network`.
///
/// The WIF compression flag is ignored: the network alone decides how the
/// public key is serialized.
pub fn collector_key_from_wif(wif: &str, network: BtcNetwork) -> Result<SecretKey, BtcError> {
    let key = PrivateKey::from_wif(wif.trim())
        .map_err(|e| BtcError::InvalidPrivateKey(format!("invalid WIF: {e}")))?;
    if key.network != NetworkKind::from(network.to_bitcoin_network()) {
        return Err(BtcError::InvalidPrivateKey(format!(
            "WIF key is not encoded for {network}"
        )));
    }
    Ok(key.inner)
}

/// The collector's public key as deposit scripts on `network` commit to it.
pub fn collector_public_key(secret: &SecretKey, network: BtcNetwork) -> PublicKey {
    network.public_key(secret.public_key(&Secp256k1::signing_only()))
}
