use std::str::FromStr;

use alloy_primitives::Address;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;

use crate::error::EthError;

/// The account address controlled by `secret`.
///
/// Keccak-256 of the 64-byte uncompressed public key (without the 0x04
/// prefix), last 20 bytes.
pub fn address_from_secret(secret: &SecretKey) -> Address {
    let uncompressed = secret.public_key().to_encoded_point(false);
    Address::from_raw_public_key(&uncompressed.as_bytes()[1..])
}

/// Parse a 0x-prefixed address string.
///
/// All-lowercase and all-uppercase addresses carry no checksum and are
/// accepted as-is; mixed-case addresses must satisfy EIP-55.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let normalized = format!("0x{hex_part}");
        return Address::parse_checksummed(&normalized, None)
            .map_err(|e| EthError::InvalidAddress(format!("{address}: {e}")));
    }

    Address::from_str(hex_part).map_err(|e| EthError::InvalidAddress(format!("{address}: {e}")))
}

/// EIP-55 mixed-case form of `address`.
pub fn checksum_address(address: &Address) -> String {
    address.to_checksum(None)
}
