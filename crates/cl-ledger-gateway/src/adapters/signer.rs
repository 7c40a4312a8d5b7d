//! Signing identity derived from a secp256k1 private key.
//!
//! Only the account address is kept. Transactions are sent from
//! node-managed accounts, so the key itself is discarded after derivation.

use crate::abi::keccak256;
use crate::domain::{LedgerError, LedgerResult};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use shared_types::Address;

/// Account the gateway acts as when no explicit sender is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignerIdentity {
    address: Address,
}

impl SignerIdentity {
    /// Derive the account address from a hex private key.
    pub fn from_private_key(credential: &str) -> LedgerResult<Self> {
        let digits = credential.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits)
            .map_err(|_| LedgerError::SignerUnavailable("credential is not hex".into()))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| LedgerError::SignerUnavailable("invalid secp256k1 key".into()))?;

        let public = PublicKey::from(key.verifying_key());
        let point = public.to_encoded_point(false);
        // Uncompressed SEC1 point: 0x04 || X || Y
        let hash = keccak256(&point.as_bytes()[1..]);
        let address = Address::from_slice(&hash[12..])
            .ok_or_else(|| LedgerError::SignerUnavailable("address derivation failed".into()))?;

        Ok(Self { address })
    }

    /// Identity for a known account (no key material).
    #[must_use]
    pub fn from_address(address: Address) -> Self {
        Self { address }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }
}
