//! secp256k1 signer recovery

use crate::{keccak256, CryptoError};
use fugue_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Recover the signing address of `hash` from an `(v, r, s)` triple.
///
/// `v` is accepted both as a raw recovery id (0/1) and in the 27/28 form.
pub fn ecrecover(hash: &H256, v: u8, r: &[u8; 32], s: &[u8; 32]) -> Result<Address, CryptoError> {
    let id = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(id).ok_or(CryptoError::InvalidRecoveryId(v))?;

    let signature = Signature::from_scalars(k256::FieldBytes::from(*r), k256::FieldBytes::from(*s))
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(public_key_to_address(&key))
}

/// Derive an account address from an uncompressed public key.
pub fn public_key_to_address(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 tag byte
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}
