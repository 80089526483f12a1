use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::b40;
use crate::error::BuildError;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data)), the hash behind addresses and name commitments.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    hasher.finalize().into()
}

/// First 16 bytes of the double SHA256 of `data`.
pub fn hash256_trunc128(data: &[u8]) -> [u8; 16] {
    let digest = double_sha256(data);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// Commitment hidden in a NAME_PREORDER:
/// `hash160(b40_to_bin(name) || script_pubkey || register_addr)`.
pub fn hash_name(name: &str, script_pubkey: &[u8], register_addr: Option<&str>) -> Result<[u8; 20], BuildError> {
    let mut data = b40::b40_to_bin(name)?;
    data.extend_from_slice(script_pubkey);
    if let Some(addr) = register_addr {
        data.extend_from_slice(addr.as_bytes());
    }
    Ok(hash160(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
        assert_eq!(
            hex::encode(double_sha256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        assert_eq!(hex::encode(hash256_trunc128(b"")), "5df6e0e2761359d30a8275058e299fcc");
    }

    #[test]
    fn register_address_changes_commitment() {
        let script = [0x76, 0xa9];
        let bare = hash_name("bob.id", &script, None).unwrap();
        let bound = hash_name("bob.id", &script, Some("1BoatSLRHtKNngkdXEeobR76b53LETtpyT")).unwrap();
        assert_ne!(bare, bound);
        assert_eq!(bare, hash_name("bob.id", &script, None).unwrap());
    }

    #[test]
    fn rejects_name_outside_alphabet() {
        assert!(hash_name("Bob.id", &[], None).is_err());
    }
}
