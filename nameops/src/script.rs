//! Output scripts: null-data carriers, pay-to-address scripts and the
//! base58check addresses they correspond to.

use crate::config::ProtocolConfig;
use crate::error::BuildError;

pub const OP_RETURN: u8 = 0x6a;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;

/// Largest payload relayed in a standard null-data output.
pub const MAX_NULLDATA_SIZE: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    PubkeyHash,
    ScriptHash,
}

/// `OP_RETURN <push data>` with minimal push encoding.
pub fn make_op_return_script(data: &[u8]) -> Result<Vec<u8>, BuildError> {
    if data.len() > MAX_NULLDATA_SIZE {
        return Err(BuildError::PayloadTooLarge(data.len()));
    }
    let mut script = Vec::with_capacity(3 + data.len());
    script.push(OP_RETURN);
    if data.len() > 0x4b {
        script.push(OP_PUSHDATA1);
    }
    script.push(data.len() as u8);
    script.extend_from_slice(data);
    Ok(script)
}

pub fn is_op_return(script: &[u8]) -> bool {
    script.first() == Some(&OP_RETURN)
}

/// Data carried by a single-push null-data script.
pub fn op_return_data(script: &[u8]) -> Option<&[u8]> {
    let rest = script.strip_prefix(&[OP_RETURN])?;
    let (&first, rest) = rest.split_first()?;
    let (len, data) = match first {
        0x01..=0x4b => (first as usize, rest),
        OP_PUSHDATA1 => {
            let (&len, data) = rest.split_first()?;
            (len as usize, data)
        }
        _ => return None,
    };
    (data.len() == len).then_some(data)
}

pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, 20]);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

pub fn address_from_hash160(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// Decodes a base58check address of the configured network.
pub fn decode_address(config: &ProtocolConfig, address: &str) -> Option<(AddressKind, [u8; 20])> {
    let payload = bs58::decode(address).with_check(None).into_vec().ok()?;
    let (&version, hash) = payload.split_first()?;
    let hash: [u8; 20] = hash.try_into().ok()?;
    if version == config.network.p2pkh_version() {
        Some((AddressKind::PubkeyHash, hash))
    } else if version == config.network.p2sh_version() {
        Some((AddressKind::ScriptHash, hash))
    } else {
        None
    }
}

pub fn make_pay_to_address_script(config: &ProtocolConfig, address: &str) -> Result<Vec<u8>, BuildError> {
    match decode_address(config, address) {
        Some((AddressKind::PubkeyHash, hash)) => Ok(p2pkh_script(&hash)),
        Some((AddressKind::ScriptHash, hash)) => Ok(p2sh_script(&hash)),
        None => Err(BuildError::InvalidAddress(address.to_string())),
    }
}

/// Address paid by a P2PKH or P2SH script; `None` for anything else.
pub fn script_to_address(config: &ProtocolConfig, script: &[u8]) -> Option<String> {
    match script {
        [OP_DUP, OP_HASH160, 20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            let hash: [u8; 20] = hash.try_into().ok()?;
            Some(address_from_hash160(config.network.p2pkh_version(), &hash))
        }
        [OP_HASH160, 20, hash @ .., OP_EQUAL] if hash.len() == 20 => {
            let hash: [u8; 20] = hash.try_into().ok()?;
            Some(address_from_hash160(config.network.p2sh_version(), &hash))
        }
        _ => None,
    }
}
