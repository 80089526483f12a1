use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::error::{AssembleError, BuildError};
use crate::hashing::double_sha256;
use crate::keys::KeyAddress;

const TX_VERSION: u32 = 1;
const SEQUENCE_FINAL: u32 = 0xffff_ffff;
const SIGHASH_ALL: u32 = 1;

/// A spendable output handed over by the input source.
///
/// `txid` is kept in display order and reversed on the wire. `script` is the
/// locking script of the output being spent.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    #[serde_as(as = "Hex")]
    pub txid: [u8; 32],
    pub vout: u32,
    pub value: u64,
    #[serde_as(as = "Hex")]
    #[serde(rename = "script_hex")]
    pub script: Vec<u8>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    #[serde_as(as = "Hex")]
    #[serde(rename = "script_hex")]
    pub script: Vec<u8>,
    pub value: u64,
}

impl TxOutput {
    pub fn new(script: Vec<u8>, value: u64) -> Self {
        Self { script, value }
    }
}

/// What is left for the change output once `send_amount` and `fee` are paid.
pub fn calculate_change_amount(inputs: &[TxInput], send_amount: u64, fee: u64) -> Result<u64, BuildError> {
    let total = inputs.iter().fold(0u64, |acc, input| acc.saturating_add(input.value));
    total
        .checked_sub(send_amount)
        .and_then(|rest| rest.checked_sub(fee))
        .ok_or(BuildError::InsufficientFunds {
            total,
            spend: send_amount,
            fee,
        })
}

/// Bitcoin varint encoding.
pub fn write_varint(buffer: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buffer.push(n as u8),
        0xfd..=0xffff => {
            buffer.push(0xfd);
            buffer.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buffer.push(0xfe);
            buffer.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buffer.push(0xff);
            buffer.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_script(buffer: &mut Vec<u8>, script: &[u8]) {
    write_varint(buffer, script.len() as u64);
    buffer.extend_from_slice(script);
}

/// Legacy serialization with one scriptSig per input.
fn serialize_with(inputs: &[TxInput], script_sigs: &[&[u8]], outputs: &[TxOutput]) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&TX_VERSION.to_le_bytes());

    write_varint(&mut buffer, inputs.len() as u64);
    for (input, script_sig) in inputs.iter().zip(script_sigs) {
        let mut txid = input.txid;
        txid.reverse();
        buffer.extend_from_slice(&txid);
        buffer.extend_from_slice(&input.vout.to_le_bytes());
        write_script(&mut buffer, script_sig);
        buffer.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    }

    write_varint(&mut buffer, outputs.len() as u64);
    for output in outputs {
        buffer.extend_from_slice(&output.value.to_le_bytes());
        write_script(&mut buffer, &output.script);
    }

    // lock time
    buffer.extend_from_slice(&0u32.to_le_bytes());
    buffer
}

/// Serializes with empty scriptSigs, ready for another party to sign.
pub fn serialize_unsigned(inputs: &[TxInput], outputs: &[TxOutput]) -> Vec<u8> {
    let empty: Vec<&[u8]> = vec![&[][..]; inputs.len()];
    serialize_with(inputs, &empty, outputs)
}

/// Signs every input with SIGHASH_ALL as a P2PKH spend of `key`.
pub fn sign_and_serialize(inputs: &[TxInput], outputs: &[TxOutput], key: &SigningKey) -> Result<Vec<u8>, AssembleError> {
    let public_key = key.public_key_bytes();
    let mut script_sigs = Vec::with_capacity(inputs.len());

    for index in 0..inputs.len() {
        let subscripts: Vec<&[u8]> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| if i == index { input.script.as_slice() } else { &[][..] })
            .collect();
        let mut preimage = serialize_with(inputs, &subscripts, outputs);
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        let digest = double_sha256(&preimage);

        let signature: Signature = key
            .sign_prehash(&digest)
            .map_err(|e| AssembleError::Signing(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        let der = signature.to_der();

        let mut script_sig = Vec::with_capacity(der.as_bytes().len() + public_key.len() + 3);
        script_sig.push((der.as_bytes().len() + 1) as u8);
        script_sig.extend_from_slice(der.as_bytes());
        script_sig.push(SIGHASH_ALL as u8);
        script_sig.push(public_key.len() as u8);
        script_sig.extend_from_slice(&public_key);
        script_sigs.push(script_sig);
    }

    let script_sigs: Vec<&[u8]> = script_sigs.iter().map(Vec::as_slice).collect();
    Ok(serialize_with(inputs, &script_sigs, outputs))
}

/// Display-order transaction id of a serialized transaction.
pub fn txid(raw: &[u8]) -> String {
    let mut hash = double_sha256(raw);
    hash.reverse();
    hex::encode(hash)
}
