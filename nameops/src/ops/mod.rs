//! The per-opcode codecs.
//!
//! Every operation answers the same four questions: how to build its payload
//! from trusted fields, how to parse a body observed on chain, how to lay out
//! the outputs around a payload and which fees an observed output list
//! implies.

mod announce;
mod preorder;
mod update;

pub use announce::{Announce, AnnounceFields};
pub use preorder::{NamePreorder, PreorderFields};
pub use update::{update_sanity_test, NameUpdate, UpdateFields, NAME_RECORD_FIELDS};

use crate::config::ProtocolConfig;
use crate::error::{BuildError, ParseError};
use crate::fees::{self, FeePolicy, FeeQuote};
use crate::opcode::Opcode;
use crate::record::OperationRecord;
use crate::script;
use crate::tx::{calculate_change_amount, TxInput, TxOutput};
use crate::wire;

pub trait Operation {
    /// Semantic fields accepted by [`Operation::build`].
    type Fields;

    const OPCODE: Opcode;

    /// Consensus fields of the record this operation produces, in the order
    /// they are hashed. Never reorder.
    const FIELDS: &'static [&'static str];

    /// Body layout after the frame header, in wire order.
    const LENGTHS: &'static [(&'static str, usize)];

    fn body_len() -> usize {
        Self::LENGTHS.iter().map(|(_, len)| len).sum()
    }

    /// Builds the framed null-data payload.
    fn build(config: &ProtocolConfig, fields: &Self::Fields) -> Result<Vec<u8>, BuildError>;

    /// Parses a body with the frame header already stripped. Total over all
    /// inputs.
    fn parse(body: &[u8]) -> Result<OperationRecord, ParseError>;

    fn make_outputs(
        config: &ProtocolConfig,
        payload: &[u8],
        inputs: &[TxInput],
        change_address: &str,
        policy: FeePolicy,
    ) -> Result<Vec<TxOutput>, BuildError>;

    /// Validates the shape of an observed output list and returns the fees it
    /// implies, or `None` when it does not conform.
    fn get_fees(config: &ProtocolConfig, inputs_count: usize, outputs: &[TxOutput]) -> Option<FeeQuote>;
}

pub(crate) fn check_hex_field(field: &'static str, value: &str, bytes: usize) -> Result<(), BuildError> {
    if value.len() != 2 * bytes || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BuildError::InvalidHash {
            field,
            value: value.to_string(),
            expected: bytes,
        });
    }
    Ok(())
}

pub(crate) fn check_body_len<O: Operation>(body: &[u8]) -> Result<(), ParseError> {
    let expected = O::body_len();
    if body.len() != expected {
        return Err(ParseError::BadLength {
            opcode: O::OPCODE,
            expected,
            actual: body.len(),
        });
    }
    Ok(())
}

/// Splits a length-checked body into hex fields following `O::LENGTHS`.
pub(crate) fn hex_fields<O: Operation>(body: &[u8]) -> Vec<String> {
    let mut rest = body;
    O::LENGTHS
        .iter()
        .map(|(_, len)| {
            let (field, tail) = rest.split_at(*len);
            rest = tail;
            hex::encode(field)
        })
        .collect()
}

/// Readable script (`OPCODE 0x.. 0x..`) to framed payload.
pub(crate) fn frame_readable(config: &ProtocolConfig, readable: &str) -> Result<Vec<u8>, BuildError> {
    let hex_script = wire::script_to_hex(readable)?;
    wire::add_magic_bytes(config, &hex_script)
}

/// `[null-data, change]`, shared by the operations that burn nothing.
pub(crate) fn change_outputs(
    config: &ProtocolConfig,
    payload: &[u8],
    inputs: &[TxInput],
    change_address: &str,
    policy: FeePolicy,
) -> Result<Vec<TxOutput>, BuildError> {
    let dust_fee = if policy.pay_fee {
        fees::dust_fee(config, inputs.len(), 1)
    } else {
        0
    };

    Ok(vec![
        TxOutput::new(script::make_op_return_script(payload)?, 0),
        TxOutput::new(
            script::make_pay_to_address_script(config, change_address)?,
            calculate_change_amount(inputs, 0, dust_fee)?,
        ),
    ])
}
