use crate::config::{ProtocolConfig, LENGTHS};
use crate::error::{BuildError, ParseError};
use crate::fees::{self, FeePolicy, FeeQuote};
use crate::opcode::Opcode;
use crate::record::OperationRecord;
use crate::tx::{TxInput, TxOutput};

use super::{change_outputs, check_body_len, check_hex_field, frame_readable, Operation};

/// Publishes the hash of an out-of-band message.
///
/// ```text
/// 0     2  3                             23
/// |-----|--|-----------------------------|
/// magic op   message hash (160-bit)
/// ```
pub struct Announce;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceFields {
    pub message_hash: String,
}

impl Operation for Announce {
    type Fields = AnnounceFields;

    const OPCODE: Opcode = Opcode::Announce;
    const FIELDS: &'static [&'static str] = &[];
    const LENGTHS: &'static [(&'static str, usize)] = &[("message_hash", LENGTHS.message_hash)];

    fn build(config: &ProtocolConfig, fields: &AnnounceFields) -> Result<Vec<u8>, BuildError> {
        check_hex_field("message hash", &fields.message_hash, LENGTHS.message_hash)?;
        frame_readable(config, &format!("ANNOUNCE 0x{}", fields.message_hash))
    }

    fn parse(body: &[u8]) -> Result<OperationRecord, ParseError> {
        check_body_len::<Self>(body)?;
        Ok(OperationRecord::Announce {
            message_hash: hex::encode(body),
        })
    }

    fn make_outputs(
        config: &ProtocolConfig,
        payload: &[u8],
        inputs: &[TxInput],
        change_address: &str,
        policy: FeePolicy,
    ) -> Result<Vec<TxOutput>, BuildError> {
        change_outputs(config, payload, inputs, change_address, policy)
    }

    fn get_fees(config: &ProtocolConfig, inputs_count: usize, outputs: &[TxOutput]) -> Option<FeeQuote> {
        fees::check_change_layout(config, inputs_count, outputs)
    }
}
