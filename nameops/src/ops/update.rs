use log::debug;

use crate::b40;
use crate::config::{ProtocolConfig, LENGTHS};
use crate::error::{BuildError, ParseError};
use crate::fees::{self, FeePolicy, FeeQuote};
use crate::hashing;
use crate::opcode::Opcode;
use crate::record::OperationRecord;
use crate::tx::{TxInput, TxOutput};

use super::{change_outputs, check_body_len, check_hex_field, frame_readable, hex_fields, Operation};

/// Name-record fields in consensus order, followed by any operation-specific ones.
macro_rules! name_record_fields {
    ($($extra:literal),*) => {
        &[
            "name",
            "value_hash",
            "sender",
            "sender_pubkey",
            "address",
            "block_number",
            "preorder_block_number",
            "first_registered",
            "last_renewed",
            "revoked",
            "op",
            "txid",
            "vtxindex",
            "op_fee",
            "importer",
            "importer_address",
            $($extra,)*
        ]
    };
}

/// Fields of a name record kept by the name-state machine. NAME_UPDATE's
/// consensus fields extend this list.
pub const NAME_RECORD_FIELDS: &[&str] = name_record_fields!();

/// Points a name at new data.
///
/// ```text
/// 0     2  3                                   19                      39
/// |-----|--|-----------------------------------|-----------------------|
/// magic op  hash128(name.ns_id,consensus hash) hash160(data)
/// ```
pub struct NameUpdate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFields {
    pub name: String,
    pub consensus_hash: String,
    pub data_hash: String,
}

/// Checks the parts of an update that both the builder and the parser see.
pub fn update_sanity_test(config: &ProtocolConfig, name: Option<&str>, data_hash: &str) -> Result<(), BuildError> {
    if let Some(name) = name {
        b40::check_name(config, name)?;
    }
    check_hex_field("data hash", data_hash, LENGTHS.update_hash)
}

impl Operation for NameUpdate {
    type Fields = UpdateFields;

    const OPCODE: Opcode = Opcode::NameUpdate;
    const FIELDS: &'static [&'static str] = name_record_fields!("name_hash", "consensus_hash");
    const LENGTHS: &'static [(&'static str, usize)] = &[
        ("name_hash", LENGTHS.name_hash),
        ("update_hash", LENGTHS.update_hash),
    ];

    fn build(config: &ProtocolConfig, fields: &UpdateFields) -> Result<Vec<u8>, BuildError> {
        update_sanity_test(config, Some(&fields.name), &fields.data_hash)?;
        check_hex_field("consensus hash", &fields.consensus_hash, LENGTHS.consensus_hash)?;

        let name_hash = hashing::hash256_trunc128(format!("{}{}", fields.name, fields.consensus_hash).as_bytes());
        frame_readable(
            config,
            &format!("NAME_UPDATE 0x{} 0x{}", hex::encode(name_hash), fields.data_hash),
        )
    }

    fn parse(body: &[u8]) -> Result<OperationRecord, ParseError> {
        check_body_len::<Self>(body)?;
        let mut fields = hex_fields::<Self>(body).into_iter();
        let (Some(name_hash), Some(update_hash)) = (fields.next(), fields.next()) else {
            return Err(ParseError::InvalidField {
                opcode: Self::OPCODE,
                field: "update_hash",
            });
        };

        if let Err(e) = check_hex_field("data hash", &update_hash, LENGTHS.update_hash) {
            debug!("Invalid update data: {}", e);
            return Err(ParseError::InvalidField {
                opcode: Self::OPCODE,
                field: "update_hash",
            });
        }

        Ok(OperationRecord::NameUpdate { name_hash, update_hash })
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
