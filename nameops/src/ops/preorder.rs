use log::debug;

use crate::b40;
use crate::config::{ProtocolConfig, LENGTHS};
use crate::error::{BuildError, ParseError};
use crate::fees::{self, FeePolicy, FeeQuote};
use crate::hashing;
use crate::opcode::Opcode;
use crate::record::OperationRecord;
use crate::script;
use crate::tx::{calculate_change_amount, TxInput, TxOutput};

use super::{check_body_len, check_hex_field, frame_readable, hex_fields, Operation};

/// Commits to a name without revealing it.
///
/// ```text
/// 0     2  3                                              23             39
/// |-----|--|----------------------------------------------|--------------|
/// magic op  hash(name.ns_id,script_pubkey,register_addr)   consensus hash
/// ```
pub struct NamePreorder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreorderFields {
    /// Fully-qualified name without the scheme, e.g. `bob.id`.
    pub name: String,
    /// Script of the principal that will register the name.
    pub script_pubkey: Vec<u8>,
    pub register_addr: Option<String>,
    pub consensus_hash: String,
    /// Precomputed commitment; when set, `name`, `script_pubkey` and
    /// `register_addr` are not inspected.
    pub name_hash: Option<String>,
}

impl Operation for NamePreorder {
    type Fields = PreorderFields;

    const OPCODE: Opcode = Opcode::NamePreorder;
    const FIELDS: &'static [&'static str] = &[
        "preorder_name_hash",
        "consensus_hash",
        "sender",
        "sender_pubkey",
        "address",
        "block_number",
        "op",
        "txid",
        "vtxindex",
        "op_fee",
    ];
    const LENGTHS: &'static [(&'static str, usize)] = &[
        ("preorder_name_hash", LENGTHS.preorder_name_hash),
        ("consensus_hash", LENGTHS.consensus_hash),
    ];

    fn build(config: &ProtocolConfig, fields: &PreorderFields) -> Result<Vec<u8>, BuildError> {
        let name_hash = match &fields.name_hash {
            Some(name_hash) => {
                check_hex_field("preorder name hash", name_hash, LENGTHS.preorder_name_hash)?;
                name_hash.clone()
            }
            None => {
                b40::check_name(config, &fields.name)?;
                let hash = hashing::hash_name(&fields.name, &fields.script_pubkey, fields.register_addr.as_deref())?;
                hex::encode(hash)
            }
        };
        check_hex_field("consensus hash", &fields.consensus_hash, LENGTHS.consensus_hash)?;

        frame_readable(
            config,
            &format!("NAME_PREORDER 0x{} 0x{}", name_hash, fields.consensus_hash),
        )
    }

    fn parse(body: &[u8]) -> Result<OperationRecord, ParseError> {
        check_body_len::<Self>(body)?;
        let mut fields = hex_fields::<Self>(body).into_iter();
        match (fields.next(), fields.next()) {
            (Some(preorder_name_hash), Some(consensus_hash)) => Ok(OperationRecord::NamePreorder {
                preorder_name_hash,
                consensus_hash,
            }),
            _ => Err(ParseError::InvalidField {
                opcode: Self::OPCODE,
                field: "consensus_hash",
            }),
        }
    }

    /// `[null-data, change, burn]`. The burn output always carries at least
    /// one dust unit; a subsidized request skips the dust reservation only.
    fn make_outputs(
        config: &ProtocolConfig,
        payload: &[u8],
        inputs: &[TxInput],
        change_address: &str,
        policy: FeePolicy,
    ) -> Result<Vec<TxOutput>, BuildError> {
        let op_fee = policy.fee.max(config.dust_fee);
        let dust_fee = if policy.pay_fee {
            fees::dust_fee(config, inputs.len(), 2)
        } else {
            0
        };

        Ok(vec![
            TxOutput::new(script::make_op_return_script(payload)?, 0),
            TxOutput::new(
                script::make_pay_to_address_script(config, change_address)?,
                calculate_change_amount(inputs, op_fee, dust_fee)?,
            ),
            TxOutput::new(
                script::make_pay_to_address_script(config, &config.burn_address)?,
                op_fee,
            ),
        ])
    }

    fn get_fees(config: &ProtocolConfig, inputs_count: usize, outputs: &[TxOutput]) -> Option<FeeQuote> {
        if outputs.len() != 3 {
            debug!("Expected 3 outputs; got {}", outputs.len());
            return None;
        }
        if !fees::is_nulldata_output(outputs) {
            return None;
        }
        fees::output_address(config, outputs, 1)?;

        let burn = fees::output_address(config, outputs, 2)?;
        if burn != config.burn_address {
            debug!("outputs[2] pays {} instead of the burn address", burn);
            return None;
        }

        Some(FeeQuote {
            dust_fee: fees::dust_fee(config, inputs_count, 2),
            op_fee: outputs[2].value,
        })
    }
}
