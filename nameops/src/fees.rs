use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::keys::FundingMode;
use crate::script;
use crate::tx::TxOutput;

/// Dust and operation fees implied by a conforming output list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub dust_fee: u64,
    pub op_fee: u64,
}

/// How `make_outputs` should charge a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub pay_fee: bool,
    /// Operation fee requested by the caller; only NAME_PREORDER burns it.
    pub fee: u64,
}

impl FeePolicy {
    pub const fn paid() -> Self {
        Self { pay_fee: true, fee: 0 }
    }

    pub const fn subsidized() -> Self {
        Self { pay_fee: false, fee: 0 }
    }

    pub const fn with_fee(self, fee: u64) -> Self {
        Self { fee, ..self }
    }

    pub fn for_funding(funding: &FundingMode) -> Self {
        Self {
            pay_fee: funding.pays_fee(),
            fee: 0,
        }
    }
}

/// `(inputs + outputs) * dust + op_return`, where `outputs` counts the
/// non-null-data outputs of the layout.
pub fn dust_fee(config: &ProtocolConfig, inputs_count: usize, outputs: u64) -> u64 {
    (inputs_count as u64)
        .saturating_add(outputs)
        .saturating_mul(config.dust_fee)
        .saturating_add(config.op_return_fee)
}

/// Output 0 must carry the payload and no value.
pub fn is_nulldata_output(outputs: &[TxOutput]) -> bool {
    let Some(output) = outputs.first() else {
        return false;
    };
    if !script::is_op_return(&output.script) {
        debug!("outputs[0] is not an OP_RETURN");
        return false;
    }
    if output.value != 0 {
        debug!("outputs[0] has value {}", output.value);
        return false;
    }
    true
}

/// The output at `index` must pay a decodable address.
pub fn output_address(config: &ProtocolConfig, outputs: &[TxOutput], index: usize) -> Option<String> {
    let address = outputs
        .get(index)
        .and_then(|output| script::script_to_address(config, &output.script));
    if address.is_none() {
        debug!("outputs[{}] has no decipherable address", index);
    }
    address
}

/// Shape check shared by the two-output layouts: `[null-data, change]`.
pub fn check_change_layout(config: &ProtocolConfig, inputs_count: usize, outputs: &[TxOutput]) -> Option<FeeQuote> {
    if outputs.len() != 2 {
        debug!("Expected 2 outputs; got {}", outputs.len());
        return None;
    }
    if !is_nulldata_output(outputs) {
        return None;
    }
    output_address(config, outputs, 1)?;
    Some(FeeQuote {
        dust_fee: dust_fee(config, inputs_count, 1),
        op_fee: 0,
    })
}
