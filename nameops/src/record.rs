use serde::{Deserialize, Serialize};

use crate::opcode::Opcode;

/// A successfully parsed operation. Every field is lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "opcode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationRecord {
    Announce {
        message_hash: String,
    },
    NamePreorder {
        preorder_name_hash: String,
        consensus_hash: String,
    },
    NameUpdate {
        name_hash: String,
        update_hash: String,
    },
}

impl OperationRecord {
    pub fn opcode(&self) -> Opcode {
        match self {
            OperationRecord::Announce { .. } => Opcode::Announce,
            OperationRecord::NamePreorder { .. } => Opcode::NamePreorder,
            OperationRecord::NameUpdate { .. } => Opcode::NameUpdate,
        }
    }

    /// Payload fields in wire order.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            OperationRecord::Announce { message_hash } => vec![message_hash.as_str()],
            OperationRecord::NamePreorder {
                preorder_name_hash,
                consensus_hash,
            } => vec![preorder_name_hash.as_str(), consensus_hash.as_str()],
            OperationRecord::NameUpdate { name_hash, update_hash } => vec![name_hash.as_str(), update_hash.as_str()],
        }
    }

    /// Unique string form used when folding records into a consensus hash:
    /// `<opcode byte>:<field>,<field>...`.
    pub fn canonical_string(&self) -> String {
        format!("{}:{}", self.opcode().byte() as char, self.fields().join(","))
    }
}
