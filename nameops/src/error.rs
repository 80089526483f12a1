use thiserror::Error;

use crate::opcode::Opcode;

/// Malformed input handed to a build step by a trusted caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid {field} '{value}': not {expected} bytes of hex")]
    InvalidHash {
        field: &'static str,
        value: String,
        expected: usize,
    },

    #[error("name '{0}' has non-base-38 characters")]
    InvalidName(String),

    #[error("name '{name}' is too long; exceeds {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error("invalid readable script: {0}")]
    InvalidScript(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("payload of {0} bytes does not fit in a null-data output")]
    PayloadTooLarge(usize),

    #[error("not enough inputs for transaction (total: {total}, to spend: {spend}, fee: {fee})")]
    InsufficientFunds { total: u64, spend: u64, fee: u64 },
}

/// Chain data that does not have the shape of a known operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("buffer of {0} bytes is too short for a frame")]
    TooShort(usize),

    #[error("bad magic bytes {0:02x?}")]
    BadMagic([u8; 2]),

    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("invalid {opcode} body length: expected {expected}, got {actual}")]
    BadLength {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    #[error("invalid {opcode} field {field}")]
    InvalidField { opcode: Opcode, field: &'static str },

    #[error("output 0 is not a null-data output")]
    NotNulldata,
}

/// Failures surfaced to the operator by the state-transition assembler.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("missing both public and private key")]
    MissingKeys,

    #[error("need private key for broadcasting when not in subsidized mode")]
    PrivateKeyRequired,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("name '{0}' has no namespace")]
    MissingNamespace(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("input source: {0}")]
    InputSource(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("burn address '{0}' does not decode on the configured network")]
    InvalidBurnAddress(String),

    #[error("max name length {max} does not leave room for scheme '{scheme}'")]
    InvalidNameLength { scheme: String, max: usize },
}
