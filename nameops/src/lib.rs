//! Operation layer of a name-registration protocol embedded in the null-data
//! outputs of Bitcoin-style transactions.
//!
//! Every operation is framed as `magic(2) || opcode(1) || body` and comes with
//! four rules: how to build the payload, how to parse it back from untrusted
//! chain data, how to lay out the outputs around it and how to re-derive the
//! fees an observed transaction paid.

pub mod assembler;
pub mod b40;
pub mod config;
pub mod error;
pub mod fees;
pub mod hashing;
pub mod keys;
pub mod opcode;
pub mod ops;
pub mod record;
pub mod registry;
pub mod script;
pub mod tx;
pub mod wire;

pub use assembler::{Assembled, Assembler, BroadcastOutcome, Broadcaster, InputSource, OperationRequest};
pub use config::{Network, ProtocolConfig, LENGTHS};
pub use error::{AssembleError, BuildError, ConfigError, ParseError};
pub use fees::{FeePolicy, FeeQuote};
pub use keys::{FundingMode, KeyAddress};
pub use opcode::Opcode;
pub use ops::{Announce, NamePreorder, NameUpdate, Operation};
pub use record::OperationRecord;
pub use registry::{Handler, Registry};
pub use tx::{TxInput, TxOutput};
pub use wire::Frame;
