use core::fmt;
use std::collections::BTreeMap;

use log::debug;

use crate::config::ProtocolConfig;
use crate::error::ParseError;
use crate::fees::FeeQuote;
use crate::opcode::Opcode;
use crate::ops::{Announce, NamePreorder, NameUpdate, Operation};
use crate::record::OperationRecord;
use crate::script;
use crate::tx::TxOutput;
use crate::wire::Frame;

type ParseFn = fn(&[u8]) -> Result<OperationRecord, ParseError>;
type FeesFn = fn(&ProtocolConfig, usize, &[TxOutput]) -> Option<FeeQuote>;

/// The chain-facing half of an [`Operation`], erased so it can be looked up
/// by opcode byte.
#[derive(Clone, Copy)]
pub struct Handler {
    pub opcode: Opcode,
    pub fields: &'static [&'static str],
    pub lengths: &'static [(&'static str, usize)],
    pub parse: ParseFn,
    pub get_fees: FeesFn,
}

impl Handler {
    pub fn of<O: Operation>() -> Self {
        Handler {
            opcode: O::OPCODE,
            fields: O::FIELDS,
            lengths: O::LENGTHS,
            parse: O::parse,
            get_fees: O::get_fees,
        }
    }

    pub fn body_len(&self) -> usize {
        self.lengths.iter().map(|(_, len)| len).sum()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Handler")
            .field("opcode", &self.opcode)
            .field("lengths", &self.lengths)
            .finish_non_exhaustive()
    }
}

/// Opcode byte to handler. Immutable once built, so one registry can serve
/// any number of replay threads.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handlers: BTreeMap<u8, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation this crate implements.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Handler::of::<Announce>());
        registry.register(Handler::of::<NamePreorder>());
        registry.register(Handler::of::<NameUpdate>());
        registry
    }

    /// Adds a handler, returning the one it replaced.
    pub fn register(&mut self, handler: Handler) -> Option<Handler> {
        self.handlers.insert(handler.opcode.byte(), handler)
    }

    pub fn get(&self, opcode: u8) -> Option<&Handler> {
        self.handlers.get(&opcode)
    }

    pub fn opcodes(&self) -> impl Iterator<Item = Opcode> + '_ {
        self.handlers.values().map(|handler| handler.opcode)
    }

    /// Parses a framed null-data payload.
    pub fn parse_nulldata(&self, config: &ProtocolConfig, nulldata: &[u8]) -> Result<OperationRecord, ParseError> {
        let frame = Frame::new(config, nulldata)?;
        let handler = self
            .get(frame.opcode_byte())
            .ok_or(ParseError::UnknownOpcode(frame.opcode_byte()))?;
        (handler.parse)(frame.body())
    }

    /// Parses `nulldata` and, only if that succeeds, validates the fees of the
    /// transaction carrying it.
    pub fn check(
        &self,
        config: &ProtocolConfig,
        nulldata: &[u8],
        inputs_count: usize,
        outputs: &[TxOutput],
    ) -> Option<(OperationRecord, FeeQuote)> {
        let record = match self.parse_nulldata(config, nulldata) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping candidate: {}", e);
                return None;
            }
        };
        let handler = self.get(record.opcode().byte())?;
        let quote = (handler.get_fees)(config, inputs_count, outputs)?;
        Some((record, quote))
    }

    /// Like [`Registry::check`], reading the payload from output 0.
    pub fn check_outputs(
        &self,
        config: &ProtocolConfig,
        inputs_count: usize,
        outputs: &[TxOutput],
    ) -> Option<(OperationRecord, FeeQuote)> {
        let nulldata = outputs
            .first()
            .and_then(|output| script::op_return_data(&output.script));
        let Some(nulldata) = nulldata else {
            debug!("Skipping candidate: {}", ParseError::NotNulldata);
            return None;
        };
        self.check(config, nulldata, inputs_count, outputs)
    }
}
