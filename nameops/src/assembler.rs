//! Wallet-side assembly of an operation into an unsigned or broadcast
//! transaction.
//!
//! A request moves through `validate -> resolve key -> select inputs ->
//! build payload -> lay out outputs`, then either stops with an unsigned
//! transaction or is signed and handed to a [`Broadcaster`]. Nothing here
//! retries; that is the broadcaster's business.

use log::{debug, info};
use serde::Serialize;

use crate::b40;
use crate::config::{ProtocolConfig, LENGTHS};
use crate::error::{AssembleError, BuildError};
use crate::fees::FeePolicy;
use crate::keys::FundingMode;
use crate::opcode::Opcode;
use crate::ops::{
    check_hex_field, update_sanity_test, Announce, AnnounceFields, NamePreorder, NameUpdate, Operation,
    PreorderFields, UpdateFields,
};
use crate::tx::{self, TxInput, TxOutput};

/// Spendable outputs for an address.
pub trait InputSource {
    fn get_spendable_inputs(&self, address: &str) -> Result<Vec<TxInput>, AssembleError>;
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn get_spendable_inputs(&self, address: &str) -> Result<Vec<TxInput>, AssembleError> {
        (**self).get_spendable_inputs(address)
    }
}

/// Relays a signed transaction and returns its txid.
pub trait Broadcaster {
    fn broadcast(&self, signed_tx: &[u8]) -> Result<String, AssembleError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Announce {
        message_hash: String,
    },
    Preorder {
        name: String,
        register_addr: Option<String>,
        consensus_hash: String,
        fee: u64,
    },
    Update {
        name: String,
        data_hash: String,
        consensus_hash: String,
    },
}

impl OperationRequest {
    pub fn opcode(&self) -> Opcode {
        match self {
            OperationRequest::Announce { .. } => Opcode::Announce,
            OperationRequest::Preorder { .. } => Opcode::NamePreorder,
            OperationRequest::Update { .. } => Opcode::NameUpdate,
        }
    }

    fn validate(&self, config: &ProtocolConfig) -> Result<(), AssembleError> {
        match self {
            OperationRequest::Announce { message_hash } => {
                check_hex_field("message hash", message_hash, LENGTHS.message_hash)?;
            }
            OperationRequest::Preorder { name, consensus_hash, .. } => {
                require_namespace(name)?;
                b40::check_name(config, name)?;
                check_hex_field("consensus hash", consensus_hash, LENGTHS.consensus_hash)?;
            }
            OperationRequest::Update {
                name,
                data_hash,
                consensus_hash,
            } => {
                require_namespace(name)?;
                update_sanity_test(config, Some(name), data_hash)?;
                check_hex_field("consensus hash", consensus_hash, LENGTHS.consensus_hash)?;
            }
        }
        Ok(())
    }
}

/// Names only resolve to the base chain once they carry a namespace.
fn require_namespace(name: &str) -> Result<(), AssembleError> {
    match b40::namespace_from_name(name) {
        Some(_) => Ok(()),
        None => Err(AssembleError::MissingNamespace(name.to_string())),
    }
}

/// An unsigned transaction and the payload it embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub nulldata: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BroadcastOutcome {
    Unsigned { unsigned_tx: String },
    Receipt { txid: String, data: String },
}

pub struct Assembler<'a, S> {
    config: &'a ProtocolConfig,
    source: S,
}

impl<'a, S: InputSource> Assembler<'a, S> {
    pub fn new(config: &'a ProtocolConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn assemble(&self, request: &OperationRequest, funding: &FundingMode) -> Result<Assembled, AssembleError> {
        request.validate(self.config)?;

        let from_address = funding.address(self.config);
        debug!("{} funded by {} ({:?})", request.opcode(), from_address, funding);

        let inputs = self.source.get_spendable_inputs(&from_address)?;
        debug!("{} spendable inputs for {}", inputs.len(), from_address);

        let policy = FeePolicy::for_funding(funding);
        let (nulldata, outputs) = match request {
            OperationRequest::Announce { message_hash } => self.lay_out::<Announce>(
                &AnnounceFields {
                    message_hash: message_hash.clone(),
                },
                &inputs,
                &from_address,
                policy,
            )?,
            OperationRequest::Preorder {
                name,
                register_addr,
                consensus_hash,
                fee,
            } => self.lay_out::<NamePreorder>(
                &PreorderFields {
                    name: name.clone(),
                    script_pubkey: funding.script_pubkey(),
                    register_addr: register_addr.clone(),
                    consensus_hash: consensus_hash.clone(),
                    name_hash: None,
                },
                &inputs,
                &from_address,
                policy.with_fee(*fee),
            )?,
            OperationRequest::Update {
                name,
                data_hash,
                consensus_hash,
            } => self.lay_out::<NameUpdate>(
                &UpdateFields {
                    name: name.clone(),
                    consensus_hash: consensus_hash.clone(),
                    data_hash: data_hash.clone(),
                },
                &inputs,
                &from_address,
                policy,
            )?,
        };

        Ok(Assembled {
            inputs,
            outputs,
            nulldata,
        })
    }

    fn lay_out<O: Operation>(
        &self,
        fields: &O::Fields,
        inputs: &[TxInput],
        change_address: &str,
        policy: FeePolicy,
    ) -> Result<(Vec<u8>, Vec<TxOutput>), BuildError> {
        let nulldata = O::build(self.config, fields)?;
        let outputs = O::make_outputs(self.config, &nulldata, inputs, change_address, policy)?;
        Ok((nulldata, outputs))
    }

    /// Assembles `request` and either returns it unsigned or signs and
    /// broadcasts it. Subsidized requests are always returned unsigned.
    pub fn broadcast<B: Broadcaster + ?Sized>(
        &self,
        request: &OperationRequest,
        funding: &FundingMode,
        broadcaster: &B,
        tx_only: bool,
    ) -> Result<BroadcastOutcome, AssembleError> {
        let tx_only = tx_only || !funding.pays_fee();
        let signing_key = match (tx_only, funding.signing_key()) {
            (true, _) => None,
            (false, Some(key)) => Some(key),
            (false, None) => return Err(AssembleError::PrivateKeyRequired),
        };

        let assembled = self.assemble(request, funding)?;

        let Some(signing_key) = signing_key else {
            let unsigned_tx = tx::serialize_unsigned(&assembled.inputs, &assembled.outputs);
            info!("Assembled unsigned {} ({} bytes)", request.opcode(), unsigned_tx.len());
            return Ok(BroadcastOutcome::Unsigned {
                unsigned_tx: hex::encode(unsigned_tx),
            });
        };

        let signed_tx = tx::sign_and_serialize(&assembled.inputs, &assembled.outputs, signing_key)?;
        let txid = broadcaster.broadcast(&signed_tx)?;
        info!("Broadcast {} as {}", request.opcode(), txid);

        Ok(BroadcastOutcome::Receipt {
            txid,
            data: hex::encode(&assembled.nulldata),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use k256::ecdsa::SigningKey;

    use super::*;
    use crate::fees::FeeQuote;
    use crate::hashing;
    use crate::registry::Registry;
    use crate::script;

    struct FixedInputs {
        values: Vec<u64>,
        requested: RefCell<Vec<String>>,
    }

    impl FixedInputs {
        fn new(values: &[u64]) -> Self {
            Self {
                values: values.to_vec(),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl InputSource for FixedInputs {
        fn get_spendable_inputs(&self, address: &str) -> Result<Vec<TxInput>, AssembleError> {
            self.requested.borrow_mut().push(address.to_string());
            Ok(self
                .values
                .iter()
                .enumerate()
                .map(|(i, value)| TxInput {
                    txid: [i as u8 + 1; 32],
                    vout: i as u32,
                    value: *value,
                    script: script::p2pkh_script(&[0u8; 20]),
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingBroadcaster {
        calls: Cell<usize>,
    }

    impl Broadcaster for CountingBroadcaster {
        fn broadcast(&self, signed_tx: &[u8]) -> Result<String, AssembleError> {
            self.calls.set(self.calls.get() + 1);
            Ok(tx::txid(signed_tx))
        }
    }

    struct FailingBroadcaster;

    impl Broadcaster for FailingBroadcaster {
        fn broadcast(&self, _signed_tx: &[u8]) -> Result<String, AssembleError> {
            Err(AssembleError::Broadcast("connection refused".to_string()))
        }
    }

    fn key() -> SigningKey {
        SigningKey::from_slice(&[0x42; 32]).unwrap()
    }

    fn update() -> OperationRequest {
        OperationRequest::Update {
            name: "bob.id".to_string(),
            data_hash: "dd".repeat(20),
            consensus_hash: "cc".repeat(16),
        }
    }

    fn preorder() -> OperationRequest {
        OperationRequest::Preorder {
            name: "bob.id".to_string(),
            register_addr: None,
            consensus_hash: "cc".repeat(16),
            fee: 5500,
        }
    }

    #[test]
    fn assembles_from_the_funding_address() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000]);
        let assembler = Assembler::new(&config, &source);
        let funding = FundingMode::SelfPaid(key());

        let assembled = assembler.assemble(&update(), &funding).unwrap();
        assert_eq!(source.requested.borrow().as_slice(), &[funding.address(&config)]);
        assert_eq!(assembled.outputs.len(), 2);
        assert_eq!(
            script::op_return_data(&assembled.outputs[0].script),
            Some(assembled.nulldata.as_slice())
        );
        assert_eq!(
            script::script_to_address(&config, &assembled.outputs[1].script),
            Some(funding.address(&config))
        );

        let (record, quote) = Registry::standard()
            .check_outputs(&config, assembled.inputs.len(), &assembled.outputs)
            .unwrap();
        assert_eq!(record.opcode(), Opcode::NameUpdate);
        assert_eq!(quote, FeeQuote { dust_fee: 2 * config.dust_fee + config.op_return_fee, op_fee: 0 });
    }

    #[test]
    fn preorder_commits_to_the_supplied_key() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000]);
        let assembler = Assembler::new(&config, &source);

        let subsidy_key = SigningKey::from_slice(&[0x43; 32]).unwrap();
        for funding in [
            FundingMode::SelfPaid(key()),
            FundingMode::Subsidized(*subsidy_key.verifying_key()),
        ] {
            let assembled = assembler.assemble(&preorder(), &funding).unwrap();
            let expected = hashing::hash_name("bob.id", &funding.script_pubkey(), None).unwrap();
            assert_eq!(&assembled.nulldata[3..23], &expected);
            assert_eq!(assembled.outputs.len(), 3);
        }
    }

    #[test]
    fn subsidized_update_is_returned_unsigned() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[30_000]);
        let assembler = Assembler::new(&config, &source);
        let funding = FundingMode::from_keys(None, Some(*key().verifying_key())).unwrap();
        let broadcaster = CountingBroadcaster::default();

        let assembled = assembler.assemble(&update(), &funding).unwrap();
        assert_eq!(assembled.outputs[1].value, 30_000);

        let outcome = assembler.broadcast(&update(), &funding, &broadcaster, false).unwrap();
        let expected = hex::encode(tx::serialize_unsigned(&assembled.inputs, &assembled.outputs));
        assert_eq!(outcome, BroadcastOutcome::Unsigned { unsigned_tx: expected });
        assert_eq!(broadcaster.calls.get(), 0);

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("unsigned_tx").is_some());
        assert!(json.get("txid").is_none());
    }

    #[test]
    fn paid_broadcast_returns_receipt_with_payload() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000, 50_000]);
        let assembler = Assembler::new(&config, &source);
        let funding = FundingMode::SelfPaid(key());
        let broadcaster = CountingBroadcaster::default();

        let request = OperationRequest::Announce {
            message_hash: "a1".repeat(20),
        };
        let outcome = assembler.broadcast(&request, &funding, &broadcaster, false).unwrap();
        let BroadcastOutcome::Receipt { txid, data } = outcome else {
            panic!("expected a receipt");
        };
        assert_eq!(txid.len(), 64);
        assert_eq!(data, format!("6964{}{}", hex::encode([b'#']), "a1".repeat(20)));
        assert_eq!(broadcaster.calls.get(), 1);
    }

    #[test]
    fn tx_only_skips_broadcast() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000]);
        let assembler = Assembler::new(&config, &source);
        let broadcaster = CountingBroadcaster::default();

        let outcome = assembler
            .broadcast(&update(), &FundingMode::SelfPaid(key()), &broadcaster, true)
            .unwrap();
        assert!(matches!(outcome, BroadcastOutcome::Unsigned { .. }));
        assert_eq!(broadcaster.calls.get(), 0);
    }

    #[test]
    fn broadcaster_errors_propagate() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000]);
        let assembler = Assembler::new(&config, &source);
        let err = assembler
            .broadcast(&update(), &FundingMode::SelfPaid(key()), &FailingBroadcaster, false)
            .unwrap_err();
        assert!(matches!(err, AssembleError::Broadcast(_)));
    }

    #[test]
    fn invalid_requests_fail_before_selecting_inputs() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[100_000]);
        let assembler = Assembler::new(&config, &source);
        let funding = FundingMode::SelfPaid(key());

        let no_namespace = OperationRequest::Update {
            name: "bob".to_string(),
            data_hash: "dd".repeat(20),
            consensus_hash: "cc".repeat(16),
        };
        assert!(matches!(
            assembler.assemble(&no_namespace, &funding),
            Err(AssembleError::MissingNamespace(_))
        ));

        let bad_hash = OperationRequest::Announce {
            message_hash: "a1".repeat(10),
        };
        assert!(matches!(
            assembler.assemble(&bad_hash, &funding),
            Err(AssembleError::Build(BuildError::InvalidHash { .. }))
        ));

        let bad_name = OperationRequest::Preorder {
            name: "bob+.id".to_string(),
            register_addr: None,
            consensus_hash: "cc".repeat(16),
            fee: 0,
        };
        assert!(matches!(
            assembler.assemble(&bad_name, &funding),
            Err(AssembleError::Build(BuildError::InvalidName(_)))
        ));

        assert!(source.requested.borrow().is_empty());
    }

    #[test]
    fn insufficient_inputs_surface_as_build_errors() {
        let config = ProtocolConfig::default();
        let source = FixedInputs::new(&[1_000]);
        let assembler = Assembler::new(&config, &source);
        let err = assembler.assemble(&preorder(), &FundingMode::SelfPaid(key())).unwrap_err();
        assert!(matches!(err, AssembleError::Build(BuildError::InsufficientFunds { .. })));
    }
}
