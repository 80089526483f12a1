use nameops::ops::{AnnounceFields, PreorderFields, UpdateFields};
use nameops::script::{self, address_from_hash160};
use nameops::wire::strip_frame;
use nameops::{
    Announce, FeePolicy, FeeQuote, NamePreorder, NameUpdate, Operation, OperationRecord, ProtocolConfig, Registry,
    TxInput, TxOutput,
};
use proptest::prelude::*;

fn inputs(values: &[u64]) -> Vec<TxInput> {
    values
        .iter()
        .map(|value| TxInput {
            txid: [9u8; 32],
            vout: 0,
            value: *value,
            script: script::p2pkh_script(&[2u8; 20]),
        })
        .collect()
}

fn change_address(config: &ProtocolConfig) -> String {
    address_from_hash160(config.network.p2pkh_version(), &[2u8; 20])
}

proptest! {
    #[test]
    fn parse_is_total(opcode in prop::sample::select(vec![b'#', b'?', b'+', b':', 0u8]), body in prop::collection::vec(any::<u8>(), 0..80)) {
        let config = ProtocolConfig::default();
        let registry = Registry::standard();
        let mut nulldata = config.magic.to_vec();
        nulldata.push(opcode);
        nulldata.extend_from_slice(&body);

        let expected_len = registry.get(opcode).map(|handler| handler.body_len());
        match registry.parse_nulldata(&config, &nulldata) {
            Ok(record) => {
                prop_assert_eq!(Some(body.len()), expected_len);
                prop_assert_eq!(record.opcode().byte(), opcode);
            }
            Err(_) => prop_assert!(expected_len != Some(body.len())),
        }
    }

    #[test]
    fn announce_round_trip(hash in prop::array::uniform20(any::<u8>())) {
        let config = ProtocolConfig::default();
        let payload = Announce::build(&config, &AnnounceFields { message_hash: hex::encode(hash) }).unwrap();
        let (_, body) = strip_frame(&config, &payload).unwrap();
        prop_assert_eq!(
            Announce::parse(body).unwrap(),
            OperationRecord::Announce { message_hash: hex::encode(hash) }
        );
    }

    #[test]
    fn preorder_round_trip(name_hash in prop::array::uniform20(any::<u8>()), consensus in prop::array::uniform16(any::<u8>())) {
        let config = ProtocolConfig::default();
        let fields = PreorderFields {
            name: String::new(),
            script_pubkey: Vec::new(),
            register_addr: None,
            consensus_hash: hex::encode(consensus).to_uppercase(),
            name_hash: Some(hex::encode(name_hash)),
        };
        let payload = NamePreorder::build(&config, &fields).unwrap();
        let (_, body) = strip_frame(&config, &payload).unwrap();
        prop_assert_eq!(
            NamePreorder::parse(body).unwrap(),
            OperationRecord::NamePreorder {
                preorder_name_hash: hex::encode(name_hash),
                consensus_hash: hex::encode(consensus),
            }
        );
    }

    #[test]
    fn paid_outputs_pass_fee_validation(
        values in prop::collection::vec(150_000u64..1_000_000, 1..6),
        fee in 0u64..50_000,
    ) {
        let config = ProtocolConfig::default();
        let inputs = inputs(&values);
        let n = inputs.len() as u64;
        let change = change_address(&config);

        let announce = Announce::build(&config, &AnnounceFields { message_hash: "a1".repeat(20) }).unwrap();
        let outputs = Announce::make_outputs(&config, &announce, &inputs, &change, FeePolicy::paid()).unwrap();
        prop_assert_eq!(
            Announce::get_fees(&config, inputs.len(), &outputs),
            Some(FeeQuote { dust_fee: (n + 1) * config.dust_fee + config.op_return_fee, op_fee: 0 })
        );

        let update = NameUpdate::build(&config, &UpdateFields {
            name: "bob.id".to_string(),
            consensus_hash: "00".repeat(16),
            data_hash: "11".repeat(20),
        }).unwrap();
        let outputs = NameUpdate::make_outputs(&config, &update, &inputs, &change, FeePolicy::paid()).unwrap();
        prop_assert_eq!(
            NameUpdate::get_fees(&config, inputs.len(), &outputs),
            Some(FeeQuote { dust_fee: (n + 1) * config.dust_fee + config.op_return_fee, op_fee: 0 })
        );

        let preorder = NamePreorder::build(&config, &PreorderFields {
            name: "bob.id".to_string(),
            script_pubkey: script::p2pkh_script(&[2u8; 20]),
            register_addr: None,
            consensus_hash: "00".repeat(16),
            name_hash: None,
        }).unwrap();
        let outputs = NamePreorder::make_outputs(&config, &preorder, &inputs, &change, FeePolicy::paid().with_fee(fee)).unwrap();
        prop_assert_eq!(outputs.len(), 3);
        prop_assert_eq!(
            NamePreorder::get_fees(&config, inputs.len(), &outputs),
            Some(FeeQuote { dust_fee: (n + 2) * config.dust_fee + config.op_return_fee, op_fee: outputs[2].value })
        );
        prop_assert_eq!(outputs[2].value, fee.max(config.dust_fee));
    }

    #[test]
    fn arbitrary_output_lists_never_panic(
        scripts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..30), 0..5),
        inputs_count in 0usize..10,
    ) {
        let config = ProtocolConfig::default();
        let outputs: Vec<TxOutput> = scripts.into_iter().map(|script| TxOutput::new(script, 1)).collect();
        let _ = Announce::get_fees(&config, inputs_count, &outputs);
        let _ = NamePreorder::get_fees(&config, inputs_count, &outputs);
        let _ = NameUpdate::get_fees(&config, inputs_count, &outputs);
        let _ = Registry::standard().check_outputs(&config, inputs_count, &outputs);
    }
}
