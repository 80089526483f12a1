use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::error::ConfigError;
use crate::script;

pub const MAGIC_BYTES: [u8; 2] = *b"id";
pub const DEFAULT_DUST_FEE: u64 = 5500;
pub const DEFAULT_OP_RETURN_FEE: u64 = 10000;

/// hash160 of twenty zero bytes on mainnet; nobody holds its key.
pub const BURN_ADDRESS: &str = "1111111111111111111114oLvT2";

/// Characters a name may be built from, before the separator rules apply.
pub const NAME_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz-_.+";

/// Byte lengths of every fixed-size field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLengths {
    pub magic_bytes: usize,
    pub opcode: usize,
    pub message_hash: usize,
    pub preorder_name_hash: usize,
    pub consensus_hash: usize,
    pub name_hash: usize,
    pub update_hash: usize,
    pub blockchain_id_name: usize,
}

pub const LENGTHS: FieldLengths = FieldLengths {
    magic_bytes: 2,
    opcode: 1,
    message_hash: 20,
    preorder_name_hash: 20,
    consensus_hash: 16,
    name_hash: 16,
    update_hash: 20,
    blockchain_id_name: 37,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub const fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    pub const fn p2sh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x05,
            Network::Testnet => 0xc4,
        }
    }
}

/// Process-wide protocol constants. Built once at start-up and only ever
/// borrowed afterwards.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolConfig {
    #[serde_as(as = "Hex")]
    pub magic: [u8; 2],
    pub dust_fee: u64,
    pub op_return_fee: u64,
    pub burn_address: String,
    pub network: Network,
    pub name_scheme: String,
    pub max_name_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            magic: MAGIC_BYTES,
            dust_fee: DEFAULT_DUST_FEE,
            op_return_fee: DEFAULT_OP_RETURN_FEE,
            burn_address: BURN_ADDRESS.to_string(),
            network: Network::Mainnet,
            name_scheme: format!("{}:", String::from_utf8_lossy(&MAGIC_BYTES)),
            max_name_length: LENGTHS.blockchain_id_name,
        }
    }
}

impl ProtocolConfig {
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            burn_address: script::address_from_hash160(Network::Testnet.p2pkh_version(), &[0u8; 20]),
            ..Self::default()
        }
    }

    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if script::decode_address(self, &self.burn_address).is_none() {
            return Err(ConfigError::InvalidBurnAddress(self.burn_address.clone()));
        }
        if self.name_scheme.len() >= self.max_name_length {
            return Err(ConfigError::InvalidNameLength {
                scheme: self.name_scheme.clone(),
                max: self.max_name_length,
            });
        }
        Ok(())
    }

    /// Longest name accepted once the scheme prefix is accounted for.
    pub fn max_bare_name_length(&self) -> usize {
        self.max_name_length.saturating_sub(self.name_scheme.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ProtocolConfig::default().validate().unwrap();
        ProtocolConfig::testnet().validate().unwrap();
        assert_eq!(ProtocolConfig::default().name_scheme, "id:");
        assert_eq!(ProtocolConfig::default().max_bare_name_length(), 34);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = ProtocolConfig::from_json(br#"{"dust_fee": 600, "magic": "6964"}"#).unwrap();
        assert_eq!(config.dust_fee, 600);
        assert_eq!(config.op_return_fee, DEFAULT_OP_RETURN_FEE);
        assert_eq!(config.magic, MAGIC_BYTES);
    }

    #[test]
    fn rejects_burn_address_from_other_network() {
        let json = format!(r#"{{"network": "testnet", "burn_address": "{}"}}"#, BURN_ADDRESS);
        assert!(matches!(
            ProtocolConfig::from_json(json.as_bytes()),
            Err(ConfigError::InvalidBurnAddress(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let config = ProtocolConfig::testnet();
        let json = config.to_json().unwrap();
        assert_eq!(ProtocolConfig::from_json(json.as_bytes()).unwrap(), config);
    }
}
