use core::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};

use crate::config::ProtocolConfig;
use crate::error::AssembleError;
use crate::hashing::hash160;
use crate::script;

/// Who pays for an operation.
///
/// A self-paid request holds the private key and signs its own transaction.
/// A subsidized request only names the principal's public key; a separate
/// party funds the transaction and co-signs it later.
#[derive(Clone)]
pub enum FundingMode {
    SelfPaid(SigningKey),
    Subsidized(VerifyingKey),
}

impl FundingMode {
    /// Resolves the funding mode from the keys a caller supplied. A public
    /// key always selects subsidized mode.
    pub fn from_keys(
        private_key: Option<SigningKey>,
        public_key: Option<VerifyingKey>,
    ) -> Result<Self, AssembleError> {
        match (private_key, public_key) {
            (_, Some(public_key)) => Ok(FundingMode::Subsidized(public_key)),
            (Some(private_key), None) => Ok(FundingMode::SelfPaid(private_key)),
            (None, None) => Err(AssembleError::MissingKeys),
        }
    }

    pub fn pays_fee(&self) -> bool {
        matches!(self, FundingMode::SelfPaid(_))
    }

    pub fn public_key(&self) -> VerifyingKey {
        match self {
            FundingMode::SelfPaid(key) => *key.verifying_key(),
            FundingMode::Subsidized(key) => *key,
        }
    }

    pub fn signing_key(&self) -> Option<&SigningKey> {
        match self {
            FundingMode::SelfPaid(key) => Some(key),
            FundingMode::Subsidized(_) => None,
        }
    }

    pub fn address(&self, config: &ProtocolConfig) -> String {
        self.public_key().address(config)
    }

    /// P2PKH script of the key that was actually supplied for this request.
    pub fn script_pubkey(&self) -> Vec<u8> {
        self.public_key().script_pubkey()
    }
}

impl fmt::Debug for FundingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FundingMode::SelfPaid(key) => write!(f, "SelfPaid({})", key.public_key_hex()),
            FundingMode::Subsidized(key) => write!(f, "Subsidized({})", key.public_key_hex()),
        }
    }
}

pub trait KeyAddress {
    /// SEC1 compressed public key.
    fn public_key_bytes(&self) -> Vec<u8>;

    fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    fn address(&self, config: &ProtocolConfig) -> String {
        let hash = hash160(&self.public_key_bytes());
        script::address_from_hash160(config.network.p2pkh_version(), &hash)
    }

    fn script_pubkey(&self) -> Vec<u8> {
        script::p2pkh_script(&hash160(&self.public_key_bytes()))
    }
}

impl KeyAddress for VerifyingKey {
    fn public_key_bytes(&self) -> Vec<u8> {
        self.to_encoded_point(true).as_bytes().to_vec()
    }
}

impl KeyAddress for SigningKey {
    fn public_key_bytes(&self) -> Vec<u8> {
        self.verifying_key().public_key_bytes()
    }
}

/// Hex private key, optionally followed by the `01` compressed-key marker.
pub fn parse_private_key(hex_key: &str) -> Result<SigningKey, AssembleError> {
    let mut bytes = hex::decode(hex_key.trim()).map_err(|_| AssembleError::InvalidKey("private key is not hex".to_string()))?;
    if bytes.len() == 33 && bytes[32] == 0x01 {
        bytes.truncate(32);
    }
    SigningKey::from_slice(&bytes).map_err(|e| AssembleError::InvalidKey(e.to_string()))
}

/// Hex SEC1 public key, compressed or not.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, AssembleError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|_| AssembleError::InvalidKey("public key is not hex".to_string()))?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| AssembleError::InvalidKey(e.to_string()))
}
