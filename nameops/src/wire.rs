use crate::config::ProtocolConfig;
use crate::error::{BuildError, ParseError};
use crate::opcode::Opcode;

pub const FRAME_HEADER_SIZE: usize = 2 /* magic */ + 1 /* opcode */;

/// A framed payload: `magic(2) || opcode(1) || body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a>(&'a [u8]);

impl<'a> Frame<'a> {
    pub fn new(config: &ProtocolConfig, data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(ParseError::TooShort(data.len()));
        }
        let magic = [data[0], data[1]];
        if magic != config.magic {
            return Err(ParseError::BadMagic(magic));
        }
        Ok(Frame(data))
    }

    pub fn header(&self) -> &'a [u8] {
        &self.0[..FRAME_HEADER_SIZE]
    }

    pub fn opcode_byte(&self) -> u8 {
        self.0[2]
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_byte(self.opcode_byte())
    }

    pub fn body(&self) -> &'a [u8] {
        &self.0[FRAME_HEADER_SIZE..]
    }
}

pub fn encode_frame(config: &ProtocolConfig, opcode: Opcode, body: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
    buffer.extend_from_slice(&config.magic);
    buffer.push(opcode.byte());
    buffer.extend_from_slice(body);
    buffer
}

pub fn is_framed(config: &ProtocolConfig, data: &[u8]) -> bool {
    Frame::new(config, data).is_ok()
}

/// Splits a framed payload into its raw opcode byte and body.
pub fn strip_frame<'a>(config: &ProtocolConfig, data: &'a [u8]) -> Result<(u8, &'a [u8]), ParseError> {
    let frame = Frame::new(config, data)?;
    Ok((frame.opcode_byte(), frame.body()))
}

/// Converts a readable script such as `NAME_UPDATE 0x<hex> 0x<hex>` into the
/// hex of the unframed payload: the opcode byte followed by every field.
pub fn script_to_hex(readable: &str) -> Result<String, BuildError> {
    let mut tokens = readable.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| BuildError::InvalidScript("empty script".to_string()))?;
    let opcode = Opcode::from_name(name)
        .ok_or_else(|| BuildError::InvalidScript(format!("unknown opcode {}", name)))?;

    let mut out = hex::encode([opcode.byte()]);
    for token in tokens {
        let field = token
            .strip_prefix("0x")
            .ok_or_else(|| BuildError::InvalidScript(format!("expected 0x-prefixed field, got {}", token)))?;
        if field.len() % 2 != 0 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BuildError::InvalidScript(format!("field {} is not hex", token)));
        }
        out.push_str(&field.to_ascii_lowercase());
    }
    Ok(out)
}

/// Prefixes the magic bytes onto the output of [`script_to_hex`].
pub fn add_magic_bytes(config: &ProtocolConfig, hex_script: &str) -> Result<Vec<u8>, BuildError> {
    let script = hex::decode(hex_script)
        .map_err(|e| BuildError::InvalidScript(format!("{}: {}", hex_script, e)))?;
    let mut buffer = Vec::with_capacity(config.magic.len() + script.len());
    buffer.extend_from_slice(&config.magic);
    buffer.extend_from_slice(&script);
    Ok(buffer)
}
