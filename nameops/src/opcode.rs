use core::fmt;

use serde::{Deserialize, Serialize};

/// One-byte tag identifying which operation a framed payload encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    Announce,
    NamePreorder,
    NameUpdate,
}

impl Opcode {
    pub const ALL: [Opcode; 3] = [Opcode::Announce, Opcode::NamePreorder, Opcode::NameUpdate];

    /// Wire byte written after the magic prefix. These are the printable
    /// protocol characters; no operation uses `0x00`.
    pub const fn byte(self) -> u8 {
        match self {
            Opcode::Announce => b'#',
            Opcode::NamePreorder => b'?',
            Opcode::NameUpdate => b'+',
        }
    }

    /// Name used in readable scripts and in parsed records.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Announce => "ANNOUNCE",
            Opcode::NamePreorder => "NAME_PREORDER",
            Opcode::NameUpdate => "NAME_UPDATE",
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_agree() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
        assert_eq!(Opcode::from_byte(0x00), None);
        assert_eq!(Opcode::from_name("NAME_REGISTER"), None);
    }

    #[test]
    fn wire_bytes() {
        assert_eq!(Opcode::Announce.byte(), 0x23);
        assert_eq!(Opcode::NamePreorder.byte(), 0x3f);
        assert_eq!(Opcode::NameUpdate.byte(), 0x2b);
    }

    #[test]
    fn serializes_as_protocol_name() {
        let json = serde_json::to_string(&Opcode::NamePreorder).unwrap();
        assert_eq!(json, "\"NAME_PREORDER\"");
    }
}
