//! Base-40 name alphabet helpers.
//!
//! Names are written in `[0-9a-z-_.+]`. Of those, `.` separates the name from
//! its namespace and `+` is reserved, which leaves the 38 symbols a label may
//! use.

use crate::config::{ProtocolConfig, NAME_ALPHABET};
use crate::error::BuildError;

const BASE: u32 = NAME_ALPHABET.len() as u32;

fn digit(c: char) -> Option<u32> {
    NAME_ALPHABET.find(c).map(|i| i as u32)
}

pub fn is_b40(s: &str) -> bool {
    s.chars().all(|c| digit(c).is_some())
}

/// Alphabet check plus the separator rules: no `+` and at most one `.`.
pub fn is_valid_name_charset(name: &str) -> bool {
    is_b40(name) && !name.contains('+') && name.matches('.').count() <= 1
}

/// Validates a fully-qualified name (`label.namespace`, without the scheme).
pub fn check_name(config: &ProtocolConfig, name: &str) -> Result<(), BuildError> {
    if name.is_empty() || !is_valid_name_charset(name) {
        return Err(BuildError::InvalidName(name.to_string()));
    }
    if config.name_scheme.len() + name.len() > config.max_name_length {
        return Err(BuildError::NameTooLong {
            name: name.to_string(),
            max: config.max_bare_name_length(),
        });
    }
    Ok(())
}

/// Reads `s` as a base-40 number and returns its minimal big-endian bytes.
/// Zero encodes as a single zero byte.
pub fn b40_to_bin(s: &str) -> Result<Vec<u8>, BuildError> {
    // little-endian while accumulating
    let mut acc: Vec<u8> = Vec::new();
    for c in s.chars() {
        let mut carry = digit(c).ok_or_else(|| BuildError::InvalidName(s.to_string()))?;
        for byte in acc.iter_mut() {
            let v = (*byte as u32) * BASE + carry;
            *byte = v as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            acc.push(carry as u8);
            carry >>= 8;
        }
    }
    if acc.is_empty() {
        acc.push(0);
    }
    acc.reverse();
    Ok(acc)
}

/// The namespace a name lives in, if it has one.
pub fn namespace_from_name(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((label, ns)) if !label.is_empty() && !ns.is_empty() => Some(ns),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_rules() {
        assert!(is_valid_name_charset("bob.id"));
        assert!(is_valid_name_charset("a-b_c9"));
        assert!(!is_valid_name_charset("bob+x.id"));
        assert!(!is_valid_name_charset("bob.foo.id"));
        assert!(!is_valid_name_charset("Bob.id"));
        assert!(!is_valid_name_charset("bob id"));
    }

    #[test]
    fn name_length_accounts_for_scheme() {
        let config = ProtocolConfig::default();
        let longest = format!("{}.id", "a".repeat(31));
        assert_eq!(longest.len(), 34);
        check_name(&config, &longest).unwrap();

        let too_long = format!("{}.id", "a".repeat(32));
        assert_eq!(
            check_name(&config, &too_long),
            Err(BuildError::NameTooLong { name: too_long.clone(), max: 34 })
        );
        assert!(check_name(&config, "").is_err());
    }

    #[test]
    fn base40_conversion() {
        assert_eq!(b40_to_bin("0").unwrap(), vec![0]);
        assert_eq!(b40_to_bin("").unwrap(), vec![0]);
        // "10" = 40, "a0" = 10 * 40 = 400
        assert_eq!(b40_to_bin("10").unwrap(), vec![40]);
        assert_eq!(b40_to_bin("a0").unwrap(), vec![0x01, 0x90]);
        assert_eq!(b40_to_bin("+").unwrap(), vec![39]);
        assert!(b40_to_bin("A").is_err());
    }

    #[test]
    fn namespaces() {
        assert_eq!(namespace_from_name("bob.id"), Some("id"));
        assert_eq!(namespace_from_name("bob"), None);
        assert_eq!(namespace_from_name(".id"), None);
        assert_eq!(namespace_from_name("bob."), None);
    }
}
