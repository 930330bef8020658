//! Core data types
//!
//! The small validated building blocks every ADC message is made of: session
//! IDs, client IDs, command names, feature names, and the two-letter keys of
//! named parameters.

use std::{fmt, str::from_utf8};

use thiserror::Error;

use crate::utils::indicators::{is_base32_char, is_simple_alpha, is_simple_alphanum};

/// A session ID.
///
/// `encoded_sid ::= base32_character{4}`
///
/// Assigned by the hub during the PROTOCOL phase and used to address users
/// for the lifetime of the connection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Sid([u8; 4]);

impl Sid {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), SidError> {
        let value = value.as_ref();

        if value.len() != 4 {
            return Err(SidError::BadLength(value.len()));
        }

        if let Some(position) = value.iter().position(|b| !is_base32_char(*b)) {
            return Err(SidError::ByteNotAllowed {
                found: value[position],
                position,
            });
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        // # Safety
        //
        // `unwrap` can't panic because verified SIDs are ASCII-only.
        from_utf8(&self.0).unwrap()
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Sid {
    type Error = SidError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(value);

        Ok(Self(raw))
    }
}

impl TryFrom<&str> for Sid {
    type Error = SidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum SidError {
    #[error("Must be exactly 4 bytes, got {0}")]
    BadLength(usize),
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// A client ID in its Base32 wire form.
///
/// `encoded_cid ::= base32_character+`
///
/// Carried by U headers. The decoded form is a hash digest, 24 bytes (39
/// Base32 characters) for Tiger.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Cid(String);

impl Cid {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), CidError> {
        let value = value.as_ref();

        if value.is_empty() {
            return Err(CidError::Empty);
        }

        if let Some(position) = value.iter().position(|b| !is_base32_char(*b)) {
            return Err(CidError::ByteNotAllowed {
                found: value[position],
                position,
            });
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&[u8]> for Cid {
    type Error = CidError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        // # Safety
        //
        // `unwrap` can't panic because verified CIDs are ASCII-only.
        Ok(Self(from_utf8(value).unwrap().to_owned()))
    }
}

impl TryFrom<&str> for Cid {
    type Error = CidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl TryFrom<String> for Cid {
    type Error = CidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::verify(&value)?;

        Ok(Self(value))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum CidError {
    #[error("Must not be empty")]
    Empty,
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// A three-letter command name such as `SUP`, `INF` or `MSG`.
///
/// `command_name ::= simple_alpha simple_alphanum simple_alphanum`
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CommandName([u8; 3]);

impl CommandName {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), CommandNameError> {
        let value = value.as_ref();

        if value.len() != 3 {
            return Err(CommandNameError::BadLength(value.len()));
        }

        if !is_simple_alpha(value[0]) {
            return Err(CommandNameError::ByteNotAllowed {
                found: value[0],
                position: 0,
            });
        }

        if let Some(position) = value[1..].iter().position(|b| !is_simple_alphanum(*b)) {
            return Err(CommandNameError::ByteNotAllowed {
                found: value[position + 1],
                position: position + 1,
            });
        }

        Ok(())
    }

    /// Builds a command name from a byte-string literal, panicking on
    /// invalid input. Intended for `b"SUP"`-style constants.
    pub const fn from_static(raw: &[u8; 3]) -> Self {
        if !raw[0].is_ascii_uppercase()
            || !(raw[1].is_ascii_uppercase() || raw[1].is_ascii_digit())
            || !(raw[2].is_ascii_uppercase() || raw[2].is_ascii_digit())
        {
            panic!("invalid command name literal");
        }

        Self(*raw)
    }

    pub fn as_str(&self) -> &str {
        // # Safety
        //
        // `unwrap` can't panic because verified command names are ASCII-only.
        from_utf8(&self.0).unwrap()
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Packs the three command bytes into the low 24 bits of a `u32`,
    /// usable as a dense dispatch-table key.
    pub const fn packed(self) -> u32 {
        Self::pack(&self.0)
    }

    /// Packs a raw three-byte command into its 24-bit form without
    /// validation; the dispatch tables use this on literals.
    pub const fn pack(raw: &[u8; 3]) -> u32 {
        ((raw[0] as u32) << 16) | ((raw[1] as u32) << 8) | raw[2] as u32
    }
}

impl TryFrom<&[u8]> for CommandName {
    type Error = CommandNameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        let mut raw = [0u8; 3];
        raw.copy_from_slice(value);

        Ok(Self(raw))
    }
}

impl TryFrom<&str> for CommandName {
    type Error = CommandNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum CommandNameError {
    #[error("Must be exactly 3 bytes, got {0}")]
    BadLength(usize),
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// A four-character feature name such as `BASE` or `TIGR`.
///
/// `feature_name ::= simple_alpha simple_alphanum{3}`
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FeatureName([u8; 4]);

impl FeatureName {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), FeatureNameError> {
        let value = value.as_ref();

        if value.len() != 4 {
            return Err(FeatureNameError::BadLength(value.len()));
        }

        if !is_simple_alpha(value[0]) {
            return Err(FeatureNameError::ByteNotAllowed {
                found: value[0],
                position: 0,
            });
        }

        if let Some(position) = value[1..].iter().position(|b| !is_simple_alphanum(*b)) {
            return Err(FeatureNameError::ByteNotAllowed {
                found: value[position + 1],
                position: position + 1,
            });
        }

        Ok(())
    }

    /// Builds a feature name from a byte-string literal, panicking on
    /// invalid input. Intended for `b"BASE"`-style constants.
    pub const fn from_static(raw: &[u8; 4]) -> Self {
        if !raw[0].is_ascii_uppercase() {
            panic!("invalid feature name literal");
        }

        let mut i = 1;
        while i < 4 {
            if !(raw[i].is_ascii_uppercase() || raw[i].is_ascii_digit()) {
                panic!("invalid feature name literal");
            }
            i += 1;
        }

        Self(*raw)
    }

    pub fn as_str(&self) -> &str {
        // # Safety
        //
        // `unwrap` can't panic because verified feature names are ASCII-only.
        from_utf8(&self.0).unwrap()
    }
}

impl TryFrom<&[u8]> for FeatureName {
    type Error = FeatureNameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(value);

        Ok(Self(raw))
    }
}

impl TryFrom<&str> for FeatureName {
    type Error = FeatureNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum FeatureNameError {
    #[error("Must be exactly 4 bytes, got {0}")]
    BadLength(usize),
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// The two-letter key of a named parameter, e.g. `NI` or `I4`.
///
/// `parameter_name ::= simple_alpha simple_alphanum`
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ParamKey([u8; 2]);

/// Number of distinct keys: 26 choices for the first byte, 36 for the second.
pub const PARAM_KEY_SPACE: usize = 26 * 36;

impl ParamKey {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), ParamKeyError> {
        let value = value.as_ref();

        if value.len() != 2 {
            return Err(ParamKeyError::BadLength(value.len()));
        }

        if !is_simple_alpha(value[0]) {
            return Err(ParamKeyError::ByteNotAllowed {
                found: value[0],
                position: 0,
            });
        }

        if !is_simple_alphanum(value[1]) {
            return Err(ParamKeyError::ByteNotAllowed {
                found: value[1],
                position: 1,
            });
        }

        Ok(())
    }

    /// Builds a key from a byte-string literal, panicking on invalid input.
    /// Intended for `b"NI"`-style constants.
    pub const fn from_static(raw: &[u8; 2]) -> Self {
        if !raw[0].is_ascii_uppercase() || !(raw[1].is_ascii_uppercase() || raw[1].is_ascii_digit())
        {
            panic!("invalid parameter key literal");
        }

        Self(*raw)
    }

    /// Tests whether the first two bytes of a token form a key, which is
    /// what decides named against positional parameters.
    pub fn matches(first: u8, second: u8) -> bool {
        is_simple_alpha(first) && is_simple_alphanum(second)
    }

    pub fn as_str(&self) -> &str {
        // # Safety
        //
        // `unwrap` can't panic because verified keys are ASCII-only.
        from_utf8(&self.0).unwrap()
    }

    /// A dense index into [`PARAM_KEY_SPACE`]-sized lookup tables.
    pub const fn table_index(self) -> usize {
        let first = (self.0[0] - b'A') as usize;
        let second = if self.0[1].is_ascii_digit() {
            26 + (self.0[1] - b'0') as usize
        } else {
            (self.0[1] - b'A') as usize
        };

        first * 36 + second
    }
}

impl TryFrom<&[u8]> for ParamKey {
    type Error = ParamKeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        Ok(Self([value[0], value[1]]))
    }
}

impl TryFrom<&str> for ParamKey {
    type Error = ParamKeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.as_bytes())
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum ParamKeyError {
    #[error("Must be exactly 2 bytes, got {0}")]
    BadLength(usize),
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid() {
        for valid in ["AAAB", "Z777", "Q2P7"] {
            assert_eq!(valid, Sid::try_from(valid).unwrap().as_str());
        }

        for invalid in ["", "AAA", "AAAAA", "aaab", "A018"] {
            assert!(Sid::try_from(invalid).is_err(), "{invalid:?}");
        }
    }

    #[test]
    fn test_command_name() {
        for valid in ["AAA", "Z99", "A00", "SUP", "MSG"] {
            assert_eq!(valid, CommandName::try_from(valid).unwrap().as_str());
        }

        for invalid in ["", "AB", "ABCD", "0AB", "aBC"] {
            assert!(CommandName::try_from(invalid).is_err(), "{invalid:?}");
        }
    }

    #[test]
    fn test_command_name_packing() {
        let sup = CommandName::try_from("SUP").unwrap();

        assert_eq!(CommandName::pack(b"SUP"), sup.packed());
        assert_ne!(CommandName::pack(b"SID"), sup.packed());
    }

    #[test]
    fn test_feature_name() {
        for valid in ["AAAA", "Z999", "BASE", "TIGR", "ZLIB"] {
            assert_eq!(valid, FeatureName::try_from(valid).unwrap().as_str());
        }

        for invalid in ["", "AAA", "AAAAA", "1AAA", "AaAA"] {
            assert!(FeatureName::try_from(invalid).is_err(), "{invalid:?}");
        }
    }

    #[test]
    fn test_param_key_table_index_is_dense() {
        let mut seen = vec![false; PARAM_KEY_SPACE];

        for first in b'A'..=b'Z' {
            for second in (b'A'..=b'Z').chain(b'0'..=b'9') {
                let key = ParamKey::try_from(&[first, second][..]).unwrap();
                let index = key.table_index();

                assert!(index < PARAM_KEY_SPACE);
                assert!(!seen[index], "collision at {key}");
                seen[index] = true;
            }
        }

        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_cid() {
        let cid = Cid::try_from("LWPNACQDBZRYXW3VHJVCJ64QBZNGHOHHHZWCLNQ").unwrap();
        assert_eq!(39, cid.as_str().len());

        for invalid in ["", "abc", "A1AA"] {
            assert!(Cid::try_from(invalid).is_err(), "{invalid:?}");
        }
    }
}
