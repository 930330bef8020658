//! Typed parameter values
//!
//! Named parameters travel as raw strings; a per-key type table governs how
//! they are decoded into and encoded from typed values. The INFO fields of
//! ADC 1.0 are registered here, everything else round-trips as text.

use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};

use data_encoding::BASE32_NOPAD;
use thiserror::Error;

use crate::core::{ParamKey, PARAM_KEY_SPACE};

/// A Base32-encoded binary value, e.g. a CID or a hash digest.
///
/// Encoding strips the trailing `=` padding as ADC requires; decoding
/// accepts unpadded input and needs the declared byte length to know where
/// the value ends.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Base32Value {
    bytes: Vec<u8>,
    declared: Option<usize>,
}

impl Base32Value {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            declared: None,
        }
    }

    /// Decodes an unpadded (or padded) Base32 string into `size` bytes.
    pub fn decode(text: &str, size: usize) -> Result<Self, Base32DecodeError> {
        let trimmed = text.trim_end_matches('=');

        let mut bytes = BASE32_NOPAD.decode(trimmed.as_bytes())?;

        if bytes.len() < size {
            return Err(Base32DecodeError::Truncated {
                declared: size,
                got: bytes.len(),
            });
        }

        bytes.truncate(size);

        Ok(Self {
            bytes,
            declared: Some(size),
        })
    }

    /// The unpadded Base32 form used on the wire.
    pub fn encode(&self) -> String {
        BASE32_NOPAD.encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn declared_len(&self) -> Option<usize> {
        self.declared
    }
}

impl fmt::Display for Base32Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Base32DecodeError {
    #[error("Invalid Base32: {0}")]
    Decode(#[from] data_encoding::DecodeError),
    #[error("Declared {declared} bytes but decoded only {got}")]
    Truncated { declared: usize, got: usize },
}

/// How a named parameter's raw string is interpreted.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamType {
    Int,
    Ip4,
    Ip6,
    Base32,
    Str,
}

/// A decoded parameter value.
///
/// The IP variants keep `None` for the empty string, which INF fields use as
/// the "my real address" sentinel.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Int(i64),
    Ip4(Option<Ipv4Addr>),
    Ip6(Option<Ipv6Addr>),
    Base32(Base32Value),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_base32(&self) -> Option<&Base32Value> {
        match self {
            Self::Base32(value) => Some(value),
            _ => None,
        }
    }
}

/// Decodes a raw (already unescaped) parameter string.
///
/// `base32_len` is the declared byte length used for [`ParamType::Base32`]
/// fields, typically the negotiated hash size.
pub fn decode_value(raw: &str, ty: ParamType, base32_len: usize) -> Result<Value, ValueError> {
    match ty {
        ParamType::Int => {
            if raw.is_empty() {
                return Err(ValueError::EmptyInt);
            }

            Ok(Value::Int(raw.parse()?))
        }
        ParamType::Ip4 => {
            if raw.is_empty() {
                return Ok(Value::Ip4(None));
            }

            raw.parse()
                .map(|addr| Value::Ip4(Some(addr)))
                .map_err(|_| ValueError::Ip4(raw.to_owned()))
        }
        ParamType::Ip6 => {
            if raw.is_empty() {
                return Ok(Value::Ip6(None));
            }

            raw.parse()
                .map(|addr| Value::Ip6(Some(addr)))
                .map_err(|_| ValueError::Ip6(raw.to_owned()))
        }
        ParamType::Base32 => Ok(Value::Base32(Base32Value::decode(raw, base32_len)?)),
        ParamType::Str => Ok(Value::Text(raw.to_owned())),
    }
}

/// Encodes a value back into its raw string form. Escaping is the wire
/// layer's concern, not this function's.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::Int(value) => value.to_string(),
        Value::Ip4(None) | Value::Ip6(None) => String::new(),
        Value::Ip4(Some(addr)) => addr.to_string(),
        Value::Ip6(Some(addr)) => addr.to_string(),
        Value::Base32(value) => value.encode(),
        Value::Text(value) => value.clone(),
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValueError {
    #[error("Empty integer field")]
    EmptyInt,
    #[error("Invalid integer: {0}")]
    Int(#[from] std::num::ParseIntError),
    #[error("Invalid IPv4 address: {0:?}")]
    Ip4(String),
    #[error("Invalid IPv6 address: {0:?}")]
    Ip6(String),
    #[error(transparent)]
    Base32(#[from] Base32DecodeError),
}

/// The INFO fields of ADC 1.0 and their types.
const INFO_FIELDS: &[(&[u8; 2], ParamType)] = &[
    (b"ID", ParamType::Base32),
    (b"PD", ParamType::Base32),
    (b"I4", ParamType::Ip4),
    (b"I6", ParamType::Ip6),
    (b"U4", ParamType::Int),
    (b"U6", ParamType::Int),
    (b"SS", ParamType::Int),
    (b"SF", ParamType::Int),
    (b"US", ParamType::Int),
    (b"DS", ParamType::Int),
    (b"SL", ParamType::Int),
    (b"AS", ParamType::Int),
    (b"AM", ParamType::Int),
    (b"HN", ParamType::Int),
    (b"HR", ParamType::Int),
    (b"HO", ParamType::Int),
    (b"CT", ParamType::Int),
    (b"AW", ParamType::Int),
    (b"NI", ParamType::Str),
    (b"DE", ParamType::Str),
    (b"VE", ParamType::Str),
    (b"EM", ParamType::Str),
    (b"SU", ParamType::Str),
    (b"RF", ParamType::Str),
    (b"KP", ParamType::Str),
    (b"HI", ParamType::Str),
    (b"OP", ParamType::Str),
    (b"TO", ParamType::Str),
];

/// Dense table over the whole key space for O(1) lookups.
static INFO_TYPES: [Option<ParamType>; PARAM_KEY_SPACE] = build_info_types();

const fn build_info_types() -> [Option<ParamType>; PARAM_KEY_SPACE] {
    let mut table = [None; PARAM_KEY_SPACE];

    let mut i = 0;
    while i < INFO_FIELDS.len() {
        let (raw, ty) = INFO_FIELDS[i];
        table[ParamKey::from_static(raw).table_index()] = Some(ty);
        i += 1;
    }

    table
}

/// The registered type of an INFO field, or `None` for unknown keys.
pub fn lookup(key: ParamKey) -> Option<ParamType> {
    INFO_TYPES[key.table_index()]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_base32_round_trip() {
        let tests: &[(&[u8], &str)] = &[
            (b"", ""),
            (b"f", "MY"),
            (b"TEST", "KRCVGVA"),
            (b"FOOBAR", "IZHU6QSBKI"),
        ];

        for (bytes, encoded) in tests {
            let value = Base32Value::new(*bytes);
            assert_eq!(*encoded, value.encode());

            let decoded = Base32Value::decode(encoded, bytes.len()).unwrap();
            assert_eq!(*bytes, decoded.as_bytes());
        }
    }

    #[test]
    fn test_base32_accepts_padded_input() {
        let decoded = Base32Value::decode("KRCVGVA=", 4).unwrap();
        assert_eq!(b"TEST", decoded.as_bytes());
    }

    #[test]
    fn test_base32_rejects_short_input() {
        assert_eq!(
            Err(Base32DecodeError::Truncated {
                declared: 24,
                got: 4
            }),
            Base32Value::decode("KRCVGVA", 24)
        );
    }

    #[test]
    fn test_decode_int() {
        assert_eq!(
            Value::Int(-42),
            decode_value("-42", ParamType::Int, 0).unwrap()
        );
        assert!(decode_value("", ParamType::Int, 0).is_err());
        assert!(decode_value("12x", ParamType::Int, 0).is_err());
    }

    #[test]
    fn test_decode_ip_sentinel() {
        assert_eq!(
            Value::Ip4(None),
            decode_value("", ParamType::Ip4, 0).unwrap()
        );
        assert_eq!(
            Value::Ip4(Some(Ipv4Addr::new(10, 0, 0, 1))),
            decode_value("10.0.0.1", ParamType::Ip4, 0).unwrap()
        );
        assert_eq!(
            Value::Ip6(None),
            decode_value("", ParamType::Ip6, 0).unwrap()
        );
        assert!(decode_value("10.0.0.256", ParamType::Ip4, 0).is_err());
    }

    #[test]
    fn test_encode_is_inverse_of_decode() {
        let tests = [
            ("1024", ParamType::Int),
            ("10.0.0.1", ParamType::Ip4),
            ("::1", ParamType::Ip6),
            ("", ParamType::Ip4),
            ("some text", ParamType::Str),
        ];

        for (raw, ty) in tests {
            let value = decode_value(raw, ty, 0).unwrap();
            assert_eq!(raw, encode_value(&value));
        }
    }

    #[test]
    fn test_info_table() {
        assert_eq!(
            Some(ParamType::Base32),
            lookup(ParamKey::from_static(b"ID"))
        );
        assert_eq!(Some(ParamType::Str), lookup(ParamKey::from_static(b"NI")));
        assert_eq!(Some(ParamType::Int), lookup(ParamKey::from_static(b"SS")));
        assert_eq!(Some(ParamType::Ip4), lookup(ParamKey::from_static(b"I4")));
        assert_eq!(None, lookup(ParamKey::from_static(b"XX")));
    }
}
