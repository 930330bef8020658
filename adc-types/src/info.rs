//! INFO records
//!
//! A record of the two-letter INFO fields announced by a user or by the hub
//! itself. Fields with a registered type are decoded on insertion, unknown
//! keys are kept as raw text. Every insertion marks the key dirty until
//! [`InfoRecord::clean`] runs, which lets the connection react to an update
//! burst exactly once.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    core::ParamKey,
    param::{self, Value, ValueError},
};

const NI: ParamKey = ParamKey::from_static(b"NI");
const SS: ParamKey = ParamKey::from_static(b"SS");
const VE: ParamKey = ParamKey::from_static(b"VE");
const DE: ParamKey = ParamKey::from_static(b"DE");

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InfoRecord {
    fields: BTreeMap<ParamKey, Value>,
    dirty: BTreeSet<ParamKey>,
}

impl InfoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and stores a raw field value, marking the key dirty.
    ///
    /// `base32_len` is the declared byte length for Base32 fields such as
    /// `ID` and `PD`, typically the negotiated hash size. On a decode error
    /// the record is left untouched.
    pub fn set(&mut self, key: ParamKey, raw: &str, base32_len: usize) -> Result<(), ValueError> {
        let value = match param::lookup(key) {
            Some(ty) => param::decode_value(raw, ty, base32_len)?,
            None => Value::Text(raw.to_owned()),
        };

        self.fields.insert(key, value);
        self.dirty.insert(key);

        Ok(())
    }

    pub fn get(&self, key: ParamKey) -> Option<&Value> {
        self.fields.get(&key)
    }

    pub fn text(&self, key: ParamKey) -> Option<&str> {
        self.fields.get(&key).and_then(Value::as_text)
    }

    pub fn int(&self, key: ParamKey) -> Option<i64> {
        self.fields.get(&key).and_then(Value::as_int)
    }

    /// The `NI` field.
    pub fn nick(&self) -> Option<&str> {
        self.text(NI)
    }

    /// The `SS` field.
    pub fn share_size(&self) -> Option<i64> {
        self.int(SS)
    }

    /// The `VE` field.
    pub fn version(&self) -> Option<&str> {
        self.text(VE)
    }

    /// The `DE` field.
    pub fn description(&self) -> Option<&str> {
        self.text(DE)
    }

    pub fn is_dirty(&self, key: ParamKey) -> bool {
        self.dirty.contains(&key)
    }

    /// The keys touched since the last [`clean`](Self::clean).
    pub fn dirty_keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.dirty.iter().copied()
    }

    pub fn clean(&mut self) {
        self.dirty.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
