//! Message model
//!
//! A message is a header plus a list of parameter tokens. Tokens are stored
//! with their detected kind: a token whose first two bytes form a valid
//! parameter name is named, everything else is positional. Index-based
//! access still sees every token (a SID like `AABB` begins with a valid key,
//! yet is addressed positionally by commands such as `IQUI`), so positional
//! lookup reconstructs the raw token on demand.

use std::{collections::BTreeSet, fmt};

use thiserror::Error;

use crate::{
    core::{
        Cid, CidError, CommandName, CommandNameError, FeatureName, FeatureNameError, ParamKey,
        Sid, SidError,
    },
    utils::escape_param,
};

/// The routing class of a message, the first byte on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HeaderKind {
    Broadcast,
    Client,
    Info,
    Hub,
    Direct,
    Echo,
    Feature,
    Udp,
}

impl HeaderKind {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Broadcast => b'B',
            Self::Client => b'C',
            Self::Info => b'I',
            Self::Hub => b'H',
            Self::Direct => b'D',
            Self::Echo => b'E',
            Self::Feature => b'F',
            Self::Udp => b'U',
        }
    }
}

/// Whether a feature-broadcast entry selects for or against a feature.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FeatureOp {
    Add,
    Remove,
}

impl FeatureOp {
    pub fn sign(self) -> char {
        match self {
            Self::Add => '+',
            Self::Remove => '-',
        }
    }
}

/// A message header.
///
/// One variant per routing class; B, D, E and F carry the sender SID, D and
/// E additionally the target SID, F an ordered feature selection, U the
/// sender CID.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Header {
    Broadcast {
        cmd: CommandName,
        sid: Sid,
    },
    Client {
        cmd: CommandName,
    },
    Info {
        cmd: CommandName,
    },
    Hub {
        cmd: CommandName,
    },
    Direct {
        cmd: CommandName,
        sid: Sid,
        target: Sid,
    },
    Echo {
        cmd: CommandName,
        sid: Sid,
        target: Sid,
    },
    Feature {
        cmd: CommandName,
        sid: Sid,
        features: Vec<(FeatureOp, FeatureName)>,
    },
    Udp {
        cmd: CommandName,
        cid: Cid,
    },
}

impl Header {
    /// Builds a broadcast header from raw strings, validating both fields.
    pub fn broadcast(cmd: &str, sid: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Broadcast {
            cmd: CommandName::try_from(cmd)?,
            sid: Sid::try_from(sid)?,
        })
    }

    pub fn info(cmd: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Info {
            cmd: CommandName::try_from(cmd)?,
        })
    }

    pub fn hub(cmd: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Hub {
            cmd: CommandName::try_from(cmd)?,
        })
    }

    pub fn client(cmd: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Client {
            cmd: CommandName::try_from(cmd)?,
        })
    }

    pub fn direct(cmd: &str, sid: &str, target: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Direct {
            cmd: CommandName::try_from(cmd)?,
            sid: Sid::try_from(sid)?,
            target: Sid::try_from(target)?,
        })
    }

    pub fn echo(cmd: &str, sid: &str, target: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Echo {
            cmd: CommandName::try_from(cmd)?,
            sid: Sid::try_from(sid)?,
            target: Sid::try_from(target)?,
        })
    }

    /// Builds a feature-broadcast header. The feature selection must not be
    /// empty.
    pub fn feature(
        cmd: CommandName,
        sid: Sid,
        features: Vec<(FeatureOp, FeatureName)>,
    ) -> Result<Self, InvalidHeader> {
        if features.is_empty() {
            return Err(InvalidHeader::EmptyFeatureList);
        }

        Ok(Self::Feature { cmd, sid, features })
    }

    pub fn udp(cmd: &str, cid: &str) -> Result<Self, InvalidHeader> {
        Ok(Self::Udp {
            cmd: CommandName::try_from(cmd)?,
            cid: Cid::try_from(cid)?,
        })
    }

    pub fn kind(&self) -> HeaderKind {
        match self {
            Self::Broadcast { .. } => HeaderKind::Broadcast,
            Self::Client { .. } => HeaderKind::Client,
            Self::Info { .. } => HeaderKind::Info,
            Self::Hub { .. } => HeaderKind::Hub,
            Self::Direct { .. } => HeaderKind::Direct,
            Self::Echo { .. } => HeaderKind::Echo,
            Self::Feature { .. } => HeaderKind::Feature,
            Self::Udp { .. } => HeaderKind::Udp,
        }
    }

    pub fn command(&self) -> CommandName {
        match self {
            Self::Broadcast { cmd, .. }
            | Self::Client { cmd }
            | Self::Info { cmd }
            | Self::Hub { cmd }
            | Self::Direct { cmd, .. }
            | Self::Echo { cmd, .. }
            | Self::Feature { cmd, .. }
            | Self::Udp { cmd, .. } => *cmd,
        }
    }

    /// The sender SID, for the classes that carry one.
    pub fn sid(&self) -> Option<Sid> {
        match self {
            Self::Broadcast { sid, .. }
            | Self::Direct { sid, .. }
            | Self::Echo { sid, .. }
            | Self::Feature { sid, .. } => Some(*sid),
            _ => None,
        }
    }

    /// The target SID of D and E headers.
    pub fn target(&self) -> Option<Sid> {
        match self {
            Self::Direct { target, .. } | Self::Echo { target, .. } => Some(*target),
            _ => None,
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Broadcast { cmd, sid } => write!(f, "B{cmd} {sid}"),
            Self::Client { cmd } => write!(f, "C{cmd}"),
            Self::Info { cmd } => write!(f, "I{cmd}"),
            Self::Hub { cmd } => write!(f, "H{cmd}"),
            Self::Direct { cmd, sid, target } => write!(f, "D{cmd} {sid} {target}"),
            Self::Echo { cmd, sid, target } => write!(f, "E{cmd} {sid} {target}"),
            Self::Feature { cmd, sid, features } => {
                write!(f, "F{cmd} {sid}")?;

                for (op, feature) in features {
                    write!(f, " {}{feature}", op.sign())?;
                }

                Ok(())
            }
            Self::Udp { cmd, cid } => write!(f, "U{cmd} {cid}"),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum InvalidHeader {
    #[error("Invalid command name: {0}")]
    Command(#[from] CommandNameError),
    #[error("Invalid SID: {0}")]
    Sid(#[from] SidError),
    #[error("Invalid CID: {0}")]
    Cid(#[from] CidError),
    #[error("Invalid feature name: {0}")]
    Feature(#[from] FeatureNameError),
    #[error("Feature selection must not be empty")]
    EmptyFeatureList,
}

/// A single parameter token in its decoded (unescaped) form.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Param {
    Positional(String),
    Named(ParamKey, String),
}

impl Param {
    /// Classifies a decoded token: named when its first two bytes form a
    /// parameter name, positional otherwise.
    ///
    /// Escape sequences decode to space, newline or backslash, none of which
    /// can begin a name, so classifying the decoded form is equivalent to
    /// classifying the raw one.
    pub fn classify(token: String) -> Self {
        let bytes = token.as_bytes();

        if bytes.len() >= 2 && ParamKey::matches(bytes[0], bytes[1]) {
            // # Safety
            //
            // `unwrap` can't panic because `matches` checked both bytes.
            let key = ParamKey::try_from(&bytes[..2]).unwrap();
            Self::Named(key, token[2..].to_owned())
        } else {
            Self::Positional(token)
        }
    }

    pub fn key(&self) -> Option<ParamKey> {
        match self {
            Self::Named(key, _) => Some(*key),
            Self::Positional(_) => None,
        }
    }

    /// The full decoded token, reconstructing `key ++ value` for named
    /// parameters.
    pub fn token(&self) -> String {
        match self {
            Self::Positional(value) => value.clone(),
            Self::Named(key, value) => format!("{key}{value}"),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Positional(value) => f.write_str(&escape_param(value)),
            Self::Named(key, value) => write!(f, "{key}{}", escape_param(value)),
        }
    }
}

/// A complete protocol message.
///
/// A `None` header models the empty keep-alive line.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Message {
    header: Option<Header>,
    params: Vec<Param>,
}

impl Message {
    pub fn new(header: Header) -> Self {
        Self {
            header: Some(header),
            params: Vec::new(),
        }
    }

    /// The empty line that hubs send to keep the connection alive.
    pub fn keep_alive() -> Self {
        Self {
            header: None,
            params: Vec::new(),
        }
    }

    pub fn from_parts(header: Header, params: Vec<Param>) -> Self {
        Self {
            header: Some(header),
            params,
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Appends a parameter token, classifying it the same way the parser
    /// would. This keeps constructed and re-parsed messages structurally
    /// equal.
    pub fn push_param(&mut self, token: impl Into<String>) {
        self.params.push(Param::classify(token.into()));
    }

    pub fn push_named(&mut self, key: ParamKey, value: impl Into<String>) {
        self.params.push(Param::Named(key, value.into()));
    }

    pub fn with_param(mut self, token: impl Into<String>) -> Self {
        self.push_param(token);
        self
    }

    pub fn with_named(mut self, key: ParamKey, value: impl Into<String>) -> Self {
        self.push_named(key, value.into());
        self
    }

    /// The `index`-th parameter token, regardless of its detected kind.
    pub fn get_positional(&self, index: usize) -> Option<String> {
        self.params.get(index).map(Param::token)
    }

    /// Every value carried under `key`, in order of appearance.
    pub fn get_named(&self, key: ParamKey) -> Vec<&str> {
        self.params
            .iter()
            .filter_map(|param| match param {
                Param::Named(k, value) if *k == key => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The first value carried under `key`.
    pub fn get_first(&self, key: ParamKey) -> Option<&str> {
        self.params.iter().find_map(|param| match param {
            Param::Named(k, value) if *k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// The set of named keys present on the message.
    pub fn named_keys(&self) -> BTreeSet<ParamKey> {
        self.params.iter().filter_map(Param::key).collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Some(header) = &self.header else {
            return Ok(());
        };

        write!(f, "{header}")?;

        for param in &self.params {
            write!(f, " {param}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_header_display() {
        let tests: [(Header, &str); 4] = [
            (Header::broadcast("ART", "AAAA").unwrap(), "BART AAAA"),
            (Header::info("STA").unwrap(), "ISTA"),
            (Header::direct("CTM", "AAAA", "BBBB").unwrap(), "DCTM AAAA BBBB"),
            (
                Header::feature(
                    CommandName::from_static(b"SCH"),
                    Sid::try_from("AAAA").unwrap(),
                    vec![
                        (FeatureOp::Add, FeatureName::from_static(b"TCP4")),
                        (FeatureOp::Remove, FeatureName::from_static(b"NAT0")),
                    ],
                )
                .unwrap(),
                "FSCH AAAA +TCP4 -NAT0",
            ),
        ];

        for (header, expected) in tests {
            assert_eq!(expected, header.to_string());
        }
    }

    #[test]
    fn test_feature_header_requires_features() {
        assert_eq!(
            Err(InvalidHeader::EmptyFeatureList),
            Header::feature(
                CommandName::from_static(b"SCH"),
                Sid::try_from("AAAA").unwrap(),
                Vec::new(),
            )
        );
    }

    #[test]
    fn test_param_classification() {
        assert_eq!(
            Param::Named(ParamKey::from_static(b"NI"), "alice".into()),
            Param::classify("NIalice".into())
        );
        // Two bytes with nothing following are still a named (empty) value.
        assert_eq!(
            Param::Named(ParamKey::from_static(b"AD"), "".into()),
            Param::classify("AD".into())
        );
        // Lowercase second byte prevents a name match.
        assert_eq!(
            Param::Positional("Hello world".into()),
            Param::classify("Hello world".into())
        );
        assert_eq!(Param::Positional("240".into()), Param::classify("240".into()));
    }

    #[test]
    fn test_positional_access_reconstructs_tokens() {
        // The SID argument of IQUI happens to start with a valid key.
        let message = Message::new(Header::info("QUI").unwrap()).with_param("AABB");

        assert_eq!(Some("AABB".to_owned()), message.get_positional(0));
        assert_eq!(None, message.get_positional(1));
    }

    #[test]
    fn test_named_access() {
        let message = Message::new(Header::hub("SUP").unwrap())
            .with_named(ParamKey::from_static(b"AD"), "TIGR")
            .with_named(ParamKey::from_static(b"AD"), "BASE")
            .with_named(ParamKey::from_static(b"RM"), "NONE");

        assert_eq!(
            vec!["TIGR", "BASE"],
            message.get_named(ParamKey::from_static(b"AD"))
        );
        assert_eq!(Some("TIGR"), message.get_first(ParamKey::from_static(b"AD")));
        assert_eq!(
            vec![ParamKey::from_static(b"AD"), ParamKey::from_static(b"RM")],
            message.named_keys().into_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_message_display_escapes_values() {
        let message =
            Message::new(Header::broadcast("MSG", "AAAB").unwrap()).with_param("Hello world");

        assert_eq!("BMSG AAAB Hello\\sworld", message.to_string());
    }

    #[test]
    fn test_keep_alive_renders_empty() {
        assert_eq!("", Message::keep_alive().to_string());
    }
}
