//! Status codes
//!
//! An `STA` message carries a three-character code and a free-text
//! description. The first digit is the severity, the remaining two select a
//! well-known message from the ADC 1.0 table.

use std::fmt;

use thiserror::Error;

/// The first digit of a status code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    Success,
    Recoverable,
    Fatal,
}

impl Severity {
    fn from_digit(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Self::Success),
            b'1' => Some(Self::Recoverable),
            b'2' => Some(Self::Fatal),
            _ => None,
        }
    }

    fn digit(self) -> char {
        match self {
            Self::Success => '0',
            Self::Recoverable => '1',
            Self::Fatal => '2',
        }
    }
}

/// The well-known status codes of ADC 1.0.
const DESCRIPTIONS: &[(&[u8; 2], &str)] = &[
    (b"00", "Generic"),
    (b"10", "Generic hub error"),
    (b"11", "Hub full"),
    (b"12", "Hub disabled"),
    (b"20", "Generic login/access error"),
    (b"21", "Nick invalid"),
    (b"22", "Nick taken"),
    (b"23", "Invalid password"),
    (b"24", "CID taken"),
    (b"25", "Access denied, flag \"FC\" is the FOURCC of the offending command"),
    (b"26", "Registered users only"),
    (b"27", "Invalid PID supplied"),
    (b"30", "Kicks/bans/disconnects generic"),
    (b"31", "Permanently banned"),
    (b"32", "Temporarily banned"),
    (b"40", "Protocol error"),
    (b"41", "Transfer protocol unsupported"),
    (b"42", "Direct connection failed"),
    (b"43", "Required INF field missing/bad"),
    (b"44", "Invalid state"),
    (b"45", "Required feature missing"),
    (b"46", "Invalid IP supplied in INF"),
    (b"47", "No hash support overlap in SUP between client and hub"),
    (b"50", "Client-client / file transfer error"),
    (b"51", "File not available"),
    (b"52", "File part not available"),
    (b"53", "Slots full"),
    (b"54", "No hash support overlap in SUP between clients"),
];

/// A parsed status.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Status {
    severity: Severity,
    code: [u8; 2],
    description: String,
}

impl Status {
    /// Parses the three-character `code` and a free-text description, e.g.
    /// `("240", "Protocol error")`.
    pub fn new(code: &str, description: impl Into<String>) -> Result<Self, InvalidStatus> {
        let bytes = code.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidStatus::BadLength(bytes.len()));
        }

        let severity = Severity::from_digit(bytes[0])
            .ok_or(InvalidStatus::BadSeverity(bytes[0] as char))?;
        let code = [bytes[1], bytes[2]];

        if !DESCRIPTIONS.iter().any(|(known, _)| **known == code) {
            return Err(InvalidStatus::UnknownCode(code_string(code)));
        }

        Ok(Self {
            severity,
            code,
            description: description.into(),
        })
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The two-digit code without the severity, e.g. `"40"`.
    pub fn code(&self) -> String {
        code_string(self.code)
    }

    /// The well-known message behind the code.
    pub fn formal(&self) -> &'static str {
        // # Safety
        //
        // `unwrap` can't panic because `new` rejected unknown codes.
        DESCRIPTIONS
            .iter()
            .find(|(known, _)| **known == self.code)
            .map(|(_, formal)| *formal)
            .unwrap()
    }

    /// The free-text description from the wire.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The three-character wire form, severity digit included.
    pub fn wire_code(&self) -> String {
        format!(
            "{}{}",
            self.severity.digit(),
            code_string(self.code)
        )
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }

    pub fn is_recoverable(&self) -> bool {
        self.severity == Severity::Recoverable
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]({}) {}",
            self.code(),
            self.formal(),
            self.description
        )
    }
}

fn code_string(code: [u8; 2]) -> String {
    // # Safety
    //
    // `unwrap` can't panic because codes come from the ASCII-only table.
    std::str::from_utf8(&code).unwrap().to_owned()
}

#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum InvalidStatus {
    #[error("Status code must be 3 characters, got {0}")]
    BadLength(usize),
    #[error("Invalid severity digit {0:?}")]
    BadSeverity(char),
    #[error("Unknown status code {0}")]
    UnknownCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let status = Status::new("240", "Protocol error").unwrap();

        assert_eq!(Severity::Fatal, status.severity());
        assert!(status.is_fatal());
        assert_eq!("40", status.code());
        assert_eq!("240", status.wire_code());
        assert_eq!("Protocol error", status.formal());
        assert_eq!("[40](Protocol error) Protocol error", status.to_string());
    }

    #[test]
    fn test_severities() {
        assert!(Status::new("000", "").unwrap().is_success());
        assert!(Status::new("111", "").unwrap().is_recoverable());
        assert!(Status::new("253", "").unwrap().is_fatal());
    }

    #[test]
    fn test_invalid() {
        assert_eq!(
            Err(InvalidStatus::BadLength(2)),
            Status::new("24", "short")
        );
        assert_eq!(
            Err(InvalidStatus::BadSeverity('3')),
            Status::new("340", "bad severity")
        );
        assert_eq!(
            Err(InvalidStatus::UnknownCode("99".into())),
            Status::new("299", "unknown")
        );
    }

    #[test]
    fn test_every_table_code_parses() {
        for (code, formal) in DESCRIPTIONS {
            let code = std::str::from_utf8(*code).unwrap();
            let status = Status::new(&format!("0{code}"), "").unwrap();

            assert_eq!(*formal, status.formal());
        }
    }
}
