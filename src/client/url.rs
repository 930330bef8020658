//! `adc://` and `adcs://` hub addresses.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Transport selection for a hub connection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scheme {
    /// Plain TCP.
    Adc,
    /// TLS.
    Adcs,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adc => "adc",
            Self::Adcs => "adcs",
        }
    }
}

/// A parsed hub address: `adc://host:port` or `adcs://host:port`, with an
/// optional username in the authority.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HubUrl {
    pub scheme: Scheme,
    pub username: Option<String>,
    pub host: String,
    pub port: u16,
}

impl FromStr for HubUrl {
    type Err = UrlError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or(UrlError::MissingScheme)?;

        let scheme = match scheme {
            "adc" => Scheme::Adc,
            "adcs" => Scheme::Adcs,
            other => return Err(UrlError::UnknownScheme(other.to_owned())),
        };

        let (username, authority) = match rest.split_once('@') {
            Some((username, authority)) if !username.is_empty() => {
                (Some(username.to_owned()), authority)
            }
            Some((_, authority)) => (None, authority),
            None => (None, rest),
        };

        // Bracketed IPv6 literals keep their colons.
        let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
            let (host, rest) = rest.split_once(']').ok_or(UrlError::MissingHost)?;
            let port = rest.strip_prefix(':').ok_or(UrlError::MissingPort)?;
            (host, port)
        } else {
            authority.rsplit_once(':').ok_or(UrlError::MissingPort)?
        };

        if host.is_empty() {
            return Err(UrlError::MissingHost);
        }

        let port = port
            .parse()
            .map_err(|_| UrlError::InvalidPort(port.to_owned()))?;

        Ok(Self {
            scheme,
            username,
            host: host.to_owned(),
            port,
        })
    }
}

impl fmt::Display for HubUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://", self.scheme.as_str())?;

        if let Some(username) = &self.username {
            write!(f, "{username}@")?;
        }

        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum UrlError {
    #[error("Missing `adc://` or `adcs://` scheme")]
    MissingScheme,
    #[error("Unknown scheme {0:?}")]
    UnknownScheme(String),
    #[error("Missing host")]
    MissingHost,
    #[error("Missing port (ADC mandates no default)")]
    MissingPort,
    #[error("Invalid port {0:?}")]
    InvalidPort(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse() {
        let url: HubUrl = "adc://hub.example.org:1511".parse().unwrap();

        assert_eq!(Scheme::Adc, url.scheme);
        assert_eq!(None, url.username);
        assert_eq!("hub.example.org", url.host);
        assert_eq!(1511, url.port);
    }

    #[test]
    fn test_parse_tls_with_username() {
        let url: HubUrl = "adcs://alice@hub.example.org:1511".parse().unwrap();

        assert_eq!(Scheme::Adcs, url.scheme);
        assert_eq!(Some("alice".to_owned()), url.username);
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let url: HubUrl = "adc://[::1]:1511".parse().unwrap();

        assert_eq!("::1", url.host);
        assert_eq!(1511, url.port);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Err(UrlError::MissingScheme),
            "hub.example.org:1511".parse::<HubUrl>()
        );
        assert_eq!(
            Err(UrlError::UnknownScheme("dchub".into())),
            "dchub://hub:411".parse::<HubUrl>()
        );
        assert_eq!(
            Err(UrlError::MissingPort),
            "adc://hub.example.org".parse::<HubUrl>()
        );
        assert_eq!(
            Err(UrlError::InvalidPort("99999".into())),
            "adc://hub:99999".parse::<HubUrl>()
        );
        assert_eq!(Err(UrlError::MissingHost), "adc://:1511".parse::<HubUrl>());
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "adc://hub.example.org:1511",
            "adcs://alice@hub.example.org:1511",
            "adc://[::1]:1511",
        ] {
            assert_eq!(text, text.parse::<HubUrl>().unwrap().to_string());
        }
    }
}
