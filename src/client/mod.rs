//! Hub-client machinery.
//!
//! [`connection`] holds the transport-free state machine, [`driver`] runs
//! it over a TCP or TLS stream, and [`app`] supervises a set of hubs with a
//! reconnect policy. The embedder observes everything through
//! [`Event`](event::Event)s.

pub mod app;
pub mod connection;
pub mod driver;
pub mod event;
pub mod url;

use thiserror::Error;

use adc_types::{message::InvalidHeader, status::InvalidStatus};

pub use app::{Application, HubDesc, HubHandle, HubId};
pub use connection::{HubConnection, Profile};
pub use event::{Event, HubEvent};
pub use url::{HubUrl, Scheme};

/// Failures of a hub connection.
///
/// Every variant except [`ClientError::InvalidParameter`] ends the
/// connection; a bad single field is logged and dropped instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Malformed frame")]
    MalformedFrame,
    #[error("Line exceeds the {limit} byte limit")]
    LineTooLong { limit: usize },
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeader),
    #[error("Invalid parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),
    #[error("Missing positional parameter {0}")]
    MissingField(usize),
    #[error("Protocol violation: {0}")]
    ProtocolViolation(&'static str),
    #[error("Invalid connection state: {0}")]
    InvalidState(&'static str),
    #[error("No hash support overlap with the hub")]
    NoHashOverlap,
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}
