//! # State and Flow Diagram
//!
//! A hub connection moves through up to five states. `VERIFY` is only
//! entered when the hub demands a password challenge; `DATA` is the binary
//! mode used for inline transfers.
//!
//! ```text
//!      +----------------------+
//!      |connection established|
//!      +----------------------+
//!                 ||
//!                 \/
//!           +----------+   SUP/SID exchange, feature and
//!           | PROTOCOL |   hash negotiation
//!           +----------+
//!                 ||  ISID
//!                 \/
//!           +----------+   hub INF absorbed, client INF
//!           | IDENTIFY |   (login) sent
//!           +----------+
//!             ||      ||  GPA (password demanded)
//!             ||      \/
//!             ||  +----------+
//!             ||  |  VERIFY  |
//!             ||  +----------+
//!             ||      ||  PAS accepted
//!             \/      \/
//!           +----------+   roster, chat and search
//!           |  NORMAL  |   traffic
//!           +----------+
//!                 ||
//!                 \/
//!           +----------+
//!           |   DATA   |
//!           +----------+
//! ```

/// State of an ADC hub connection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum State {
    /// Feature and hash negotiation; the hub has not assigned a SID yet.
    Protocol,

    /// A SID is assigned; the client must introduce itself with an INF.
    Identify,

    /// The hub demanded a password challenge.
    Verify,

    /// Logged in; roster and chat traffic flows.
    Normal,

    /// Binary transfer mode.
    Data,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "PROTOCOL",
            Self::Identify => "IDENTIFY",
            Self::Verify => "VERIFY",
            Self::Normal => "NORMAL",
            Self::Data => "DATA",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
