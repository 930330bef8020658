//! Events surfaced to the embedder.

use adc_types::{core::Sid, info::InfoRecord, message::Message, status::Status};

use super::app::HubId;

/// Something the embedder should react to.
///
/// Roster and hub records are carried as snapshots; the connection keeps
/// ownership of the live state. Snapshots still have their dirty bits set,
/// so a listener can tell which fields an update actually touched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// The transport is up; the login handshake is starting.
    ConnectionMade,

    /// The transport is gone, with a human-readable reason.
    ConnectionLost { reason: String },

    /// The hub introduced itself; login completed.
    HubIdentified { info: InfoRecord },

    /// A roster entry appeared or changed.
    UserInfo { sid: Sid, info: InfoRecord },

    /// A user left the hub.
    UserQuit { sid: Sid },

    /// Chat, broadcast or directed at us.
    Message { sid: Sid, text: String },

    /// A non-fatal status from the hub. Fatal statuses also close the
    /// connection right after this event.
    Status { status: Status },

    /// A peer asks for a client-client connection. Transport setup is the
    /// embedder's concern; the full frame is passed along for it.
    DirectConnect { from: Sid, to: Sid, frame: Message },
}

/// An [`Event`] tagged with the hub it happened on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HubEvent {
    pub hub: HubId,
    pub event: Event,
}
