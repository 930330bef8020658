//! The transport-free hub connection.
//!
//! [`HubConnection`] consumes parsed frames and produces outbound messages
//! and [`Event`]s; the driver moves bytes. Dispatch goes through a static
//! table keyed by connection state, header kind and the packed command
//! name. A frame without a table entry is logged and dropped; a handler
//! error closes the connection, because a hub session cannot recover from a
//! bug mid-handshake.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use adc_types::{
    core::{CommandName, FeatureName, ParamKey, Sid},
    info::InfoRecord,
    message::{Header, HeaderKind, Message},
    param::Base32Value,
    state::State,
    status::Status,
};

use crate::hash::{self, HashMethod};

use super::{event::Event, ClientError};

const AD: ParamKey = ParamKey::from_static(b"AD");
const RM: ParamKey = ParamKey::from_static(b"RM");
const NI: ParamKey = ParamKey::from_static(b"NI");
const SS: ParamKey = ParamKey::from_static(b"SS");
const ID: ParamKey = ParamKey::from_static(b"ID");
const PD: ParamKey = ParamKey::from_static(b"PD");

const CMD_SUP: CommandName = CommandName::from_static(b"SUP");
const CMD_INF: CommandName = CommandName::from_static(b"INF");
const CMD_MSG: CommandName = CommandName::from_static(b"MSG");

/// Protocol features we are willing to negotiate besides the hash methods.
const SUPPORTED_FEATURES: &[FeatureName] = &[
    FeatureName::from_static(b"BASE"),
    FeatureName::from_static(b"ZLIB"),
];

/// Chat lines kept in the per-connection ring.
const MESSAGE_BUFFER: usize = 1000;

/// What the embedder advertises about itself during login.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    pub nick: String,
    pub share_size: u64,
}

/// Why a connection ended.
#[derive(Debug)]
pub enum CloseReason {
    Error(ClientError),
    FatalStatus(Status),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Error(error) => write!(f, "{error}"),
            Self::FatalStatus(status) => write!(f, "fatal status from hub: {status}"),
        }
    }
}

type Handler = fn(&mut HubConnection, &Message) -> Result<(), ClientError>;

/// The handler table. Frames are routed on the connection state, the
/// header kind and the 24-bit packed command name.
const DISPATCH: &[(State, HeaderKind, u32, Handler)] = &[
    (
        State::Protocol,
        HeaderKind::Info,
        CommandName::pack(b"SUP"),
        HubConnection::on_protocol_sup,
    ),
    (
        State::Protocol,
        HeaderKind::Info,
        CommandName::pack(b"SID"),
        HubConnection::on_protocol_sid,
    ),
    (
        State::Identify,
        HeaderKind::Info,
        CommandName::pack(b"INF"),
        HubConnection::on_identify_inf,
    ),
    (
        State::Identify,
        HeaderKind::Info,
        CommandName::pack(b"STA"),
        HubConnection::on_status,
    ),
    (
        State::Normal,
        HeaderKind::Info,
        CommandName::pack(b"INF"),
        HubConnection::on_normal_inf,
    ),
    (
        State::Normal,
        HeaderKind::Info,
        CommandName::pack(b"STA"),
        HubConnection::on_status,
    ),
    (
        State::Normal,
        HeaderKind::Broadcast,
        CommandName::pack(b"INF"),
        HubConnection::on_user_inf,
    ),
    (
        State::Normal,
        HeaderKind::Broadcast,
        CommandName::pack(b"MSG"),
        HubConnection::on_chat,
    ),
    (
        State::Normal,
        HeaderKind::Direct,
        CommandName::pack(b"MSG"),
        HubConnection::on_direct_chat,
    ),
    (
        State::Normal,
        HeaderKind::Info,
        CommandName::pack(b"QUI"),
        HubConnection::on_quit,
    ),
    (
        State::Normal,
        HeaderKind::Direct,
        CommandName::pack(b"CTM"),
        HubConnection::on_direct_connect,
    ),
    (
        State::Normal,
        HeaderKind::Direct,
        CommandName::pack(b"RCM"),
        HubConnection::on_direct_connect,
    ),
];

fn dispatch(state: State, kind: HeaderKind, command: u32) -> Option<Handler> {
    DISPATCH
        .iter()
        .find(|(s, k, c, _)| *s == state && *k == kind && *c == command)
        .map(|(_, _, _, handler)| *handler)
}

/// State machine of a single hub connection.
#[derive(Debug)]
pub struct HubConnection {
    state: State,
    profile: Profile,
    sid: Option<Sid>,
    pid: Option<Vec<u8>>,
    cid: Option<Vec<u8>>,
    features: BTreeSet<FeatureName>,
    hash_method: Option<&'static HashMethod>,
    hub_info: InfoRecord,
    users: HashMap<Sid, InfoRecord>,
    nicks: HashMap<String, Sid>,
    recent: VecDeque<(Sid, String)>,
    outbox: VecDeque<Message>,
    events: VecDeque<Event>,
    closed: Option<CloseReason>,
}

impl HubConnection {
    pub fn new(profile: Profile) -> Self {
        Self {
            state: State::Protocol,
            profile,
            sid: None,
            pid: None,
            cid: None,
            features: BTreeSet::new(),
            hash_method: None,
            hub_info: InfoRecord::new(),
            users: HashMap::new(),
            nicks: HashMap::new(),
            recent: VecDeque::new(),
            outbox: VecDeque::new(),
            events: VecDeque::new(),
            closed: None,
        }
    }

    /// Entry point, right after the transport comes up: announce the
    /// supported hashes and `BASE`, then wait for `ISUP`.
    pub fn start(&mut self) {
        self.events.push_back(Event::ConnectionMade);

        let mut sup = Message::new(Header::Hub { cmd: CMD_SUP });

        for method in hash::methods() {
            sup.push_named(AD, method.name.as_str());
        }

        sup.push_named(AD, "BASE");
        self.outbox.push_back(sup);
    }

    /// Feeds one parsed frame through the dispatch table.
    pub fn on_frame(&mut self, frame: &Message) {
        // Keep-alive.
        let Some(header) = frame.header() else {
            return;
        };

        let command = header.command();

        let Some(handler) = dispatch(self.state, header.kind(), command.packed()) else {
            log::warn!(
                "unhandled: state={} header={}{}",
                self.state,
                header.kind().as_byte() as char,
                command,
            );
            return;
        };

        if let Err(error) = handler(self, frame) {
            log::error!("closing connection: {error}");
            self.close(CloseReason::Error(error));
        }
    }

    /// Requests connection teardown; the first reason wins.
    pub fn close(&mut self, reason: CloseReason) {
        if self.closed.is_none() {
            self.closed = Some(reason);
        }
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.closed.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// The next outbound message, in `send` order.
    pub fn poll_message(&mut self) -> Option<Message> {
        self.outbox.pop_front()
    }

    /// The next pending event, in emit order.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn sid(&self) -> Option<Sid> {
        self.sid
    }

    pub fn pid(&self) -> Option<&[u8]> {
        self.pid.as_deref()
    }

    pub fn cid(&self) -> Option<&[u8]> {
        self.cid.as_deref()
    }

    pub fn features(&self) -> &BTreeSet<FeatureName> {
        &self.features
    }

    pub fn hash_method(&self) -> Option<&'static HashMethod> {
        self.hash_method
    }

    pub fn hub_info(&self) -> &InfoRecord {
        &self.hub_info
    }

    pub fn user(&self, sid: Sid) -> Option<&InfoRecord> {
        self.users.get(&sid)
    }

    pub fn users(&self) -> impl Iterator<Item = (Sid, &InfoRecord)> {
        self.users.iter().map(|(sid, info)| (*sid, info))
    }

    pub fn sid_of_nick(&self, nick: &str) -> Option<Sid> {
        self.nicks.get(nick).copied()
    }

    /// The bounded ring of recent chat lines.
    pub fn recent_messages(&self) -> impl Iterator<Item = (Sid, &str)> {
        self.recent.iter().map(|(sid, text)| (*sid, text.as_str()))
    }

    /// Queues a broadcast chat message.
    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        let sid = self.require_logged_in()?;

        self.outbox
            .push_back(Message::new(Header::Broadcast { cmd: CMD_MSG, sid }).with_param(text));

        Ok(())
    }

    /// Queues a direct chat message to `target`.
    pub fn send_private(&mut self, target: Sid, text: &str) -> Result<(), ClientError> {
        let sid = self.require_logged_in()?;

        self.outbox.push_back(
            Message::new(Header::Direct {
                cmd: CMD_MSG,
                sid,
                target,
            })
            .with_param(text),
        );

        Ok(())
    }

    /// Queues a raw message. The caller is responsible for its fit with the
    /// current state.
    pub fn send_message(&mut self, message: Message) {
        self.outbox.push_back(message);
    }

    fn require_logged_in(&self) -> Result<Sid, ClientError> {
        if self.state != State::Normal {
            return Err(ClientError::InvalidState("not logged in"));
        }

        self.sid
            .ok_or(ClientError::InvalidState("no session ID assigned"))
    }

    fn set_state(&mut self, state: State) {
        log::debug!("state: {} -> {state}", self.state);
        self.state = state;
    }

    fn hash_size(&self) -> usize {
        self.hash_method.map(|method| method.size).unwrap_or(24)
    }

    /// `ISUP` during PROTOCOL: intersect the hub's feature selection with
    /// ours and settle on a hash method.
    fn on_protocol_sup(&mut self, frame: &Message) -> Result<(), ClientError> {
        for raw in frame.get_named(AD) {
            let Ok(feature) = FeatureName::try_from(raw) else {
                log::warn!("dropping invalid feature name {raw:?}");
                continue;
            };

            if let Some(method) = hash::lookup(feature) {
                self.hash_method = Some(method);
            } else if SUPPORTED_FEATURES.contains(&feature) {
                self.features.insert(feature);
            } else {
                log::debug!("feature not supported: {feature}");
            }
        }

        for raw in frame.get_named(RM) {
            let Ok(feature) = FeatureName::try_from(raw) else {
                log::warn!("dropping invalid feature name {raw:?}");
                continue;
            };

            if self.hash_method.map(|method| method.name) == Some(feature) {
                self.hash_method = None;
            }

            self.features.remove(&feature);
        }

        if self.hash_method.is_none() {
            return Err(ClientError::NoHashOverlap);
        }

        Ok(())
    }

    /// `ISID` during PROTOCOL: adopt the assigned SID and derive our
    /// identity from a fresh private ID.
    fn on_protocol_sid(&mut self, frame: &Message) -> Result<(), ClientError> {
        if self.sid.is_some() {
            return Err(ClientError::ProtocolViolation("SID assigned twice"));
        }

        let raw = frame
            .get_positional(0)
            .ok_or(ClientError::MissingField(0))?;
        let sid =
            Sid::try_from(raw.as_str()).map_err(|error| ClientError::InvalidParameter {
                key: "SID".into(),
                reason: error.to_string(),
            })?;

        let method = self
            .hash_method
            .ok_or(ClientError::InvalidState("SID before hash negotiation"))?;

        let seed: [u8; 16] = rand::random();
        let pid = method.digest(&[&seed]);
        let cid = method.digest(&[&pid]);

        self.sid = Some(sid);
        self.pid = Some(pid);
        self.cid = Some(cid);
        self.set_state(State::Identify);

        Ok(())
    }

    /// `IINF` during IDENTIFY: absorb the hub's own INFO, answer with our
    /// login `BINF`, and move to NORMAL.
    fn on_identify_inf(&mut self, frame: &Message) -> Result<(), ClientError> {
        if self.sid.is_none() {
            return Err(ClientError::InvalidState("hub INF before SID assignment"));
        }

        self.absorb_hub_info(frame);

        self.events.push_back(Event::HubIdentified {
            info: self.hub_info.clone(),
        });
        self.hub_info.clean();

        self.send_login()?;
        self.set_state(State::Normal);

        Ok(())
    }

    /// `IINF` during NORMAL keeps the hub record current.
    fn on_normal_inf(&mut self, frame: &Message) -> Result<(), ClientError> {
        self.absorb_hub_info(frame);
        self.hub_info.clean();

        Ok(())
    }

    fn absorb_hub_info(&mut self, frame: &Message) {
        let size = self.hash_size();

        for key in frame.named_keys() {
            let Some(value) = frame.get_first(key) else {
                continue;
            };

            if let Err(error) = self.hub_info.set(key, value, size) {
                log::warn!("dropping hub INF field {key}: {error}");
            }
        }
    }

    fn send_login(&mut self) -> Result<(), ClientError> {
        let (Some(sid), Some(pid), Some(cid)) = (self.sid, &self.pid, &self.cid) else {
            return Err(ClientError::InvalidState("login before identification"));
        };

        let message = Message::new(Header::Broadcast { cmd: CMD_INF, sid })
            .with_named(NI, self.profile.nick.clone())
            .with_named(SS, self.profile.share_size.to_string())
            .with_named(ID, Base32Value::new(cid.clone()).encode())
            .with_named(PD, Base32Value::new(pid.clone()).encode());

        self.outbox.push_back(message);

        Ok(())
    }

    /// `BINF` during NORMAL: upsert the roster entry and notify once.
    fn on_user_inf(&mut self, frame: &Message) -> Result<(), ClientError> {
        let sid = frame
            .header()
            .and_then(Header::sid)
            .ok_or(ClientError::MalformedFrame)?;

        let own = self.sid == Some(sid);
        let size = self.hash_size();

        let info = self.users.entry(sid).or_default();
        let previous_nick = info.nick().map(str::to_owned);

        for key in frame.named_keys() {
            let Some(value) = frame.get_first(key) else {
                continue;
            };

            if let Err(error) = info.set(key, value, size) {
                log::warn!("dropping INF field {key} of {sid}: {error}");
            }
        }

        let nick = info.nick().map(str::to_owned);
        let snapshot = info.clone();
        info.clean();

        if nick != previous_nick {
            if let Some(previous) = previous_nick {
                self.nicks.remove(&previous);
            }
            if let Some(nick) = nick {
                self.nicks.insert(nick, sid);
            }
        }

        if !own {
            self.events.push_back(Event::UserInfo {
                sid,
                info: snapshot,
            });
        }

        Ok(())
    }

    /// `BMSG` during NORMAL.
    fn on_chat(&mut self, frame: &Message) -> Result<(), ClientError> {
        let sid = frame
            .header()
            .and_then(Header::sid)
            .ok_or(ClientError::MalformedFrame)?;
        let text = frame
            .get_positional(0)
            .ok_or(ClientError::MissingField(0))?;

        if !self.users.contains_key(&sid) {
            log::warn!("chat from unknown SID {sid}");
            return Ok(());
        }

        self.push_recent(sid, &text);
        self.events.push_back(Event::Message { sid, text });

        Ok(())
    }

    /// `DMSG` during NORMAL: a private message addressed to us.
    fn on_direct_chat(&mut self, frame: &Message) -> Result<(), ClientError> {
        let header = frame.header().ok_or(ClientError::MalformedFrame)?;
        let sid = header.sid().ok_or(ClientError::MalformedFrame)?;

        if header.target() != self.sid {
            log::warn!("private message for {:?}, not us", header.target());
            return Ok(());
        }

        let text = frame
            .get_positional(0)
            .ok_or(ClientError::MissingField(0))?;

        if !self.users.contains_key(&sid) {
            log::warn!("chat from unknown SID {sid}");
            return Ok(());
        }

        self.push_recent(sid, &text);
        self.events.push_back(Event::Message { sid, text });

        Ok(())
    }

    fn push_recent(&mut self, sid: Sid, text: &str) {
        self.recent.push_back((sid, text.to_owned()));

        if self.recent.len() > MESSAGE_BUFFER {
            self.recent.pop_front();
        }
    }

    /// `IQUI` during NORMAL.
    fn on_quit(&mut self, frame: &Message) -> Result<(), ClientError> {
        let raw = frame
            .get_positional(0)
            .ok_or(ClientError::MissingField(0))?;
        let sid =
            Sid::try_from(raw.as_str()).map_err(|error| ClientError::InvalidParameter {
                key: "SID".into(),
                reason: error.to_string(),
            })?;

        match self.users.remove(&sid) {
            Some(info) => {
                if let Some(nick) = info.nick() {
                    self.nicks.remove(nick);
                }

                self.events.push_back(Event::UserQuit { sid });
            }
            None => log::warn!("quit for unknown SID {sid}"),
        }

        Ok(())
    }

    /// `DCTM`/`DRCM` during NORMAL: surface the request, hand transport
    /// setup to the embedder.
    fn on_direct_connect(&mut self, frame: &Message) -> Result<(), ClientError> {
        let header = frame.header().ok_or(ClientError::MalformedFrame)?;
        let (Some(from), Some(to)) = (header.sid(), header.target()) else {
            return Err(ClientError::MalformedFrame);
        };

        if !self.users.contains_key(&from) {
            log::warn!("connect request from unknown SID {from}");
            return Ok(());
        }

        self.events.push_back(Event::DirectConnect {
            from,
            to,
            frame: frame.clone(),
        });

        Ok(())
    }

    /// `ISTA` during IDENTIFY or NORMAL: surface the status, closing on a
    /// fatal one. An unknown code is treated as fatal to be safe.
    fn on_status(&mut self, frame: &Message) -> Result<(), ClientError> {
        let code = frame
            .get_positional(0)
            .ok_or(ClientError::MissingField(0))?;
        let description = frame
            .get_positional(1)
            .ok_or(ClientError::MissingField(1))?;

        let status = Status::new(&code, description)?;

        self.events.push_back(Event::Status {
            status: status.clone(),
        });

        if status.is_fatal() {
            log::error!("fatal status from hub: {status}");
            self.close(CloseReason::FatalStatus(status));
        }

        Ok(())
    }
}
