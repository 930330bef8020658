//! The application supervisor.
//!
//! Holds the set of hub descriptors and keeps them connected. A lost
//! connection with the reconnect flag set is retried after a fixed
//! interval; without the flag the descriptor is evicted. Removing a hub
//! clears the flag, requests a disconnect and cancels any pending retry.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::{sync::mpsc, time};

use super::{
    connection::Profile,
    driver::{self, Command},
    event::HubEvent,
    url::{HubUrl, Scheme},
};

/// Identifies one hub within an [`Application`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HubId(u64);

/// Everything needed to keep a session with one hub.
#[derive(Clone, Debug)]
pub struct HubDesc {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub profile: Profile,
    pub reconnect: bool,
}

impl HubDesc {
    /// Builds a descriptor from a parsed hub URL, defaulting the nick to
    /// the URL's username when it carries one.
    pub fn from_url(url: &HubUrl, profile: Profile, reconnect: bool) -> Self {
        let profile = match &url.username {
            Some(username) => Profile {
                nick: username.clone(),
                ..profile
            },
            None => profile,
        };

        Self {
            host: url.host.clone(),
            port: url.port,
            scheme: url.scheme,
            profile,
            reconnect,
        }
    }
}

/// Handle to a supervised hub connection.
#[derive(Debug)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
    reconnect: Arc<AtomicBool>,
}

impl HubHandle {
    /// Queues a broadcast chat message. Dropped with a warning when the hub
    /// is not connected.
    pub fn send_chat(&self, text: impl Into<String>) {
        if self.commands.try_send(Command::Chat(text.into())).is_err() {
            log::warn!("cannot send message to hub, not connected");
        }
    }

    fn disconnect(&self) {
        self.reconnect.store(false, Ordering::Relaxed);
        let _ = self.commands.try_send(Command::Disconnect);
    }
}

/// Supervises a set of hub connections.
#[derive(Debug)]
pub struct Application {
    reconnect_interval: Duration,
    events: mpsc::Sender<HubEvent>,
    hubs: Arc<Mutex<HashMap<HubId, HubHandle>>>,
    next_id: u64,
}

impl Application {
    /// Creates the supervisor and the event stream the embedder consumes.
    pub fn new(reconnect_interval: Duration) -> (Self, mpsc::Receiver<HubEvent>) {
        let (events, receiver) = mpsc::channel(64);

        (
            Self {
                reconnect_interval,
                events,
                hubs: Arc::new(Mutex::new(HashMap::new())),
                next_id: 0,
            },
            receiver,
        )
    }

    /// Registers a hub and starts connecting to it.
    pub fn add_hub(&mut self, desc: HubDesc) -> HubId {
        let id = HubId(self.next_id);
        self.next_id += 1;

        let (commands_tx, commands_rx) = mpsc::channel(16);
        let reconnect = Arc::new(AtomicBool::new(desc.reconnect));

        let handle = HubHandle {
            commands: commands_tx,
            reconnect: Arc::clone(&reconnect),
        };

        // # Safety
        //
        // `unwrap` can't panic: the mutex is only held for map operations,
        // which do not panic.
        self.hubs.lock().unwrap().insert(id, handle);

        tokio::spawn(supervise(
            id,
            desc,
            self.events.clone(),
            commands_rx,
            reconnect,
            self.reconnect_interval,
            Arc::clone(&self.hubs),
        ));

        id
    }

    /// Clears the reconnect flag and disconnects the hub.
    pub fn remove_hub(&mut self, id: HubId) {
        let handle = self.hubs.lock().unwrap().remove(&id);

        match handle {
            Some(handle) => handle.disconnect(),
            None => log::warn!("remove_hub: no such hub {id:?}"),
        }
    }

    /// Runs `f` with the handle of a connected hub.
    pub fn with_hub<R>(&self, id: HubId, f: impl FnOnce(&HubHandle) -> R) -> Option<R> {
        self.hubs.lock().unwrap().get(&id).map(f)
    }

    /// Queues a broadcast chat message on one hub.
    pub fn send_chat(&self, id: HubId, text: impl Into<String>) {
        let text = text.into();

        if self.with_hub(id, |hub| hub.send_chat(text)).is_none() {
            log::warn!("send_chat: no such hub {id:?}");
        }
    }
}

async fn supervise(
    id: HubId,
    desc: HubDesc,
    events: mpsc::Sender<HubEvent>,
    mut commands: mpsc::Receiver<Command>,
    reconnect: Arc<AtomicBool>,
    interval: Duration,
    hubs: Arc<Mutex<HashMap<HubId, HubHandle>>>,
) {
    loop {
        let retryable = driver::run_connection(id, &desc, &events, &mut commands).await;

        if !retryable || !reconnect.load(Ordering::Relaxed) {
            break;
        }

        log::info!(
            "reconnecting to {}:{} in {:?}",
            desc.host,
            desc.port,
            interval
        );

        // The sleep races against a disconnect request so that removing
        // the hub cancels a pending reconnect.
        tokio::select! {
            _ = time::sleep(interval) => {}
            command = commands.recv() => match command {
                Some(Command::Disconnect) | None => break,
                Some(Command::Chat(_)) => {
                    log::warn!("cannot send message to hub, not connected");
                }
            },
        }

        if !reconnect.load(Ordering::Relaxed) {
            break;
        }
    }

    hubs.lock().unwrap().remove(&id);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::client::Event;

    use super::*;

    fn desc(reconnect: bool) -> HubDesc {
        HubDesc {
            host: "127.0.0.1".into(),
            port: 1,
            scheme: Scheme::Adc,
            profile: Profile {
                nick: "tester".into(),
                share_size: 0,
            },
            reconnect,
        }
    }

    #[test]
    fn test_desc_from_url_adopts_username() {
        let url: HubUrl = "adcs://carol@hub.example.org:1511".parse().unwrap();
        let desc = HubDesc::from_url(
            &url,
            Profile {
                nick: "fallback".into(),
                share_size: 7,
            },
            true,
        );

        assert_eq!("carol", desc.profile.nick);
        assert_eq!(7, desc.profile.share_size);
        assert_eq!(Scheme::Adcs, desc.scheme);
    }

    #[tokio::test]
    async fn test_failed_connect_without_reconnect_evicts() {
        let (mut app, mut events) = Application::new(Duration::from_millis(10));

        // Port 1 refuses connections; with reconnect off the descriptor
        // must be evicted after the failure event.
        let id = app.add_hub(desc(false));

        let event = events.recv().await.unwrap();
        assert_eq!(id, event.hub);
        assert!(matches!(event.event, Event::ConnectionLost { .. }));

        // Give the supervisor a beat to clean up.
        time::sleep(Duration::from_millis(50)).await;
        assert!(app.with_hub(id, |_| ()).is_none());
    }

    #[tokio::test]
    async fn test_remove_hub_cancels_reconnect() {
        let (mut app, mut events) = Application::new(Duration::from_secs(3600));

        let id = app.add_hub(desc(true));

        // First failure arrives, then the supervisor sits in its retry
        // sleep until we remove the hub.
        let _ = events.recv().await.unwrap();
        app.remove_hub(id);

        time::sleep(Duration::from_millis(50)).await;
        assert!(app.with_hub(id, |_| ()).is_none());
    }
}
