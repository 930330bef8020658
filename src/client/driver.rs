//! Runs a [`HubConnection`] over a real transport.
//!
//! One task per hub connection. The task owns the connection state, reads
//! frames off a [`Framed`] transport, forwards events to the supervisor's
//! channel, and writes queued messages in `send` order. `adcs` hubs get a
//! TLS session with the platform's trust roots and rustls' safe defaults
//! (TLS 1.2 minimum); certificate validation is whatever the TLS library
//! does by default.

use std::{io, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
};
use tokio_rustls::{
    rustls::{Certificate, ClientConfig, RootCertStore, ServerName},
    TlsConnector,
};
use tokio_util::codec::Framed;

use futures::{SinkExt, StreamExt};

use super::{
    app::{HubDesc, HubId},
    connection::{CloseReason, HubConnection},
    event::{Event, HubEvent},
    ClientError, Scheme,
};
use crate::stream::{AdcCodec, AdcCodecError};

/// In-task commands from the supervisor to one connection.
#[derive(Debug)]
pub enum Command {
    /// Queue a broadcast chat message.
    Chat(String),
    /// Drop the connection (and, from the supervisor, stop reconnecting).
    Disconnect,
}

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

async fn connect(desc: &HubDesc) -> io::Result<Box<dyn Transport>> {
    let tcp = TcpStream::connect((desc.host.as_str(), desc.port)).await?;

    match desc.scheme {
        Scheme::Adc => Ok(Box::new(tcp)),
        Scheme::Adcs => {
            let connector = tls_connector()?;
            let name = ServerName::try_from(desc.host.as_str())
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;

            Ok(Box::new(connector.connect(name, tcp).await?))
        }
    }
}

fn tls_connector() -> io::Result<TlsConnector> {
    let mut roots = RootCertStore::empty();

    for certificate in rustls_native_certs::load_native_certs()? {
        if let Err(error) = roots.add(&Certificate(certificate.0)) {
            log::debug!("skipping unusable root certificate: {error}");
        }
    }

    if roots.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no usable root certificates",
        ));
    }

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Runs one connection until the transport is gone.
///
/// Emits `ConnectionMade`/`ConnectionLost` around the session. Returns
/// `false` when the loss was a deliberate local disconnect, which the
/// supervisor treats as "do not reconnect".
pub(super) async fn run_connection(
    hub: HubId,
    desc: &HubDesc,
    events: &mpsc::Sender<HubEvent>,
    commands: &mut mpsc::Receiver<Command>,
) -> bool {
    let transport = match connect(desc).await {
        Ok(transport) => transport,
        Err(error) => {
            log::info!("hub connection failed: {}:{}: {error}", desc.host, desc.port);
            emit(
                hub,
                events,
                Event::ConnectionLost {
                    reason: error.to_string(),
                },
            )
            .await;
            return true;
        }
    };

    log::info!("hub connection made: {}:{}", desc.host, desc.port);

    let mut framed = Framed::new(transport, AdcCodec::default());
    let mut connection = HubConnection::new(desc.profile.clone());
    connection.start();

    let mut local_disconnect = false;
    let mut reason = None;

    loop {
        if !pump(&mut connection, hub, events, &mut framed).await {
            reason = Some("event channel closed".to_owned());
            local_disconnect = true;
            break;
        }

        if let Some(close) = connection.close_reason() {
            reason = Some(close.to_string());
            break;
        }

        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(message)) => {
                    log::debug!("(hub): {message}");
                    connection.on_frame(&message);
                }
                Some(Err(AdcCodecError::MalformedFrame(line))) => {
                    log::error!("invalid frame, losing connection: {:?}", String::from_utf8_lossy(&line));
                    connection.close(CloseReason::Error(ClientError::MalformedFrame));
                }
                Some(Err(AdcCodecError::LineTooLong { limit, length })) => {
                    log::error!("line of {length} bytes over limit, losing connection");
                    connection.close(CloseReason::Error(ClientError::LineTooLong { limit }));
                }
                Some(Err(AdcCodecError::Io(error))) => {
                    reason = Some(error.to_string());
                    break;
                }
                None => {
                    reason = Some("connection closed by hub".to_owned());
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Chat(text)) => {
                    if let Err(error) = connection.send_chat(&text) {
                        log::warn!("cannot send message to hub: {error}");
                    }
                }
                Some(Command::Disconnect) | None => {
                    local_disconnect = true;
                    reason = Some("disconnected".to_owned());
                    break;
                }
            },
        }
    }

    // Flush whatever the machine still queued (e.g. nothing after a fatal
    // status, but a goodbye message would go here).
    let _ = pump(&mut connection, hub, events, &mut framed).await;
    drop(framed);

    let reason = reason
        .or_else(|| connection.close_reason().map(|close| close.to_string()))
        .unwrap_or_else(|| "connection closed".to_owned());

    log::info!("hub connection lost: {}:{}: {reason}", desc.host, desc.port);
    emit(hub, events, Event::ConnectionLost { reason }).await;

    !local_disconnect
}

/// Drains queued outbound messages and events. Returns `false` once the
/// event receiver is gone.
async fn pump(
    connection: &mut HubConnection,
    hub: HubId,
    events: &mpsc::Sender<HubEvent>,
    framed: &mut Framed<Box<dyn Transport>, AdcCodec>,
) -> bool {
    while let Some(message) = connection.poll_message() {
        log::debug!("(cli): {message}");

        if let Err(error) = framed.send(&message).await {
            log::warn!("send failed: {error}");
            connection.close(CloseReason::Error(ClientError::Transport(io::Error::new(
                io::ErrorKind::BrokenPipe,
                error.to_string(),
            ))));
            break;
        }
    }

    while let Some(event) = connection.poll_event() {
        if events.send(HubEvent { hub, event }).await.is_err() {
            return false;
        }
    }

    true
}

async fn emit(hub: HubId, events: &mpsc::Sender<HubEvent>, event: Event) {
    let _ = events.send(HubEvent { hub, event }).await;
}
