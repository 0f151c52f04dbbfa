use crate::messages::EventFrame;
use crate::network::error::{ClientError, Result};
use crate::session::SessionIdentity;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, trace, warn};

/// Handshake header naming the game the socket is bound to
pub const GAME_ID_HEADER: &str = "Game-ID";

/// What the connection asks the writer task to do
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(EventFrame),
    Close,
}

/// Frames from the reader task. An `Err` is a transport failure; the channel
/// closing means the transport is gone.
pub type Inbound = std::result::Result<EventFrame, ClientError>;

/// The two ends a `GameConnection` needs from a transport
#[derive(Debug)]
pub struct SocketChannels {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
}

/// Handshake headers for a game socket
pub fn handshake_headers(identity: &SessionIdentity, game_id: i64) -> Result<[(&'static str, HeaderValue); 2]> {
    let authorization = HeaderValue::from_str(&identity.authorization())
        .map_err(|_| ClientError::InvalidRequest("session token is not a valid header".into()))?;
    Ok([
        ("authorization", authorization),
        (GAME_ID_HEADER, HeaderValue::from(game_id)),
    ])
}

/// Open a WebSocket to `url`, authenticate with `identity`, and bridge it to
/// a pair of channels served by a reader task and a writer task
#[instrument(skip(identity), fields(session_id = identity.session_id()))]
pub async fn open(url: &str, identity: &SessionIdentity, game_id: i64) -> Result<SocketChannels> {
    let mut request = url.into_client_request()?;
    for (name, value) in handshake_headers(identity, game_id)? {
        request.headers_mut().insert(name, value);
    }

    let (stream, response) = connect_async(request).await?;
    info!("Game socket handshake complete ({})", response.status());

    let (mut sink, mut stream) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Inbound>();

    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            match message {
                Outbound::Frame(frame) => {
                    trace!("Writing frame '{}'", frame.name);
                    if let Err(e) = sink.send(Message::text(frame.to_text())).await {
                        error!("Failed to write frame '{}': {}", frame.name, e);
                        break;
                    }
                }
                Outbound::Close => {
                    debug!("Sending close frame");
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        warn!("Failed to send close frame: {}", e);
                    }
                    break;
                }
            }
        }
        let _ = sink.close().await;
        debug!("Socket writer finished");
    });

    tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => match EventFrame::from_text(text.as_str()) {
                    Ok(frame) => {
                        if inbound_tx.send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed frame: {}", e),
                },
                Ok(Message::Close(close)) => {
                    debug!("Server closed the socket: {:?}", close);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Game socket read failed: {}", e);
                    let _ = inbound_tx.send(Err(e.into()));
                    break;
                }
            }
        }
        debug!("Socket reader finished");
    });

    Ok(SocketChannels {
        outbound: outbound_tx,
        inbound: inbound_rx,
    })
}
