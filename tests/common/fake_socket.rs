use gambit::messages::EventFrame;
use gambit::models::Game;
use gambit::network::{Inbound, Outbound, SocketChannels};
use gambit::GameConnection;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// The server side of an in-memory game socket
pub struct FakeServer {
    outbound: mpsc::UnboundedReceiver<Outbound>,
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
}

/// A connection for `game` wired to a fake server
pub fn connect(game: Arc<Game>) -> (GameConnection, FakeServer) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let connection = GameConnection::from_channels(
        SocketChannels {
            outbound: outbound_tx,
            inbound: inbound_rx,
        },
        game,
    );
    let server = FakeServer {
        outbound: outbound_rx,
        inbound: Some(inbound_tx),
    };
    (connection, server)
}

pub fn event_id(frame: &EventFrame) -> u64 {
    frame.payload["event_id"].as_u64().expect("frame has no event_id")
}

impl FakeServer {
    pub async fn next_outbound(&mut self) -> Outbound {
        timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("connection dropped its outbound channel")
    }

    pub async fn next_frame(&mut self) -> EventFrame {
        match self.next_outbound().await {
            Outbound::Frame(frame) => frame,
            Outbound::Close => panic!("expected a frame, got a close request"),
        }
    }

    /// Nothing has been sent since the last read
    pub fn is_quiet(&mut self) -> bool {
        self.outbound.try_recv().is_err()
    }

    pub fn push(&self, name: &str, payload: Value) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Ok(EventFrame::new(name, payload)));
        }
    }

    /// Answer `request` with `name`, tagging the payload with its id
    pub fn respond(&self, request: &EventFrame, name: &str, mut payload: Value) {
        payload["response_to"] = Value::from(event_id(request));
        self.push(name, payload);
    }

    pub fn fail(&self, error: gambit::ClientError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Err(error));
        }
    }

    /// Close the server side of the socket
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }
}
