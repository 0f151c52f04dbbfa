//! A live game connection: request/response correlation over one socket plus
//! fan-out of server pushes to subscribers.
//!
//! Every outbound event carries a fresh `event_id`. The server echoes it as
//! `response_to` on the matching response or on a `request_error`. Pending
//! requests are completed at most once, and all of them fail with
//! [`ClientError::ConnectionLost`] when the transport goes away.

use crate::chess::{AllowedMoves, Move};
use crate::messages::events::{payload, EVENT_ID_FIELD};
use crate::messages::{ApiError, EventFrame, EventName, FromWire, GameEnd, MoveUpdate, PushEvent, ToWire};
use crate::models::{Conclusion, DisconnectReason, Game, GameState, Notification};
use crate::network::error::{ClientError, Result};
use crate::network::socket::{self, Inbound, Outbound, SocketChannels};
use crate::session::Session;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress. [`GameConnection::connect`] only returns once the
    /// socket is open, so a live connection has always moved past this.
    Connecting,
    Authenticated,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Authenticated, Active)
                | (Authenticated, Closing)
                | (Active, Closing)
                | (Closing, Closed)
        ) || (next == Closed && self != Closed)
    }

    /// Requests may only be sent while the socket is open and not shutting down
    pub fn accepts_requests(self) -> bool {
        matches!(self, ConnectionState::Authenticated | ConnectionState::Active)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

type Handler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

struct Waiter {
    response: EventName,
    tx: oneshot::Sender<Result<Value>>,
}

struct Shared {
    game: Arc<Game>,
    pending: Mutex<HashMap<u64, Waiter>>,
    handlers: Mutex<HashMap<EventName, Vec<Handler>>>,
    state: watch::Sender<ConnectionState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                info!("Game connection {} -> {}", current, next);
                *current = next;
                true
            } else {
                if *current != next {
                    debug!("Ignoring transition {} -> {}", current, next);
                }
                false
            }
        })
    }

    fn dispatch(&self, frame: EventFrame) {
        debug!("Received '{}' (response_to: {:?})", frame.name, frame.response_to());
        if let Some(id) = frame.response_to() {
            self.complete(id, &frame);
        }

        let Some(name) = EventName::parse(&frame.name) else {
            debug!("Ignoring unknown event '{}'", frame.name);
            return;
        };
        match name {
            EventName::GameStart => {
                self.transition(ConnectionState::Active);
            }
            EventName::GameDisconnect => {
                self.transition(ConnectionState::Closing);
            }
            _ => {}
        }
        self.publish(name, &frame.payload);
    }

    /// Resolve the waiter for `id` if this frame is its answer
    fn complete(&self, id: u64, frame: &EventFrame) {
        let is_error = frame.name == EventName::RequestError.as_str();
        let waiter = {
            let mut pending = lock(&self.pending);
            let answers = pending
                .get(&id)
                .is_some_and(|w| is_error || w.response.as_str() == frame.name);
            if !answers {
                return;
            }
            pending.remove(&id)
        };
        let Some(waiter) = waiter else { return };

        let result = if is_error {
            match ApiError::from_wire(&frame.payload) {
                Ok(err) => {
                    debug!("Request {} rejected: {}", id, err);
                    Err(ClientError::Application(err))
                }
                Err(e) => Err(ClientError::Decode(e)),
            }
        } else {
            Ok(frame.payload.clone())
        };
        // The caller may have given up on the request
        let _ = waiter.tx.send(result);
    }

    fn publish(&self, name: EventName, body: &Value) {
        let handlers = lock(&self.handlers).get(&name).cloned().unwrap_or_default();
        if handlers.is_empty() {
            return;
        }
        match PushEvent::decode(name, body, &self.game) {
            Some(Ok(event)) => {
                for handler in &handlers {
                    if panic::catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                        error!("Handler for '{}' panicked", name);
                    }
                }
            }
            Some(Err(e)) => warn!("Dropping undecodable '{}' event: {}", name, e),
            None => {}
        }
    }

    fn shutdown(&self) {
        let waiters: Vec<Waiter> = {
            let mut pending = lock(&self.pending);
            self.state.send_replace(ConnectionState::Closed);
            pending.drain().map(|(_, waiter)| waiter).collect()
        };
        if !waiters.is_empty() {
            warn!("Failing {} pending requests", waiters.len());
        }
        for waiter in waiters {
            let _ = waiter.tx.send(Err(ClientError::ConnectionLost));
        }
        info!("Game connection closed");
    }
}

/// Removes a waiter when its request is abandoned or fails to send
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(&self.shared.pending).remove(&self.id);
    }
}

/// Fails every waiter once the reader stops, however it stops
struct ShutdownOnExit(Arc<Shared>);

impl Drop for ShutdownOnExit {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// A client connection to one game
pub struct GameConnection {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Outbound>,
    next_event_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl GameConnection {
    /// Open an authenticated socket for `game`
    #[instrument(skip(session, game), fields(game_id = game.id))]
    pub async fn connect(url: &str, session: &Session, game: Arc<Game>) -> Result<Self> {
        let identity = session.current_identity()?;
        debug!("Game connection {}", ConnectionState::Connecting);
        let channels = socket::open(url, &identity, game.id).await?;
        Ok(Self::from_channels(channels, game))
    }

    /// Drive a connection over already-open channels. The handshake is
    /// assumed done, so the connection starts out authenticated.
    pub fn from_channels(channels: SocketChannels, game: Arc<Game>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let shared = Arc::new(Shared {
            game,
            pending: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
            state,
        });
        shared.transition(ConnectionState::Authenticated);
        let reader = tokio::spawn(Self::read_loop(Arc::clone(&shared), channels.inbound));
        Self {
            shared,
            outbound: channels.outbound,
            next_event_id: AtomicU64::new(0),
            reader,
        }
    }

    async fn read_loop(shared: Arc<Shared>, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
        let _shutdown = ShutdownOnExit(Arc::clone(&shared));
        while let Some(message) = inbound.recv().await {
            match message {
                Ok(frame) => shared.dispatch(frame),
                Err(e) => {
                    error!("Game socket failed: {}", e);
                    break;
                }
            }
        }
    }

    pub fn game(&self) -> &Arc<Game> {
        &self.shared.game
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        let mut changes = self.state_changes();
        let _ = changes.wait_for(|s| *s == ConnectionState::Closed).await;
    }

    /// Requests still waiting for an answer
    pub fn pending_requests(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Send `event` and wait for the `response` event or a `request_error`
    /// carrying its id
    #[instrument(level = "debug", skip(self, body))]
    pub async fn send_event(&self, event: &str, response: EventName, mut body: Map<String, Value>) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = lock(&self.shared.pending);
            if !self.state().accepts_requests() {
                return Err(ClientError::ConnectionLost);
            }
            let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
            body.insert(EVENT_ID_FIELD.to_string(), Value::from(id));
            let frame = EventFrame::new(event, Value::Object(body));
            // Sent under the lock so frames leave in id order
            if self.outbound.send(Outbound::Frame(frame)).is_err() {
                return Err(ClientError::ConnectionLost);
            }
            pending.insert(id, Waiter { response, tx });
            id
        };
        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };
        debug!("Sent '{}' as event {}", event, id);

        rx.await.unwrap_or(Err(ClientError::ConnectionLost))
    }

    pub async fn get_game_state(&self) -> Result<GameState> {
        let body = self
            .send_event("get_game_state", EventName::GameState, Map::new())
            .await?;
        Ok(GameState::from_wire(&body, Arc::clone(&self.shared.game))?)
    }

    pub async fn get_allowed_moves(&self) -> Result<AllowedMoves> {
        let body = self
            .send_event("get_allowed_moves", EventName::AllowedMoves, Map::new())
            .await?;
        Ok(AllowedMoves::from_wire(&body)?)
    }

    pub async fn make_move(&self, mv: Move) -> Result<MoveUpdate> {
        let body = match mv.to_wire() {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        let body = self.send_event("make_move", EventName::Move, body).await?;
        Ok(MoveUpdate::decode(&body, &self.shared.game)?)
    }

    pub async fn offer_draw(&self) -> Result<()> {
        self.send_event("offer_draw", EventName::DrawOffer, Map::new())
            .await?;
        Ok(())
    }

    pub async fn claim_draw(&self, reason: Conclusion) -> Result<GameEnd> {
        if !reason.is_claimable_draw() {
            return Err(ClientError::InvalidRequest(format!(
                "{} cannot be claimed as a draw",
                reason
            )));
        }
        let body = payload([("reason", reason.to_wire())]);
        let body = self.send_event("claim_draw", EventName::GameEnd, body).await?;
        Ok(GameEnd::decode(&body, &self.shared.game)?)
    }

    pub async fn resign(&self) -> Result<GameEnd> {
        let body = self
            .send_event("resign", EventName::GameEnd, Map::new())
            .await?;
        Ok(GameEnd::decode(&body, &self.shared.game)?)
    }

    /// Ask the server to end the game on the opponent's clock
    pub async fn timeout(&self) -> Result<GameEnd> {
        let body = self
            .send_event("timeout", EventName::GameEnd, Map::new())
            .await?;
        Ok(GameEnd::decode(&body, &self.shared.game)?)
    }

    /// Register `handler` for pushes named `event`. Handlers run on the
    /// reader task, in registration order. A handler that panics is logged
    /// and skipped.
    pub fn on<F>(&self, event: EventName, handler: F)
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        if event == EventName::RequestError {
            warn!("request_error is only delivered to the request it answers");
        }
        lock(&self.shared.handlers)
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn on_game_start<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(EventName::GameStart, move |_| handler());
    }

    pub fn on_move<F>(&self, handler: F)
    where
        F: Fn(&MoveUpdate) + Send + Sync + 'static,
    {
        self.on(EventName::Move, move |event| {
            if let PushEvent::Move(update) = event {
                handler(update);
            }
        });
    }

    pub fn on_game_end<F>(&self, handler: F)
    where
        F: Fn(&GameEnd) + Send + Sync + 'static,
    {
        self.on(EventName::GameEnd, move |event| {
            if let PushEvent::GameEnd(end) = event {
                handler(end);
            }
        });
    }

    pub fn on_draw_offer<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(EventName::DrawOffer, move |_| handler());
    }

    pub fn on_game_state<F>(&self, handler: F)
    where
        F: Fn(&GameState) + Send + Sync + 'static,
    {
        self.on(EventName::GameState, move |event| {
            if let PushEvent::GameState(state) = event {
                handler(state);
            }
        });
    }

    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.on(EventName::Notification, move |event| {
            if let PushEvent::Notification(notification) = event {
                handler(notification);
            }
        });
    }

    pub fn on_disconnect<F>(&self, handler: F)
    where
        F: Fn(DisconnectReason) + Send + Sync + 'static,
    {
        self.on(EventName::GameDisconnect, move |event| {
            if let PushEvent::GameDisconnect(reason) = event {
                handler(*reason);
            }
        });
    }

    /// Start an orderly close. Pending requests fail once the socket is down.
    pub fn disconnect(&self) {
        if self.shared.transition(ConnectionState::Closing) {
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

impl Drop for GameConnection {
    fn drop(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
        self.reader.abort();
    }
}

impl fmt::Debug for GameConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameConnection")
            .field("game_id", &self.shared.game.id)
            .field("state", &self.state())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use ConnectionState::*;
        assert!(Connecting.can_transition_to(Authenticated));
        assert!(Authenticated.can_transition_to(Active));
        assert!(Active.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
        assert!(Connecting.can_transition_to(Closed));
        assert!(Active.can_transition_to(Closed));

        assert!(!Active.can_transition_to(Authenticated));
        assert!(!Closing.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Connecting));
    }

    #[tokio::test]
    async fn test_new_connection_has_completed_handshake() {
        let (outbound, _outbound_rx) = mpsc::unbounded_channel();
        let (_inbound_tx, inbound) = mpsc::unbounded_channel();
        let game = Arc::new(
            Game::from_wire(&serde_json::json!({
                "id": 3, "mode": 1, "host": null, "away": null, "invited": null,
                "current_turn": 1, "turn_number": 0,
                "main_thinking_time": 600, "fixed_extra_time": 0, "time_increment_per_turn": 5,
                "host_time": 600, "away_time": 600, "host_offering_draw": false,
                "away_offering_draw": false, "winner": 1, "conclusion_type": 1,
                "opened_at": 1_600_000_000, "started_at": null, "ended_at": null
            }))
            .unwrap(),
        );
        let conn = GameConnection::from_channels(SocketChannels { outbound, inbound }, game);
        assert_eq!(conn.state(), ConnectionState::Authenticated);
        assert!(ConnectionState::Connecting.can_transition_to(conn.state()));
    }

    #[test]
    fn test_only_open_states_accept_requests() {
        assert!(ConnectionState::Authenticated.accepts_requests());
        assert!(ConnectionState::Active.accepts_requests());
        assert!(!ConnectionState::Connecting.accepts_requests());
        assert!(!ConnectionState::Closing.accepts_requests());
        assert!(!ConnectionState::Closed.accepts_requests());
    }
}
