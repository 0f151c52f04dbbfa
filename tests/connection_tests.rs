mod common;

use common::fake_socket::{self, event_id};
use common::fixtures;
use gambit::messages::{EventName, PushEvent};
use gambit::models::{Conclusion, DisconnectReason};
use gambit::network::Outbound;
use gambit::{ClientError, ConnectionState};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[tokio::test]
async fn test_first_request_is_framed_with_event_id_zero() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (result, _) = tokio::join!(conn.get_game_state(), async {
        let frame = server.next_frame().await;
        assert_eq!(frame.name, "get_game_state");
        assert_eq!(frame.payload, json!({"event_id": 0}));
        server.respond(&frame, "game_state", fixtures::game_state_json(4));
    });

    let state = result.unwrap();
    assert_eq!(state.turn_number, 4);
    assert_eq!(state.game.id, 7);
    assert_eq!(conn.pending_requests(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_resolve_out_of_order() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let server_task = tokio::spawn(async move {
        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.push(server.next_frame().await);
        }
        let ids: HashSet<u64> = frames.iter().map(event_id).collect();
        assert_eq!(ids.len(), 3);
        // Answer newest first; each answer carries its own id as the turn
        for frame in frames.iter().rev() {
            let id = event_id(frame) as u32;
            server.respond(frame, "game_state", fixtures::game_state_json(id));
        }
        server
    });

    let (a, b, c) = tokio::join!(
        conn.get_game_state(),
        conn.get_game_state(),
        conn.get_game_state()
    );
    assert_eq!(a.unwrap().turn_number, 0);
    assert_eq!(b.unwrap().turn_number, 1);
    assert_eq!(c.unwrap().turn_number, 2);
    assert_eq!(conn.pending_requests(), 0);

    let _server = server_task.await.unwrap();
}

#[tokio::test]
async fn test_request_error_rejects_only_its_request() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (bad, good, _) = tokio::join!(
        conn.make_move("e2e5".parse().unwrap()),
        conn.get_allowed_moves(),
        async {
            let bad = server.next_frame().await;
            let good = server.next_frame().await;
            assert_eq!(bad.name, "make_move");
            assert_eq!(bad.payload["start_rank"], 1);
            assert_eq!(bad.payload["end_rank"], 4);
            server.respond(&bad, "request_error", json!({"error": 2134, "message": "Illegal move"}));
            server.respond(&good, "allowed_moves", fixtures::allowed_moves_json());
        }
    );

    let err = bad.unwrap_err();
    let api = err.api_error().expect("application error");
    assert_eq!(api.code, 2134);
    assert!(err.in_domain(21));
    assert!(!err.in_domain(22));
    assert_eq!(good.unwrap().moves.len(), 2);
    assert_eq!(conn.state(), ConnectionState::Authenticated);
    assert_eq!(conn.pending_requests(), 0);
}

#[tokio::test]
async fn test_response_with_wrong_name_does_not_complete_request() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (result, _) = tokio::join!(conn.get_game_state(), async {
        let frame = server.next_frame().await;
        server.respond(&frame, "allowed_moves", fixtures::allowed_moves_json());
        tokio::time::sleep(Duration::from_millis(20)).await;
        server.respond(&frame, "game_state", fixtures::game_state_json(2));
    });

    assert_eq!(result.unwrap().turn_number, 2);
}

#[tokio::test]
async fn test_dropped_request_releases_its_waiter() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let abandoned = timeout(Duration::from_millis(20), conn.get_allowed_moves()).await;
    assert!(abandoned.is_err());
    assert_eq!(conn.pending_requests(), 0);

    // A late answer to the abandoned request is harmless
    let frame = server.next_frame().await;
    server.respond(&frame, "allowed_moves", fixtures::allowed_moves_json());

    let (result, _) = tokio::join!(conn.get_allowed_moves(), async {
        let frame = server.next_frame().await;
        assert_eq!(event_id(&frame), 1);
        server.respond(&frame, "allowed_moves", fixtures::allowed_moves_json());
    });
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_teardown_fails_pending_requests() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (first, second, _) = tokio::join!(conn.resign(), conn.offer_draw(), async {
        server.next_frame().await;
        server.next_frame().await;
        server.hang_up();
    });

    assert!(matches!(first, Err(ClientError::ConnectionLost)));
    assert!(matches!(second, Err(ClientError::ConnectionLost)));
    conn.closed().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.pending_requests(), 0);

    // Nothing is sent once the connection is closed
    assert!(matches!(conn.get_game_state().await, Err(ClientError::ConnectionLost)));
    assert!(server.is_quiet());
}

#[tokio::test]
async fn test_transport_error_closes_connection() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (result, _) = tokio::join!(conn.timeout(), async {
        server.next_frame().await;
        server.fail(ClientError::InvalidRequest("socket reset".into()));
    });

    assert!(matches!(result, Err(ClientError::ConnectionLost)));
    conn.closed().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_pushes_reach_handlers_in_subscription_order() {
    let (conn, server) = fake_socket::connect(fixtures::game(7));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let first = tx.clone();
    conn.on(EventName::Move, move |event| {
        if let PushEvent::Move(update) = event {
            let _ = first.send(("first", update.state.turn_number));
        }
    });
    let second = tx.clone();
    conn.on_move(move |update| {
        let _ = second.send(("second", update.state.turn_number));
    });
    let unrelated = tx.clone();
    conn.on_draw_offer(move || {
        let _ = unrelated.send(("draw", 0));
    });

    // Undecodable pushes are dropped, the next one still arrives
    server.push("move", json!({"move": "e2e4"}));
    server.push("move", fixtures::move_update_json());

    assert_eq!(rx.recv().await, Some(("first", 1)));
    assert_eq!(rx.recv().await, Some(("second", 1)));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_correlated_response_is_also_published() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));
    let (tx, mut rx) = mpsc::unbounded_channel();
    conn.on_game_end(move |end| {
        let _ = tx.send(end.conclusion);
    });

    let (result, _) = tokio::join!(conn.claim_draw(Conclusion::ThreefoldRepetition), async {
        let frame = server.next_frame().await;
        assert_eq!(frame.name, "claim_draw");
        assert_eq!(frame.payload["reason"], 6);
        server.respond(&frame, "game_end", fixtures::game_end_json(6));
    });

    assert_eq!(result.unwrap().conclusion, Conclusion::ThreefoldRepetition);
    assert_eq!(rx.recv().await, Some(Conclusion::ThreefoldRepetition));
}

#[tokio::test]
async fn test_claim_draw_rejects_unclaimable_reason() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let result = conn.claim_draw(Conclusion::Checkmate).await;
    assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    assert!(server.is_quiet());
}

#[tokio::test]
async fn test_make_move_decodes_update() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    let (result, _) = tokio::join!(conn.make_move("e2e4".parse().unwrap()), async {
        let frame = server.next_frame().await;
        server.respond(&frame, "move", fixtures::move_update_json());
    });

    let update = result.unwrap();
    assert_eq!(update.mv.to_string(), "e2e4");
    assert_eq!(update.state.turn_number, 1);
    assert_eq!(update.allowed_moves.moves.len(), 2);
}

#[tokio::test]
async fn test_lifecycle_events_drive_state() {
    let (conn, server) = fake_socket::connect(fixtures::game(7));
    let mut changes = conn.state_changes();
    let (tx, mut rx) = mpsc::unbounded_channel();
    conn.on_disconnect(move |reason| {
        let _ = tx.send(reason);
    });

    assert_eq!(conn.state(), ConnectionState::Authenticated);

    server.push("game_start", json!({}));
    changes
        .wait_for(|s| *s == ConnectionState::Active)
        .await
        .unwrap();

    server.push("game_disconnect", json!({"reason": 3}));
    changes
        .wait_for(|s| *s == ConnectionState::Closing)
        .await
        .unwrap();
    assert_eq!(rx.recv().await, Some(DisconnectReason::GameOver));

    // Closing refuses new requests
    assert!(matches!(conn.offer_draw().await, Err(ClientError::ConnectionLost)));
}

#[tokio::test]
async fn test_disconnect_requests_close_frame() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));

    conn.disconnect();
    assert_eq!(conn.state(), ConnectionState::Closing);
    assert_eq!(server.next_outbound().await, Outbound::Close);

    // A second disconnect is a no-op
    conn.disconnect();
    assert!(server.is_quiet());

    server.hang_up();
    conn.closed().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_panicking_handler_does_not_stall_the_connection() {
    let (conn, mut server) = fake_socket::connect(fixtures::game(7));
    let (tx, mut rx) = mpsc::unbounded_channel();

    conn.on_draw_offer(|| panic!("handler bug"));
    conn.on_draw_offer(move || {
        let _ = tx.send(());
    });

    server.push("draw_offer", json!({}));
    assert_eq!(rx.recv().await, Some(()));
    assert_eq!(conn.state(), ConnectionState::Authenticated);

    let exchange = async {
        tokio::join!(conn.get_game_state(), async {
            let frame = server.next_frame().await;
            server.respond(&frame, "game_state", fixtures::game_state_json(3));
        })
    };
    let (result, _) = timeout(Duration::from_secs(2), exchange)
        .await
        .expect("request was answered");
    assert_eq!(result.unwrap().turn_number, 3);
}
