//! End-to-end session against a local WebSocket server

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use tank_client::config::Config;
use tank_client::game::LoopPhase;
use tank_client::{Session, SimpleAgent};

fn config_for(addr: std::net::SocketAddr) -> Config {
    Config {
        server_addr: addr.to_string(),
        ..Config::default()
    }
}

fn stopped_tank_state() -> Value {
    json!({
        "ongoingGame": true,
        "myTank": {
            "id": 1, "x": 50.0, "y": 60.0, "heading": 0.0,
            "moving": false, "alive": true, "canShoot": false, "name": "me"
        },
        "tanks": [],
        "shells": [],
        "walls": []
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn plays_until_the_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(stopped_tank_state().to_string().into()))
            .await
            .unwrap();

        let mut actions = Vec::new();
        while actions.len() < 2 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let command: Value = serde_json::from_str(text.as_str()).unwrap();
                    actions.push(command);
                }
                Some(Ok(_)) => {}
                other => panic!("client went away early: {other:?}"),
            }
        }
        ws.close(None).await.unwrap();
        actions
    });

    let session = Session::new(config_for(addr), SimpleAgent::seeded(11));
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        session.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("session did not end after the server closed");
    let report = tokio_test::assert_ok!(report);

    let actions = server.await.unwrap();
    assert_eq!(actions[0]["action"], "Command_Info");
    assert!(actions[0]["arg"].as_str().unwrap().contains("SimpleAgent"));
    assert_eq!(actions[1]["action"], "Command_Turn");
    assert!(actions[1]["arg"].is_f64());

    assert!(report.received_state);
    let state = report.final_state.unwrap();
    assert!(state.is_round_active);
    assert_eq!(state.my_tank.name.as_deref(), Some("me"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_connection_ends_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(stopped_tank_state().to_string().into()))
            .await
            .unwrap();
        // Wait until the client has acted on the state, then hang up
        // without a close handshake
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(_))) => break,
                Some(Ok(_)) => {}
                other => panic!("client went away early: {other:?}"),
            }
        }
        drop(ws);
    });

    let session = Session::new(config_for(addr), SimpleAgent::seeded(7));
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        session.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("session did not end after the connection dropped")
    .unwrap();
    server.await.unwrap();

    assert_eq!(report.loop_phase, LoopPhase::Off);
    assert!(report.received_state);
    assert!(report.final_state.unwrap().is_round_active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_closes_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        // Never send a state; wait for the client to hang up
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => {}
            }
        }
    });

    let session = Session::new(config_for(addr), SimpleAgent::seeded(3));
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        session.run_until(tokio::time::sleep(Duration::from_millis(200))),
    )
    .await
    .expect("session ignored the shutdown request")
    .unwrap();

    assert!(!report.received_state);
    assert!(report.final_state.is_none());
    assert_eq!(report.loop_phase, LoopPhase::Off);
    assert!(tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_server_ends_the_session() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let session = Session::new(config_for(addr), SimpleAgent::seeded(5));
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        session.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("session hung on a refused connection")
    .unwrap();

    assert!(!report.received_state);
    assert!(report.final_state.is_none());
}
