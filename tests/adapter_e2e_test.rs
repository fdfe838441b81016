//! Client runtime against a scripted server on a local listener.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use tetrinet::adapter::transport::FrameReader;
use tetrinet::adapter::{run_client, ClientConfig, Exit, TransportError};
use tetrinet::core::protocol::login_frame;
use tetrinet::core::{GameParams, RecordingPresenter};
use tetrinet::types::Intent;

async fn listener() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = ClientConfig {
        port,
        nick: "tester".to_string(),
        team: "blue".to_string(),
        seed: Some(5),
        handshake_timeout_ms: 2_000,
        ..ClientConfig::default()
    };
    (listener, config)
}

async fn send(stream: &mut TcpStream, frame: &str) {
    stream.write_all(frame.as_bytes()).await.unwrap();
    stream.write_all(&[0xFF]).await.unwrap();
}

async fn expect_frame(reader: &mut FrameReader<&mut TcpStream>) -> String {
    tokio::time::timeout(Duration::from_secs(2), reader.next_frame())
        .await
        .expect("timed out waiting for client frame")
        .unwrap()
        .expect("client closed")
}

#[tokio::test]
async fn client_logs_in_plays_and_quits() {
    let (listener, config) = listener().await;
    let (intent_tx, intent_rx) = mpsc::channel(8);

    let client = tokio::spawn(run_client(config, RecordingPresenter::default(), intent_rx));

    let (mut stream, _) = listener.accept().await.unwrap();
    {
        let mut reader = FrameReader::new(&mut stream);
        assert_eq!(expect_frame(&mut reader).await, login_frame("tester"));
    }

    send(&mut stream, "playernum 2").await;
    {
        let mut reader = FrameReader::new(&mut stream);
        assert_eq!(expect_frame(&mut reader).await, "team 2 blue");
    }

    send(&mut stream, "playerjoin 1 alice").await;
    send(&mut stream, &GameParams::default().rules_message()).await;
    // Let the rules land before the intent races them.
    tokio::time::sleep(Duration::from_millis(200)).await;
    intent_tx.send(Intent::HardDrop).await.unwrap();

    {
        let mut reader = FrameReader::new(&mut stream);
        let field = expect_frame(&mut reader).await;
        assert!(field.starts_with("f 2 "), "got {:?}", field);
    }

    intent_tx.send(Intent::Quit).await.unwrap();
    let exit = tokio::time::timeout(Duration::from_secs(2), client)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(exit, Exit::Quit);
}

#[tokio::test]
async fn client_reports_server_hangup() {
    let (listener, config) = listener().await;
    let (_intent_tx, intent_rx) = mpsc::channel(8);
    let client = tokio::spawn(run_client(config, RecordingPresenter::default(), intent_rx));

    let (mut stream, _) = listener.accept().await.unwrap();
    {
        let mut reader = FrameReader::new(&mut stream);
        expect_frame(&mut reader).await;
    }
    send(&mut stream, "playernum 1").await;
    {
        let mut reader = FrameReader::new(&mut stream);
        assert_eq!(expect_frame(&mut reader).await, "team 1 blue");
    }
    drop(stream);

    let exit = tokio::time::timeout(Duration::from_secs(2), client)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(exit, Exit::Disconnected);
}

#[tokio::test]
async fn refused_login_is_an_error() {
    let (listener, config) = listener().await;
    let (_intent_tx, intent_rx) = mpsc::channel(8);
    let client = tokio::spawn(run_client(config, RecordingPresenter::default(), intent_rx));

    let (mut stream, _) = listener.accept().await.unwrap();
    send(&mut stream, "noconnecting Nickname already exists on server!").await;

    let err = tokio::time::timeout(Duration::from_secs(2), client)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    let refused = err
        .chain()
        .find_map(|e| e.downcast_ref::<TransportError>())
        .expect("transport error in chain");
    assert!(matches!(refused, TransportError::Refused(reason) if reason.starts_with("Nickname")));
}
