// crab-print-link/tests/websocket_daemon.rs
// 端到端: 本地 WebSocket 打印守护进程

use crab_print_link::{
    ConnectionState, DaemonCommand, DeliveryOutcome, DeviceLink, LinkConfig, PrintDocument,
    PrintJobDispatcher,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Minimal daemon: greets, acks every job, answers pings.
/// Jobs for order "offline" are answered with print-error.
async fn spawn_daemon() -> (SocketAddr, mpsc::UnboundedReceiver<DaemonCommand>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                ws.send(Message::text(r#"{"type":"connected","message":"Print daemon ready"}"#))
                    .await
                    .unwrap();

                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let command: DaemonCommand = serde_json::from_str(text.as_str()).unwrap();
                    let reply = match &command {
                        DaemonCommand::PrintJob { job } if job.order_id == "offline" => format!(
                            r#"{{"type":"print-error","jobId":"{}","error":"Printer offline"}}"#,
                            job.id
                        ),
                        DaemonCommand::PrintJob { job } => {
                            format!(r#"{{"type":"print-success","jobId":"{}"}}"#, job.id)
                        }
                        DaemonCommand::Ping => r#"{"type":"pong"}"#.to_string(),
                    };
                    let _ = seen_tx.send(command);
                    if ws.send(Message::text(reply)).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, seen_rx)
}

async fn wait_for_state(link: &DeviceLink, state: ConnectionState) {
    let mut rx = link.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

#[tokio::test]
async fn test_print_roundtrip_over_websocket() {
    let (addr, mut seen) = spawn_daemon().await;
    let link = DeviceLink::new(LinkConfig::new(format!("ws://{}", addr)));
    let mut deliveries = link.subscribe_deliveries();

    link.connect().await;
    wait_for_state(&link, ConnectionState::Connected).await;

    let dispatcher = PrintJobDispatcher::new(link.clone());
    let job_id = dispatcher
        .print_receipt("42", PrintDocument::Pdf("JVBERi0xLjQ=".into()), None)
        .await
        .unwrap();
    assert!(job_id.starts_with("BILL-42-"));

    let report = tokio::time::timeout(Duration::from_secs(5), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.job_id.as_deref(), Some(job_id.as_str()));
    assert_eq!(report.outcome, DeliveryOutcome::Delivered);

    match seen.recv().await {
        Some(DaemonCommand::PrintJob { job }) => {
            assert_eq!(job.id, job_id);
            assert_eq!(job.copies, Some(1));
            assert!(job.printer.is_none());
        }
        other => panic!("unexpected command: {:?}", other),
    }

    link.disconnect().await;
    assert_eq!(link.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_daemon_failure_is_reported_not_raised() {
    let (addr, _seen) = spawn_daemon().await;
    let link = DeviceLink::new(LinkConfig::new(format!("ws://{}", addr)));
    let mut deliveries = link.subscribe_deliveries();

    link.connect().await;
    wait_for_state(&link, ConnectionState::Connected).await;

    let dispatcher = PrintJobDispatcher::new(link.clone());
    let job_id = dispatcher
        .print_kitchen_ticket("offline", PrintDocument::Html("<h1>KOT</h1>".into()), Some(""))
        .await
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.job_id.as_deref(), Some(job_id.as_str()));
    assert_eq!(report.outcome, DeliveryOutcome::Failed("Printer offline".into()));
    assert!(link.is_connected());
}

#[tokio::test]
async fn test_unreachable_daemon_gives_up() {
    // bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let config = LinkConfig::new(format!("ws://{}", addr))
        .with_reconnect_delay(Duration::from_millis(10))
        .with_max_reconnect_attempts(2);
    let link = DeviceLink::new(config);

    link.connect().await;
    wait_for_state(&link, ConnectionState::GivenUp).await;
    assert!(!link.is_connected());
}
