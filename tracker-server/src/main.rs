//! Request-triggered WebSocket shell for the ES/SPY tracker.
//!
//! Pushes a snapshot frame to every connected client after each scheduled
//! ingest, and services explicit client commands (`snapshot`, `refresh`,
//! `clear`, calculator conversions) on demand. The tracker itself never
//! lives here; this binary only holds a handle and renders JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use tracker_core::{
    Fetcher, REFRESH_INTERVAL, RatioTracker, RefreshEvent, TrackerSnapshot, calc, refresh_once,
    spawn_refresh_loop,
};

/// Commands a client may send as JSON text frames
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum ClientCommand {
    /// Read the current state
    Snapshot,
    /// Trigger a single synchronous fetch+ingest cycle
    Refresh,
    /// Reset the tracked history
    Clear,
    /// SPY price implied by an ES price, at the tracked or supplied ratio
    CalcSpy { es_price: f64, ratio: Option<f64> },
    /// ES price implied by a SPY price, at the tracked or supplied ratio
    CalcEs { spy_price: f64, ratio: Option<f64> },
}

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting ES/SPY tracker WebSocket server");

    let tracker = Arc::new(RatioTracker::new());
    let fetcher = Fetcher::new();

    // Broadcast channel fanning snapshot frames out to connected clients
    let (broadcast_tx, _rx) = broadcast::channel::<String>(64);
    let broadcast_tx = Arc::new(broadcast_tx);

    // Scheduled refresh loop; its events feed the broadcast fan-out
    let (event_tx, mut event_rx) = mpsc::channel::<RefreshEvent>(16);
    let _refresh = spawn_refresh_loop(
        fetcher.clone(),
        Arc::clone(&tracker),
        REFRESH_INTERVAL,
        Some(event_tx),
    );

    {
        let tracker = Arc::clone(&tracker);
        let broadcast_tx = Arc::clone(&broadcast_tx);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let frame = match event {
                    RefreshEvent::Ingested(_) => snapshot_frame(&tracker.snapshot()),
                    RefreshEvent::Failed(error) => error_frame(&error.to_string()),
                };
                // Ignore send errors while no clients are connected
                let _ = broadcast_tx.send(frame);
            }
        });
    }

    // Configurable via WS_ADDR env var (default: 0.0.0.0:9001)
    let addr_str = std::env::var("WS_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string());
    let addr = addr_str
        .parse::<SocketAddr>()
        .unwrap_or_else(|_| "0.0.0.0:9001".parse().unwrap());

    info!("WebSocket server listening on ws://{addr}");

    start_websocket_server(addr, tracker, fetcher, broadcast_tx).await;
}

/// Accept loop spawning one handler task per client
async fn start_websocket_server(
    addr: SocketAddr,
    tracker: Arc<RatioTracker>,
    fetcher: Fetcher,
    broadcast_tx: Arc<broadcast::Sender<String>>,
) {
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind WebSocket server");

    info!("WebSocket server bound to {addr}");

    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from {peer_addr}");
        tokio::spawn(handle_client(
            stream,
            peer_addr,
            Arc::clone(&tracker),
            fetcher.clone(),
            broadcast_tx.subscribe(),
        ));
    }
}

/// Handle individual WebSocket client connection
async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    tracker: Arc<RatioTracker>,
    fetcher: Fetcher,
    mut updates: broadcast::Receiver<String>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {peer_addr}: {e}");
            return;
        }
    };

    info!("WebSocket handshake completed for {peer_addr}");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Welcome message plus the current state so late joiners render
    // immediately
    let welcome = serde_json::json!({
        "type": "welcome",
        "message": "Connected to the ES/SPY tracker feed",
        "timestamp": Utc::now()
    });
    if let Ok(msg) = serde_json::to_string(&welcome) {
        let _ = ws_sender.send(Message::Text(msg.into())).await;
    }
    let _ = ws_sender
        .send(Message::Text(snapshot_frame(&tracker.snapshot()).into()))
        .await;

    // Command replies and broadcast pushes share the sink via one task
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(16);

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(frame) => {
                        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Client fell behind; skip and keep serving it
                        warn!("Client {peer_addr} lagged, skipped {skipped} updates");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed for {peer_addr}");
                        break;
                    }
                },
                reply = reply_rx.recv() => match reply {
                    Some(frame) => {
                        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let frame = handle_command(&text, &tracker, &fetcher).await;
                    if reply_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    debug!("Received ping from {peer_addr}");
                }
                Err(e) => {
                    error!("WebSocket error for {peer_addr}: {e}");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            info!("Send task completed for {peer_addr}");
        }
        _ = &mut recv_task => {
            info!("Receive task completed for {peer_addr}");
        }
    }

    info!("WebSocket connection closed for {peer_addr}");
}

/// Execute one client command and render the reply frame.
///
/// Fetch and validation failures only ever reach the requesting client;
/// tracker state is untouched by them.
async fn handle_command(text: &str, tracker: &RatioTracker, fetcher: &Fetcher) -> String {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => return error_frame(&format!("unrecognized command: {e}")),
    };

    match command {
        ClientCommand::Snapshot => snapshot_frame(&tracker.snapshot()),
        ClientCommand::Refresh => match refresh_once(fetcher, tracker).await {
            Ok(_) => snapshot_frame(&tracker.snapshot()),
            Err(error) => {
                warn!(%error, "client-triggered refresh failed");
                error_frame(&error.to_string())
            }
        },
        ClientCommand::Clear => {
            tracker.clear();
            snapshot_frame(&tracker.snapshot())
        }
        ClientCommand::CalcSpy { es_price, ratio } => {
            let ratio = ratio.unwrap_or_else(|| tracker.current_ratio());
            match calc::spy_from_es(es_price, ratio) {
                Ok(spy_price) => calc_frame("spy", spy_price, ratio),
                Err(error) => error_frame(&error.to_string()),
            }
        }
        ClientCommand::CalcEs { spy_price, ratio } => {
            let ratio = ratio.unwrap_or_else(|| tracker.current_ratio());
            match calc::es_from_spy(spy_price, ratio) {
                Ok(es_price) => calc_frame("es", es_price, ratio),
                Err(error) => error_frame(&error.to_string()),
            }
        }
    }
}

fn snapshot_frame(snapshot: &TrackerSnapshot) -> String {
    serde_json::json!({"type": "snapshot", "data": snapshot}).to_string()
}

fn error_frame(message: &str) -> String {
    serde_json::json!({"type": "error", "message": message}).to_string()
}

fn calc_frame(instrument: &str, price: f64, ratio: f64) -> String {
    serde_json::json!({
        "type": "calc",
        "instrument": instrument,
        "price": price,
        "ratio": ratio
    })
    .to_string()
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
