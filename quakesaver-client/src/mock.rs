//! Scriptable in-process mock sensor for tests.
//!
//! Speaks the sensor side of the wire protocol on a loopback port:
//! accepts WebSocket connections on any path, reacts to start/stop
//! commands with scripted frame sequences, and answers plain
//! `GET /state` requests. Tracks opened/closed connections and received
//! actions so tests can assert on resource lifecycle.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use quakesaver_rs_protocol::StreamCommand;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub struct MockSensorConfig {
    /// Envelope JSON documents sent per accepted stream connection.
    pub connection_frames: Vec<Vec<String>>,
    /// Close the websocket once the scripted frames are sent.
    pub close_after_frames: bool,
    /// Number of websocket connections accepted before refusing more.
    pub max_connections: usize,
    /// Body served for plain `GET /state` requests.
    pub state_body: Option<String>,
}

impl MockSensorConfig {
    /// One connection serving the given frames, kept open afterwards.
    pub fn single(frames: Vec<String>) -> Self {
        Self {
            connection_frames: vec![frames],
            close_after_frames: false,
            max_connections: 1,
            state_body: None,
        }
    }
}

#[derive(Default)]
struct MockStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    actions: Mutex<Vec<String>>,
}

pub struct MockSensor {
    addr: SocketAddr,
    stats: Arc<MockStats>,
}

impl MockSensor {
    pub async fn start(config: MockSensorConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(MockStats::default());

        let task_stats = stats.clone();
        tokio::spawn(async move {
            Self::serve(listener, config, task_stats).await;
        });

        Self { addr, stats }
    }

    /// Host string (`ip:port`) clients should connect to.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn connections_opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }

    /// Actions received over all connections, in receipt order.
    pub fn actions(&self) -> Vec<String> {
        self.stats.actions.lock().unwrap().clone()
    }

    async fn serve(listener: TcpListener, config: MockSensorConfig, stats: Arc<MockStats>) {
        let mut ws_served = 0usize;
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };

            let mut head = [0u8; 1024];
            let n = tcp.peek(&mut head).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&head[..n]).to_ascii_lowercase();

            if request.contains("upgrade: websocket") {
                if ws_served >= config.max_connections {
                    drop(tcp);
                    continue;
                }
                let frames = config
                    .connection_frames
                    .get(ws_served)
                    .cloned()
                    .unwrap_or_default();
                ws_served += 1;

                let Ok(mut ws) = accept_async(tcp).await else {
                    continue;
                };
                stats.opened.fetch_add(1, Ordering::SeqCst);
                Self::handle_ws(&mut ws, &frames, config.close_after_frames, &stats).await;
                stats.closed.fetch_add(1, Ordering::SeqCst);
            } else {
                Self::handle_http(tcp, config.state_body.as_deref()).await;
            }
        }
    }

    async fn handle_ws(
        ws: &mut tokio_tungstenite::WebSocketStream<TcpStream>,
        frames: &[String],
        close_after_frames: bool,
        stats: &MockStats,
    ) {
        while let Some(message) = ws.next().await {
            let Ok(message) = message else {
                // Peer dropped without a closing handshake.
                return;
            };
            match message {
                Message::Text(text) => {
                    let Ok(command) = StreamCommand::parse(text.as_str()) else {
                        continue;
                    };
                    stats
                        .actions
                        .lock()
                        .unwrap()
                        .push(command.as_str().to_owned());
                    match command {
                        StreamCommand::Start => {
                            for frame in frames {
                                if ws.send(Message::Text(frame.clone().into())).await.is_err() {
                                    return;
                                }
                            }
                            if close_after_frames {
                                let _ = ws.close(None).await;
                                while let Some(Ok(_)) = ws.next().await {}
                                return;
                            }
                        }
                        StreamCommand::Stop => {
                            let _ = ws.close(None).await;
                            while let Some(Ok(_)) = ws.next().await {}
                            return;
                        }
                    }
                }
                Message::Close(_) => {
                    let _ = ws.close(None).await;
                    return;
                }
                _ => {}
            }
        }
    }

    async fn handle_http(mut tcp: TcpStream, state_body: Option<&str>) {
        let mut buf = [0u8; 2048];
        let _ = tcp.read(&mut buf).await;
        let body = state_body.unwrap_or("{}");
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len(),
        );
        let _ = tcp.write_all(response.as_bytes()).await;
        let _ = tcp.shutdown().await;
    }
}

/// Build a waveform envelope JSON document for test scripts.
pub fn frame_envelope(uid: &str, samples: &[i32]) -> String {
    let encoded = quakesaver_rs_protocol::encode_counts(samples, false).unwrap();
    serde_json::json!({
        "version": 1,
        "mutation": "waveform_stream",
        "class_name": "none",
        "payload": {
            "uid": uid,
            "delta_t": 0.01,
            "endtime": "2024-05-01T12:00:00Z",
            "data_unit": "counts",
            "compressed": false,
            "data": { "EHZ": encoded },
        },
    })
    .to_string()
}

/// Build a waveform envelope whose channel data is gzip-compressed
/// before base64 encoding.
pub fn compressed_frame_envelope(uid: &str, samples: &[i32]) -> String {
    let encoded = quakesaver_rs_protocol::encode_counts(samples, true).unwrap();
    serde_json::json!({
        "version": 1,
        "mutation": "waveform_stream",
        "class_name": "none",
        "payload": {
            "uid": uid,
            "delta_t": 0.01,
            "endtime": "2024-05-01T12:00:00Z",
            "data_unit": "counts",
            "compressed": true,
            "data": { "EHZ": encoded },
        },
    })
    .to_string()
}

/// Build a non-data acknowledgement envelope.
pub fn ack_envelope() -> String {
    serde_json::json!({
        "version": 1,
        "mutation": "ack",
        "class_name": "none",
        "payload": { "status": "ok" },
    })
    .to_string()
}
