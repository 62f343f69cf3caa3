//! Minimal etcd-like key endpoint for integration tests
//!
//! `GET ...?wait=true` sends its headers at once and holds the body until the
//! next PUT. A PUT waits `release_delay`, releases every held watch and then
//! answers. Each connection serves one request.
//!
//! [`LongPollStub::start_cutting`] additionally closes the first few watches
//! halfway through their body, as a server restart or proxy reset would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

pub struct LongPollStub {
    pub port: u16,
    state: Arc<StubState>,
}

struct StubState {
    release_delay: Duration,
    generation: watch::Sender<u64>,
    watches: AtomicUsize,
    cuts_left: AtomicUsize,
    cut: AtomicUsize,
    puts: Mutex<Vec<(String, String)>>,
}

impl LongPollStub {
    pub async fn start(release_delay: Duration) -> Self {
        Self::start_cutting(release_delay, 0).await
    }

    /// Like `start`, but the first `cuts` watches lose their connection mid-body
    pub async fn start_cutting(release_delay: Duration, cuts: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(StubState {
            release_delay,
            generation: watch::channel(0).0,
            watches: AtomicUsize::new(0),
            cuts_left: AtomicUsize::new(cuts),
            cut: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self { port, state }
    }

    pub fn key_url(&self) -> String {
        format!("http://127.0.0.1:{}/v2/keys/name", self.port)
    }

    /// Watches whose headers have been sent
    pub fn watches(&self) -> usize {
        self.state.watches.load(Ordering::SeqCst)
    }

    /// Watches closed before their body was complete
    pub fn cut_watches(&self) -> usize {
        self.state.cut.load(Ordering::SeqCst)
    }

    /// Path and body of every PUT received
    pub fn puts(&self) -> Vec<(String, String)> {
        self.state.puts.lock().unwrap().clone()
    }
}

async fn serve(stream: TcpStream, state: Arc<StubState>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    match method.as_str() {
        "GET" => {
            let mut generation = state.generation.subscribe();
            let seen = *generation.borrow_and_update();
            let payload = br#"{"action":"set","node":{"key":"/name","value":"jex"}}"#;

            writer
                .write_all(
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        payload.len()
                    )
                    .as_bytes(),
                )
                .await?;
            writer.flush().await?;
            state.watches.fetch_add(1, Ordering::SeqCst);

            let cut = state
                .cuts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if cut {
                writer.write_all(&payload[..payload.len() / 2]).await?;
                writer.flush().await?;
                state.cut.fetch_add(1, Ordering::SeqCst);
                return writer.shutdown().await;
            }

            let _ = generation.wait_for(|g| *g > seen).await;
            writer.write_all(payload).await?;
            writer.flush().await?;
        }
        "PUT" => {
            let path = target.split('?').next().unwrap_or_default().to_string();
            state
                .puts
                .lock()
                .unwrap()
                .push((path, String::from_utf8_lossy(&body).into_owned()));

            tokio::time::sleep(state.release_delay).await;
            state.generation.send_modify(|g| *g += 1);

            let payload = br#"{"action":"set"}"#;
            writer
                .write_all(
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        payload.len()
                    )
                    .as_bytes(),
                )
                .await?;
            writer.write_all(payload).await?;
            writer.flush().await?;
        }
        _ => {
            writer
                .write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await?;
        }
    }

    writer.shutdown().await
}
