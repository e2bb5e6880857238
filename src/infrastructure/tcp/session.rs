//! Interpreter Connection Module
//!
//! Owns the single long-lived TCP stream to the interpreter. The stream is
//! opened lazily on the first exchange and reopened lazily after the
//! interpreter drops it.

use crate::domain::models::StreamState;
use crate::domain::settings::BridgeSettings;
use crate::infrastructure::tcp::ByteSource;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 256;

pub struct StreamSession {
    addr: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    /// Bytes received but not yet handed to a reader
    pending: Vec<u8>,
    connect_attempts: u64,
}

impl StreamSession {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            stream: None,
            pending: Vec::new(),
            connect_attempts: 0,
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(settings.interpreter_addr(), settings.connect_timeout())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn state(&self) -> StreamState {
        if self.stream.is_some() {
            StreamState::Connected
        } else {
            StreamState::Disconnected
        }
    }

    /// Check if the stream is open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of connection attempts made so far
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    /// Make sure the stream is open, attempting one connection if not.
    ///
    /// Returns `true` immediately when already connected. Never retries;
    /// a failed attempt leaves the session disconnected and returns `false`.
    pub async fn ensure_connected(&mut self) -> bool {
        // Picks up a close by the interpreter since the last exchange
        self.drain();
        if self.stream.is_some() {
            return true;
        }

        self.connect_attempts += 1;
        debug!("Connecting to interpreter at {}", self.addr);

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Could not disable Nagle on interpreter stream: {}", e);
                }
                info!("Connected to interpreter at {}", self.addr);
                self.stream = Some(stream);
                true
            }
            Ok(Err(e)) => {
                warn!("Interpreter connection to {} failed: {}", self.addr, e);
                false
            }
            Err(_) => {
                warn!(
                    "Interpreter connection to {} timed out after {:?}",
                    self.addr, self.connect_timeout
                );
                false
            }
        }
    }

    /// Send raw bytes. Does nothing when the stream is not open.
    pub async fn write(&mut self, bytes: &[u8]) {
        let Some(stream) = self.stream.as_mut() else {
            debug!("Write of {} bytes dropped: not connected", bytes.len());
            return;
        };

        let result = match stream.write_all(bytes).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Interpreter write failed: {}", e);
            self.close();
        }
    }

    /// Drop the stream. The next [`StreamSession::ensure_connected`] reconnects.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Interpreter stream closed");
        }
    }

    /// Move everything the socket has buffered into `pending`.
    fn drain(&mut self) {
        let Some(stream) = self.stream.as_ref() else {
            return;
        };

        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match stream.try_read(&mut buf) {
                Ok(0) => {
                    info!("Interpreter at {} closed the connection", self.addr);
                    self.stream = None;
                    return;
                }
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Interpreter read failed: {}", e);
                    self.stream = None;
                    return;
                }
            }
        }
    }
}

impl ByteSource for StreamSession {
    fn read_available(&mut self) -> Vec<u8> {
        self.drain();
        std::mem::take(&mut self.pending)
    }

    fn push_back(&mut self, mut bytes: Vec<u8>) {
        bytes.append(&mut self.pending);
        self.pending = bytes;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some() || !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Accepts connections, counts them and keeps them open.
    async fn counting_listener() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        (addr, accepted)
    }

    async fn unused_addr() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn test_ensure_connected_is_idempotent() {
        let (addr, accepted) = counting_listener().await;
        let mut session = StreamSession::new(addr, Duration::from_secs(1));

        assert!(session.ensure_connected().await);
        assert!(session.ensure_connected().await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.connect_attempts(), 1);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), StreamState::Connected);
    }

    #[tokio::test]
    async fn test_connect_failure_returns_false() {
        let mut session = StreamSession::new(unused_addr().await, Duration::from_secs(1));

        assert!(!session.ensure_connected().await);
        assert_eq!(session.state(), StreamState::Disconnected);
        assert!(!session.ensure_connected().await);
        assert_eq!(session.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_write_and_read_available() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(b"OK\r>").await.unwrap();
            buf
        });

        let mut session = StreamSession::new(addr, Duration::from_secs(1));
        assert!(session.read_available().is_empty());
        assert!(session.ensure_connected().await);
        session.write(b"ATZ\r").await;
        assert_eq!(&server.await.unwrap(), b"ATZ\r");

        let mut received = Vec::new();
        for _ in 0..100 {
            received.extend(session.read_available());
            if received.len() == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(received, b"OK\r>");
    }

    #[tokio::test]
    async fn test_reconnects_after_remote_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            // First connection is dropped right away, the second one is kept
            let (first, _) = listener.accept().await.unwrap();
            drop(first);
            let (_second, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut session = StreamSession::new(addr, Duration::from_secs(1));
        assert!(session.ensure_connected().await);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(session.read_available().is_empty());
        assert_eq!(session.state(), StreamState::Disconnected);

        assert!(session.ensure_connected().await);
        assert_eq!(session.state(), StreamState::Connected);
        assert_eq!(session.connect_attempts(), 2);
    }

    #[test]
    fn test_push_back_is_read_first() {
        let mut session = StreamSession::new("127.0.0.1:1", Duration::from_secs(1));
        session.push_back(b"B".to_vec());
        session.push_back(b"A".to_vec());
        assert!(session.is_open());
        assert_eq!(session.read_available(), b"AB");
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_write_without_connection_is_noop() {
        let mut session = StreamSession::new("127.0.0.1:1", Duration::from_secs(1));
        session.write(b"ATZ\r").await;
        assert_eq!(session.connect_attempts(), 0);
        assert_eq!(session.state(), StreamState::Disconnected);
    }
}
