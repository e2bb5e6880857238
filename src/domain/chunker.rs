//! Fragmentation of responses into notification-sized pieces.

use crate::domain::error::BridgeResult;
use std::time::Duration;
use tracing::trace;

/// Splits text into fixed-size fragments and emits them with a fixed pause
/// between notifications.
///
/// The fragment size is a configured constant and never follows the MTU
/// negotiated with a particular client. There is no acknowledgement based
/// flow control; pacing is purely time based.
#[derive(Debug, Clone)]
pub struct NotificationChunker {
    fragment_size: usize,
    delay: Duration,
}

impl NotificationChunker {
    /// Create a chunker. A zero fragment size is raised to one byte.
    pub fn new(fragment_size: usize, delay: Duration) -> Self {
        Self {
            fragment_size: fragment_size.max(1),
            delay,
        }
    }

    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Fragments of `text` in transmission order
    pub fn fragments<'a>(&self, text: &'a str) -> std::slice::Chunks<'a, u8> {
        text.as_bytes().chunks(self.fragment_size)
    }

    /// Emit every fragment of `text` through `emit`, pausing between calls.
    ///
    /// Returns the number of fragments emitted. Stops at the first failed
    /// emit and returns its error.
    pub async fn send<F>(&self, text: &str, mut emit: F) -> BridgeResult<usize>
    where
        F: FnMut(&[u8]) -> BridgeResult<()>,
    {
        let mut sent = 0;
        for fragment in self.fragments(text) {
            if sent > 0 {
                tokio::time::sleep(self.delay).await;
            }
            trace!("Notify fragment {}: {:?}", sent, String::from_utf8_lossy(fragment));
            emit(fragment)?;
            sent += 1;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::BridgeError;

    const SIZE: usize = 20;

    async fn collect(text: &str) -> (usize, Vec<Vec<u8>>) {
        let chunker = NotificationChunker::new(SIZE, Duration::from_millis(1));
        let mut received = Vec::new();
        let sent = chunker
            .send(text, |fragment| {
                received.push(fragment.to_vec());
                Ok(())
            })
            .await
            .unwrap();
        (sent, received)
    }

    #[tokio::test]
    async fn test_fragments_reassemble() {
        for len in [0, 1, SIZE - 1, SIZE, SIZE + 1, SIZE * 3, SIZE * 7 + 5] {
            let text: String = (0..len).map(|i| (b'A' + (i % 26) as u8) as char).collect();
            let (sent, received) = collect(&text).await;

            assert_eq!(sent, len.div_ceil(SIZE), "len {}", len);
            assert_eq!(received.len(), sent);
            assert!(received.iter().all(|f| !f.is_empty() && f.len() <= SIZE));
            assert_eq!(received.concat(), text.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_empty_text_emits_nothing() {
        let (sent, received) = collect("").await;
        assert_eq!(sent, 0);
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_emit_failure_stops_sending() {
        let chunker = NotificationChunker::new(2, Duration::ZERO);
        let mut calls = 0;
        let result = chunker
            .send("abcdef", |_| {
                calls += 1;
                if calls == 2 {
                    Err(BridgeError::Notify("not subscribed".into()))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(BridgeError::Notify(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_zero_size_clamped() {
        let chunker = NotificationChunker::new(0, Duration::ZERO);
        assert_eq!(chunker.fragment_size(), 1);
        assert_eq!(chunker.fragments("abc").count(), 3);
    }
}
