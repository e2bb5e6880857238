//! Response framing.
//!
//! The interpreter sends no length field. A response is complete once the
//! prompt character arrives, or when the read deadline elapses.

use crate::domain::models::{NO_DATA, TERMINATOR};
use crate::domain::settings::BridgeSettings;
use crate::infrastructure::tcp::ByteSource;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResponseReader {
    deadline: Duration,
    poll_interval: Duration,
}

impl ResponseReader {
    pub fn new(deadline: Duration, poll_interval: Duration) -> Self {
        Self {
            deadline,
            poll_interval,
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(settings.read_timeout(), settings.read_poll_interval())
    }

    /// Accumulate bytes until the terminator or the deadline.
    ///
    /// The result includes the terminator. Bytes drained past the terminator
    /// are pushed back into the source for the next exchange. When nothing
    /// at all arrived the [`NO_DATA`] sentinel is returned, so the result is
    /// never empty. A source that closes ends the wait early.
    pub async fn read<S: ByteSource>(&self, source: &mut S) -> String {
        let started = Instant::now();
        let mut response: Vec<u8> = Vec::new();

        'poll: loop {
            let bytes = source.read_available();

            if bytes.is_empty() {
                if !source.is_open() {
                    debug!("Stream closed after {} response bytes", response.len());
                    break;
                }
                if started.elapsed() >= self.deadline {
                    debug!(
                        "Response deadline of {:?} elapsed with {} bytes",
                        self.deadline,
                        response.len()
                    );
                    break;
                }
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            for (i, &byte) in bytes.iter().enumerate() {
                response.push(byte);
                if byte == TERMINATOR as u8 {
                    if i + 1 < bytes.len() {
                        source.push_back(bytes[i + 1..].to_vec());
                    }
                    break 'poll;
                }
            }

            if started.elapsed() >= self.deadline {
                debug!("Response deadline elapsed while data was still arriving");
                break;
            }
        }

        if response.is_empty() {
            NO_DATA.to_string()
        } else {
            String::from_utf8_lossy(&response).into_owned()
        }
    }
}
