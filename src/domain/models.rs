use crate::domain::error::{BridgeError, BridgeResult};

/// Prompt character the interpreter emits once a response is complete
pub const TERMINATOR: char = '>';

/// Line ending appended to outbound commands
pub const CR: char = '\r';

/// Delivered when the interpreter sent nothing before the read deadline
pub const NO_DATA: &str = "NO DATA\r>";

/// Delivered when the interpreter could not be reached
pub const NO_TCP: &str = "NO TCP\r>";

/// One client command, kept exactly as written by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    original: String,
}

impl Command {
    pub fn new(text: impl Into<String>) -> BridgeResult<Self> {
        let original = text.into();
        if original.is_empty() {
            return Err(BridgeError::EmptyCommand);
        }
        Ok(Self { original })
    }

    /// Build a command from a raw characteristic write.
    pub fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        Self::new(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Text as received, used for echo comparison
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Text as transmitted: a trailing CR is appended unless the command
    /// already ends in CR or LF.
    pub fn normalized(&self) -> String {
        if self.original.ends_with(['\r', '\n']) {
            self.original.clone()
        } else {
            let mut text = String::with_capacity(self.original.len() + 1);
            text.push_str(&self.original);
            text.push(CR);
            text
        }
    }
}

/// Connectivity of the stream to the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Disconnected,
    Connected,
}

/// Connectivity of the wireless side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CentralState {
    #[default]
    Idle,
    CentralConnected,
}

/// Wireless connectivity change reported by the radio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Connected,
    Disconnected,
}

impl CentralState {
    /// Apply a link change. Returns `None` when the change is not a legal
    /// transition from the current state.
    pub fn transition(self, change: LinkChange) -> Option<CentralState> {
        match (self, change) {
            (CentralState::Idle, LinkChange::Connected) => Some(CentralState::CentralConnected),
            (CentralState::CentralConnected, LinkChange::Disconnected) => Some(CentralState::Idle),
            _ => None,
        }
    }
}

/// Events delivered from the radio layer into the controller queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    CentralConnected,
    CentralDisconnected,
    /// Raw bytes written to the command characteristic
    Write(Vec<u8>),
}

/// Status published by the controller for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeNotice {
    CentralConnected,
    CentralDisconnected,
    StreamConnected,
    StreamUnavailable,
    ExchangeCompleted {
        command: String,
        response_len: usize,
        fragments: usize,
    },
}
