use thiserror::Error;

/// Errors surfaced by the bridge API.
///
/// Exchange-level failures (interpreter unreachable, response timeout) are
/// not errors: they degrade to sentinel text delivered to the client.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("an exchange is already in flight and the command queue is full")]
    Busy,
    #[error("empty command ignored")]
    EmptyCommand,
    #[error("bridge controller has stopped")]
    ControllerStopped,
    #[error("notification failed: {0}")]
    Notify(String),
    #[error("radio stack error: {0}")]
    Radio(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
