//! Interpreter Stream Module
//!
//! Outbound TCP connection to the command interpreter and framing of its
//! prompt-terminated responses.
//!
//! - [`session`] - Lazy connection lifecycle and raw byte I/O
//! - [`reader`] - Terminator/deadline framed response reads

pub mod reader;
pub mod session;

pub use reader::ResponseReader;
pub use session::StreamSession;

/// Non-blocking byte supply consumed by [`ResponseReader`]
pub trait ByteSource {
    /// Drain whatever is buffered right now. Empty when nothing is pending.
    fn read_available(&mut self) -> Vec<u8>;

    /// Return bytes that were drained but not consumed. They come back
    /// first on the next [`ByteSource::read_available`].
    fn push_back(&mut self, bytes: Vec<u8>);

    /// Whether more bytes can still arrive
    fn is_open(&self) -> bool;
}
