pub mod chunker;
pub mod echo;
pub mod error;
pub mod models;
pub mod settings;
