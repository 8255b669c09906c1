//! Relay client: receives audio chunks, decides when a reply is playable and
//! plays it on request.

pub mod app;
pub mod buffer;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod sink;

pub use app::{ClientApp, ConnectionState};
pub use buffer::{AssembledAudio, BufferState, ChunkBuffer, ExpectedCount};
pub use client::RelayConnection;
pub use config::ClientConfig;
pub use controller::{ClientEvent, Played, PlaybackController};
pub use error::PlaybackError;
pub use sink::{AudioSink, FileSink};
