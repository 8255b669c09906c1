//! WebSocket relay: text in, reply speech out as paced binary chunks.

pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod validation;

pub use app::{build_router, AppState};
pub use config::ServerConfig;
pub use session::{SessionEngine, SessionOptions};
