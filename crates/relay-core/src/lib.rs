//! Relay Core
//!
//! Relays conversations to a remote agent backend and turns its event stream
//! into a small, stable outbound protocol. Tool-approval handshakes requested
//! by the backend are resolved automatically inside a bounded round loop.
//!
//! ## Modules
//! - `ai` - Backend wire types, SSE decoding, event normalization, HTTP client
//! - `agent` - Approval loop, output accumulation, outbound events
//! - `render` - Citation rewriting and code-block reconstruction
//! - `deploy` - Config fingerprinting and create-or-reuse of the remote agent

pub mod agent;
pub mod ai;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod render;

pub use agent::{ChatRelay, RelayEvent, StreamMode};
pub use config::{ConfigSource, RelayConfig};
