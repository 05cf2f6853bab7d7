//! Chat relay
//!
//! ## Entry point
//! - `ChatRelay` - Spawns one relay task per chat request
//! - `RelayEvent` / `StreamMode` - Outbound protocol and forwarding mode
//!
//! ## Loop
//! - `ApprovalLoop` - Round state machine with automatic tool approvals
//! - `AccumulatedOutput` - Per-request text buffer with de-duplication guards
//! - `RelaySink` - Caller channel plus incremental forwarding cursor

pub mod events;
pub mod orchestrator;
pub mod output;
pub mod relay;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{RelayEvent, StreamMode};
pub use orchestrator::{ApprovalLoop, LoopOutcome, LoopState};
pub use output::AccumulatedOutput;
pub use relay::{user_safe_message, ChatRelay};
pub use stream::RelaySink;
