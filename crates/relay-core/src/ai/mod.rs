//! Backend communication layer
//!
//! Wire types for the responses backend, the SSE decoder, the event
//! normalizer and the HTTP client.

pub mod client;
pub mod convert;
pub mod error;
pub mod parsers;
pub mod sse;
pub mod types;

pub use error::BackendError;
