//! Event normalization for backend streams

mod responses;

pub use responses::{normalize, NormalizedEvent, OutputItem};
