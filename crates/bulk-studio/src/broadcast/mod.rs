//! Event streaming for host view layers.

pub mod batch_progress;

pub use batch_progress::{BatchEvent, BatchEventKind, BatchProgressBroadcaster};
