//! QueueFlow queue worker
//!
//! Long-polls a queue and acknowledges each received message by deleting it.
//! A message whose deletion fails stays leased and is delivered again once
//! its visibility timeout elapses.

mod consumer;

pub use consumer::{BatchReport, Consumer, ConsumerSettings};
