//! The queue control surface: resize, blocking push, blocking pop, stats

pub mod config;
pub mod message_queue;
pub mod stats;


pub use config::QueueConfig;
pub use message_queue::MessageQueue;
pub use stats::{QueueStats, StatsSnapshot};
