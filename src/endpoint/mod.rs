//! Local socket endpoint
//!
//! Makes a queue device reachable from other processes: requests and responses
//! travel as length-prefixed frames over a Unix domain socket.

pub mod client;
pub mod server;

pub use client::QueueClient;
pub use server::QueueServer;
