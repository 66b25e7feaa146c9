//! # Match Client Library
//!
//! Headless client for builder vs attacker matches. It keeps a replica of
//! the server's state, checks requests locally with the same rules the
//! server enforces, and drives everything from text commands.
//!
//! ## Module Organization
//!
//! - `replica`: mirror of phase, round, rooms, traps, health and entities,
//!   with an observer interface for reacting to changes
//! - `predict`: local placement, spawn and firing checks so doomed requests
//!   are never sent
//! - `input`: stdin command parser and sequenced movement input
//! - `network`: TCP connection, heartbeat and the command loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     client::network::run("127.0.0.1:8080", None).await
//! }
//! ```

pub mod input;
pub mod network;
pub mod predict;
pub mod replica;
