//! # Match Server
//!
//! Authoritative server for a two-player builder vs attacker match. The
//! builder lays out rooms on a grid and fits them with traps; the attacker
//! picks an entry room once play starts and has a fixed time to destroy the
//! reactor while the builder defends.
//!
//! ## Architecture
//!
//! All match state lives in [`game::GameState`], mutated only by the main
//! loop in [`network::Server`]. Network tasks never touch it: an acceptor
//! task and one reader and one writer task per TCP connection talk to the
//! loop over channels. Client commands are queued in receipt order and
//! applied at the start of the next tick, before the simulation step.
//!
//! Requests the rules refuse are dropped silently. The typed reason is only
//! logged at debug level; clients learn about state from the events the
//! server broadcasts.
//!
//! ## Modules
//!
//! - `phase`, `round`, `roles`: match progression and who plays what
//! - `rooms`, `traps`, `fog`: placement validation and the base reveal
//! - `combat`, `hazards`, `bots`: health, projectiles and trap behaviour
//! - `spatial`: collider index answering overlap and sweep queries
//! - `schedule`: deferred respawns and removals
//! - `client_manager`, `network`, `config`: transport and settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::network::NetError> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod bots;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod entity;
pub mod fog;
pub mod game;
pub mod hazards;
pub mod network;
pub mod phase;
pub mod roles;
pub mod rooms;
pub mod round;
pub mod schedule;
pub mod spatial;
pub mod traps;
