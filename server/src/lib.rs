//! # Combat Sync Server Library
//!
//! Server side of a lightweight state-sync backend for cooperative
//! multiplayer levels. Clients push their own position over UDP, pull the
//! positions of their group mates over UDP, and use short TCP exchanges to
//! join a combat group and to report finished levels.
//!
//! ## Core Responsibilities
//!
//! ### Player Registry
//! One shared map from player id to last known state. Entries appear the
//! first time a player is seen on any endpoint; there is no explicit join.
//! A single readers-writer lock guards the whole map so list snapshots never
//! mix old and new entries.
//!
//! ### Level Consensus
//! Every combat group moves through levels together. A level is finished
//! once every live member has reported it. Late reports for levels the group
//! already left are answered as "completed" so lagging clients catch up.
//!
//! ### Lifecycle
//! Players that stop sending updates for longer than the timeout are swept
//! out once per interval. The synthetic seed player is never swept.
//!
//! ## Module Organization
//!
//! - `registry`: the player map and its upsert / list / evict operations
//! - `levels`: per-group level state and the consensus check
//! - `sweeper`: periodic eviction task
//! - `network`: the four listeners and per-message handlers
//! - `config`: command line and defaults
//! - `seed`: the synthetic player present at startup
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::levels::LevelTracker;
//! use server::network::Server;
//! use server::registry::PlayerRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let registry = Arc::new(PlayerRegistry::new());
//!     let levels = Arc::new(LevelTracker::new(Arc::clone(&registry)));
//!
//!     let server = Server::bind(&ServerConfig::default(), registry, levels).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Trust Boundary
//!
//! Staleness is judged against timestamps supplied by clients in their
//! position updates. A client with a skewed clock can keep its own entry
//! alive or get itself evicted early; nothing here authenticates clients.

pub mod config;
pub mod levels;
pub mod network;
pub mod registry;
pub mod seed;
pub mod sweeper;
