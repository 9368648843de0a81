//! # Combat Sync Client Library
//!
//! Client side of the combat sync protocol. A client pushes its own
//! position, pulls the positions of everyone in its combat group, joins a
//! group and reports finished levels.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`network::SyncClient`] wraps one UDP socket for position pushes and list
//! requests. Control messages each use a short-lived TCP connection.
//!
//! ### Bot Module (`bot`)
//! Headless wandering motion used by the command line client and load tests.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Endpoints, SyncClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoints = Endpoints::on_host("127.0.0.1".parse()?);
//!     let client = SyncClient::new("player-1", endpoints).await?;
//!
//!     client.assign_combat_tag("raid-7").await?;
//!     client.send_position((100, 200), (1, 0), "red").await?;
//!
//!     let others = client.request_player_list(Duration::from_secs(1)).await?;
//!     println!("{} players nearby", others.players.len());
//!
//!     let verdict = client
//!         .report_level_completion("raid-7", 0, Duration::from_secs(1))
//!         .await?;
//!     println!("all completed: {}", verdict.all_completed);
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod network;
