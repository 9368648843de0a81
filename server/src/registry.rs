//! Shared registry of every player the server currently knows about
//!
//! Entries are created implicitly the first time a player shows up on either
//! protocol and are only ever removed by the sweeper. A single readers-writer
//! lock guards the whole map so that list snapshots are consistent across
//! entries, not just within one.

use log::{debug, info};
use shared::{ColorCode, PlayerRecord, PositionUpdate, DEFAULT_COLOR};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use tokio::sync::RwLock;

/// Everything the server tracks for one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: String,
    /// Combat group; empty when the player is ungrouped
    pub group_tag: String,
    pub x: i32,
    pub y: i32,
    pub vel_x: i32,
    pub vel_y: i32,
    pub color: String,
    /// Milliseconds since the Unix epoch of the last accepted update
    pub last_seen: u64,
    /// Where list replies for this player go
    pub return_addr: Option<SocketAddr>,
}

impl PlayerState {
    /// Creates a stationary, ungrouped player with the default color
    pub fn new(id: &str, last_seen: u64) -> Self {
        Self {
            id: id.to_string(),
            group_tag: String::new(),
            x: 0,
            y: 0,
            vel_x: 0,
            vel_y: 0,
            color: DEFAULT_COLOR.to_string(),
            last_seen,
            return_addr: None,
        }
    }

    fn apply_position(&mut self, update: &PositionUpdate, addr: SocketAddr) {
        self.x = update.x;
        self.y = update.y;
        self.vel_x = update.vel_x;
        self.vel_y = update.vel_y;
        self.color = update.color.clone();
        self.last_seen = update.timestamp;
        self.return_addr = Some(addr);
    }

    pub fn is_stale(&self, now: u64, timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_seen) > timeout_ms
    }

    /// Wire view of this player for a list response
    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id.clone(),
            group_tag: self.group_tag.clone(),
            x: self.x,
            y: self.y,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
            color: ColorCode::from_color(&self.color),
            last_seen: self.last_seen,
        }
    }
}

/// Process-wide player map shared by every listener and the sweeper
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: RwLock<HashMap<String, PlayerState>>,
    /// Ids that are never evicted and never count as group members
    exempt: HashSet<String>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a permanent synthetic player.
    ///
    /// Called before the registry is shared, so no lock contention is
    /// possible here.
    pub fn with_seed(mut self, player: PlayerState) -> Self {
        info!(
            "Seeding synthetic player {} in group '{}'",
            player.id, player.group_tag
        );
        self.exempt.insert(player.id.clone());
        self.players.get_mut().insert(player.id.clone(), player);
        self
    }

    pub fn is_exempt(&self, id: &str) -> bool {
        self.exempt.contains(id)
    }

    /// Creates `id` if unknown, then applies `apply` to its entry.
    ///
    /// The only path through which players come into existence. Returns true
    /// if the player was new.
    pub async fn upsert<F>(&self, id: &str, now: u64, apply: F) -> bool
    where
        F: FnOnce(&mut PlayerState),
    {
        let mut players = self.players.write().await;
        match players.get_mut(id) {
            Some(player) => {
                apply(player);
                false
            }
            None => {
                let mut player = PlayerState::new(id, now);
                apply(&mut player);
                players.insert(id.to_string(), player);
                true
            }
        }
    }

    /// Applies a position push, creating the player on first sighting
    pub async fn upsert_from_position(&self, update: &PositionUpdate, addr: SocketAddr) -> bool {
        let created = self
            .upsert(&update.player_id, update.timestamp, |player| {
                player.apply_position(update, addr)
            })
            .await;
        if created {
            info!("New player {} added via position update", update.player_id);
        }
        created
    }

    /// Moves a player into a combat group, creating them if unknown.
    ///
    /// Only the group tag changes on an existing entry.
    pub async fn upsert_group_tag(&self, id: &str, group_tag: &str, now: u64) -> bool {
        let created = self
            .upsert(id, now, |player| player.group_tag = group_tag.to_string())
            .await;
        if created {
            info!("Added new player {} with combat tag '{}'", id, group_tag);
        } else {
            info!("Updated combat tag for player {} to '{}'", id, group_tag);
        }
        created
    }

    /// Refreshes return address and timestamp of a known player.
    ///
    /// Unknown ids are left alone. Returns the player's group tag if known.
    pub async fn touch(&self, id: &str, addr: SocketAddr, now: u64) -> Option<String> {
        let mut players = self.players.write().await;
        let player = players.get_mut(id)?;
        player.return_addr = Some(addr);
        player.last_seen = now;
        Some(player.group_tag.clone())
    }

    /// Snapshot of every player except `exclude_id` in `group_filter`.
    ///
    /// An empty filter matches every group, including ungrouped players.
    pub async fn list_excluding(&self, exclude_id: &str, group_filter: &str) -> Vec<PlayerState> {
        let players = self.players.read().await;
        let listed: Vec<PlayerState> = players
            .values()
            .filter(|p| p.id != exclude_id)
            .filter(|p| group_filter.is_empty() || p.group_tag == group_filter)
            .cloned()
            .collect();
        debug!(
            "Listed {} of {} players for '{}' (group '{}')",
            listed.len(),
            players.len(),
            exclude_id,
            group_filter
        );
        listed
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.players.write().await.remove(id).is_some()
    }

    pub async fn get(&self, id: &str) -> Option<PlayerState> {
        self.players.read().await.get(id).cloned()
    }

    /// Ids of live, non-exempt players tagged with `group`
    pub async fn members_of(&self, group: &str) -> HashSet<String> {
        let players = self.players.read().await;
        players
            .values()
            .filter(|p| p.group_tag == group && !self.is_exempt(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Deletes every non-exempt player idle for longer than `timeout_ms`.
    ///
    /// Returns the removed ids.
    pub async fn evict_stale(&self, now: u64, timeout_ms: u64) -> Vec<String> {
        let mut players = self.players.write().await;
        let stale: Vec<String> = players
            .values()
            .filter(|p| !self.is_exempt(&p.id) && p.is_stale(now, timeout_ms))
            .map(|p| p.id.clone())
            .collect();

        for id in &stale {
            players.remove(id);
        }

        stale
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }
}
