//! Wire protocols shared by the sync server and its clients.
//!
//! Two protocols live here:
//! - [`position`]: the big-endian binary format used on the UDP endpoints
//!   (position pushes in, filtered player lists out)
//! - [`control`]: the JSON messages used on the single-shot TCP endpoints
//!   (combat-tag assignment and level completion)

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod control;
pub mod position;

pub use control::{
    CombatTagRequest, ControlError, LevelCompletionRequest, LevelCompletionResponse,
};
pub use position::{ColorCode, DecodeError, PlayerList, PlayerRecord, PositionUpdate};

pub const POSITION_UPDATE_PORT: u16 = 8089;
pub const PLAYER_LIST_PORT: u16 = 8090;
pub const COMBAT_TAG_PORT: u16 = 5000;
pub const LEVEL_COMPLETION_PORT: u16 = 5001;

/// Entries not refreshed within this window are evicted by the server.
pub const PLAYER_TIMEOUT_MS: u64 = 15_000;
pub const SWEEP_INTERVAL_MS: u64 = 1_000;

/// Width of the space-padded id column in a player-list record.
pub const ID_FIELD_WIDTH: usize = 36;

/// Largest control message a server will buffer before giving up on it.
pub const MAX_CONTROL_MESSAGE: usize = 4096;

/// Default color for entries first seen through the control protocol.
pub const DEFAULT_COLOR: &str = "red";

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let t1 = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        let t2 = get_timestamp();
        assert!(t2 > t1);
    }

    #[test]
    fn test_default_ports_are_distinct() {
        let ports = [
            POSITION_UPDATE_PORT,
            PLAYER_LIST_PORT,
            COMBAT_TAG_PORT,
            LEVEL_COMPLETION_PORT,
        ];
        for (i, a) in ports.iter().enumerate() {
            for b in &ports[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
