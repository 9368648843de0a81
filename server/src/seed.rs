use crate::registry::PlayerState;

pub const DUMMY_PLAYER_ID: &str = "dummy-player-id";
pub const DUMMY_GROUP_TAG: &str = "00000";

/// Stationary player that lets a lone client see a non-empty list
pub fn dummy_player(now: u64) -> PlayerState {
    PlayerState {
        id: DUMMY_PLAYER_ID.to_string(),
        group_tag: DUMMY_GROUP_TAG.to_string(),
        x: 200,
        y: 200,
        vel_x: 0,
        vel_y: 0,
        color: "blue".to_string(),
        last_seen: now,
        return_addr: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_player_fields() {
        let player = dummy_player(77);
        assert_eq!(player.id, DUMMY_PLAYER_ID);
        assert_eq!(player.group_tag, DUMMY_GROUP_TAG);
        assert_eq!((player.x, player.y), (200, 200));
        assert_eq!(player.color, "blue");
        assert_eq!(player.last_seen, 77);
    }
}
