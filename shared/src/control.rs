//! JSON control messages exchanged over single-shot TCP connections.
//!
//! A connection carries exactly one request. Combat-tag requests get no
//! reply; level-completion requests get exactly one
//! [`LevelCompletionResponse`] before the server closes the stream.

use serde::{Deserialize, Serialize};
use serde_json::error::Category;

/// Errors produced while decoding a control request
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("missing or mistyped fields: {0}")]
    MissingFields(#[source] serde_json::Error),
}

impl ControlError {
    /// Text placed in the `error` field of a level-completion reply
    pub fn reply_text(&self) -> &'static str {
        match self {
            ControlError::InvalidJson(_) => "Invalid JSON",
            ControlError::MissingFields(_) => "Missing fields",
        }
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => ControlError::MissingFields(err),
            Category::Io | Category::Syntax | Category::Eof => ControlError::InvalidJson(err),
        }
    }
}

/// Assigns a player to a combat group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatTagRequest {
    pub player_id: String,
    pub combat_id: String,
}

/// Reports that a player finished a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCompletionRequest {
    pub player_id: String,
    pub combat_id: String,
    /// Clients send a JSON number; fractions are allowed on the wire
    pub level_num: f64,
}

impl LevelCompletionRequest {
    pub fn new(player_id: &str, combat_id: &str, level: i64) -> Self {
        Self {
            player_id: player_id.to_string(),
            combat_id: combat_id.to_string(),
            level_num: level as f64,
        }
    }

    /// Level number truncated toward zero
    pub fn level(&self) -> i64 {
        self.level_num.trunc() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCompletionResponse {
    pub all_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_for_players: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LevelCompletionResponse {
    /// The group finished `current_level` (or the report was stale)
    pub fn completed(current_level: i64) -> Self {
        Self {
            all_completed: true,
            current_level: Some(current_level),
            waiting_for_players: None,
            error: None,
        }
    }

    /// Some members of the group have not reported yet
    pub fn waiting(current_level: i64, waiting_for: Vec<String>) -> Self {
        Self {
            all_completed: false,
            current_level: Some(current_level),
            waiting_for_players: Some(waiting_for),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            all_completed: false,
            current_level: None,
            waiting_for_players: None,
            error: Some(message.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub fn decode_combat_tag(data: &[u8]) -> Result<CombatTagRequest, ControlError> {
    Ok(serde_json::from_slice(data)?)
}

pub fn decode_level_completion(data: &[u8]) -> Result<LevelCompletionRequest, ControlError> {
    Ok(serde_json::from_slice(data)?)
}

/// Serializes any control message to its JSON bytes
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

pub fn decode_level_response(data: &[u8]) -> Result<LevelCompletionResponse, ControlError> {
    Ok(serde_json::from_slice(data)?)
}

/// True once `data` holds a complete JSON value, or can never become one.
///
/// Used by stream readers to decide whether to keep reading.
pub fn is_complete_message(data: &[u8]) -> bool {
    match serde_json::from_slice::<serde_json::Value>(data) {
        Ok(_) => true,
        Err(err) => !err.is_eof(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_combat_tag() {
        let request = decode_combat_tag(br#"{"playerId":"p1","combatId":"blue"}"#).unwrap();
        assert_eq!(request.player_id, "p1");
        assert_eq!(request.combat_id, "blue");
    }

    #[test]
    fn test_combat_tag_missing_field() {
        let err = decode_combat_tag(br#"{"playerId":"p1"}"#).unwrap_err();
        assert!(matches!(err, ControlError::MissingFields(_)));
        assert_eq!(err.reply_text(), "Missing fields");
    }

    #[test]
    fn test_combat_tag_invalid_json() {
        let err = decode_combat_tag(b"{playerId: p1").unwrap_err();
        assert!(matches!(err, ControlError::InvalidJson(_)));
        assert_eq!(err.reply_text(), "Invalid JSON");
    }

    #[test]
    fn test_level_num_is_truncated() {
        let request =
            decode_level_completion(br#"{"playerId":"a","combatId":"g","levelNum":2.9}"#)
                .unwrap();
        assert_eq!(request.level(), 2);

        let request =
            decode_level_completion(br#"{"playerId":"a","combatId":"g","levelNum":-1.5}"#)
                .unwrap();
        assert_eq!(request.level(), -1);

        let request =
            decode_level_completion(br#"{"playerId":"a","combatId":"g","levelNum":4}"#).unwrap();
        assert_eq!(request.level(), 4);
    }

    #[test]
    fn test_level_num_wrong_type() {
        let err = decode_level_completion(br#"{"playerId":"a","combatId":"g","levelNum":"3"}"#)
            .unwrap_err();
        assert!(matches!(err, ControlError::MissingFields(_)));
    }

    #[test]
    fn test_level_request_extra_fields_ignored() {
        let request = decode_level_completion(
            br#"{"playerId":"a","combatId":"g","levelNum":1,"score":900}"#,
        )
        .unwrap();
        assert_eq!(request.level(), 1);
    }

    #[test]
    fn test_completed_response_shape() {
        let body = encode(&LevelCompletionResponse::completed(3)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"allCompleted": true, "currentLevel": 3}));
    }

    #[test]
    fn test_waiting_response_shape() {
        let response = LevelCompletionResponse::waiting(2, vec!["c".to_string()]);
        let value: serde_json::Value = serde_json::from_slice(&encode(&response).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"allCompleted": false, "currentLevel": 2, "waitingForPlayers": ["c"]})
        );
    }

    #[test]
    fn test_error_response_shape() {
        let response = LevelCompletionResponse::error("Invalid JSON");
        let value: serde_json::Value = serde_json::from_slice(&encode(&response).unwrap()).unwrap();
        assert_eq!(value, json!({"allCompleted": false, "error": "Invalid JSON"}));
        assert!(response.is_error());
    }

    #[test]
    fn test_decode_minimal_response() {
        let response = decode_level_response(br#"{"allCompleted":true,"currentLevel":5}"#).unwrap();
        assert_eq!(response, LevelCompletionResponse::completed(5));
    }

    #[test]
    fn test_request_encoding_uses_camel_case() {
        let body = encode(&LevelCompletionRequest::new("p", "g", 7)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["playerId"], "p");
        assert_eq!(value["combatId"], "g");
        assert_eq!(value["levelNum"], 7.0);
    }

    #[test]
    fn test_is_complete_message() {
        assert!(!is_complete_message(b""));
        assert!(!is_complete_message(br#"{"playerId":"p"#));
        assert!(is_complete_message(br#"{"playerId":"p"}"#));
        assert!(is_complete_message(b"{oops"));
    }
}
