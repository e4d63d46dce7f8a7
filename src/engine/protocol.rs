use serde::{Deserialize, Serialize};

/// Messages exchanged with the playback surface, encoded as two-element
/// JSON arrays: `["position", 12.5]` from the player, `["seek", 30]` to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(String, f64)", into = "(String, f64)")]
pub enum PlayerMessage {
    Position(f64),
    Seek(f64),
}

impl TryFrom<(String, f64)> for PlayerMessage {
    type Error = String;

    fn try_from((kind, seconds): (String, f64)) -> Result<Self, Self::Error> {
        match kind.as_str() {
            "position" => Ok(PlayerMessage::Position(seconds)),
            "seek" => Ok(PlayerMessage::Seek(seconds)),
            other => Err(format!("unknown player message '{}'", other)),
        }
    }
}

impl From<PlayerMessage> for (String, f64) {
    fn from(message: PlayerMessage) -> Self {
        match message {
            PlayerMessage::Position(t) => ("position".to_string(), t),
            PlayerMessage::Seek(t) => ("seek".to_string(), t),
        }
    }
}
