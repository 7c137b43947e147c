// Save-state records, JSON-encoded into the save_states table

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The reserved singleton slot. Always overwritten in place, never
/// renamed.
pub const QUICK_SAVE_SLOT: &str = "quick_save.state";

/// One named save-state slot: compressed snapshot bytes plus a thumbnail
/// data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    #[serde(rename = "stateName")]
    pub state_name: String,
    #[serde(rename = "state", with = "b64")]
    pub state: Vec<u8>,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// All save-states of one title, keyed by slot name. Keys are unique;
/// a surviving entry with an empty map is a valid terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateEntry {
    #[serde(rename = "gameName")]
    pub game_name: String,
    #[serde(default)]
    pub states: BTreeMap<String, StateEntry>,
}

impl GameStateEntry {
    pub fn empty(game_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            states: BTreeMap::new(),
        }
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
