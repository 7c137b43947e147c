// Typed shapes of the object-store API, validated at the boundary

use serde::Deserialize;

/// Metadata of one stored file, as returned by queries, uploads and
/// metadata patches.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
}

/// Result of a file query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileMetadata>,
}

/// The battery-backup payload for one title. Listings carry only the
/// name; `data` stays empty until the file body is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    pub game_name: String,
    pub data: Vec<u8>,
}

impl SaveEntry {
    pub fn empty(game_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            data: Vec::new(),
        }
    }
}
