use crate::uno::GameState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// On-disk form of a room: the authoritative snapshot plus the time of
/// the last accepted transition.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedRoom {
    pub state: GameState,
    pub last_updated: DateTime<Utc>,
}

/// One JSON document per room id under the data directory, rewritten
/// after every accepted transition.
pub struct RoomStore {
    data_dir: PathBuf,
}

impl RoomStore {
    pub fn new(data_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn path(&self, room_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", room_id))
    }

    pub fn save(&self, room_id: &str, room: &PersistedRoom) -> io::Result<()> {
        let json = serde_json::to_string_pretty(room)?;
        fs::write(self.path(room_id), json)
    }

    /// `Ok(None)` when the room has never been persisted.
    pub fn load(&self, room_id: &str) -> io::Result<Option<PersistedRoom>> {
        let json = match fs::read_to_string(self.path(room_id)) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let room = serde_json::from_str(&json)?;
        Ok(Some(room))
    }
}
