use super::store::{PersistedRoom, RoomStore};
use crate::uno::{Card, Color, Direction, GameError, GameState, Player};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, warn};
use uuid::Uuid;

/// Seats per room.
pub const MAX_PLAYERS: usize = 4;

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room is full")]
    RoomFull,
    #[error("the game is already in progress")]
    GameInProgress,
    #[error("a player of that name is already connected")]
    NameTaken,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Fan-out payload for every subscriber of a room, the originator of a
/// transition included. Hands are redacted per subscriber at send time,
/// so the channel itself carries the full snapshot.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    StateUpdated(GameState),
    Reset,
}

/// One shared game plus the mapping from seats to the live connections
/// that claim them.
pub struct Room {
    pub state: GameState,
    seats: HashMap<usize, Uuid>,
    events: broadcast::Sender<RoomEvent>,
    pub last_updated: DateTime<Utc>,
}

impl Room {
    pub fn new(state: GameState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state,
            seats: HashMap::new(),
            events,
            last_updated: Utc::now(),
        }
    }

    fn from_persisted(persisted: PersistedRoom) -> Self {
        let mut room = Room::new(persisted.state);
        room.last_updated = persisted.last_updated;
        room
    }

    /// Seats a client. A player of the same name reclaims their
    /// existing seat if no other connection holds it; a new name gets
    /// the lowest unclaimed slot, which for an append-only roster is
    /// the next free index.
    pub fn claim_seat(&mut self, name: &str, client: Uuid) -> Result<usize, RoomError> {
        if let Some(player) = self.state.players.iter().find(|p| p.name == name) {
            let seat = player.id;
            return match self.seats.get(&seat) {
                Some(owner) if *owner != client => Err(RoomError::NameTaken),
                _ => {
                    self.seats.insert(seat, client);
                    Ok(seat)
                }
            };
        }

        if self.state.game_started {
            return Err(RoomError::GameInProgress);
        }
        if self.state.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }

        let seat = self.state.players.len();
        self.state.players.push(Player::new(seat, name.to_string()));
        self.seats.insert(seat, client);
        Ok(seat)
    }

    /// Frees whatever seat the connection held, letting the same name
    /// rejoin later. The player stays in the roster.
    pub fn release_seat(&mut self, client: Uuid) {
        self.seats.retain(|_, owner| *owner != client);
    }

    pub fn seat_claimed_by(&self, seat: usize, client: Uuid) -> bool {
        self.seats.get(&seat) == Some(&client)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn broadcast_state(&self) {
        // No receivers is fine; the store still holds the snapshot.
        let _ = self
            .events
            .send(RoomEvent::StateUpdated(self.state.clone()));
    }

    pub fn broadcast_reset(&self) {
        let _ = self.events.send(RoomEvent::Reset);
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// A player as seen by someone who may not look at their cards: the
/// hand collapses to same-length `null` placeholders so a client can
/// still render the right number of card backs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedPlayer {
    pub id: usize,
    pub name: String,
    pub hand: Vec<Option<Card>>,
    pub score: u32,
}

/// The snapshot a single client is allowed to see. Deck contents are
/// never serialized, only the remaining count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    pub players: Vec<RedactedPlayer>,
    pub current_player: usize,
    pub direction: Direction,
    pub current_color: Option<Color>,
    pub discard_top: Option<Card>,
    pub deck_remaining: usize,
    pub game_started: bool,
    pub winner: Option<usize>,
    pub pending_draw: usize,
    pub uno_called: Vec<usize>,
    pub needs_uno_call: Vec<usize>,
    pub drawn_card_index: Option<usize>,
}

impl ClientView {
    /// Redacts every hand except the viewer's own. `None` is a
    /// spectator view with every hand hidden.
    pub fn redact(state: &GameState, viewer: Option<usize>) -> Self {
        let players = state
            .players
            .iter()
            .map(|p| RedactedPlayer {
                id: p.id,
                name: p.name.clone(),
                hand: p
                    .hand
                    .iter()
                    .map(|card| {
                        if Some(p.id) == viewer {
                            Some(*card)
                        } else {
                            None
                        }
                    })
                    .collect(),
                score: p.score,
            })
            .collect();

        let mut uno_called: Vec<usize> = state.uno_called.iter().copied().collect();
        uno_called.sort_unstable();
        let mut needs_uno_call: Vec<usize> = state.needs_uno_call.iter().copied().collect();
        needs_uno_call.sort_unstable();

        Self {
            players,
            current_player: state.current_player,
            direction: state.direction,
            current_color: state.current_color,
            discard_top: state.top_card().copied(),
            deck_remaining: state.deck.len(),
            game_started: state.game_started,
            winner: state.winner,
            pending_draw: state.pending_draw,
            uno_called,
            needs_uno_call,
            drawn_card_index: state.drawn_card_index,
        }
    }
}

/// Shared registry of live rooms backed by the store. Rooms are loaded
/// lazily on first access and created on first join.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, Arc<Mutex<Room>>>>>,
    store: Arc<RoomStore>,
}

impl RoomManager {
    pub fn new(store: RoomStore) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            store: Arc::new(store),
        }
    }

    /// An existing room, resurrecting it from disk if this process has
    /// not touched it yet. `None` for an id nobody ever joined.
    pub async fn get(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        if let Some(room) = self.rooms.read().await.get(room_id) {
            return Some(room.clone());
        }

        let persisted = match self.store.load(room_id) {
            Ok(found) => found?,
            Err(e) => {
                error!(room_id, error = %e, "failed to load persisted room");
                return None;
            }
        };

        let mut rooms = self.rooms.write().await;
        // Another task may have loaded it while we read the file.
        if let Some(room) = rooms.get(room_id) {
            return Some(room.clone());
        }
        let room = Arc::new(Mutex::new(Room::from_persisted(persisted)));
        rooms.insert(room_id.to_string(), room.clone());
        Some(room)
    }

    /// The room for a join: existing, persisted, or brand new.
    pub async fn get_or_create(&self, room_id: &str) -> Arc<Mutex<Room>> {
        if let Some(room) = self.get(room_id).await {
            return room;
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Room::new(GameState::new(Vec::new())))))
            .clone()
    }

    /// Write-after-transition. Persistence is best effort: a failed
    /// write is logged and reported so the caller can surface a
    /// `not_saved` indicator instead of dropping the move silently.
    pub fn persist(&self, room_id: &str, room: &Room) -> bool {
        let persisted = PersistedRoom {
            state: room.state.clone(),
            last_updated: room.last_updated,
        };
        match self.store.save(room_id, &persisted) {
            Ok(()) => true,
            Err(e) => {
                warn!(room_id, error = %e, "failed to persist room state");
                false
            }
        }
    }
}
