pub mod api;
pub mod room;
pub mod store;

pub use api::{router, serve, AppState};
pub use room::{ClientView, Room, RoomError, RoomEvent, RoomManager, MAX_PLAYERS};
pub use store::{PersistedRoom, RoomStore};
