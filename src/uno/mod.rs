pub mod card;
pub mod deck;
pub mod game;
pub mod player;
pub mod rules;

pub use card::{Card, CardKind, Color};
pub use game::{Direction, GameError, GameState, PlayOutcome};
pub use player::Player;
