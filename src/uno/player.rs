use super::card::Card;
use serde::{Deserialize, Serialize};

/// A seated player. `id` doubles as the seat/turn-order position and
/// never changes for the lifetime of the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: usize,
    pub name: String,
    pub hand: Vec<Card>,
    pub score: u32,
}

impl Player {
    pub fn new(id: usize, name: String) -> Self {
        Self {
            id,
            name,
            hand: Vec::new(),
            score: 0,
        }
    }

    /// Point total of the cards still in hand, credited to the winner
    /// at the end of a game.
    pub fn hand_points(&self) -> u32 {
        self.hand.iter().map(Card::points).sum()
    }
}
