use serde::{Deserialize, Serialize};
use std::fmt;

/// The four playable colors. Wild cards carry no color of their own;
/// the chosen color lives in `GameState::current_color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::Green => write!(f, "Green"),
            Color::Blue => write!(f, "Blue"),
            Color::Yellow => write!(f, "Yellow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

impl CardKind {
    pub fn is_wild(&self) -> bool {
        matches!(self, CardKind::Wild | CardKind::WildDrawFour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub kind: CardKind,
    pub color: Option<Color>,
}

impl Card {
    pub fn new(color: Color, kind: CardKind) -> Self {
        Self {
            kind,
            color: Some(color),
        }
    }

    pub fn wild(kind: CardKind) -> Self {
        debug_assert!(kind.is_wild());
        Self { kind, color: None }
    }

    pub fn is_wild(&self) -> bool {
        self.kind.is_wild()
    }

    /// Official scoring value: face value for numbers, 20 for actions,
    /// 50 for wilds.
    pub fn points(&self) -> u32 {
        match self.kind {
            CardKind::Number(n) => u32::from(n),
            CardKind::Skip | CardKind::Reverse | CardKind::DrawTwo => 20,
            CardKind::Wild | CardKind::WildDrawFour => 50,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.color, self.kind) {
            (Some(c), CardKind::Number(n)) => write!(f, "{} {}", c, n),
            (Some(c), CardKind::Skip) => write!(f, "{} Skip", c),
            (Some(c), CardKind::Reverse) => write!(f, "{} Reverse", c),
            (Some(c), CardKind::DrawTwo) => write!(f, "{} Draw Two", c),
            (_, CardKind::Wild) => write!(f, "Wild"),
            (_, CardKind::WildDrawFour) => write!(f, "Wild Draw Four"),
            (None, kind) => write!(f, "{:?}", kind),
        }
    }
}
