use super::card::{Card, CardKind, Color};
use super::deck::{self, HAND_SIZE};
use super::player::Player;
use super::rules;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Direction of play around the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// The seat reached from `seat` after moving `steps` seats in this
    /// direction around a table of `player_count`.
    pub fn step(self, seat: usize, player_count: usize, steps: usize) -> usize {
        match self {
            Direction::Clockwise => (seat + steps) % player_count,
            Direction::CounterClockwise => {
                (seat + (player_count - 1) * steps) % player_count
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid move")]
    InvalidMove,
    #[error("wild draw four cannot be played while holding a card of the current color")]
    WildDrawFourRestricted,
    #[error("it is not player {0}'s turn")]
    NotYourTurn(usize),
    #[error("no card at index {0}")]
    CardNotInHand(usize),
    #[error("the game has not started")]
    NotStarted,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the game is already over")]
    GameOver,
    #[error("UNO can only be called with exactly one card in hand")]
    CallUnoInvalid,
    #[error("at least two players are required")]
    NotEnoughPlayers,
    #[error("the deck ran out of cards")]
    EmptyDeck,
}

/// Result of a legal `play_card` call. `NeedsColor` is the first half
/// of the two-phase wild protocol: the state is untouched and the
/// caller must re-invoke with a chosen color.
#[derive(Debug)]
pub enum PlayOutcome {
    Played(GameState),
    NeedsColor,
}

/// The full authoritative snapshot of one game. Transitions take
/// `&self` and return a fresh state, so a rejected operation can never
/// leave a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub deck: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub players: Vec<Player>,
    pub current_player: usize,
    pub direction: Direction,
    pub current_color: Option<Color>,
    pub game_started: bool,
    pub winner: Option<usize>,
    pub pending_draw: usize,
    pub uno_called: HashSet<usize>,
    pub needs_uno_call: HashSet<usize>,
    pub drawn_card_index: Option<usize>,
}

impl GameState {
    /// A roster with no cards dealt. `start` turns it into a running
    /// game.
    pub fn new(player_names: Vec<String>) -> Self {
        let players = player_names
            .into_iter()
            .enumerate()
            .map(|(id, name)| Player::new(id, name))
            .collect();

        Self {
            deck: Vec::new(),
            discard_pile: Vec::new(),
            players,
            current_player: 0,
            direction: Direction::Clockwise,
            current_color: None,
            game_started: false,
            winner: None,
            pending_draw: 0,
            uno_called: HashSet::new(),
            needs_uno_call: HashSet::new(),
            drawn_card_index: None,
        }
    }

    /// Shuffles, deals seven cards to every seat and flips the first
    /// discard. A wild flip gets a uniformly random starting color.
    pub fn start(&self) -> Result<GameState, GameError> {
        if self.game_started {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        let shuffled = deck::shuffle(deck::build_deck());
        let (hands, mut remaining) = deck::deal(shuffled, self.players.len(), HAND_SIZE)?;

        let mut next = self.clone();
        for (player, hand) in next.players.iter_mut().zip(hands) {
            player.hand = hand;
        }

        let top = remaining.pop().ok_or(GameError::EmptyDeck)?;
        next.current_color = match top.color {
            Some(color) => Some(color),
            None => {
                let mut rng = rand::rng();
                Some(Color::ALL[rng.random_range(0..Color::ALL.len())])
            }
        };
        next.discard_pile = vec![top];
        next.deck = remaining;
        next.current_player = 0;
        next.direction = Direction::Clockwise;
        next.game_started = true;
        next.winner = None;
        next.pending_draw = 0;
        next.uno_called.clear();
        next.needs_uno_call.clear();
        next.drawn_card_index = None;

        Ok(next)
    }

    /// Convenience constructor: roster plus deal in one step.
    pub fn initialize(player_names: Vec<String>) -> Result<GameState, GameError> {
        GameState::new(player_names).start()
    }

    /// Fresh shuffled game with the same roster; accumulated scores
    /// carry over between games.
    pub fn reset_for_rematch(&self) -> Result<GameState, GameError> {
        let mut next = GameState::new(self.players.iter().map(|p| p.name.clone()).collect());
        for (player, old) in next.players.iter_mut().zip(&self.players) {
            player.score = old.score;
        }
        next.start()
    }

    pub fn top_card(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    /// Total cards in circulation; 108 for the lifetime of a started
    /// game.
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    fn in_progress(&self, actor: usize) -> Result<(), GameError> {
        if !self.game_started {
            return Err(GameError::NotStarted);
        }
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        if actor >= self.players.len() || actor != self.current_player {
            return Err(GameError::NotYourTurn(actor));
        }
        Ok(())
    }

    fn advance(&mut self, steps: usize) {
        self.current_player =
            self.direction
                .step(self.current_player, self.players.len(), steps);
    }

    /// Takes the top card of the deck, reshuffling all but the top
    /// discard back into the deck when the supply runs out. `None`
    /// means both piles are exhausted.
    fn take_from_deck(&mut self) -> Option<Card> {
        if self.deck.is_empty() && self.discard_pile.len() > 1 {
            let top = self.discard_pile.pop()?;
            let reclaimed = std::mem::take(&mut self.discard_pile);
            self.deck = deck::shuffle(reclaimed);
            self.discard_pile = vec![top];
        }
        self.deck.pop()
    }

    /// Forced multi-card draw. Stops quietly if the supply is fully
    /// exhausted mid-draw.
    fn force_draw(&mut self, seat: usize, count: usize) {
        for _ in 0..count {
            match self.take_from_deck() {
                Some(card) => self.players[seat].hand.push(card),
                None => break,
            }
        }
    }

    fn apply_card_effect(&mut self, kind: CardKind) {
        match kind {
            CardKind::Skip => self.advance(2),
            CardKind::Reverse => {
                self.direction = self.direction.reverse();
                self.advance(1);
            }
            CardKind::DrawTwo => {
                self.pending_draw += 2;
                self.advance(1);
            }
            CardKind::WildDrawFour => {
                self.pending_draw += 4;
                self.advance(1);
            }
            CardKind::Wild | CardKind::Number(_) => self.advance(1),
        }
    }

    /// Plays `card_index` from the acting player's hand.
    ///
    /// The winning play is gated on the player having already called
    /// UNO; an empty hand without the call keeps the game going. A seat
    /// change wipes the UNO bookkeeping of every player, after
    /// penalizing the actor two cards if they had been sitting on an
    /// uncalled one-card hand since before this play.
    pub fn play_card(
        &self,
        actor: usize,
        card_index: usize,
        chosen_color: Option<Color>,
    ) -> Result<PlayOutcome, GameError> {
        self.in_progress(actor)?;

        let hand = &self.players[actor].hand;
        let card = *hand
            .get(card_index)
            .ok_or(GameError::CardNotInHand(card_index))?;
        let top = self.top_card().ok_or(GameError::NotStarted)?;
        rules::validate_move(&card, top, self.current_color, hand)?;

        if card.is_wild() && chosen_color.is_none() {
            return Ok(PlayOutcome::NeedsColor);
        }

        let mut next = self.clone();
        let entry_needs_call = next.needs_uno_call.contains(&actor);
        let entry_called = next.uno_called.contains(&actor);

        let card = next.players[actor].hand.remove(card_index);
        next.discard_pile.push(card);
        next.current_color = chosen_color.or(card.color).or(self.current_color);
        next.drawn_card_index = None;

        if next.players[actor].hand.is_empty() && entry_called {
            let winnings: u32 = next
                .players
                .iter()
                .filter(|p| p.id != actor)
                .map(Player::hand_points)
                .sum();
            next.players[actor].score += winnings;
            next.winner = Some(actor);
            return Ok(PlayOutcome::Played(next));
        }

        let seat_before = next.current_player;
        next.apply_card_effect(card.kind);

        if next.pending_draw > 0 {
            let victim = next.current_player;
            let count = next.pending_draw;
            next.force_draw(victim, count);
            next.advance(1);
            next.pending_draw = 0;
        }

        if next.current_player != seat_before {
            if entry_needs_call && !entry_called {
                next.force_draw(actor, 2);
            }
            next.uno_called.clear();
            next.needs_uno_call.clear();
        }

        match next.players[actor].hand.len() {
            1 => {
                next.needs_uno_call.insert(actor);
            }
            _ => {
                next.needs_uno_call.remove(&actor);
                next.uno_called.remove(&actor);
            }
        }

        Ok(PlayOutcome::Played(next))
    }

    /// Draws for the acting player: the accumulated pending cards if a
    /// Draw Two / Wild Draw Four is outstanding, otherwise a single
    /// card. A single drawn card that is immediately playable keeps the
    /// turn with the drawer, recorded in `drawn_card_index`.
    pub fn draw_card(&self, actor: usize) -> Result<GameState, GameError> {
        self.in_progress(actor)?;

        let mut next = self.clone();

        if next.pending_draw > 0 {
            let count = next.pending_draw;
            next.force_draw(actor, count);
            next.pending_draw = 0;
            next.drawn_card_index = None;
            next.advance(1);
            next.uno_called.clear();
            next.needs_uno_call.clear();
            return Ok(next);
        }

        let card = next.take_from_deck().ok_or(GameError::EmptyDeck)?;
        next.players[actor].hand.push(card);

        let top = *next.top_card().ok_or(GameError::NotStarted)?;
        if rules::is_playable(&card, &top, next.current_color) {
            next.drawn_card_index = Some(next.players[actor].hand.len() - 1);
        } else {
            next.drawn_card_index = None;
            next.advance(1);
            next.uno_called.clear();
            next.needs_uno_call.clear();
        }

        // Drawing moves the hand away from one card.
        if next.players[actor].hand.len() != 1 {
            next.needs_uno_call.remove(&actor);
            next.uno_called.remove(&actor);
        }

        Ok(next)
    }

    /// Declares UNO for a player sitting on exactly one card. Any other
    /// hand size is rejected without mutation.
    pub fn call_uno(&self, actor: usize) -> Result<GameState, GameError> {
        if !self.game_started {
            return Err(GameError::NotStarted);
        }
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        if actor >= self.players.len() || self.players[actor].hand.len() != 1 {
            return Err(GameError::CallUnoInvalid);
        }

        let mut next = self.clone();
        next.uno_called.insert(actor);
        next.needs_uno_call.remove(&actor);
        Ok(next)
    }
}
