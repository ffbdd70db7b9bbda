use super::card::{Card, CardKind, Color};
use rand::seq::SliceRandom;

use super::game::GameError;

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 108;

/// Cards dealt to each player at the start of a game.
pub const HAND_SIZE: usize = 7;

/// Enumerates all 108 cards in the standard distribution, in a fixed
/// order. Shuffling is a separate step.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);

    for color in Color::ALL {
        // One 0 per color, two each of 1-9.
        deck.push(Card::new(color, CardKind::Number(0)));
        for number in 1..=9 {
            deck.push(Card::new(color, CardKind::Number(number)));
            deck.push(Card::new(color, CardKind::Number(number)));
        }

        // Two each of Skip, Reverse and Draw Two per color.
        for _ in 0..2 {
            deck.push(Card::new(color, CardKind::Skip));
            deck.push(Card::new(color, CardKind::Reverse));
            deck.push(Card::new(color, CardKind::DrawTwo));
        }
    }

    // Four of each wild.
    for _ in 0..4 {
        deck.push(Card::wild(CardKind::Wild));
        deck.push(Card::wild(CardKind::WildDrawFour));
    }

    deck
}

/// Fisher-Yates shuffle. Consumes the deck and returns a uniformly
/// random permutation of it.
pub fn shuffle(mut deck: Vec<Card>) -> Vec<Card> {
    let mut rng = rand::rng();
    deck.shuffle(&mut rng);
    deck
}

/// Deals `hand_size` cards to each of `player_count` players, one card
/// per player per round, and returns the hands in player-index order
/// along with the undealt remainder. The top of the deck is its last
/// element.
pub fn deal(
    mut deck: Vec<Card>,
    player_count: usize,
    hand_size: usize,
) -> Result<(Vec<Vec<Card>>, Vec<Card>), GameError> {
    if deck.len() < player_count * hand_size {
        return Err(GameError::EmptyDeck);
    }

    let mut hands = vec![Vec::with_capacity(hand_size); player_count];
    for _ in 0..hand_size {
        for hand in hands.iter_mut() {
            let card = deck.pop().ok_or(GameError::EmptyDeck)?;
            hand.push(card);
        }
    }

    Ok((hands, deck))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn count_cards(cards: &[Card]) -> HashMap<(CardKind, Option<Color>), usize> {
        let mut counts = HashMap::new();
        for card in cards {
            *counts.entry((card.kind, card.color)).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn deck_has_108_cards() {
        assert_eq!(build_deck().len(), DECK_SIZE);
    }

    #[test]
    fn deck_distribution() {
        let counts = count_cards(&build_deck());

        for color in Color::ALL {
            assert_eq!(counts[&(CardKind::Number(0), Some(color))], 1);
            for n in 1..=9 {
                assert_eq!(counts[&(CardKind::Number(n), Some(color))], 2);
            }
            assert_eq!(counts[&(CardKind::Skip, Some(color))], 2);
            assert_eq!(counts[&(CardKind::Reverse, Some(color))], 2);
            assert_eq!(counts[&(CardKind::DrawTwo, Some(color))], 2);
        }
        assert_eq!(counts[&(CardKind::Wild, None)], 4);
        assert_eq!(counts[&(CardKind::WildDrawFour, None)], 4);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let deck = build_deck();
        let shuffled = shuffle(deck.clone());
        assert_eq!(shuffled.len(), deck.len());
        assert_eq!(count_cards(&shuffled), count_cards(&deck));
    }

    #[test]
    fn deal_round_robin() {
        let deck = build_deck();
        let (hands, rest) = deal(deck.clone(), 3, HAND_SIZE).unwrap();

        assert_eq!(hands.len(), 3);
        for hand in &hands {
            assert_eq!(hand.len(), HAND_SIZE);
        }
        assert_eq!(rest.len(), deck.len() - 3 * HAND_SIZE);

        // No card lost or duplicated across hands and remainder.
        let mut all: Vec<Card> = rest.clone();
        for hand in &hands {
            all.extend_from_slice(hand);
        }
        assert_eq!(count_cards(&all), count_cards(&deck));

        // Round-robin order: the first round hands out the last three
        // cards of the deck, one per player.
        let n = deck.len();
        assert_eq!(hands[0][0], deck[n - 1]);
        assert_eq!(hands[1][0], deck[n - 2]);
        assert_eq!(hands[2][0], deck[n - 3]);
    }

    #[test]
    fn deal_rejects_short_deck() {
        let deck = build_deck().into_iter().take(10).collect::<Vec<_>>();
        assert!(deal(deck, 2, HAND_SIZE).is_err());
    }
}
