//! Pure legality checks. Nothing in here touches game state; the state
//! machine in `game` calls these before committing a transition.

use super::card::{Card, Color};
use super::game::GameError;

/// Whether `card` may be played on `top_card` under `current_color`.
///
/// Wild-type cards are always nominally playable here; the Wild Draw
/// Four hand restriction is a separate check. Non-wild cards need a
/// color match against the active color or an exact kind match
/// (including rank) against the top card.
pub fn is_playable(card: &Card, top_card: &Card, current_color: Option<Color>) -> bool {
    if card.is_wild() {
        return true;
    }
    if card.color.is_some() && card.color == current_color {
        return true;
    }
    card.kind == top_card.kind
}

/// The official "no bluffing" restriction: a Wild Draw Four is legal
/// only when the hand holds no non-wild card matching the active color.
pub fn can_play_wild_draw_four(hand: &[Card], current_color: Option<Color>) -> bool {
    !hand
        .iter()
        .any(|c| !c.is_wild() && c.color.is_some() && c.color == current_color)
}

/// Full move validation for a single card against the discard top.
/// Returns the rejection reason; the caller leaves state untouched on
/// `Err`.
pub fn validate_move(
    card: &Card,
    top_card: &Card,
    current_color: Option<Color>,
    hand: &[Card],
) -> Result<(), GameError> {
    if card.kind == super::card::CardKind::WildDrawFour
        && !can_play_wild_draw_four(hand, current_color)
    {
        return Err(GameError::WildDrawFourRestricted);
    }
    if !is_playable(card, top_card, current_color) {
        return Err(GameError::InvalidMove);
    }
    Ok(())
}
