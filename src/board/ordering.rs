//! Position policy for lists within a board and cards within a list.
//!
//! Appends take `max(sibling positions) + 1` (or `0` for the first item), so
//! they never collide. An append after a sibling at `i32::MAX` has no
//! position left and yields `None`. Nothing here renumbers siblings: a reorder or move
//! writes exactly one row, and callers that pass a non-unique position get a
//! tie. Drag-and-drop always appends to the end of the target list.

use uuid::Uuid;

use super::models::{Card, List};

/// Anything ordered by an integer `position` within its parent.
pub trait Positioned {
    fn position(&self) -> i32;
}

impl Positioned for List {
    fn position(&self) -> i32 {
        self.position
    }
}

impl Positioned for Card {
    fn position(&self) -> i32 {
        self.position
    }
}

/// Position for an item appended after `siblings`, or `None` when the last
/// sibling already sits at `i32::MAX`.
pub fn next_position<'a, T, I>(siblings: I) -> Option<i32>
where
    T: Positioned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    siblings
        .into_iter()
        .map(Positioned::position)
        .max()
        .map_or(Some(0), |max| max.checked_add(1))
}

/// Position for a new list appended to `board_id`.
pub fn next_list_position(lists: &[List], board_id: Uuid) -> Option<i32> {
    next_position(lists.iter().filter(|l| l.board_id == board_id))
}

/// Position for a new card appended to `list_id`.
pub fn next_card_position(cards: &[Card], list_id: Uuid) -> Option<i32> {
    next_position(cards.iter().filter(|c| c.list_id == list_id))
}

/// Target position for a card dropped on `target_list_id`.
///
/// Always the end of the list, wherever the drop landed visually. The
/// dragged card itself counts when dropped back onto its own list, so it
/// moves to the end there too.
pub fn drop_position(cards: &[Card], target_list_id: Uuid) -> Option<i32> {
    next_card_position(cards, target_list_id)
}

/// Lists of `board_id` in display order (stable for ties).
pub fn board_lists(lists: &[List], board_id: Uuid) -> Vec<&List> {
    let mut ordered: Vec<&List> = lists.iter().filter(|l| l.board_id == board_id).collect();
    ordered.sort_by_key(|l| l.position);
    ordered
}

/// Cards of `list_id` in display order (stable for ties).
pub fn list_cards(cards: &[Card], list_id: Uuid) -> Vec<&Card> {
    let mut ordered: Vec<&Card> = cards.iter().filter(|c| c.list_id == list_id).collect();
    ordered.sort_by_key(|c| c.position);
    ordered
}
