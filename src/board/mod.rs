//! Boards, lists and cards.
//!
//! | Module     | Purpose                                                  |
//! |------------|----------------------------------------------------------|
//! | `models`   | Row types for boards, lists and cards, plus `CardPatch`  |
//! | `ordering` | Append positions, drop target, display order             |
//! | `store`    | `BoardStore`: remote-confirmed state transitions         |

pub mod models;
pub mod ordering;
pub mod store;

pub use models::{Board, Card, CardPatch, List, Priority};
pub use store::{BoardState, BoardStore};
