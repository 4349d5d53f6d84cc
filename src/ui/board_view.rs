//! Plain terminal rendering of boards.
//!
//! Renderers return strings so commands decide where output goes and tests
//! can inspect it. Ids are printed in full because the CLI takes them as
//! arguments.

use std::fmt::Write;

use console::style;

use super::icons::{BOARD, CARD, CLOCK, LIST};
use crate::board::{Board, BoardState, Card, Priority};

/// One board per line, newest first as given.
pub fn render_boards(boards: &[Board]) -> String {
    if boards.is_empty() {
        return "No boards yet. Create one with `taskboard boards create <TITLE>`.\n".to_string();
    }
    let mut out = String::new();
    for board in boards {
        let _ = write!(out, "{}{}", BOARD, style(&board.title).bold());
        if let Some(description) = board.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, "  {}", style(description).dim());
        }
        let _ = writeln!(out, "  {}", style(board.id).dim());
    }
    let _ = writeln!(out, "\n{} board(s)", boards.len());
    out
}

fn priority_label(priority: &Priority) -> String {
    let label = format!("[{}]", priority);
    match priority {
        Priority::Urgent => style(label).red().bold().to_string(),
        Priority::High => style(label).red().to_string(),
        Priority::Medium => style(label).yellow().to_string(),
        Priority::Low => style(label).green().to_string(),
        Priority::Other(_) => style(label).dim().to_string(),
    }
}

pub fn render_card_line(card: &Card) -> String {
    let mut line = format!("{}{}", CARD, card.title);
    if let Some(priority) = &card.priority {
        let _ = write!(line, " {}", priority_label(priority));
    }
    if let Some(due) = card.due_date {
        let _ = write!(line, " {}{}", CLOCK, due.format("%Y-%m-%d"));
    }
    let _ = write!(line, "  {}", style(card.id).dim());
    line
}

/// The open board with its lists and cards in position order.
pub fn render_board(state: &BoardState) -> String {
    let Some(board) = &state.current_board else {
        return "No board loaded.\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}{}  {}", BOARD, style(&board.title).bold().cyan(), style(board.id).dim());
    if let Some(description) = board.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "   {}", description);
    }

    let lists = state.ordered_lists();
    if lists.is_empty() {
        let _ = writeln!(out, "\n   (no lists)");
        return out;
    }

    for list in lists {
        let cards = state.list_cards(list.id);
        let _ = writeln!(
            out,
            "\n{}{} ({})  {}",
            LIST,
            style(&list.title).bold(),
            cards.len(),
            style(list.id).dim()
        );
        if cards.is_empty() {
            let _ = writeln!(out, "   {}", style("(empty)").dim());
        }
        for card in cards {
            let _ = writeln!(out, "   {}", render_card_line(card));
            if let Some(description) = card.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = writeln!(out, "      {}", style(description).dim());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::List;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn board() -> Board {
        Board {
            id: Uuid::new_v4(),
            title: "Launch".to_string(),
            description: Some("Q3 launch plan".to_string()),
            background: None,
            owner_id: Uuid::nil(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn list(board_id: Uuid, title: &str, position: i32) -> List {
        List {
            id: Uuid::new_v4(),
            board_id,
            title: title.to_string(),
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn card(list_id: Uuid, title: &str, position: i32) -> Card {
        Card {
            id: Uuid::new_v4(),
            list_id,
            title: title.to_string(),
            description: None,
            position,
            due_date: None,
            cover_color: None,
            cover_image: None,
            priority: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_boards_empty_hint() {
        assert!(render_boards(&[]).contains("No boards yet"));
    }

    #[test]
    fn test_render_boards_lists_titles_and_ids() {
        let boards = vec![board(), board()];
        let out = render_boards(&boards);
        assert!(out.contains("Launch"));
        assert!(out.contains(&boards[1].id.to_string()));
        assert!(out.contains("2 board(s)"));
    }

    #[test]
    fn test_render_board_orders_lists_and_cards_by_position() {
        let b = board();
        let later = list(b.id, "Done", 1);
        let first = list(b.id, "To Do", 0);
        let state = BoardState {
            current_board: Some(b.clone()),
            cards: vec![card(first.id, "Second card", 5), card(first.id, "First card", 2)],
            lists: vec![later, first],
            ..BoardState::default()
        };

        let out = render_board(&state);
        let todo = out.find("To Do").unwrap();
        let done = out.find("Done").unwrap();
        assert!(todo < done);
        assert!(out.find("First card").unwrap() < out.find("Second card").unwrap());
        assert!(out.contains("(empty)"));
    }

    #[test]
    fn test_render_card_line_shows_priority_and_due_date() {
        let mut c = card(Uuid::new_v4(), "Ship it", 0);
        c.priority = Some(Priority::High);
        c.due_date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let line = render_card_line(&c);
        assert!(line.contains("Ship it"));
        assert!(line.contains("[high]"));
        assert!(line.contains("2024-06-01"));
    }

    #[test]
    fn test_render_board_without_board() {
        assert_eq!(render_board(&BoardState::default()), "No board loaded.\n");
    }
}
