//! Board view and list/card editing: `taskboard board <ID>`.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use console::style;
use taskboard::board::{BoardStore, CardPatch};
use taskboard::remote::RemoteStore;
use taskboard::ui::icons::{CHECK, MOVE};
use taskboard::ui::render_board;
use uuid::Uuid;

use super::super::BoardCommands;
use super::ensure_ok;

fn require_list(store: &BoardStore, list_id: Uuid) -> Result<()> {
    if store.state().list(list_id).is_none() {
        anyhow::bail!("List {} is not on this board", list_id);
    }
    Ok(())
}

fn require_card(store: &BoardStore, card_id: Uuid) -> Result<()> {
    if store.state().card(card_id).is_none() {
        anyhow::bail!("Card {} is not on this board", card_id);
    }
    Ok(())
}

/// Empty strings clear a nullable text field.
fn text_change(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v).filter(|v| !v.is_empty()))
}

pub async fn cmd_board(
    remote: Arc<dyn RemoteStore>,
    board_id: Uuid,
    command: Option<BoardCommands>,
) -> Result<()> {
    let store = BoardStore::new(remote);
    store.fetch_board_details(board_id).await;
    ensure_ok(&store)?;

    let Some(command) = command else {
        print!("{}", render_board(&store.state()));
        return Ok(());
    };

    match command {
        BoardCommands::AddList { title } => {
            if let Some(id) = store.add_list(board_id, &title).await {
                println!("{}Added list {}  {}", CHECK, style(&title).bold(), style(id).dim());
            }
        }
        BoardCommands::RenameList { list, title } => {
            require_list(&store, list)?;
            store.update_list(list, &title).await;
        }
        BoardCommands::DeleteList { list } => {
            require_list(&store, list)?;
            store.delete_list(list).await;
        }
        BoardCommands::ReorderList { list, position } => {
            require_list(&store, list)?;
            store.reorder_list(list, position).await;
        }
        BoardCommands::AddCard { list, title } => {
            require_list(&store, list)?;
            if let Some(id) = store.add_card(list, &title).await {
                println!("{}Added card {}  {}", CHECK, style(&title).bold(), style(id).dim());
            }
        }
        BoardCommands::EditCard {
            card,
            title,
            description,
            due,
            clear_due,
            priority,
            cover_color,
            cover_image,
        } => {
            require_card(&store, card)?;
            let due_date = if clear_due {
                Some(None)
            } else {
                due.map(|d| Some(d.and_time(NaiveTime::MIN).and_utc()))
            };
            let patch = CardPatch {
                title,
                description: text_change(description),
                due_date,
                cover_color: text_change(cover_color),
                cover_image: text_change(cover_image),
                priority: priority.map(Some),
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change; pass at least one field flag");
            }
            store.update_card(card, patch).await;
        }
        BoardCommands::DeleteCard { card } => {
            require_card(&store, card)?;
            store.delete_card(card).await;
        }
        BoardCommands::MoveCard {
            card,
            list,
            position,
        } => {
            require_card(&store, card)?;
            require_list(&store, list)?;
            match position {
                Some(position) => store.move_card(card, list, position).await,
                None => {
                    if let Some(position) = store.drop_card(card, list).await {
                        println!("{}Moved card to position {}", MOVE, position);
                    }
                }
            }
        }
        BoardCommands::ReorderCard { card, position } => {
            require_card(&store, card)?;
            store.reorder_card(card, position).await;
        }
    }

    ensure_ok(&store)?;
    print!("{}", render_board(&store.state()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_change_empty_clears() {
        assert_eq!(text_change(None), None);
        assert_eq!(text_change(Some(String::new())), Some(None));
        assert_eq!(text_change(Some("red".to_string())), Some(Some("red".to_string())));
    }
}
