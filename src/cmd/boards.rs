//! Board listing and creation: `taskboard boards`.

use std::sync::Arc;

use anyhow::Result;
use console::style;
use taskboard::board::BoardStore;
use taskboard::remote::RemoteStore;
use taskboard::ui::icons::CHECK;
use taskboard::ui::render_boards;

use super::super::BoardsCommands;
use super::ensure_ok;

pub async fn cmd_boards(remote: Arc<dyn RemoteStore>, command: Option<BoardsCommands>) -> Result<()> {
    let store = BoardStore::new(remote);

    match command {
        None => {
            store.fetch_boards().await;
            ensure_ok(&store)?;
            print!("{}", render_boards(&store.state().boards));
        }
        Some(BoardsCommands::Create { title, description }) => {
            let title = title.trim();
            if title.is_empty() {
                anyhow::bail!("Board title must not be empty");
            }
            let created = store.create_board(title, description.as_deref()).await;
            ensure_ok(&store)?;
            if let Some(id) = created {
                println!("{}Created board {}  {}", CHECK, style(title).bold(), style(id).dim());
            }
        }
    }

    Ok(())
}
