//! Offline sample board: `taskboard demo`.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use taskboard::board::BoardStore;
use taskboard::remote::MemoryRemote;
use taskboard::ui::icons::{MOVE, SPARKLE};
use taskboard::ui::render_board;

use super::ensure_ok;

pub async fn cmd_demo() -> Result<()> {
    let remote = Arc::new(MemoryRemote::new());
    let board_id = remote
        .seed_demo_board()
        .context("Failed to seed the sample board")?;

    let store = BoardStore::new(remote);
    store.fetch_board_details(board_id).await;
    ensure_ok(&store)?;

    println!("{}{}", SPARKLE, style("Sample board (in memory, nothing is saved)").dim());
    println!();
    print!("{}", render_board(&store.state()));

    // Drag the first "To Do" card onto "Done".
    let state = store.state();
    let lists = state.ordered_lists();
    let (Some(from), Some(to)) = (lists.first(), lists.last()) else {
        return Ok(());
    };
    let Some(card) = state.list_cards(from.id).first().map(|c| (*c).clone()) else {
        return Ok(());
    };

    let position = store.drop_card(card.id, to.id).await;
    ensure_ok(&store)?;
    if let Some(position) = position {
        println!();
        println!(
            "{}Dropped {} from {} onto {} at position {}",
            MOVE,
            style(&card.title).bold(),
            from.title,
            to.title,
            position
        );
        println!();
        print!("{}", render_board(&store.state()));
    }

    Ok(())
}
