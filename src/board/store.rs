//! Board state store.
//!
//! `BoardStore` owns one `BoardState` behind a `watch` channel. Each operation
//! issues its remote call first and patches local state only once the remote
//! has confirmed, so a failure leaves the previous state untouched and only
//! records the error message. Every patch is a single `send_modify`, so
//! subscribers never observe a half-applied change.
//!
//! No lock is held across a remote round trip. Overlapping operations each
//! patch against whatever state is current when they complete.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::watch;
use uuid::Uuid;

use super::models::{Board, Card, CardPatch, List};
use super::ordering::{self, drop_position, next_card_position, next_list_position};
use crate::errors::RemoteError;
use crate::remote::{Query, RemoteStore, Table, decode_row, decode_rows};

/// Snapshot of everything the board views render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub boards: Vec<Board>,
    pub current_board: Option<Board>,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub loading: bool,
    pub error: Option<String>,
}

impl BoardState {
    pub fn card(&self, card_id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    pub fn list(&self, list_id: Uuid) -> Option<&List> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    /// Cards of `list_id` in position order.
    pub fn list_cards(&self, list_id: Uuid) -> Vec<&Card> {
        ordering::list_cards(&self.cards, list_id)
    }

    /// Lists of the open board in position order.
    pub fn ordered_lists(&self) -> Vec<&List> {
        match &self.current_board {
            Some(board) => ordering::board_lists(&self.lists, board.id),
            None => Vec::new(),
        }
    }
}

fn id_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

pub struct BoardStore {
    remote: Arc<dyn RemoteStore>,
    state: watch::Sender<BoardState>,
}

impl BoardStore {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            state: watch::Sender::new(BoardState::default()),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> BoardState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.subscribe()
    }

    fn begin(&self, loading: bool) {
        self.state.send_modify(|s| {
            s.error = None;
            if loading {
                s.loading = true;
            }
        });
    }

    fn record_failure(&self, op: &'static str, err: &RemoteError, loading: bool) {
        tracing::warn!(op, error = %err, "board operation failed");
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.error = Some(message);
            if loading {
                s.loading = false;
            }
        });
    }

    /// Run one operation: clear the error, await the remote work, record any
    /// failure. A successful loading operation clears `loading` in its own
    /// final patch.
    async fn run<T, F>(&self, op: &'static str, loading: bool, work: F) -> Option<T>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.begin(loading);
        match work.await {
            Ok(value) => Some(value),
            Err(e) => {
                self.record_failure(op, &e, loading);
                None
            }
        }
    }

    pub async fn fetch_boards(&self) {
        self.run("fetch_boards", true, self.try_fetch_boards()).await;
    }

    async fn try_fetch_boards(&self) -> Result<(), RemoteError> {
        let rows = self
            .remote
            .select(Table::Boards, &Query::new().order("created_at", false))
            .await?;
        let boards: Vec<Board> = decode_rows(Table::Boards, rows)?;
        tracing::debug!(count = boards.len(), "boards loaded");
        self.state.send_modify(|s| {
            s.boards = boards;
            s.loading = false;
        });
        Ok(())
    }

    /// Create a board and put it at the front of `boards`. The caller checks
    /// that `title` is non-empty.
    pub async fn create_board(&self, title: &str, description: Option<&str>) -> Option<Uuid> {
        self.run("create_board", true, self.try_create_board(title, description))
            .await
    }

    async fn try_create_board(&self, title: &str, description: Option<&str>) -> Result<Uuid, RemoteError> {
        let row = json!({
            "title": title,
            "description": description.unwrap_or(""),
        });
        let stored = self.remote.insert(Table::Boards, row).await?;
        let board: Board = decode_row(Table::Boards, stored)?;
        let id = board.id;
        self.state.send_modify(|s| {
            s.boards.insert(0, board);
            s.loading = false;
        });
        Ok(id)
    }

    /// Load one board with its lists and their cards.
    pub async fn fetch_board_details(&self, board_id: Uuid) {
        self.run("fetch_board_details", true, self.try_fetch_board_details(board_id))
            .await;
    }

    async fn try_fetch_board_details(&self, board_id: Uuid) -> Result<(), RemoteError> {
        let board_rows = self
            .remote
            .select(Table::Boards, &Query::new().eq("id", id_value(board_id)))
            .await?;
        let board: Board = match board_rows.into_iter().next() {
            Some(row) => decode_row(Table::Boards, row)?,
            None => {
                return Err(RemoteError::NotFound {
                    table: Table::Boards,
                    id: board_id.to_string(),
                });
            }
        };

        let list_rows = self
            .remote
            .select(
                Table::Lists,
                &Query::new()
                    .eq("board_id", id_value(board_id))
                    .order("position", true),
            )
            .await?;
        let lists: Vec<List> = decode_rows(Table::Lists, list_rows)?;

        let cards: Vec<Card> = if lists.is_empty() {
            Vec::new()
        } else {
            let list_ids = lists.iter().map(|l| id_value(l.id)).collect();
            let card_rows = self
                .remote
                .select(
                    Table::Cards,
                    &Query::new()
                        .is_in("list_id", list_ids)
                        .order("position", true),
                )
                .await?;
            decode_rows(Table::Cards, card_rows)?
        };

        tracing::debug!(%board_id, lists = lists.len(), cards = cards.len(), "board loaded");
        self.state.send_modify(|s| {
            s.current_board = Some(board);
            s.lists = lists;
            s.cards = cards;
            s.loading = false;
        });
        Ok(())
    }

    pub async fn create_list(&self, board_id: Uuid, title: &str, position: i32) -> Option<Uuid> {
        self.run("create_list", false, self.try_create_list(board_id, title, position))
            .await
    }

    async fn try_create_list(&self, board_id: Uuid, title: &str, position: i32) -> Result<Uuid, RemoteError> {
        let row = json!({
            "board_id": id_value(board_id),
            "title": title,
            "position": position,
        });
        let stored = self.remote.insert(Table::Lists, row).await?;
        let list: List = decode_row(Table::Lists, stored)?;
        let id = list.id;
        self.state.send_modify(|s| s.lists.push(list));
        Ok(id)
    }

    pub async fn update_list(&self, list_id: Uuid, title: &str) {
        self.run("update_list", false, self.try_update_list(list_id, title))
            .await;
    }

    async fn try_update_list(&self, list_id: Uuid, title: &str) -> Result<(), RemoteError> {
        let now = Utc::now();
        self.remote
            .update(Table::Lists, list_id, json!({"title": title, "updated_at": now}))
            .await?;
        self.state.send_modify(|s| {
            if let Some(list) = s.lists.iter_mut().find(|l| l.id == list_id) {
                list.title = title.to_string();
                list.updated_at = now;
            }
        });
        Ok(())
    }

    /// Delete a list; its cards go with it.
    pub async fn delete_list(&self, list_id: Uuid) {
        self.run("delete_list", false, self.try_delete_list(list_id))
            .await;
    }

    async fn try_delete_list(&self, list_id: Uuid) -> Result<(), RemoteError> {
        self.remote.delete(Table::Lists, list_id).await?;
        self.state.send_modify(|s| {
            s.lists.retain(|l| l.id != list_id);
            s.cards.retain(|c| c.list_id != list_id);
        });
        Ok(())
    }

    pub async fn create_card(&self, list_id: Uuid, title: &str, position: i32) -> Option<Uuid> {
        self.run("create_card", false, self.try_create_card(list_id, title, position))
            .await
    }

    async fn try_create_card(&self, list_id: Uuid, title: &str, position: i32) -> Result<Uuid, RemoteError> {
        let row = json!({
            "list_id": id_value(list_id),
            "title": title,
            "position": position,
        });
        let stored = self.remote.insert(Table::Cards, row).await?;
        let card: Card = decode_row(Table::Cards, stored)?;
        let id = card.id;
        self.state.send_modify(|s| s.cards.push(card));
        Ok(id)
    }

    pub async fn update_card(&self, card_id: Uuid, patch: CardPatch) {
        self.run("update_card", false, self.try_update_card(card_id, patch))
            .await;
    }

    async fn try_update_card(&self, card_id: Uuid, patch: CardPatch) -> Result<(), RemoteError> {
        let now = Utc::now();
        let mut body = serde_json::to_value(&patch).map_err(|e| RemoteError::Encode {
            table: Table::Cards,
            message: e.to_string(),
        })?;
        if let Value::Object(fields) = &mut body {
            fields.insert("updated_at".to_string(), json!(now));
        }
        self.remote.update(Table::Cards, card_id, body).await?;
        self.patch_card(card_id, now, |card| patch.apply_to(card));
        Ok(())
    }

    pub async fn delete_card(&self, card_id: Uuid) {
        self.run("delete_card", false, self.try_delete_card(card_id))
            .await;
    }

    async fn try_delete_card(&self, card_id: Uuid) -> Result<(), RemoteError> {
        self.remote.delete(Table::Cards, card_id).await?;
        self.state.send_modify(|s| s.cards.retain(|c| c.id != card_id));
        Ok(())
    }

    /// Move a card to another list (or within its own) at `position`.
    pub async fn move_card(&self, card_id: Uuid, list_id: Uuid, position: i32) {
        self.run("move_card", false, self.try_move_card(card_id, list_id, position))
            .await;
    }

    async fn try_move_card(&self, card_id: Uuid, list_id: Uuid, position: i32) -> Result<(), RemoteError> {
        let now = Utc::now();
        let patch = json!({
            "list_id": id_value(list_id),
            "position": position,
            "updated_at": now,
        });
        self.remote.update(Table::Cards, card_id, patch).await?;
        self.patch_card(card_id, now, |card| {
            card.list_id = list_id;
            card.position = position;
        });
        Ok(())
    }

    pub async fn reorder_list(&self, list_id: Uuid, position: i32) {
        self.run("reorder_list", false, self.try_reorder_list(list_id, position))
            .await;
    }

    async fn try_reorder_list(&self, list_id: Uuid, position: i32) -> Result<(), RemoteError> {
        let now = Utc::now();
        self.remote
            .update(Table::Lists, list_id, json!({"position": position, "updated_at": now}))
            .await?;
        self.state.send_modify(|s| {
            if let Some(list) = s.lists.iter_mut().find(|l| l.id == list_id) {
                list.position = position;
                list.updated_at = now;
            }
        });
        Ok(())
    }

    pub async fn reorder_card(&self, card_id: Uuid, position: i32) {
        self.run("reorder_card", false, self.try_reorder_card(card_id, position))
            .await;
    }

    async fn try_reorder_card(&self, card_id: Uuid, position: i32) -> Result<(), RemoteError> {
        let now = Utc::now();
        self.remote
            .update(Table::Cards, card_id, json!({"position": position, "updated_at": now}))
            .await?;
        self.patch_card(card_id, now, |card| card.position = position);
        Ok(())
    }

    fn patch_card(&self, card_id: Uuid, now: DateTime<Utc>, apply: impl FnOnce(&mut Card)) {
        self.state.send_modify(|s| {
            if let Some(card) = s.cards.iter_mut().find(|c| c.id == card_id) {
                apply(card);
                card.updated_at = now;
            }
        });
    }

    /// Append a list to the end of `board_id`.
    pub async fn add_list(&self, board_id: Uuid, title: &str) -> Option<Uuid> {
        let position = next_list_position(&self.state.borrow().lists, board_id);
        self.run("add_list", false, async {
            let position = position.ok_or(RemoteError::PositionExhausted { table: Table::Lists })?;
            self.try_create_list(board_id, title, position).await
        })
        .await
    }

    /// Append a card to the end of `list_id`.
    pub async fn add_card(&self, list_id: Uuid, title: &str) -> Option<Uuid> {
        let position = next_card_position(&self.state.borrow().cards, list_id);
        self.run("add_card", false, async {
            let position = position.ok_or(RemoteError::PositionExhausted { table: Table::Cards })?;
            self.try_create_card(list_id, title, position).await
        })
        .await
    }

    /// Drag-and-drop: move a loaded card to the end of `target_list_id`.
    ///
    /// Returns the position written, or `None` when the card is not loaded,
    /// the target list has no position left, or the move failed.
    pub async fn drop_card(&self, card_id: Uuid, target_list_id: Uuid) -> Option<i32> {
        let position = {
            let state = self.state.borrow();
            state.card(card_id)?;
            drop_position(&state.cards, target_list_id)
        };
        self.run("move_card", false, async {
            let position = position.ok_or(RemoteError::PositionExhausted { table: Table::Cards })?;
            self.try_move_card(card_id, target_list_id, position).await?;
            Ok::<_, RemoteError>(position)
        })
        .await
    }
}
