//! In-process remote: tables held as JSON rows behind a mutex.
//!
//! Mirrors what the client relies on from the hosted platform: generated ids
//! and timestamps, nullable column defaults, foreign keys with cascading
//! deletes, filtered/ordered selects and password accounts. It also records
//! every data call and can be told to fail the next call of a given kind,
//! which is what the store tests use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    AuthClient, AuthEvent, Filter, Query, RemoteStore, Session, SignUpOutcome, Table, User,
    UserMetadata,
};
use crate::errors::{AuthError, RemoteError};

/// Kind of data call, for the call log and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCall {
    pub operation: Operation,
    pub table: Table,
}

struct InjectedFailure {
    operation: Operation,
    table: Table,
    message: String,
}

struct Account {
    email: String,
    password: String,
    user: User,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Map<String, Value>>>,
    calls: Vec<RemoteCall>,
    failures: Vec<InjectedFailure>,
    accounts: Vec<Account>,
    session: Option<Session>,
    latency: Option<Duration>,
    last_stamp: Option<DateTime<Utc>>,
}

pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every data call made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next `operation` on `table` fail with an API error carrying `message`.
    pub fn fail_next(&self, operation: Operation, table: Table, message: impl Into<String>) {
        self.lock().failures.push(InjectedFailure {
            operation,
            table,
            message: message.into(),
        });
    }

    /// Delay every data call by `latency` before it takes effect.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock()
            .tables
            .get(&table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    pub fn row(&self, table: Table, id: Uuid) -> Option<Value> {
        let key = id_value(id);
        self.lock()
            .tables
            .get(&table)?
            .iter()
            .find(|row| row.get("id") == Some(&key))
            .cloned()
            .map(Value::Object)
    }

    /// Create a password account without signing in.
    pub fn register(&self, email: &str, password: &str, full_name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: UserMetadata {
                full_name: Some(full_name.to_string()),
                avatar_url: None,
            },
        };
        self.lock().accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
            user: user.clone(),
        });
        user
    }

    /// Replace an account's metadata and notify subscribers, as an account
    /// settings change on the platform would.
    pub fn update_user_metadata(&self, user_id: Uuid, metadata: UserMetadata) -> Option<User> {
        let user = {
            let mut state = self.lock();
            let account = state.accounts.iter_mut().find(|a| a.user.id == user_id)?;
            account.user.user_metadata = metadata;
            let user = account.user.clone();
            if let Some(session) = state.session.as_mut().filter(|s| s.user.id == user_id) {
                session.user = user.clone();
            }
            user
        };
        let _ = self.events.send(AuthEvent::UserUpdated { user: user.clone() });
        Some(user)
    }

    /// Insert the sample "Product Development" board with four lists and ten cards.
    pub fn seed_demo_board(&self) -> Result<Uuid, RemoteError> {
        const LISTS: [&str; 4] = ["To Do", "In Progress", "Review", "Done"];
        const CARDS: [(usize, &str, &str); 10] = [
            (0, "Research competitors", "Analyze top 5 competitors in the market"),
            (0, "Create wireframes", "Design initial wireframes for homepage"),
            (0, "User interviews", "Schedule and conduct user interviews"),
            (1, "API documentation", "Update API docs with new endpoints"),
            (1, "Fix navigation bug", "Address issues with mobile navigation"),
            (2, "Implement authentication", "Add OAuth integration"),
            (2, "Design system update", "Update component library with new tokens"),
            (3, "Landing page copy", "Finalize copy for landing page"),
            (3, "Analytics setup", "Configure Google Analytics"),
            (3, "Onboarding flow", "Implement new user onboarding"),
        ];

        let mut state = self.lock();
        let board = state.insert_row(
            Table::Boards,
            object(json!({
                "title": "Product Development",
                "description": "Sample board with demo data",
                "background": "bg-gradient-to-r from-blue-500 to-cyan-500",
            })),
        )?;
        let board_id = board.get("id").cloned().unwrap_or(Value::Null);

        let mut list_ids = Vec::with_capacity(LISTS.len());
        for (position, title) in LISTS.iter().enumerate() {
            let list = state.insert_row(
                Table::Lists,
                object(json!({"board_id": board_id, "title": title, "position": position})),
            )?;
            list_ids.push(list.get("id").cloned().unwrap_or(Value::Null));
        }

        let mut next_in_list = [0usize; LISTS.len()];
        for (list, title, description) in CARDS {
            state.insert_row(
                Table::Cards,
                object(json!({
                    "list_id": list_ids[list],
                    "title": title,
                    "description": description,
                    "position": next_in_list[list],
                })),
            )?;
            next_in_list[list] += 1;
        }

        board_id
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| RemoteError::decode(Table::Boards, "seeded board has no id"))
    }

    async fn enter(&self, operation: Operation, table: Table) -> Result<(), RemoteError> {
        let latency = {
            let mut state = self.lock();
            state.calls.push(RemoteCall { operation, table });
            state.latency
        };
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if let Some(idx) = state
            .failures
            .iter()
            .position(|f| f.operation == operation && f.table == table)
        {
            let failure = state.failures.remove(idx);
            return Err(RemoteError::Api {
                status: 400,
                message: failure.message,
            });
        }
        Ok(())
    }

    fn start_session(&self, user: User) -> Session {
        let session = Session {
            access_token: format!("memory-access-{}", Uuid::new_v4()),
            refresh_token: format!("memory-refresh-{}", Uuid::new_v4()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user,
        };
        self.lock().session = Some(session.clone());
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent::SignedIn {
            session: session.clone(),
        });
        session
    }
}

impl MemoryState {
    fn stamp(&mut self) -> String {
        let now = Utc::now();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn insert_row(
        &mut self,
        table: Table,
        mut row: Map<String, Value>,
    ) -> Result<Map<String, Value>, RemoteError> {
        self.fill_defaults(table, &mut row);
        check_required(table, &row)?;
        self.check_foreign_keys(table, &row)?;
        self.tables.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    fn fill_defaults(&mut self, table: Table, row: &mut Map<String, Value>) {
        row.entry("id")
            .or_insert_with(|| id_value(Uuid::new_v4()));
        let stamp = self.stamp();
        row.entry("created_at")
            .or_insert_with(|| Value::String(stamp.clone()));
        row.entry("updated_at").or_insert(Value::String(stamp));

        let nullable: &[&str] = match table {
            Table::Boards => &["description", "background"],
            Table::Lists => &[],
            Table::Cards => &["description", "due_date", "cover_color", "cover_image", "priority"],
            Table::Users => &["full_name", "avatar_url"],
        };
        for column in nullable {
            row.entry(*column).or_insert(Value::Null);
        }

        if table == Table::Boards {
            let owner = self
                .session
                .as_ref()
                .map(|s| s.user.id)
                .unwrap_or_else(Uuid::nil);
            row.entry("owner_id").or_insert_with(|| id_value(owner));
        }
    }

    fn check_foreign_keys(&self, table: Table, row: &Map<String, Value>) -> Result<(), RemoteError> {
        let (column, parent) = match table {
            Table::Lists => ("board_id", Table::Boards),
            Table::Cards => ("list_id", Table::Lists),
            Table::Boards | Table::Users => return Ok(()),
        };
        let key = row.get(column).unwrap_or(&Value::Null);
        let exists = self
            .tables
            .get(&parent)
            .is_some_and(|rows| rows.iter().any(|r| r.get("id") == Some(key)));
        if exists {
            Ok(())
        } else {
            Err(RemoteError::Api {
                status: 409,
                message: format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\"",
                    table, table, column
                ),
            })
        }
    }

    fn update_row(&mut self, table: Table, id: Uuid, patch: Map<String, Value>) -> Result<(), RemoteError> {
        let key = id_value(id);
        let Some(idx) = self
            .tables
            .get(&table)
            .and_then(|rows| rows.iter().position(|r| r.get("id") == Some(&key)))
        else {
            return Ok(());
        };

        let mut merged = self.tables[&table][idx].clone();
        merged.extend(patch);
        self.check_foreign_keys(table, &merged)?;
        if let Some(rows) = self.tables.get_mut(&table) {
            rows[idx] = merged;
        }
        Ok(())
    }

    fn delete_row(&mut self, table: Table, id: &Value) {
        if let Some(rows) = self.tables.get_mut(&table) {
            rows.retain(|r| r.get("id") != Some(id));
        }
        let child = match table {
            Table::Boards => Some((Table::Lists, "board_id")),
            Table::Lists => Some((Table::Cards, "list_id")),
            Table::Cards | Table::Users => None,
        };
        if let Some((child_table, column)) = child {
            let orphans: Vec<Value> = self
                .tables
                .get(&child_table)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| r.get(column) == Some(id))
                        .filter_map(|r| r.get("id").cloned())
                        .collect()
                })
                .unwrap_or_default();
            for orphan in orphans {
                self.delete_row(child_table, &orphan);
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError> {
        self.enter(Operation::Select, table).await?;
        let state = self.lock();
        let mut rows: Vec<Value> = state
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .map(Value::Object)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(&a[order.column], &b[order.column]);
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        self.enter(Operation::Insert, table).await?;
        let row = expect_object(row)?;
        let stored = self.lock().insert_row(table, row)?;
        Ok(Value::Object(stored))
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), RemoteError> {
        self.enter(Operation::Update, table).await?;
        let patch = expect_object(patch)?;
        self.lock().update_row(table, id, patch)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), RemoteError> {
        self.enter(Operation::Delete, table).await?;
        self.lock().delete_row(table, &id_value(id));
        Ok(())
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        self.enter(Operation::Upsert, table).await?;
        let row = expect_object(row)?;
        let mut state = self.lock();
        let existing = row.get("id").and_then(|key| {
            state
                .tables
                .get(&table)?
                .iter()
                .position(|r| r.get("id") == Some(key))
        });
        match existing {
            Some(idx) => {
                let rows = state.tables.entry(table).or_default();
                rows[idx].extend(row);
                Ok(Value::Object(rows[idx].clone()))
            }
            None => state.insert_row(table, row).map(Value::Object),
        }
    }
}

#[async_trait]
impl AuthClient for MemoryRemote {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.lock().session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self
            .lock()
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| AuthError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;
        Ok(self.start_session(user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let taken = self
            .lock()
            .accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(AuthError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let user = self.register(email, password, full_name);
        let session = self.start_session(user.clone());
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().session = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

fn id_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn expect_object(value: Value) -> Result<Map<String, Value>, RemoteError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::Api {
            status: 400,
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

fn check_required(table: Table, row: &Map<String, Value>) -> Result<(), RemoteError> {
    let required: &[&str] = match table {
        Table::Boards => &["title"],
        Table::Lists => &["board_id", "title", "position"],
        Table::Cards => &["list_id", "title", "position"],
        Table::Users => &[],
    };
    for column in required {
        if row.get(*column).is_none_or(Value::is_null) {
            return Err(RemoteError::Api {
                status: 400,
                message: format!(
                    "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                    column, table
                ),
            });
        }
    }
    Ok(())
}

fn matches_filter(row: &Map<String, Value>, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(*column).unwrap_or(&Value::Null) == value,
        Filter::In { column, values } => {
            let cell = row.get(*column).unwrap_or(&Value::Null);
            values.contains(cell)
        }
    }
}

/// Ascending order with nulls last, the platform's default.
fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
