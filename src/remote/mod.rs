//! Remote collaborators: the hosted data platform seen from the client.
//!
//! Two capability traits describe everything the client needs from the
//! platform:
//!
//! | Trait         | Capabilities                                                |
//! |---------------|-------------------------------------------------------------|
//! | `RemoteStore` | select (filter + order), insert, update, delete, upsert     |
//! | `AuthClient`  | session retrieval, change subscription, sign-in/up/out      |
//!
//! `SupabaseClient` implements both over HTTP. `MemoryRemote` implements both
//! in process for tests and the offline demo board.

pub mod memory;
pub mod session;
pub mod supabase;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::{AuthError, RemoteError};

pub use memory::MemoryRemote;
pub use session::{Session, SignUpOutcome, User, UserMetadata};
pub use supabase::SupabaseClient;

/// The tables the client reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Boards,
    Lists,
    Cards,
    Users,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boards => "boards",
            Self::Lists => "lists",
            Self::Cards => "cards",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row filter understood by every `RemoteStore`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: &'static str, value: Value },
    In { column: &'static str, values: Vec<Value> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// Select query: conjunction of filters plus an optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: Value) -> Self {
        self.filters.push(Filter::Eq { column, value });
        self
    }

    pub fn is_in(mut self, column: &'static str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In { column, values });
        self
    }

    pub fn order(mut self, column: &'static str, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }
}

/// Row-level CRUD over the platform's tables.
///
/// Rows travel as JSON objects; the board store decodes them into typed
/// models. `update` and `delete` succeed even when no row matched, the same
/// way a filtered PATCH/DELETE does on the platform.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError>;

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), RemoteError>;

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), RemoteError>;

    /// Insert or merge by primary key and return the stored row.
    async fn upsert(&self, table: Table, row: Value) -> Result<Value, RemoteError>;
}

/// Session-change notifications published by an `AuthClient`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { session: Session },
    SignedOut,
    TokenRefreshed { session: Session },
    UserUpdated { user: User },
}

/// Password-based authentication against the platform.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Current session, refreshed first when it has expired.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Decode a batch of rows from `table` into typed models.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Result<Vec<T>, RemoteError> {
    rows.into_iter()
        .map(|row| decode_row(table, row))
        .collect()
}

pub fn decode_row<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, RemoteError> {
    serde_json::from_value(row).map_err(|e| RemoteError::decode(table, e))
}
