//! HTTP client for a Supabase-compatible platform.
//!
//! Data calls go to the PostgREST endpoint (`/rest/v1/<table>`), auth calls to
//! the GoTrue endpoint (`/auth/v1`). One `SupabaseClient` serves both traits
//! so the bearer token obtained at sign-in is used for row access.
//!
//! No retries and no client-side timeouts: failures surface to the caller as
//! they happen.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::session::{SessionFile, TokenResponse};
use super::{AuthClient, AuthEvent, Filter, Query, RemoteStore, Session, SignUpOutcome, Table, User};
use crate::config::RemoteConfig;
use crate::errors::{AuthError, RemoteError};

pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
    auth_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    session_file: Option<SessionFile>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(config: &RemoteConfig) -> Self {
        let (events, _rx) = broadcast::channel(16);
        let session_file = config.session_file.clone().map(SessionFile::new);
        let session = session_file.as_ref().and_then(SessionFile::load);
        Self {
            http: reqwest::Client::new(),
            rest_url: config.rest_url(),
            auth_url: config.auth_url(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(session),
            session_file,
            events,
        }
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn store_session(&self, session: Option<Session>) {
        if let Some(file) = &self.session_file {
            let persisted = match &session {
                Some(s) => file.save(s),
                None => file.clear(),
            };
            if let Err(e) = persisted {
                tracing::warn!(error = %e, "failed to persist session");
            }
        }
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    /// Bearer for data calls: the live access token, refreshed first when it
    /// has expired, or the anon key when signed out.
    async fn bearer(&self) -> Result<String, RemoteError> {
        let session = self
            .get_session()
            .await
            .map_err(|e| RemoteError::Transport(format!("session refresh failed: {}", e)))?;
        let token = session
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone());
        Ok(format!("Bearer {}", token))
    }

    async fn rest(&self, method: Method, table: Table) -> Result<RequestBuilder, RemoteError> {
        let bearer = self.bearer().await?;
        Ok(self
            .http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .header("Authorization", bearer))
    }

    fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let resp = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({"refresh_token": refresh_token}))
            .send()
            .await?;
        let token: TokenResponse = auth_json(resp).await?;
        Ok(token.into_session(Utc::now()))
    }
}

/// Render a filter value the way PostgREST expects it in a query string.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Values inside `in.(...)` that contain reserved characters must be quoted.
fn render_list_item(value: &Value) -> String {
    let raw = render_value(value);
    if raw.contains(&[',', '(', ')', '"', ' '][..]) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

/// Query-string pairs for a select.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        match filter {
            Filter::Eq { column, value } => {
                params.push((column.to_string(), format!("eq.{}", render_value(value))));
            }
            Filter::In { column, values } => {
                let items: Vec<String> = values.iter().map(render_list_item).collect();
                params.push((column.to_string(), format!("in.({})", items.join(","))));
            }
        }
    }
    if let Some(order) = query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

fn id_param(id: Uuid) -> [(&'static str, String); 1] {
    [("id", format!("eq.{}", id))]
}

/// Pull a human-readable message out of a platform error body.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

async fn rest_ok(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

async fn rest_rows(table: Table, resp: Response) -> Result<Vec<Value>, RemoteError> {
    let resp = rest_ok(resp).await?;
    let body: Value = resp.json().await?;
    match body {
        Value::Array(rows) => Ok(rows),
        other => Err(RemoteError::decode(
            table,
            format!("expected an array of rows, got {}", other),
        )),
    }
}

async fn rest_single(table: Table, resp: Response) -> Result<Value, RemoteError> {
    rest_rows(table, resp)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RemoteError::decode(table, "no row returned"))
}

async fn auth_json<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, AuthError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(AuthError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError> {
        tracing::debug!(%table, filters = query.filters.len(), "select");
        let resp = self
            .rest(Method::GET, table)
            .await?
            .query(&query_params(query))
            .send()
            .await?;
        rest_rows(table, resp).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        tracing::debug!(%table, "insert");
        let resp = self
            .rest(Method::POST, table)
            .await?
            .header("Prefer", "return=representation")
            .json(&Value::Array(vec![row]))
            .send()
            .await?;
        rest_single(table, resp).await
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), RemoteError> {
        tracing::debug!(%table, %id, "update");
        let resp = self
            .rest(Method::PATCH, table)
            .await?
            .query(&id_param(id))
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        rest_ok(resp).await.map(|_| ())
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), RemoteError> {
        tracing::debug!(%table, %id, "delete");
        let resp = self
            .rest(Method::DELETE, table)
            .await?
            .query(&id_param(id))
            .send()
            .await?;
        rest_ok(resp).await.map(|_| ())
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        tracing::debug!(%table, "upsert");
        let resp = self
            .rest(Method::POST, table)
            .await?
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&Value::Array(vec![row]))
            .send()
            .await?;
        rest_single(table, resp).await
    }
}

#[async_trait]
impl AuthClient for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user.id, "session refreshed");
                self.store_session(Some(refreshed.clone()));
                let _ = self.events.send(AuthEvent::TokenRefreshed {
                    session: refreshed.clone(),
                });
                Ok(Some(refreshed))
            }
            Err(AuthError::Api { status, message }) => {
                // The refresh token is dead; the user has to sign in again.
                tracing::warn!(status, %message, "session refresh rejected");
                self.store_session(None);
                let _ = self.events.send(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        let session = auth_json::<TokenResponse>(resp)
            .await?
            .into_session(Utc::now());
        self.store_session(Some(session.clone()));
        let _ = self.events.send(AuthEvent::SignedIn {
            session: session.clone(),
        });
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let resp = self
            .auth(Method::POST, "signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": {"full_name": full_name},
            }))
            .send()
            .await?;
        let body: Value = auth_json(resp).await?;

        // With email confirmation enabled the platform returns a bare user.
        if body.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;
            let session = token.into_session(Utc::now());
            self.store_session(Some(session.clone()));
            let _ = self.events.send(AuthEvent::SignedIn {
                session: session.clone(),
            });
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: User =
                serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };
        let resp = self
            .auth(Method::POST, "logout")
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;
        let status = resp.status();
        // An already-invalid token still ends the local session.
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        self.store_session(None);
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
