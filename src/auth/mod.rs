//! Auth session holder.
//!
//! `AuthSession` tracks who is signed in and mirrors the user's profile into
//! the `users` table. It is fed two ways: directly by `sign_in` / `sign_up` /
//! `sign_out`, and by session-change events from the `AuthClient` once
//! `listen` has been called. The listener task holds only a weak reference,
//! so dropping the holder ends it; `teardown` ends it explicitly.

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{AuthError, RemoteError};
use crate::remote::{AuthClient, AuthEvent, RemoteStore, SignUpOutcome, Table, User};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No session lookup has completed yet.
    Uninitialized,
    Authenticated(User),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub loading: bool,
}

impl AuthSnapshot {
    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Row mirrored into the `users` table after sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id,
            full_name: user.user_metadata.full_name.clone(),
            avatar_url: user.user_metadata.avatar_url.clone(),
            updated_at: now,
        }
    }
}

/// Handle to the running event listener. Cancels it when dropped.
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Abort the listener. Returns `false` if it was already cancelled.
    fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct AuthSession {
    auth: Arc<dyn AuthClient>,
    remote: Arc<dyn RemoteStore>,
    state: watch::Sender<AuthSnapshot>,
    subscription: Mutex<Option<Subscription>>,
}

impl AuthSession {
    pub fn new(auth: Arc<dyn AuthClient>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            auth,
            remote,
            state: watch::Sender::new(AuthSnapshot {
                state: AuthState::Uninitialized,
                loading: true,
            }),
            subscription: Mutex::new(None),
        }
    }

    pub fn state(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|s| {
            s.state = match user {
                Some(user) => AuthState::Authenticated(user),
                None => AuthState::Unauthenticated,
            };
            s.loading = false;
        });
    }

    /// Look up the existing session and settle the initial state.
    pub async fn initialize(&self) -> Result<Option<User>, AuthError> {
        match self.auth.get_session().await {
            Ok(Some(session)) => {
                let user = session.user;
                tracing::debug!(user_id = %user.id, "restored session");
                self.set_user(Some(user.clone()));
                self.sync_profile(&user).await;
                Ok(Some(user))
            }
            Ok(None) => {
                self.set_user(None);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// Start following session-change events. A second call while already
    /// listening does nothing.
    pub fn listen(self: &Arc<Self>) {
        let mut slot = self.lock_subscription();
        if slot.is_some() {
            return;
        }
        let events = self.auth.subscribe();
        let holder = Arc::downgrade(self);
        let handle = tokio::spawn(follow_events(holder, events));
        *slot = Some(Subscription::new(handle));
    }

    /// Stop following events. Returns `false` when there was nothing to stop.
    pub fn teardown(&self) -> bool {
        match self.lock_subscription().take() {
            Some(mut subscription) => subscription.cancel(),
            None => false,
        }
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn apply_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn { session } => {
                self.set_user(Some(session.user.clone()));
                self.sync_profile(&session.user).await;
            }
            AuthEvent::SignedOut => self.set_user(None),
            AuthEvent::TokenRefreshed { session } => self.set_user(Some(session.user)),
            AuthEvent::UserUpdated { user } => self.set_user(Some(user)),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        let user = session.user;
        self.set_user(Some(user.clone()));
        self.sync_profile(&user).await;
        Ok(user)
    }

    /// Register a new account. The user is only signed in when the platform
    /// issued a session (no email confirmation pending).
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let outcome = self.auth.sign_up(email, password, full_name).await?;
        if outcome.session.is_some() {
            self.set_user(Some(outcome.user.clone()));
        }
        self.sync_profile(&outcome.user).await;
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await?;
        self.set_user(None);
        Ok(())
    }

    /// Upsert the profile row. Failures are logged, never returned.
    async fn sync_profile(&self, user: &User) {
        if let Err(e) = self.try_sync_profile(user).await {
            tracing::warn!(user_id = %user.id, error = %e, "profile sync failed");
        }
    }

    async fn try_sync_profile(&self, user: &User) -> Result<(), RemoteError> {
        let profile = UserProfile::from_user(user, Utc::now());
        let row = serde_json::to_value(&profile).map_err(|e| RemoteError::Encode {
            table: Table::Users,
            message: e.to_string(),
        })?;
        self.remote.upsert(Table::Users, row).await?;
        Ok(())
    }
}

async fn follow_events(holder: Weak<AuthSession>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(holder) = holder.upgrade() else {
                    break;
                };
                holder.apply_event(event).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "auth events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::Operation;
    use crate::remote::{MemoryRemote, UserMetadata};
    use std::time::Duration;

    fn setup() -> (Arc<MemoryRemote>, Arc<AuthSession>) {
        let remote = Arc::new(MemoryRemote::new());
        let session = Arc::new(AuthSession::new(remote.clone(), remote.clone()));
        (remote, session)
    }

    async fn wait_for<F>(session: &AuthSession, predicate: F) -> AuthSnapshot
    where
        F: Fn(&AuthSnapshot) -> bool,
    {
        let mut rx = session.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| predicate(s)))
            .await
            .expect("timed out waiting for auth state")
            .expect("auth state channel closed")
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn test_starts_uninitialized_and_loading() {
        let (_remote, session) = setup();
        let snapshot = session.state();
        assert_eq!(snapshot.state, AuthState::Uninitialized);
        assert!(snapshot.loading);
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let (_remote, session) = setup();
        assert!(session.initialize().await.unwrap().is_none());
        let snapshot = session.state();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_initialize_restores_existing_session() {
        let (remote, session) = setup();
        remote.register("ada@example.com", "hunter22", "Ada");
        remote
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        let user = session.initialize().await.unwrap().unwrap();
        assert_eq!(session.current_user(), Some(user.clone()));
        assert!(remote.row(Table::Users, user.id).is_some());
    }

    #[tokio::test]
    async fn test_sign_up_mirrors_profile() {
        let (remote, session) = setup();
        let outcome = session
            .sign_up("grace@example.com", "cobol4ever", "Grace Hopper")
            .await
            .unwrap();

        assert_eq!(session.current_user(), Some(outcome.user.clone()));
        let row = remote.row(Table::Users, outcome.user.id).unwrap();
        assert_eq!(row["full_name"], "Grace Hopper");
        assert_eq!(row["avatar_url"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_returned_and_state_kept() {
        let (remote, session) = setup();
        remote.register("ada@example.com", "hunter22", "Ada");
        session.initialize().await.unwrap();

        let err = session.sign_in("ada@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(session.state().state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_profile_sync_failure_does_not_fail_sign_in() {
        let (remote, session) = setup();
        let user = remote.register("ada@example.com", "hunter22", "Ada");
        remote.fail_next(Operation::Upsert, Table::Users, "permission denied for table users");

        let signed_in = session.sign_in("ada@example.com", "hunter22").await.unwrap();

        assert_eq!(signed_in.id, user.id);
        assert_eq!(session.current_user().map(|u| u.id), Some(user.id));
        assert!(remote.row(Table::Users, user.id).is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_user() {
        let (remote, session) = setup();
        remote.register("ada@example.com", "hunter22", "Ada");
        session.sign_in("ada@example.com", "hunter22").await.unwrap();

        session.sign_out().await.unwrap();

        assert_eq!(session.state().state, AuthState::Unauthenticated);
        assert!(remote.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listen_follows_remote_events() {
        let (remote, session) = setup();
        let user = remote.register("ada@example.com", "hunter22", "Ada");
        session.initialize().await.unwrap();
        session.listen();

        remote
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        let snapshot = wait_for(&session, |s| s.user().is_some()).await;
        assert_eq!(snapshot.user().map(|u| u.id), Some(user.id));

        remote.update_user_metadata(
            user.id,
            UserMetadata {
                full_name: Some("Ada Lovelace".to_string()),
                avatar_url: None,
            },
        );
        wait_for(&session, |s| {
            s.user()
                .and_then(|u| u.user_metadata.full_name.as_deref())
                == Some("Ada Lovelace")
        })
        .await;

        remote.sign_out().await.unwrap();
        wait_for(&session, |s| s.state == AuthState::Unauthenticated).await;
    }

    #[tokio::test]
    async fn test_teardown_cancels_exactly_once() {
        let (remote, session) = setup();
        remote.register("ada@example.com", "hunter22", "Ada");
        session.initialize().await.unwrap();
        session.listen();

        assert!(session.teardown());
        assert!(!session.teardown());

        remote
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.state().state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_subscription_aborts_task_once() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        let mut subscription = Subscription::new(handle);

        assert!(subscription.cancel());
        assert!(!subscription.cancel());
        // The aborted task drops its sender
        assert!(tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("task was not aborted")
            .is_err());
        drop(subscription);
    }

    #[tokio::test]
    async fn test_teardown_without_listen_is_noop() {
        let (_remote, session) = setup();
        assert!(!session.teardown());
    }

    #[test]
    fn test_profile_from_user_metadata() {
        let user = User {
            id: Uuid::new_v4(),
            email: Some("ada@example.com".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Ada".to_string()),
                avatar_url: Some("https://example.com/ada.png".to_string()),
            },
        };
        let now = Utc::now();
        let profile = UserProfile::from_user(&user, now);
        assert_eq!(profile.id, user.id);
        assert_eq!(profile.full_name.as_deref(), Some("Ada"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/ada.png"));
        assert_eq!(profile.updated_at, now);
    }
}
