//! Connects the auth collaborator's session changes to the portfolio store.

use crate::core::auth::AuthSessions;
use crate::core::error::StoreError;
use crate::store::PortfolioStore;
use crate::store::facade::CloudSyncFacade;
use crate::store::scope::{Facade, StoreScope};
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tracing::debug;

struct Link {
    auth: Weak<AuthSessions>,
    store: Weak<PortfolioStore>,
    task: JoinHandle<()>,
}

impl Link {
    fn joins(&self, auth: &Arc<AuthSessions>, store: &Arc<PortfolioStore>) -> bool {
        Weak::ptr_eq(&self.auth, &Arc::downgrade(auth))
            && Weak::ptr_eq(&self.store, &Arc::downgrade(store))
    }
}

/// Subscribes the store to session changes, at most one subscription at a time.
#[derive(Default)]
pub struct AuthBridge {
    link: Mutex<Option<Link>>,
}

impl AuthBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `auth` to the store attached to `scope`.
    ///
    /// Linking the same pair again does nothing and returns false. Linking a
    /// different pair drops the previous subscription first. Must be called
    /// from within a tokio runtime.
    pub fn connect(
        &self,
        auth: &Arc<AuthSessions>,
        scope: &StoreScope,
    ) -> Result<bool, StoreError> {
        let sync: CloudSyncFacade = scope.facade()?;
        let store = scope.store().cloned().ok_or(StoreError::UninitializedStore {
            concern: CloudSyncFacade::CONCERN,
        })?;

        let mut link = self
            .link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if link.as_ref().is_some_and(|l| l.joins(auth, &store)) {
            return Ok(false);
        }
        if let Some(previous) = link.take() {
            debug!("Replacing auth subscription");
            previous.task.abort();
        }

        let mut rx = auth.subscribe();
        let current = rx.borrow_and_update().clone();
        sync.handle_auth_state_change(current.as_ref());

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                sync.handle_auth_state_change(session.as_ref());
            }
            debug!("Auth collaborator gone, subscription ended");
        });

        *link = Some(Link {
            auth: Arc::downgrade(auth),
            store: Arc::downgrade(&store),
            task,
        });
        debug!("Auth subscription established");
        Ok(true)
    }

    pub fn is_connected(&self) -> bool {
        self.link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|l| !l.task.is_finished())
    }

    pub fn disconnect(&self) {
        let link = self
            .link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(link) = link {
            link.task.abort();
        }
    }
}

impl Drop for AuthBridge {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::UserSession;
    use crate::core::portfolio::PortfolioState;
    use crate::store::testing;

    fn scope() -> StoreScope {
        StoreScope::with_store(Arc::new(PortfolioStore::new(
            PortfolioState::default(),
            testing::drive(),
        )))
    }

    async fn user_of(scope: &StoreScope) -> Option<String> {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        scope
            .cloud_sync()
            .unwrap()
            .current_user()
            .map(|u| u.user_id.clone())
    }

    #[tokio::test]
    async fn test_requires_attached_store() {
        let bridge = AuthBridge::new();
        let auth = Arc::new(AuthSessions::new());
        assert!(bridge.connect(&auth, &StoreScope::new()).is_err());
        assert!(!bridge.is_connected());
    }

    #[tokio::test]
    async fn test_session_changes_reach_store() {
        let bridge = AuthBridge::new();
        let auth = Arc::new(AuthSessions::new());
        let scope = scope();
        assert!(bridge.connect(&auth, &scope).unwrap());

        let _session = auth.sign_in(UserSession::new("u1", "u1@example.com", "t"));
        assert_eq!(user_of(&scope).await.as_deref(), Some("u1"));

        auth.sign_out();
        assert_eq!(user_of(&scope).await, None);
    }

    #[tokio::test]
    async fn test_connect_picks_up_existing_session() {
        let auth = Arc::new(AuthSessions::new());
        let _session = auth.sign_in(UserSession::new("u1", "u1@example.com", "t"));
        let scope = scope();

        AuthBridge::new().connect(&auth, &scope).unwrap();
        let user = scope.cloud_sync().unwrap().current_user();
        assert_eq!(user.unwrap().user_id, "u1");
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let bridge = AuthBridge::new();
        let auth = Arc::new(AuthSessions::new());
        let scope = scope();

        assert!(bridge.connect(&auth, &scope).unwrap());
        assert!(!bridge.connect(&auth, &scope).unwrap());
        assert!(bridge.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_on_identity_change() {
        let bridge = AuthBridge::new();
        let first = Arc::new(AuthSessions::new());
        let second = Arc::new(AuthSessions::new());
        let scope = scope();

        bridge.connect(&first, &scope).unwrap();
        assert!(bridge.connect(&second, &scope).unwrap());

        // The old collaborator no longer reaches the store
        let _old = first.sign_in(UserSession::new("old", "old@example.com", "t"));
        assert_eq!(user_of(&scope).await, None);

        let _new = second.sign_in(UserSession::new("new", "new@example.com", "t"));
        assert_eq!(user_of(&scope).await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_reconnect_on_store_change() {
        let bridge = AuthBridge::new();
        let auth = Arc::new(AuthSessions::new());
        let old_scope = scope();
        let new_scope = scope();

        assert!(bridge.connect(&auth, &old_scope).unwrap());
        assert!(bridge.connect(&auth, &new_scope).unwrap());
        assert!(!bridge.connect(&auth, &new_scope).unwrap());
        let mut old_updates = old_scope.store().unwrap().subscribe();
        old_updates.borrow_and_update();

        let _session = auth.sign_in(UserSession::new("u1", "u1@example.com", "t"));
        assert_eq!(user_of(&new_scope).await.as_deref(), Some("u1"));
        assert_eq!(user_of(&old_scope).await, None);

        auth.sign_out();
        assert_eq!(user_of(&new_scope).await, None);
        assert!(!old_updates.has_changed().unwrap());
    }
}
