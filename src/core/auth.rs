//! Authentication collaborator: owns the signed-in session and announces changes.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub access_token: String,
}

impl UserSession {
    pub fn new(user_id: &str, email: &str, access_token: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            display_name: None,
            access_token: access_token.to_string(),
        }
    }
}

/// Holds the current session and a "session changed" channel.
///
/// Sessions are owned here; everyone else keeps weak references.
pub struct AuthSessions {
    tx: watch::Sender<Option<Arc<UserSession>>>,
}

impl AuthSessions {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, session: UserSession) -> Arc<UserSession> {
        info!(user = %session.user_id, "Signed in");
        let session = Arc::new(session);
        self.tx.send_replace(Some(Arc::clone(&session)));
        session
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("Signed out");
        }
    }

    pub fn current(&self) -> Option<Arc<UserSession>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<UserSession>>> {
        self.tx.subscribe()
    }
}

impl Default for AuthSessions {
    fn default() -> Self {
        Self::new()
    }
}
