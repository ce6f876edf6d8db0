//! Typed errors for the store and the cloud sync path.

use crate::store::scope::Concern;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A facade was requested from a scope with no store attached.
    #[error("{concern} facade requested outside an active portfolio store scope")]
    UninitializedStore { concern: Concern },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No signed-in user to sync with")]
    NotSignedIn,

    /// The REST proxy could not reach, or got an error from, the upstream.
    #[error("Proxy communication failed{}: {message}", status_suffix(.status))]
    ProxyCommunication {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid portfolio document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl SyncError {
    pub fn proxy(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::ProxyCommunication {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::UninitializedStore {
            concern: Concern::CloudSync,
        };
        assert_eq!(
            err.to_string(),
            "cloud sync facade requested outside an active portfolio store scope"
        );

        assert_eq!(
            SyncError::proxy(Some(500), "upstream down").to_string(),
            "Proxy communication failed (500): upstream down"
        );
        assert_eq!(
            SyncError::proxy(None, "connection refused").to_string(),
            "Proxy communication failed: connection refused"
        );
    }
}
