//! Cloud storage abstraction

use crate::core::auth::UserSession;
use crate::core::error::SyncError;
use crate::core::portfolio::PortfolioDocument;
use async_trait::async_trait;

#[async_trait]
pub trait CloudStorage: Send + Sync {
    async fn save(&self, session: &UserSession, document: &PortfolioDocument)
    -> Result<(), SyncError>;

    /// Returns `None` when the user has no stored portfolio yet.
    async fn load(&self, session: &UserSession) -> Result<Option<PortfolioDocument>, SyncError>;
}
