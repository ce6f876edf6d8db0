//! Narrow views over the portfolio store, one per concern.
//!
//! Facades hold only a reference to the store. Sequences are handed out as the
//! store's own `Arc`s, so a write through one facade shows up in every other
//! facade on its next read.

use crate::core::allocation::{AllocationReport, build_report};
use crate::core::auth::UserSession;
use crate::core::currency::{Currency, ExchangeRate};
use crate::core::error::SyncError;
use crate::core::portfolio::{
    AllocationTarget, Asset, DataSource, PortfolioDocument, PortfolioState, SyncStatus,
};
use crate::store::PortfolioStore;
use crate::store::scope::{Concern, Facade};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

pub struct AssetsFacade {
    store: Arc<PortfolioStore>,
}

impl Facade for AssetsFacade {
    const CONCERN: Concern = Concern::Assets;

    fn attach(store: Arc<PortfolioStore>) -> Self {
        Self { store }
    }
}

impl AssetsFacade {
    pub fn current_assets(&self) -> Arc<Vec<Asset>> {
        Arc::clone(&self.store.snapshot().current_assets)
    }

    pub fn total_assets(&self) -> f64 {
        self.store.snapshot().total_assets
    }

    pub fn base_currency(&self) -> Currency {
        self.store.snapshot().base_currency
    }

    pub fn set_assets(&self, assets: Vec<Asset>) {
        self.store.update(|s| s.current_assets = Arc::new(assets));
    }

    /// Appends `asset`, or replaces the asset with the same id in place.
    pub fn add_asset(&self, asset: Asset) {
        self.store.update(|s| {
            let assets = Arc::make_mut(&mut s.current_assets);
            match assets.iter_mut().find(|a| a.id == asset.id) {
                Some(existing) => *existing = asset,
                None => assets.push(asset),
            }
        });
    }

    /// Returns false when no asset has this id.
    pub fn update_asset(&self, id: &str, edit: impl FnOnce(&mut Asset)) -> bool {
        self.store.update_if(|s| {
            if !s.current_assets.iter().any(|a| a.id == id) {
                return false;
            }
            let assets = Arc::make_mut(&mut s.current_assets);
            assets.iter_mut().find(|a| a.id == id).map(edit).is_some()
        })
    }

    pub fn remove_asset(&self, id: &str) -> bool {
        self.store.update_if(|s| {
            let Some(index) = s.current_assets.iter().position(|a| a.id == id) else {
                return false;
            };
            Arc::make_mut(&mut s.current_assets).remove(index);
            true
        })
    }
}

pub struct AllocationFacade {
    store: Arc<PortfolioStore>,
}

impl Facade for AllocationFacade {
    const CONCERN: Concern = Concern::Allocation;

    fn attach(store: Arc<PortfolioStore>) -> Self {
        Self { store }
    }
}

impl AllocationFacade {
    pub fn target_portfolio(&self) -> Arc<Vec<AllocationTarget>> {
        Arc::clone(&self.store.snapshot().target_portfolio)
    }

    pub fn current_assets(&self) -> Arc<Vec<Asset>> {
        Arc::clone(&self.store.snapshot().current_assets)
    }

    pub fn set_target_portfolio(&self, targets: Vec<AllocationTarget>) {
        self.store.update(|s| s.target_portfolio = Arc::new(targets));
    }

    pub fn allocation_report(&self) -> AllocationReport {
        let snapshot = self.store.snapshot();
        build_report(
            &snapshot.current_assets,
            &snapshot.target_portfolio,
            snapshot.total_assets,
        )
    }
}

pub struct CurrencyFacade {
    store: Arc<PortfolioStore>,
}

impl Facade for CurrencyFacade {
    const CONCERN: Concern = Concern::Currency;

    fn attach(store: Arc<PortfolioStore>) -> Self {
        Self { store }
    }
}

impl CurrencyFacade {
    pub fn base_currency(&self) -> Currency {
        self.store.snapshot().base_currency
    }

    /// Returns false when `currency` already is the base currency.
    pub fn set_base_currency(&self, currency: Currency) -> bool {
        self.store.update_if(|s| {
            if s.base_currency == currency {
                return false;
            }
            debug!("Base currency {} -> {}", s.base_currency, currency);
            s.base_currency = currency;
            true
        })
    }

    pub fn exchange_rate(&self) -> Option<ExchangeRate> {
        self.store.snapshot().exchange_rate
    }

    pub fn apply_exchange_rate(&self, rate: ExchangeRate) {
        self.store.update(|s| s.exchange_rate = Some(rate));
    }
}

pub struct CloudSyncFacade {
    store: Arc<PortfolioStore>,
}

impl Facade for CloudSyncFacade {
    const CONCERN: Concern = Concern::CloudSync;

    fn attach(store: Arc<PortfolioStore>) -> Self {
        Self { store }
    }
}

impl CloudSyncFacade {
    pub fn data_source(&self) -> DataSource {
        self.store.snapshot().sync.data_source
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.store.snapshot().sync.last_sync_time
    }

    /// Data source and last sync time read from the same snapshot.
    pub fn sync_status(&self) -> SyncStatus {
        self.store.snapshot().sync
    }

    pub fn current_user(&self) -> Option<Arc<UserSession>> {
        self.store.snapshot().current_user()
    }

    /// Uploads the current snapshot to the drive.
    ///
    /// The store is not locked while the upload is in flight; the sync status
    /// changes only once the drive has accepted the document, and only if the
    /// session that started the save is still attached.
    pub async fn save_to_drive(&self) -> Result<DateTime<Utc>, SyncError> {
        let snapshot = self.store.snapshot();
        let user = snapshot.current_user().ok_or(SyncError::NotSignedIn)?;
        let saved_at = Utc::now();
        let document = snapshot.to_document(saved_at);
        drop(snapshot);

        let cloud = Arc::clone(self.store.cloud());
        cloud.save(&user, &document).await?;

        let applied = self.store.update_if(|s| {
            if !attached_to(s, &user) {
                return false;
            }
            s.sync = SyncStatus::synced_at(saved_at);
            true
        });
        if applied {
            info!(
                user = %user.user_id,
                assets = document.assets.len(),
                "Saved portfolio to drive"
            );
        } else {
            debug!(user = %user.user_id, "Session changed during save, sync status left as is");
        }
        Ok(saved_at)
    }

    /// Replaces the portfolio with the drive's copy.
    ///
    /// Returns false, leaving the store untouched, when the drive holds no
    /// portfolio for this user or the session changed while loading.
    pub async fn load_from_drive(&self) -> Result<bool, SyncError> {
        let user = self.current_user().ok_or(SyncError::NotSignedIn)?;
        let cloud = Arc::clone(self.store.cloud());

        let Some(document) = cloud.load(&user).await? else {
            info!(user = %user.user_id, "No portfolio stored in drive");
            return Ok(false);
        };
        if document.version > PortfolioDocument::VERSION {
            return Err(SyncError::InvalidDocument(serde::de::Error::custom(format!(
                "unsupported document version {}",
                document.version
            ))));
        }

        let loaded_at = Utc::now();
        let asset_count = document.assets.len();
        let applied = self.store.update_if(move |s| {
            if !attached_to(s, &user) {
                return false;
            }
            s.current_assets = Arc::new(document.assets);
            s.target_portfolio = Arc::new(document.targets);
            s.base_currency = document.base_currency;
            s.sync = SyncStatus::synced_at(loaded_at);
            true
        });
        if applied {
            info!(assets = asset_count, "Loaded portfolio from drive");
        } else {
            debug!("Session changed during load, drive copy discarded");
        }
        Ok(applied)
    }

    /// Follows the auth collaborator's session.
    ///
    /// Signing out also returns the portfolio to local mode. Repeating the
    /// current session is a no-op.
    pub fn handle_auth_state_change(&self, session: Option<&Arc<UserSession>>) -> bool {
        self.store.update_if(|s| match session {
            Some(session) => {
                if attached_to(s, session) {
                    return false;
                }
                debug!(user = %session.user_id, "Session attached to portfolio store");
                s.current_user = Some(Arc::downgrade(session));
                true
            }
            None => {
                if s.current_user.is_none() && s.sync == SyncStatus::default() {
                    return false;
                }
                debug!("Session detached from portfolio store");
                s.current_user = None;
                s.sync = SyncStatus::default();
                true
            }
        })
    }
}

/// True while `user` is the session attached to the state.
fn attached_to(state: &PortfolioState, user: &Arc<UserSession>) -> bool {
    state
        .current_user
        .as_ref()
        .is_some_and(|current| Weak::ptr_eq(current, &Arc::downgrade(user)))
}
