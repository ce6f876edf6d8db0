//! Portfolio data model shared by the store, the facades and the cloud drive.

use crate::core::auth::UserSession;
use crate::core::currency::{Currency, ExchangeRate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A single holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub currency: Currency,
    #[serde(default)]
    pub asset_class: Option<String>,
    /// Value in the portfolio's base currency, derived by the store.
    #[serde(skip)]
    pub value_in_base: Option<f64>,
}

impl Asset {
    pub fn new(id: &str, name: &str, quantity: f64, unit_price: f64, currency: Currency) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            quantity,
            unit_price,
            currency,
            asset_class: None,
            value_in_base: None,
        }
    }

    pub fn with_class(mut self, asset_class: &str) -> Self {
        self.asset_class = Some(asset_class.to_string());
        self
    }

    /// Value in the asset's own currency.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Desired weight for an asset id or an asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTarget {
    pub id: String,
    pub target_weight: f64,
}

impl AllocationTarget {
    pub fn new(id: &str, target_weight: f64) -> Self {
        Self {
            id: id.to_string(),
            target_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Local,
    Cloud,
}

/// Where the portfolio came from and when it last touched the cloud.
///
/// Both fields live in one value so the store always replaces them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStatus {
    pub data_source: DataSource,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn synced_at(time: DateTime<Utc>) -> Self {
        Self {
            data_source: DataSource::Cloud,
            last_sync_time: Some(time),
        }
    }
}

/// The authoritative in-memory snapshot for one session.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    pub current_assets: Arc<Vec<Asset>>,
    pub target_portfolio: Arc<Vec<AllocationTarget>>,
    pub base_currency: Currency,
    pub total_assets: f64,
    pub exchange_rate: Option<ExchangeRate>,
    pub sync: SyncStatus,
    /// Borrowed from the auth collaborator, never owned here.
    pub current_user: Option<Weak<UserSession>>,
}

impl PortfolioState {
    pub fn new(
        assets: Vec<Asset>,
        targets: Vec<AllocationTarget>,
        base_currency: Currency,
    ) -> Self {
        let mut state = Self {
            current_assets: Arc::new(assets),
            target_portfolio: Arc::new(targets),
            base_currency,
            total_assets: 0.0,
            exchange_rate: None,
            sync: SyncStatus::default(),
            current_user: None,
        };
        state.revalue();
        state
    }

    /// Recomputes every asset's base-currency value and the total.
    ///
    /// Foreign-currency assets without a usable rate are left unvalued and do
    /// not contribute to the total.
    pub fn revalue(&mut self) {
        let base = self.base_currency;
        let rate = self.exchange_rate;
        let assets = Arc::make_mut(&mut self.current_assets);

        let mut total = 0.0;
        for asset in assets.iter_mut() {
            let value = asset.market_value();
            asset.value_in_base = if asset.currency == base {
                Some(value)
            } else {
                rate.and_then(|r| r.convert(value, asset.currency, base))
            };
            match asset.value_in_base {
                Some(v) => total += v,
                None => debug!(
                    "No {} -> {} rate available for asset {}",
                    asset.currency, base, asset.id
                ),
            }
        }
        self.total_assets = total;
    }

    pub fn current_user(&self) -> Option<Arc<UserSession>> {
        self.current_user.as_ref().and_then(Weak::upgrade)
    }

    pub fn to_document(&self, saved_at: DateTime<Utc>) -> PortfolioDocument {
        PortfolioDocument {
            version: PortfolioDocument::VERSION,
            assets: self.current_assets.as_ref().clone(),
            targets: self.target_portfolio.as_ref().clone(),
            base_currency: self.base_currency,
            saved_at,
        }
    }
}

impl Default for PortfolioState {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Currency::Jpy)
    }
}

/// Payload stored in the cloud drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDocument {
    pub version: u32,
    pub assets: Vec<Asset>,
    pub targets: Vec<AllocationTarget>,
    pub base_currency: Currency,
    pub saved_at: DateTime<Utc>,
}

impl PortfolioDocument {
    pub const VERSION: u32 = 1;
}
