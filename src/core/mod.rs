//! Domain types and collaborator abstractions

pub mod allocation;
pub mod auth;
pub mod cloud;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod portfolio;

// Re-export main types for cleaner imports
pub use auth::{AuthSessions, UserSession};
pub use cloud::CloudStorage;
pub use currency::{Currency, CurrencyPair, CurrencyRateProvider, ExchangeRate};
pub use error::{StoreError, SyncError};
pub use portfolio::{AllocationTarget, Asset, DataSource, PortfolioState, SyncStatus};
