//! Resolves facades against the store attached to the current composition.

use crate::core::error::StoreError;
use crate::store::PortfolioStore;
use crate::store::facade::{AllocationFacade, AssetsFacade, CloudSyncFacade, CurrencyFacade};
use std::fmt::Display;
use std::sync::Arc;

/// The concern a facade serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    Assets,
    Allocation,
    Currency,
    CloudSync,
}

impl Display for Concern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Concern::Assets => "assets",
                Concern::Allocation => "allocation",
                Concern::Currency => "currency",
                Concern::CloudSync => "cloud sync",
            }
        )
    }
}

/// A narrow view over the store for one concern.
pub trait Facade: Sized {
    const CONCERN: Concern;

    fn attach(store: Arc<PortfolioStore>) -> Self;
}

/// Any facade, for callers that pick the concern at runtime.
pub enum AnyFacade {
    Assets(AssetsFacade),
    Allocation(AllocationFacade),
    Currency(CurrencyFacade),
    CloudSync(CloudSyncFacade),
}

/// Holds the store for one composition. Empty until a store is attached.
#[derive(Clone, Default)]
pub struct StoreScope {
    store: Option<Arc<PortfolioStore>>,
}

impl StoreScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<PortfolioStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn attach(&mut self, store: Arc<PortfolioStore>) {
        self.store = Some(store);
    }

    pub fn detach(&mut self) -> Option<Arc<PortfolioStore>> {
        self.store.take()
    }

    pub fn store(&self) -> Option<&Arc<PortfolioStore>> {
        self.store.as_ref()
    }

    pub fn facade<F: Facade>(&self) -> Result<F, StoreError> {
        self.store
            .as_ref()
            .map(|store| F::attach(Arc::clone(store)))
            .ok_or(StoreError::UninitializedStore {
                concern: F::CONCERN,
            })
    }

    pub fn get_facade(&self, concern: Concern) -> Result<AnyFacade, StoreError> {
        Ok(match concern {
            Concern::Assets => AnyFacade::Assets(self.facade()?),
            Concern::Allocation => AnyFacade::Allocation(self.facade()?),
            Concern::Currency => AnyFacade::Currency(self.facade()?),
            Concern::CloudSync => AnyFacade::CloudSync(self.facade()?),
        })
    }

    pub fn assets(&self) -> Result<AssetsFacade, StoreError> {
        self.facade()
    }

    pub fn allocation(&self) -> Result<AllocationFacade, StoreError> {
        self.facade()
    }

    pub fn currency(&self) -> Result<CurrencyFacade, StoreError> {
        self.facade()
    }

    pub fn cloud_sync(&self) -> Result<CloudSyncFacade, StoreError> {
        self.facade()
    }
}
