pub mod facade;
pub mod scope;

use crate::core::cloud::CloudStorage;
use crate::core::portfolio::PortfolioState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// The single authoritative portfolio snapshot for a session.
///
/// Readers get whole `Arc<PortfolioState>` snapshots; writers build the next
/// snapshot and swap it in, so nobody observes a half-applied update.
pub struct PortfolioStore {
    state: watch::Sender<Arc<PortfolioState>>,
    cloud: Arc<dyn CloudStorage>,
}

impl PortfolioStore {
    pub fn new(initial: PortfolioState, cloud: Arc<dyn CloudStorage>) -> Self {
        let (state, _rx) = watch::channel(Arc::new(initial));
        Self { state, cloud }
    }

    pub fn snapshot(&self) -> Arc<PortfolioState> {
        Arc::clone(&self.state.borrow())
    }

    /// Applies `f` to the state and publishes the result as one update.
    ///
    /// Derived values are recomputed before the new snapshot becomes visible.
    pub fn update(&self, f: impl FnOnce(&mut PortfolioState)) {
        self.state.send_modify(|state| {
            let next = Arc::make_mut(state);
            f(next);
            next.revalue();
        });
        debug!("Portfolio store updated");
    }

    /// Like [`update`](Self::update), but only publishes when `f` reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut PortfolioState) -> bool) -> bool {
        let changed = self.state.send_if_modified(|state| {
            let next = Arc::make_mut(state);
            let changed = f(next);
            if changed {
                next.revalue();
            }
            changed
        });
        if changed {
            debug!("Portfolio store updated");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioState>> {
        self.state.subscribe()
    }

    pub fn cloud(&self) -> &Arc<dyn CloudStorage> {
        &self.cloud
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::portfolio::Asset;

    #[tokio::test]
    async fn test_update_replaces_snapshot() {
        let store = PortfolioStore::new(PortfolioState::default(), testing::drive());
        let before = store.snapshot();

        store.update(|s| {
            Arc::make_mut(&mut s.current_assets).push(Asset::new(
                "a",
                "A",
                2.0,
                500.0,
                Currency::Jpy,
            ))
        });

        let after = store.snapshot();
        assert!(before.current_assets.is_empty());
        assert_eq!(before.total_assets, 0.0);
        assert_eq!(after.current_assets.len(), 1);
        assert_eq!(after.total_assets, 1000.0);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let store = PortfolioStore::new(PortfolioState::default(), testing::drive());
        let mut rx = store.subscribe();

        store.update(|s| s.base_currency = Currency::Usd);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().base_currency, Currency::Usd);
    }
}
