//! Exchange-rate refresh, gated by [`RefreshGate`].

use crate::core::currency::{CurrencyPair, CurrencyRateProvider, ExchangeRate};
use crate::store::PortfolioStore;
use crate::store::facade::CurrencyFacade;
use crate::store::scope::Facade;
use crate::throttle::{Clock, RefreshGate, SystemClock};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshOutcome {
    Updated(ExchangeRate),
    /// The gate denied the refresh; nothing was fetched.
    Skipped { retry_in: Duration },
}

pub struct RateRefresher<C: Clock = SystemClock> {
    gate: Arc<RefreshGate<C>>,
    provider: Arc<dyn CurrencyRateProvider>,
    pair: CurrencyPair,
}

impl<C: Clock + 'static> RateRefresher<C> {
    pub fn new(gate: Arc<RefreshGate<C>>, provider: Arc<dyn CurrencyRateProvider>) -> Self {
        Self {
            gate,
            provider,
            pair: CurrencyPair::USD_JPY,
        }
    }

    pub fn gate(&self) -> &Arc<RefreshGate<C>> {
        &self.gate
    }

    /// Fetches the rate and applies it, unless the gate denies the refresh.
    ///
    /// A failed fetch still counts against the interval.
    pub async fn refresh(&self, currency: &CurrencyFacade) -> Result<RefreshOutcome> {
        if !self.gate.should_update() {
            let retry_in = u64::try_from(self.gate.remaining()).unwrap_or_default();
            return Ok(RefreshOutcome::Skipped {
                retry_in: Duration::from_millis(retry_in),
            });
        }

        let rate = self
            .provider
            .get_rate(&self.pair.base.to_string(), &self.pair.quote.to_string())
            .await?;
        let rate = ExchangeRate {
            rate,
            pair: self.pair,
            fetched_at: Utc::now(),
        };
        currency.apply_exchange_rate(rate);
        info!("Exchange rate {} updated to {}", self.pair, rate.rate);
        Ok(RefreshOutcome::Updated(rate))
    }

    /// Re-arms the gate and refreshes.
    pub async fn force_refresh(&self, currency: &CurrencyFacade) -> Result<RefreshOutcome> {
        self.gate.reset();
        self.refresh(currency).await
    }

    /// Refreshes whenever the store's base currency changes.
    ///
    /// Runs until the returned handle is aborted.
    pub fn watch_store(self: Arc<Self>, store: Arc<PortfolioStore>) -> JoinHandle<()> {
        let mut rx = store.subscribe();
        let mut base = rx.borrow_and_update().base_currency;
        let currency = CurrencyFacade::attach(store);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().base_currency;
                if next == base {
                    continue;
                }
                base = next;
                debug!("Base currency changed to {base}, requesting rate refresh");
                match self.refresh(&currency).await {
                    Ok(RefreshOutcome::Skipped { retry_in }) => {
                        debug!("Rate refresh skipped, retry in {retry_in:?}")
                    }
                    Ok(RefreshOutcome::Updated(_)) => {}
                    Err(e) => warn!("Exchange rate refresh failed: {e}"),
                }
            }
        })
    }
}
