//! Composition root: builds the store, its collaborators and their wiring.

use crate::core::auth::{AuthSessions, UserSession};
use crate::core::cloud::CloudStorage;
use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::portfolio::PortfolioState;
use crate::providers::drive::DriveClient;
use crate::providers::market_data::MarketDataProvider;
use crate::refresh::{RateRefresher, RefreshOutcome};
use crate::store::PortfolioStore;
use crate::store::scope::StoreScope;
use crate::throttle::RefreshGate;
use crate::wiring::AuthBridge;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_ENV_VAR: &str = "FOLIOSYNC_ACCESS_TOKEN";
pub const USER_ENV_VAR: &str = "FOLIOSYNC_USER";

/// Builds a session from the access token and user found in the environment.
pub fn session_from_env(token: Option<String>, user: Option<String>) -> Option<UserSession> {
    let token = token.filter(|t| !t.trim().is_empty())?;
    let user = user.unwrap_or_else(|| "me".to_string());
    Some(UserSession::new(&user, &user, token.trim()))
}

/// What happened during [`App::startup`].
#[derive(Debug, Default)]
pub struct StartupReport {
    pub loaded_from_drive: bool,
    pub rate: Option<RefreshOutcome>,
    pub warnings: Vec<String>,
}

pub struct App {
    store: Arc<PortfolioStore>,
    scope: StoreScope,
    auth: Arc<AuthSessions>,
    refresher: Arc<RateRefresher>,
    bridge: AuthBridge,
    watcher: JoinHandle<()>,
}

impl App {
    /// Wires the app against the HTTP collaborators named in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let cloud = Arc::new(DriveClient::new(&config.api.base_url));
        let rates = Arc::new(MarketDataProvider::new(&config.api.base_url));
        Self::new(config, cloud, rates)
    }

    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &AppConfig,
        cloud: Arc<dyn CloudStorage>,
        rates: Arc<dyn CurrencyRateProvider>,
    ) -> Result<Self> {
        let state = PortfolioState::new(
            config.assets.clone(),
            config.targets.clone(),
            config.base_currency,
        );
        let store = Arc::new(PortfolioStore::new(state, cloud));
        let scope = StoreScope::with_store(Arc::clone(&store));

        let auth = Arc::new(AuthSessions::new());
        let bridge = AuthBridge::new();
        bridge.connect(&auth, &scope)?;

        let refresher = Arc::new(RateRefresher::new(Arc::new(RefreshGate::new()), rates));
        let watcher = Arc::clone(&refresher).watch_store(Arc::clone(&store));
        debug!("Application wired");

        Ok(Self {
            store,
            scope,
            auth,
            refresher,
            bridge,
            watcher,
        })
    }

    /// The whole current state, for views that show every concern at once.
    pub fn snapshot(&self) -> Arc<PortfolioState> {
        self.store.snapshot()
    }

    pub fn scope(&self) -> &StoreScope {
        &self.scope
    }

    pub fn auth(&self) -> &Arc<AuthSessions> {
        &self.auth
    }

    pub fn refresher(&self) -> &Arc<RateRefresher> {
        &self.refresher
    }

    /// Signs in through the auth collaborator and attaches the session to the
    /// store right away instead of waiting for the subscription to deliver it.
    pub fn sign_in(&self, session: UserSession) -> Result<Arc<UserSession>> {
        let session = self.auth.sign_in(session);
        self.scope
            .cloud_sync()?
            .handle_auth_state_change(Some(&session));
        Ok(session)
    }

    /// Pulls the drive copy (when signed in) and refreshes the rate, concurrently.
    ///
    /// Failures of either step are reported as warnings; the local portfolio
    /// stays usable.
    pub async fn startup(&self) -> Result<StartupReport> {
        let sync = self.scope.cloud_sync()?;
        let currency = self.scope.currency()?;
        let signed_in = sync.current_user().is_some();

        let load = async {
            if signed_in {
                Some(sync.load_from_drive().await)
            } else {
                None
            }
        };
        let (loaded, rate) = futures::future::join(load, self.refresher.refresh(&currency)).await;

        let mut report = StartupReport::default();
        match loaded {
            Some(Ok(found)) => report.loaded_from_drive = found,
            Some(Err(e)) => {
                warn!("Could not load portfolio from drive: {e}");
                report.warnings.push(format!("Drive: {e}"));
            }
            None => debug!("Not signed in, using local portfolio"),
        }
        match rate {
            Ok(outcome) => report.rate = Some(outcome),
            Err(e) => {
                warn!("Could not refresh exchange rate: {e:#}");
                report.warnings.push(format!("Exchange rate: {e:#}"));
            }
        }
        Ok(report)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.watcher.abort();
        self.bridge.disconnect();
    }
}
