pub mod app;
pub mod cli;
pub mod core;
pub mod providers;
pub mod proxy;
pub mod refresh;
pub mod store;
pub mod throttle;
pub mod wiring;

use crate::app::{ACCESS_TOKEN_ENV_VAR, App, USER_ENV_VAR, session_from_env};
use crate::core::config::{AppConfig, UPSTREAM_ENV_VAR};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Summary,
    Push,
    Pull,
    Proxy,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("foliosync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = match command {
        AppCommand::Proxy => return run_proxy(&config).await,
        _ => App::from_config(&config)?,
    };
    let session = session_from_env(
        std::env::var(ACCESS_TOKEN_ENV_VAR).ok(),
        std::env::var(USER_ENV_VAR).ok(),
    );
    if let Some(session) = session {
        let session = app.sign_in(session)?;
        info!("Signed in as {}", session.user_id);
    }

    match command {
        AppCommand::Summary => {
            let startup = app.startup().await?;
            cli::summary::run(&app, &startup).await
        }
        AppCommand::Push => cli::sync::push(&app).await,
        AppCommand::Pull => cli::sync::pull(&app).await,
        AppCommand::Proxy => unreachable!("Proxy command is handled before the app is built"),
    }
}

async fn run_proxy(config: &AppConfig) -> Result<()> {
    let upstream = config
        .proxy
        .resolve_upstream(std::env::var(UPSTREAM_ENV_VAR).ok())?;
    proxy::serve(&config.proxy, &upstream).await
}
