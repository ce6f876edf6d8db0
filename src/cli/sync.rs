use super::ui;
use crate::app::App;
use crate::core::error::SyncError;
use anyhow::{Context, Result};

/// Saves the local portfolio to the drive.
pub async fn push(app: &App) -> Result<()> {
    let sync = app.scope().cloud_sync()?;

    let pb = ui::new_spinner("Saving portfolio to drive...");
    let result = sync.save_to_drive().await;
    pb.finish_and_clear();

    let saved_at = result.map_err(explain).context("Push failed")?;
    println!(
        "Saved {} assets to drive at {}",
        app.scope().assets()?.current_assets().len(),
        ui::style_text(
            &saved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

/// Replaces the local portfolio with the drive copy, if there is one.
pub async fn pull(app: &App) -> Result<()> {
    let sync = app.scope().cloud_sync()?;

    let pb = ui::new_spinner("Loading portfolio from drive...");
    let result = sync.load_from_drive().await;
    pb.finish_and_clear();

    if result.map_err(explain).context("Pull failed")? {
        println!(
            "Loaded {} assets from drive",
            app.scope().assets()?.current_assets().len()
        );
    } else {
        println!(
            "{}",
            ui::style_text("No portfolio stored on drive yet", ui::StyleType::Subtle)
        );
    }
    Ok(())
}

fn explain(e: SyncError) -> anyhow::Error {
    if matches!(e, SyncError::NotSignedIn) {
        return anyhow::anyhow!("{e}: set {} to sign in", crate::app::ACCESS_TOKEN_ENV_VAR);
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_not_signed_in_names_env_var() {
        let message = format!("{}", explain(SyncError::NotSignedIn));
        assert!(message.contains(crate::app::ACCESS_TOKEN_ENV_VAR));
    }

    #[test]
    fn test_explain_keeps_proxy_errors() {
        let message = explain(SyncError::proxy(Some(502), "bad gateway")).to_string();
        assert!(message.contains("502"));
        assert!(message.contains("bad gateway"));
    }
}
