use crate::core::currency::Currency;
use crate::core::portfolio::{AllocationTarget, Asset};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable that overrides the proxy's upstream base URL.
pub const UPSTREAM_ENV_VAR: &str = "FOLIOSYNC_API_BASE_URL";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Where the `/api/*` endpoints are reached, normally the dev proxy.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://127.0.0.1:3001".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RewriteRule {
    pub prefix: String,
    pub target: String,
}

impl RewriteRule {
    pub fn new(prefix: &str, target: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            target: target.to_string(),
        }
    }
}

fn default_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule::new("/api/market-data", "/dev/api/market-data"),
        RewriteRule::new("/api/auth", "/dev/api/auth"),
        RewriteRule::new("/api/drive", "/dev/api/drive"),
    ]
}

fn default_listen() -> String {
    "127.0.0.1:3001".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default = "default_rules")]
    pub rules: Vec<RewriteRule>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            listen: default_listen(),
            upstream: None,
            rules: default_rules(),
        }
    }
}

impl ProxyConfig {
    /// Picks the upstream base URL; the environment value wins over the file.
    pub fn resolve_upstream(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.upstream.clone())
            .map(|url| url.trim_end_matches('/').to_string())
            .with_context(|| {
                format!("No upstream configured: set proxy.upstream or {UPSTREAM_ENV_VAR}")
            })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: Currency,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub targets: Vec<AllocationTarget>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "foliosync", "foliosync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: JPY
assets:
  - id: "vti"
    name: "Vanguard Total Stock Market"
    quantity: 10
    unitPrice: 250.5
    currency: USD
    assetClass: "equity"
  - id: "cash"
    name: "Cash"
    quantity: 1
    unitPrice: 500000
    currency: JPY
targets:
  - id: "equity"
    targetWeight: 0.7
  - id: "cash"
    targetWeight: 0.3
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, Currency::Jpy);
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.assets[0].unit_price, 250.5);
        assert_eq!(config.assets[0].currency, Currency::Usd);
        assert_eq!(config.assets[0].asset_class.as_deref(), Some("equity"));
        assert_eq!(config.targets[1].target_weight, 0.3);
        assert_eq!(config.api.base_url, "http://127.0.0.1:3001");
        assert_eq!(config.proxy.rules.len(), 3);
        assert!(config.proxy.upstream.is_none());
    }

    #[test]
    fn test_proxy_section() {
        let yaml_str = r#"
base_currency: USD
api:
  base_url: "http://localhost:8080"
proxy:
  listen: "0.0.0.0:9000"
  upstream: "https://api.example.com/"
  rules:
    - prefix: "/api/drive"
      target: "/v2/drive"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.assets.is_empty());
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.proxy.listen, "0.0.0.0:9000");
        assert_eq!(config.proxy.rules, vec![RewriteRule::new("/api/drive", "/v2/drive")]);
        assert_eq!(
            config.proxy.resolve_upstream(None).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_env_overrides_upstream() {
        let proxy = ProxyConfig {
            upstream: Some("https://file.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            proxy
                .resolve_upstream(Some("https://env.example.com".to_string()))
                .unwrap(),
            "https://env.example.com"
        );
        assert_eq!(
            proxy.resolve_upstream(Some("  ".to_string())).unwrap(),
            "https://file.example.com"
        );
        assert!(ProxyConfig::default().resolve_upstream(None).is_err());
    }
}
