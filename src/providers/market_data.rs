use crate::core::currency::CurrencyRateProvider;
use crate::providers::util::{RetryPolicy, http_client, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Exchange rates from the market-data service behind the API proxy.
pub struct MarketDataProvider {
    base_url: String,
    retry: RetryPolicy,
}

impl MarketDataProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    rate: Option<f64>,
}

#[async_trait]
impl CurrencyRateProvider for MarketDataProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = format!(
            "{}/api/market-data/exchange-rate?from={from}&to={to}",
            self.base_url
        );
        debug!("Requesting {from}/{to} exchange rate from {url}");

        let client = http_client()?;
        let response = with_retry(|| client.get(&url).send(), self.retry)
            .await
            .with_context(|| format!("Failed to send exchange rate request for {from}{to}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}{}",
                response.status(),
                from,
                to
            ));
        }

        let text = response.text().await?;
        let data: ExchangeRateResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}{}: {}", from, to, e))?;

        match data.rate {
            Some(rate) if rate > 0.0 => Ok(rate),
            _ => Err(anyhow!("No rate data found for currency pair: {}{}", from, to)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> MarketDataProvider {
        MarketDataProvider::new(&server.uri()).with_retry_policy(RetryPolicy {
            retries: 0,
            delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/market-data/exchange-rate"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "JPY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rate": 151.25}"#))
            .mount(&mock_server)
            .await;

        let rate = provider(&mock_server).get_rate("USD", "JPY").await.unwrap();
        assert_eq!(rate, 151.25);
    }

    #[tokio::test]
    async fn test_missing_rate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/market-data/exchange-rate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rate": null}"#))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).get_rate("USD", "JPY").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency pair: USDJPY"
        );
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/market-data/exchange-rate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).get_rate("USD", "JPY").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for currency pair: USDJPY"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/market-data/exchange-rate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).get_rate("USD", "JPY").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USDJPY")
        );
    }
}
