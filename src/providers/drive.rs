use crate::core::auth::UserSession;
use crate::core::cloud::CloudStorage;
use crate::core::error::SyncError;
use crate::core::portfolio::PortfolioDocument;
use crate::providers::util::http_client;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Portfolio storage in the user's cloud drive, reached through the API proxy.
///
/// Failures are reported as they happen; retrying is left to the caller.
pub struct DriveClient {
    base_url: String,
}

impl DriveClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn portfolio_url(&self) -> String {
        format!("{}/api/drive/portfolio", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn error_from_response(response: Response) -> SyncError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ if text.is_empty() => status.to_string(),
        _ => text,
    };
    SyncError::proxy(Some(status.as_u16()), message)
}

fn transport_error(err: reqwest::Error) -> SyncError {
    SyncError::proxy(None, err.to_string())
}

#[async_trait]
impl CloudStorage for DriveClient {
    async fn save(
        &self,
        session: &UserSession,
        document: &PortfolioDocument,
    ) -> Result<(), SyncError> {
        let url = self.portfolio_url();
        debug!("Saving portfolio for {} to {}", session.user_id, url);

        let client = http_client().map_err(transport_error)?;
        let response = client
            .post(&url)
            .bearer_auth(&session.access_token)
            .json(document)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn load(&self, session: &UserSession) -> Result<Option<PortfolioDocument>, SyncError> {
        let url = self.portfolio_url();
        debug!("Loading portfolio for {} from {}", session.user_id, url);

        let client = http_client().map_err(transport_error)?;
        let response = client
            .get(&url)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await.map_err(transport_error)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::portfolio::{AllocationTarget, Asset};
    use chrono::Utc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> UserSession {
        UserSession::new("u1", "u1@example.com", "secret-token")
    }

    fn document() -> PortfolioDocument {
        PortfolioDocument {
            version: PortfolioDocument::VERSION,
            assets: vec![Asset::new("vti", "VTI", 3.0, 250.0, Currency::Usd)],
            targets: vec![AllocationTarget::new("vti", 1.0)],
            base_currency: Currency::Jpy,
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_sends_bearer_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/drive/portfolio"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DriveClient::new(&mock_server.uri());
        client.save(&session(), &document()).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_document() {
        let mock_server = MockServer::start().await;
        let body = serde_json::to_string(&document()).unwrap();
        Mock::given(method("GET"))
            .and(path("/api/drive/portfolio"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let client = DriveClient::new(&mock_server.uri());
        let loaded = client.load(&session()).await.unwrap().unwrap();
        assert_eq!(loaded.assets[0].id, "vti");
        assert_eq!(loaded.base_currency, Currency::Jpy);
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/drive/portfolio"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = DriveClient::new(&mock_server.uri());
        assert!(client.load(&session()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_proxy_error_body_is_surfaced() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/drive/portfolio"))
            .respond_with(ResponseTemplate::new(500).set_body_string(
                r#"{"error": "Proxy error", "message": "connect ECONNREFUSED"}"#,
            ))
            .mount(&mock_server)
            .await;

        let client = DriveClient::new(&mock_server.uri());
        let err = client.save(&session(), &document()).await.unwrap_err();
        match err {
            SyncError::ProxyCommunication { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "connect ECONNREFUSED");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_proxy() {
        let client = DriveClient::new("http://127.0.0.1:9");
        let err = client.load(&session()).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::ProxyCommunication { status: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_document() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/drive/portfolio"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"assets": 1}"#))
            .mount(&mock_server)
            .await;

        let client = DriveClient::new(&mock_server.uri());
        assert!(matches!(
            client.load(&session()).await,
            Err(SyncError::InvalidDocument(_))
        ));
    }
}
