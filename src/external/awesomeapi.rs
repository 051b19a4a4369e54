use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::deadline::Deadline;
use crate::external::quote_provider::{QuoteProvider, QuoteProviderError};
use crate::models::{Quotation, QuoteEnvelope};

pub struct AwesomeApiProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl AwesomeApiProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, QuoteProviderError> {
        let client = build_client(config.upstream_http_timeout)?;
        Ok(Self::new(client, config.quote_api_url.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, request: reqwest::Request) -> Result<Quotation, QuoteProviderError> {
        let resp = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                QuoteProviderError::TransportTimeout(e.to_string())
            } else {
                QuoteProviderError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteProviderError::UpstreamStatus(status.to_string()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| QuoteProviderError::Network(e.to_string()))?;

        let envelope: QuoteEnvelope = serde_json::from_slice(&body)
            .map_err(|e| QuoteProviderError::Decode(e.to_string()))?;

        Ok(envelope.into_quotation())
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, QuoteProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| QuoteProviderError::RequestCreation(e.to_string()))
}

#[async_trait]
impl QuoteProvider for AwesomeApiProvider {
    async fn fetch_latest(&self, deadline: &Deadline) -> Result<Quotation, QuoteProviderError> {
        let request = self
            .client
            .get(&self.endpoint)
            .build()
            .map_err(|e| QuoteProviderError::RequestCreation(e.to_string()))?;

        debug!(
            endpoint = %self.endpoint,
            remaining_ms = deadline.remaining().as_millis() as u64,
            "Fetching quotation from upstream"
        );

        match deadline.run(self.execute(request)).await {
            Ok(result) => result,
            Err(expiry) => {
                warn!(endpoint = %self.endpoint, %expiry, "Upstream fetch abandoned");
                Err(expiry.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/json/last/USD-BRL", addr)
    }

    fn provider(endpoint: String) -> AwesomeApiProvider {
        AwesomeApiProvider::new(build_client(Duration::from_secs(5)).unwrap(), endpoint)
    }

    #[tokio::test]
    async fn test_fetch_decodes_quotation() {
        let url = serve(Router::new().route(
            "/json/last/USD-BRL",
            get(|| async { r#"{"USDBRL":{"code":"USD","codein":"BRL","bid":"5.42"}}"# }),
        ))
        .await;

        let deadline = Deadline::root("api", Duration::from_secs(2));
        let q = provider(url).fetch_latest(&deadline).await.unwrap();
        assert_eq!(q.bid, "5.42");
        assert_eq!(q.counter_code, "BRL");
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_status_error() {
        let url = serve(Router::new().route(
            "/json/last/USD-BRL",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;

        let deadline = Deadline::root("api", Duration::from_secs(2));
        let err = provider(url).fetch_latest(&deadline).await.unwrap_err();
        match err {
            QuoteProviderError::UpstreamStatus(status) => assert!(status.contains("503")),
            other => panic!("expected UpstreamStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let url = serve(Router::new().route(
            "/json/last/USD-BRL",
            get(|| async { r#"{"quotes": []}"# }),
        ))
        .await;

        let deadline = Deadline::root("api", Duration::from_secs(2));
        let err = provider(url).fetch_latest(&deadline).await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_slow_upstream_hits_deadline() {
        let url = serve(Router::new().route(
            "/json/last/USD-BRL",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                r#"{"USDBRL":{"bid":"5.42"}}"#
            }),
        ))
        .await;

        let deadline = Deadline::root("api", Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = provider(url).fetch_latest(&deadline).await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::DeadlineExceeded), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_client_timeout_is_transport_timeout() {
        let url = serve(Router::new().route(
            "/json/last/USD-BRL",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                r#"{"USDBRL":{"bid":"5.42"}}"#
            }),
        ))
        .await;

        // Transport ceiling well inside the deadline.
        let provider = AwesomeApiProvider::new(build_client(Duration::from_millis(50)).unwrap(), url);
        let deadline = Deadline::root("api", Duration::from_secs(2));
        let err = provider.fetch_latest(&deadline).await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::TransportTimeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_request_creation_error() {
        let deadline = Deadline::root("api", Duration::from_secs(1));
        let err = provider("not a url".into()).fetch_latest(&deadline).await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::RequestCreation(_)), "got {:?}", err);
    }
}
