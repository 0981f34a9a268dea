//! Notion Adapter
//!
//! Implements the `PageSource` port against the Notion REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::NotionConfig;
use crate::domain::{PageSource, RawPage, RawRecord};
use crate::error::{Error, Result};

// =============================================================================
// Notion Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<RawRecord>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// Notion Client
// =============================================================================

/// HTTP client for Notion databases and pages
pub struct NotionClient {
    config: NotionConfig,
    client: Client,
}

impl NotionClient {
    /// Create a new Notion client
    pub fn new(config: NotionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Notion API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", &self.config.notion_version)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(Error::SourceConnection)
    }

    /// Turn a non-success response into a source error, using Notion's
    /// error message when the body carries one.
    async fn status_error(response: Response) -> Error {
        let status = response.status().as_u16();
        let message = match response.json::<NotionErrorBody>().await {
            Ok(body) => match (body.code, body.message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message,
                (Some(code), None) => code,
                (None, None) => "no details".to_string(),
            },
            Err(_) => "no details".to_string(),
        };
        Error::SourceStatus { status, message }
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.config.base_url)
            .field("notion_version", &self.config.notion_version)
            .field("request_timeout", &self.config.request_timeout)
            .finish()
    }
}

#[async_trait]
impl PageSource for NotionClient {
    #[instrument(skip(self))]
    async fn query(
        &self,
        collection_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<RawPage> {
        let url = self.url(&format!(
            "databases/{}/query",
            urlencoding::encode(collection_id)
        ));
        let body = QueryRequest {
            page_size,
            start_cursor: cursor,
        };

        debug!("Querying Notion database");

        let response = self.send(self.client.post(&url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let page: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::SourceResponseParse(e.to_string()))?;

        debug!(
            records = page.results.len(),
            has_more = page.has_more,
            "Notion page received"
        );

        Ok(RawPage {
            records: page.results,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve(&self, id: &str) -> Result<RawRecord> {
        let url = self.url(&format!("pages/{}", urlencoding::encode(id)));

        let response = self.send(self.client.get(&url)).await?;
        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| Error::SourceResponseParse(e.to_string())),
            StatusCode::NOT_FOUND => Err(Error::not_found("page", id)),
            _ => Err(Self::status_error(response).await),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self.send(self.client.get(self.url("users/me"))).await?;
        if response.status().is_success() {
            Ok(true)
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    fn test_config(base_url: &str) -> NotionConfig {
        NotionConfig {
            base_url: base_url.to_string(),
            api_key: "secret_test".to_string(),
            request_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = NotionClient::new(test_config("https://api.notion.com")).unwrap();
        let debug = format!("{:?}", client);

        assert!(debug.contains("NotionClient"));
        assert!(!debug.contains("secret_test"));
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = NotionConfig::default();
        assert!(matches!(NotionClient::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_url_building() {
        let client = NotionClient::new(test_config("https://api.notion.com/")).unwrap();
        assert_eq!(
            client.url("databases/abc/query"),
            "https://api.notion.com/v1/databases/abc/query"
        );
    }

    #[test]
    fn test_query_request_serialization() {
        let body = QueryRequest {
            page_size: 10,
            start_cursor: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"page_size":10}"#);

        let body = QueryRequest {
            page_size: 10,
            start_cursor: Some("abc"),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"page_size":10,"start_cursor":"abc"}"#
        );
    }

    #[test]
    fn test_query_response_deserialize() {
        let json = r#"{
            "object": "list",
            "results": [{"object": "page", "id": "p1"}, {"object": "page", "id": "p2"}],
            "next_cursor": "p3",
            "has_more": true,
            "type": "page_or_database"
        }"#;

        let response: QueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);
        assert!(response.has_more);
        assert_eq!(response.next_cursor.as_deref(), Some("p3"));
    }

    #[test]
    fn test_query_response_last_page() {
        let json = r#"{"object": "list", "results": [], "next_cursor": null, "has_more": false}"#;

        let response: QueryResponse = serde_json::from_str(json).unwrap();
        assert!(response.results.is_empty());
        assert!(!response.has_more);
        assert!(response.next_cursor.is_none());
    }

    #[test]
    fn test_error_body_deserialize() {
        let json = r#"{"object": "error", "status": 429, "code": "rate_limited", "message": "Slow down"}"#;
        let body: NotionErrorBody = serde_json::from_str(json).unwrap();

        assert_eq!(body.code.as_deref(), Some("rate_limited"));
        assert_eq!(body.message.as_deref(), Some("Slow down"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_source_unavailable() {
        let client = NotionClient::new(test_config("http://localhost:19999")).unwrap();

        let err = client.query("db", 10, None).await.unwrap_err();
        assert!(matches!(err, Error::SourceConnection(_)));
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);

        assert!(client.health_check().await.is_err());
    }
}
