//! HTTP delivery -- one POST per queued record.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::payload::WirePayload;
use super::sink::RecordSink;
use crate::error::{DeliveryError, Rejection};

/// Response token for an accepted record.
pub const TOKEN_ACCEPTED: &str = "success";
/// Response token for a storage-side failure on the remote end.
pub const TOKEN_STORAGE_ERROR: &str = "storage_error";
/// Response token for a payload the remote end could not parse.
pub const TOKEN_INVALID_PAYLOAD: &str = "invalid_payload";

pub struct HttpSink {
    client: Client,
    endpoint: Url,
}

impl HttpSink {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Map a 2xx response body onto a delivery result.
pub fn classify_response(body: &str) -> Result<(), DeliveryError> {
    match body.trim() {
        TOKEN_ACCEPTED => Ok(()),
        TOKEN_STORAGE_ERROR => Err(DeliveryError::Rejected(Rejection::StorageFailure)),
        TOKEN_INVALID_PAYLOAD => Err(DeliveryError::Rejected(Rejection::MalformedPayload)),
        other => Err(DeliveryError::Rejected(Rejection::Unrecognized(other.to_string()))),
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn deliver(&self, payload: &WirePayload) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Connectivity(format!("HTTP {status}")));
        }
        let body = resp.text().await?;
        classify_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn payload() -> WirePayload {
        WirePayload {
            project: "Diet".into(),
            group: None,
            account: "tracklab-test".into(),
            record_id: Uuid::new_v4(),
            values: BTreeMap::new(),
        }
    }

    async fn sink_for(server: &mockito::ServerGuard) -> HttpSink {
        let url = Url::parse(&format!("{}/records", server.url())).unwrap();
        HttpSink::new(url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn tokens_are_classified() {
        assert!(classify_response("success\n").is_ok());
        assert_eq!(
            classify_response("storage_error"),
            Err(DeliveryError::Rejected(Rejection::StorageFailure))
        );
        assert_eq!(
            classify_response("invalid_payload"),
            Err(DeliveryError::Rejected(Rejection::MalformedPayload))
        );
        assert!(matches!(
            classify_response("maybe"),
            Err(DeliveryError::Rejected(Rejection::Unrecognized(_)))
        ));
    }

    #[tokio::test]
    async fn accepted_record_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/records")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "project": "Diet",
                "account": "tracklab-test"
            })))
            .with_status(200)
            .with_body("success")
            .create_async()
            .await;

        let sink = sink_for(&server).await;
        sink.deliver(&payload()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_is_not_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/records")
            .with_status(200)
            .with_body("storage_error")
            .create_async()
            .await;

        let err = sink_for(&server).await.deliver(&payload()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_is_connectivity() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/records")
            .with_status(503)
            .create_async()
            .await;

        let err = sink_for(&server).await.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Connectivity(_)));
        assert!(err.is_retryable());
    }
}
