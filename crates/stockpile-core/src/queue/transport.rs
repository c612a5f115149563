//! Delivery transport for queued edits

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use super::{EditMethod, QueuedEdit};
use crate::envelope::ErrorEnvelope;

/// A delivery failure for one queued edit
///
/// Timeouts are surfaced distinctly from other network failures so the
/// caller can say "request timed out" instead of a generic failure. A
/// `Rejected` delivery means the server answered and said no — including
/// the normal CONFLICT path for an edit whose payload version went stale
/// while it sat in the queue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("server rejected edit: {code}: {message}")]
    Rejected { code: String, message: String },
    #[error("request timed out")]
    TimedOut,
    #[error("network error: {0}")]
    Network(String),
}

/// Sends one queued edit to its destination
pub trait EditTransport: Send + Sync {
    fn deliver(
        &self,
        edit: &QueuedEdit,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// HTTP transport delivering edits to the Stockpile API
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// Build a transport with a bounded per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| DeliveryError::Network(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

impl EditTransport for HttpTransport {
    async fn deliver(&self, edit: &QueuedEdit) -> Result<(), DeliveryError> {
        let url = format!("{}{}", self.base_url, edit.target);
        let request = match edit.method {
            EditMethod::Post => self.client.post(&url).json(&edit.payload),
            EditMethod::Put => self.client.put(&url).json(&edit.payload),
            EditMethod::Delete => self.client.delete(&url).json(&edit.payload),
        };

        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    DeliveryError::TimedOut
                } else {
                    DeliveryError::Network(error.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(parse_rejection(status.as_u16(), &body))
    }
}

fn parse_rejection(status: u16, body: &str) -> DeliveryError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return DeliveryError::Rejected {
            code: envelope.error.code,
            message: envelope.error.message,
        };
    }
    DeliveryError::Rejected {
        code: format!("HTTP_{status}"),
        message: body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ErrorEnvelope;
    use crate::models::ProductId;

    #[test]
    fn test_parse_rejection_reads_envelope() {
        let envelope = ErrorEnvelope::conflict(ProductId::new(), 1, 3);
        let body = serde_json::to_string(&envelope).unwrap();

        let error = parse_rejection(409, &body);
        assert_eq!(
            error,
            DeliveryError::Rejected {
                code: "CONFLICT".to_string(),
                message: envelope.error.message,
            }
        );
    }

    #[test]
    fn test_parse_rejection_falls_back_to_status() {
        let error = parse_rejection(502, "bad gateway");
        assert_eq!(
            error,
            DeliveryError::Rejected {
                code: "HTTP_502".to_string(),
                message: "bad gateway".to_string(),
            }
        );
    }
}
