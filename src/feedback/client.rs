use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use super::{
    error::FeedbackError,
    service::{FeedbackRequest, FeedbackResponse, FeedbackService},
};
use crate::journal::{AiFeedbackSet, EntryType};

/// How the timeline reaches the feedback service.
#[async_trait]
pub trait FeedbackClient: Send + Sync {
    async fn request_feedback(
        &self,
        content: &str,
        entry_type: EntryType,
    ) -> Result<AiFeedbackSet, FeedbackError>;
}

/// In-process: the service lives in the same binary.
#[async_trait]
impl FeedbackClient for FeedbackService {
    async fn request_feedback(
        &self,
        content: &str,
        entry_type: EntryType,
    ) -> Result<AiFeedbackSet, FeedbackError> {
        self.generate(content, entry_type).await
    }
}

/// Calls a remote feedback endpoint over HTTP.
#[derive(Clone)]
pub struct HttpFeedbackClient {
    http: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpFeedbackClient {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build feedback HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FeedbackClient for HttpFeedbackClient {
    async fn request_feedback(
        &self,
        content: &str,
        entry_type: EntryType,
    ) -> Result<AiFeedbackSet, FeedbackError> {
        let payload = FeedbackRequest {
            content: content.to_string(),
            entry_type: entry_type.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(?err, endpoint = %self.endpoint, "feedback request did not complete");
                FeedbackError::transport(err.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| FeedbackError::transport(format!("failed to read response body: {err}")))?;

        if status.is_client_error() || status.is_server_error() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("feedback service answered {status}"));
            return Err(match status {
                StatusCode::BAD_REQUEST => FeedbackError::validation(message),
                StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                    FeedbackError::transport(message)
                }
                _ => FeedbackError::aggregation(message),
            });
        }

        let parsed: FeedbackResponse = serde_json::from_str(&body).map_err(|err| {
            FeedbackError::transport(format!("malformed feedback response: {err}"))
        })?;

        let feedback = parsed.into_feedback_set();
        if feedback.is_empty() {
            return Err(FeedbackError::aggregation(
                "feedback service returned no persona comments",
            ));
        }
        Ok(feedback)
    }
}
