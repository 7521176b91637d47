//! Client for the retrieval-augmented chat service that drafts solutions
//! for errors the knowledge base does not cover.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::NewMessage;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("assistant request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("assistant response malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait SolutionAssistant: Send + Sync {
    /// Asks the assistant within the history of `conversation_id`.
    async fn query(&self, conversation_id: &str, query: &str) -> Result<String, AssistantError>;

    /// Seeds the assistant's history for `conversation_id` with stored messages.
    async fn preload_history(
        &self,
        conversation_id: &str,
        messages: &[NewMessage],
    ) -> Result<(), AssistantError>;
}

#[derive(Serialize)]
struct QueryInput<'a> {
    conversation_id: &'a str,
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    answer: String,
}

#[derive(Serialize)]
struct PreloadInput<'a> {
    conversation_id: &'a str,
    messages: &'a [NewMessage],
}

pub struct HttpAssistant {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssistant {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<Vec<u8>, AssistantError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SolutionAssistant for HttpAssistant {
    async fn query(&self, conversation_id: &str, query: &str) -> Result<String, AssistantError> {
        let body = self
            .post(
                "/query",
                &QueryInput {
                    conversation_id,
                    query,
                },
            )
            .await?;
        let parsed: QueryResponse = serde_json::from_slice(&body)?;
        Ok(parsed.answer)
    }

    async fn preload_history(
        &self,
        conversation_id: &str,
        messages: &[NewMessage],
    ) -> Result<(), AssistantError> {
        self.post(
            "/preload-history",
            &PreloadInput {
                conversation_id,
                messages,
            },
        )
        .await?;
        Ok(())
    }
}
