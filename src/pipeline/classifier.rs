use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One per-sentence result from the classifier. Both fields are optional on the wire,
/// and a value of the wrong type reads as absent rather than failing the batch.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ClassifierVerdict {
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub sentiment: Option<f64>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub explanation: Option<String>,
}

fn numeric_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_f64()))
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    log_sentences: &'a [String],
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<ClassifierVerdict>,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier response malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClassifierError {
    /// Only a non-success status is worth resubmitting the batch for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifierError::Status { .. })
    }
}

/// Submit-batch capability of the external sentiment service.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Verdicts are positionally aligned with `sentences`.
    async fn classify(&self, sentences: &[String]) -> Result<Vec<ClassifierVerdict>, ClassifierError>;
}

pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    async fn classify(&self, sentences: &[String]) -> Result<Vec<ClassifierVerdict>, ClassifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(&BatchRequest {
                log_sentences: sentences,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: BatchResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.results)
    }
}
