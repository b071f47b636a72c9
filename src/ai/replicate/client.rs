use super::types::{CreatePredictionRequest, Prediction, PredictionStatus};
use crate::models::DEFAULT_REPLICATE_BASE_URL;
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tokio_stream::StreamExt;

/// Where a model reference is submitted, and the pinned version if any.
#[derive(Debug, PartialEq)]
pub(crate) struct PredictionTarget {
    pub path: String,
    pub version: Option<String>,
}

/// Resolve `owner/name:version` or `owner/name` into a prediction endpoint.
pub(crate) fn prediction_target(model: &str) -> Result<PredictionTarget> {
    let (name, version) = match model.split_once(':') {
        Some((name, version)) => (name, Some(version)),
        None => (model, None),
    };

    let (owner, model_name) = name
        .split_once('/')
        .filter(|(owner, model_name)| !owner.is_empty() && !model_name.is_empty())
        .ok_or_else(|| Error::Config(format!("Invalid Replicate model reference '{}'", model)))?;

    match version {
        Some(version) if !version.is_empty() => Ok(PredictionTarget {
            path: "/v1/predictions".to_string(),
            version: Some(version.to_string()),
        }),
        Some(_) => Err(Error::Config(format!(
            "Empty version in Replicate model reference '{}'",
            model
        ))),
        None => Ok(PredictionTarget {
            path: format!("/v1/models/{}/{}/predictions", owner, model_name),
            version: None,
        }),
    }
}

/// Upper bound on a downloaded prediction output.
const MAX_DOWNLOAD_BYTES: u64 = 32 * 1024 * 1024;

pub struct ReplicateHttpClient {
    client: Client,
    api_token: Option<String>,
    base_url: String,
    timeout: Duration,
    poll_interval: Duration,
    poll_deadline: Duration,
    max_download_bytes: u64,
}

impl ReplicateHttpClient {
    pub fn new_with_client(api_token: Option<String>, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_token,
            base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
            timeout,
            poll_interval: Duration::from_secs(1),
            poll_deadline: Duration::from_secs(300),
            max_download_bytes: MAX_DOWNLOAD_BYTES,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[cfg(test)]
    pub fn with_polling(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_deadline = deadline;
        self
    }

    #[cfg(test)]
    pub fn with_max_download_bytes(mut self, max_download_bytes: u64) -> Self {
        self.max_download_bytes = max_download_bytes;
        self
    }

    fn token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| Error::Service("Replicate API token is not configured".to_string()))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Replicate API error (status {}): {}", status, error_text);
            return Err(Error::Service(format!(
                "Replicate API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Replicate response: {}\nBody: {}", e, body);
            Error::Service(format!("Failed to parse Replicate response: {}", e))
        })
    }

    async fn create_prediction<I: Serialize>(&self, model: &str, input: &I) -> Result<Prediction> {
        let target = prediction_target(model)?;
        let url = format!("{}{}", self.base_url, target.path);
        let request = CreatePredictionRequest {
            version: target.version.as_deref(),
            input,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(self.token()?)
            .header("Prefer", "wait")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Replicate: {}", e);
                e
            })?;

        Self::read_json(response).await
    }

    async fn get_prediction(&self, url: &str) -> Result<Prediction> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .bearer_auth(self.token()?)
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Run a model to completion and return its raw output.
    ///
    /// Non-terminal predictions are polled through `urls.get`; a failed or
    /// canceled prediction is returned as an error straight away.
    pub async fn run<I: Serialize>(&self, model: &str, input: &I) -> Result<Value> {
        tracing::debug!("Creating Replicate prediction for {}", model);

        let mut prediction = self.create_prediction(model, input).await?;
        let deadline = Instant::now() + self.poll_deadline;

        while !prediction.status.is_terminal() {
            if Instant::now() >= deadline {
                return Err(Error::Service(format!(
                    "Replicate prediction {} did not finish within {}s",
                    prediction.id,
                    self.poll_deadline.as_secs()
                )));
            }

            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .ok_or_else(|| {
                    Error::Service(format!(
                        "Replicate prediction {} has no polling URL",
                        prediction.id
                    ))
                })?;

            tokio::time::sleep(self.poll_interval).await;
            tracing::debug!(
                "Polling Replicate prediction {} ({:?})",
                prediction.id,
                prediction.status
            );
            prediction = self.get_prediction(&poll_url).await?;
        }

        match prediction.status {
            PredictionStatus::Succeeded => prediction.output.ok_or_else(|| {
                Error::Service(format!(
                    "Replicate prediction {} succeeded without output",
                    prediction.id
                ))
            }),
            status => {
                let reason = match prediction.error {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => "no error detail".to_string(),
                };
                Err(Error::Service(format!(
                    "Replicate prediction {} {:?}: {}",
                    prediction.id, status, reason
                )))
            }
        }
    }

    /// Fetch a generated file; delivery URLs are pre-signed and need no token.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Service(format!(
                "Failed to download {} (status {})",
                url,
                response.status()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_download_bytes {
                return Err(self.oversized_download(url));
            }
        }

        let mut body = Vec::new();
        let mut chunks = Box::pin(response.bytes_stream());
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > self.max_download_bytes {
                return Err(self.oversized_download(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn oversized_download(&self, url: &str) -> Error {
        tracing::error!("Download from {} exceeds {} bytes", url, self.max_download_bytes);
        Error::Service(format!(
            "Download from {} exceeds the {} byte limit",
            url, self.max_download_bytes
        ))
    }
}
