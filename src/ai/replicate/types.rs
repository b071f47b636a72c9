//! Replicate prediction payloads shared by the provider modules.

use crate::models::ImageOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for creating a prediction.
///
/// `version` is only sent for pinned `owner/name:version` model references.
#[derive(Debug, Serialize)]
pub struct CreatePredictionRequest<'a, I: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    pub input: &'a I,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

/// Prediction object as returned by create and get.
#[derive(Debug, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    pub urls: Option<PredictionUrls>,
}

/// Input for the instruct model used as the expansion fallback.
#[derive(Debug, Serialize)]
pub struct LlamaInput {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Input for the Stable Diffusion model.
#[derive(Debug, Serialize)]
pub struct StableDiffusionInput<'a> {
    pub prompt: &'a str,
    pub num_outputs: u32,
    #[serde(flatten)]
    pub options: &'a ImageOptions,
}

/// Input for the LLaVA vision model; `image` is a data URL.
#[derive(Debug, Serialize)]
pub struct LlavaInput<'a> {
    pub image: String,
    pub prompt: &'a str,
}

/// Language models stream tokens, so text output arrives as an array of chunks.
pub fn output_text(output: &Value) -> Option<String> {
    match output {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
        _ => None,
    }
}

pub fn first_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_string),
        _ => None,
    }
}
