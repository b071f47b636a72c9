//! Data models and structures
//!
//! Defines the run/record structures produced by the feedback loop and the
//! configuration shared by the collaborator clients.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which collaborator a progress event or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExpandText,
    GenerateImage,
    DescribeImage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExpandText => "expand text",
            Stage::GenerateImage => "generate image",
            Stage::DescribeImage => "describe image",
        };
        f.write_str(name)
    }
}

/// A generated image, normalized to PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl GeneratedImage {
    pub fn to_data_url(&self) -> String {
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

/// The output of one expand → generate → describe pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub index: u32,
    pub input_prompt: String,
    pub expanded_prompt: String,
    pub image: GeneratedImage,
    pub description: String,
}

/// One execution of the feedback loop.
///
/// Only the driver appends records; callers read them through [`Run::records`],
/// including after a failed run, where the completed prefix is kept.
#[derive(Debug, Clone)]
pub struct Run {
    id: Uuid,
    seed_prompt: String,
    iterations: u32,
    started_at: DateTime<Utc>,
    records: Vec<IterationRecord>,
}

impl Run {
    pub fn new(seed_prompt: &str, iterations: u32) -> Result<Self> {
        if seed_prompt.trim().is_empty() {
            return Err(Error::InvalidInput(
                "seed prompt must not be empty".to_string(),
            ));
        }
        if iterations == 0 {
            return Err(Error::InvalidInput(
                "iteration count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            seed_prompt: seed_prompt.to_string(),
            iterations,
            started_at: Utc::now(),
            records: Vec::with_capacity(iterations as usize),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed_prompt(&self) -> &str {
        &self.seed_prompt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Prompt for the next iteration: the seed, then each record's description.
    pub fn current_prompt(&self) -> &str {
        self.records
            .last()
            .map(|record| record.description.as_str())
            .unwrap_or(&self.seed_prompt)
    }

    pub fn next_index(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.next_index() >= self.iterations
    }

    pub(crate) fn push(&mut self, record: IterationRecord) -> Result<()> {
        if record.index != self.next_index() {
            return Err(Error::Invariant(format!(
                "record index {} appended at position {}",
                record.index,
                self.next_index()
            )));
        }
        self.records.push(record);
        Ok(())
    }
}

/// Progress notification emitted while a run is driven.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    StageStarted { iteration: u32, stage: Stage },
    RecordCompleted(IterationRecord),
}

/// Stable Diffusion knobs sent with every image request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOptions {
    pub width: u32,
    pub height: u32,
    pub scheduler: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub negative_prompt: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: 768,
            height: 768,
            scheduler: "K_EULER_ANCESTRAL".to_string(),
            num_inference_steps: 50,
            guidance_scale: 7.5,
            seed: Some(42),
            negative_prompt: "ugly, blurry, poor quality, deformed, disfigured".to_string(),
        }
    }
}

pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gnokit/improve-prompt";
pub const DEFAULT_EXPAND_MODEL: &str =
    "meta/llama-3-8b-instruct:2d19859030ff705a87c746f7e96eea03aefb71f166725aee39692f1476566d48";
pub const DEFAULT_IMAGE_MODEL: &str =
    "stability-ai/stable-diffusion:ac732df83cea7fff18b8472768c88ad041fa750ff7682a21affe81863cbe77e4";
pub const DEFAULT_DESCRIBE_MODEL: &str =
    "yorickvp/llava-13b:2facb4a474a0462c15041b78b1ad70952ea46b5ec6ad29583c0b29dbd4249591";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub replicate_api_token: Option<String>,
    pub replicate_base_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_enabled: bool,
    pub expand_model: String,
    pub image_model: String,
    pub describe_model: String,
    pub expand_temperature: Option<f32>,
    pub image_options: ImageOptions,
    pub max_iterations: u32,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = ImageOptions::default();

        let seed = match var("IMAGE_SEED") {
            Some(value) if value.eq_ignore_ascii_case("random") => None,
            Some(value) => Some(parse_value("IMAGE_SEED", &value)?),
            None => defaults.seed,
        };

        let max_iterations = parse_or(&var, "MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(Error::Config("MAX_ITERATIONS must be at least 1".to_string()));
        }

        Ok(Self {
            replicate_api_token: var("REPLICATE_API_TOKEN"),
            replicate_base_url: var("REPLICATE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_REPLICATE_BASE_URL.to_string()),
            ollama_url: var("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            ollama_enabled: parse_or(&var, "OLLAMA_ENABLED", true)?,
            expand_model: var("REPLICATE_EXPAND_MODEL")
                .unwrap_or_else(|| DEFAULT_EXPAND_MODEL.to_string()),
            image_model: var("REPLICATE_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            describe_model: var("REPLICATE_DESCRIBE_MODEL")
                .unwrap_or_else(|| DEFAULT_DESCRIBE_MODEL.to_string()),
            expand_temperature: var("EXPAND_TEMPERATURE")
                .map(|value| parse_value("EXPAND_TEMPERATURE", &value))
                .transpose()?,
            image_options: ImageOptions {
                width: parse_or(&var, "IMAGE_WIDTH", defaults.width)?,
                height: parse_or(&var, "IMAGE_HEIGHT", defaults.height)?,
                num_inference_steps: parse_or(&var, "IMAGE_STEPS", defaults.num_inference_steps)?,
                guidance_scale: parse_or(&var, "IMAGE_GUIDANCE_SCALE", defaults.guidance_scale)?,
                seed,
                ..defaults
            },
            max_iterations,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, value)))
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(index: u32, input: &str, description: &str) -> IterationRecord {
        IterationRecord {
            index,
            input_prompt: input.to_string(),
            expanded_prompt: format!("expanded {}", input),
            image: GeneratedImage {
                bytes: vec![1, 2, 3],
                mime_type: "image/png".to_string(),
                width: 1,
                height: 1,
            },
            description: description.to_string(),
        }
    }

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_run_rejects_empty_seed() {
        let err = Run::new("   ", 2).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_run_keeps_seed_verbatim() {
        let run = Run::new("  a lonely lighthouse\n", 1).unwrap();
        assert_eq!(run.seed_prompt(), "  a lonely lighthouse\n");
        assert_eq!(run.current_prompt(), "  a lonely lighthouse\n");
    }

    #[test]
    fn test_run_rejects_zero_iterations() {
        let err = Run::new("a lonely lighthouse", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_current_prompt_follows_last_description() {
        let mut run = Run::new("a lonely lighthouse", 3).unwrap();
        assert_eq!(run.current_prompt(), "a lonely lighthouse");

        run.push(record(0, "a lonely lighthouse", "cliffs at dusk"))
            .unwrap();
        assert_eq!(run.current_prompt(), "cliffs at dusk");
        assert_eq!(run.next_index(), 1);
        assert!(!run.is_complete());
    }

    #[test]
    fn test_push_rejects_out_of_order_record() {
        let mut run = Run::new("seed", 2).unwrap();
        let err = run.push(record(1, "seed", "desc")).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        assert!(run.records().is_empty());
    }

    #[test]
    fn test_data_url_uses_mime_type() {
        let image = record(0, "a", "b").image;
        assert_eq!(image.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::GenerateImage).unwrap();
        assert_eq!(json, "\"generate_image\"");
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.replicate_api_token, None);
        assert_eq!(config.replicate_base_url, DEFAULT_REPLICATE_BASE_URL);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert!(config.ollama_enabled);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.image_options, ImageOptions::default());
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("REPLICATE_API_TOKEN", "r8_token"),
            ("OLLAMA_ENABLED", "false"),
            ("IMAGE_SEED", "random"),
            ("IMAGE_STEPS", "20"),
            ("EXPAND_TEMPERATURE", "0.4"),
        ])
        .unwrap();
        assert_eq!(config.replicate_api_token.as_deref(), Some("r8_token"));
        assert!(!config.ollama_enabled);
        assert_eq!(config.image_options.seed, None);
        assert_eq!(config.image_options.num_inference_steps, 20);
        assert_eq!(config.expand_temperature, Some(0.4));
    }

    #[test]
    fn test_config_rejects_unparsable_values() {
        let err = config_from(&[("IMAGE_WIDTH", "wide")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = config_from(&[("MAX_ITERATIONS", "0")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
