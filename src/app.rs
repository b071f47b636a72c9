//! Wiring of configured collaborator clients into [`LoopServices`].

use crate::ai::{
    FallbackExpandClient, OllamaExpandClient, PromptExpansionService, ReplicateDescribeClient,
    ReplicateExpandClient, ReplicateImageClient,
};
use crate::driver::LoopServices;
use crate::image::ImageProcessor;
use crate::models::Config;
use crate::Result;
use tracing::info;

/// Builds the collaborators for one run.
///
/// `api_token` is a per-run credential supplied through the UI; when `None`
/// the configured token is used.
pub trait ServicesProvider: Send + Sync {
    fn services(&self, api_token: Option<String>) -> Result<LoopServices>;
}

impl<F> ServicesProvider for F
where
    F: Fn(Option<String>) -> Result<LoopServices> + Send + Sync,
{
    fn services(&self, api_token: Option<String>) -> Result<LoopServices> {
        self(api_token)
    }
}

/// Collaborators built from [`Config`], sharing one HTTP connection pool.
pub struct ConfiguredServices {
    config: Config,
    http_client: reqwest::Client,
}

impl ConfiguredServices {
    pub fn new(config: Config) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: Config, http_client: reqwest::Client) -> Self {
        info!(
            "Expansion: {}Replicate {}",
            if config.ollama_enabled {
                format!("Ollama {} at {}, falling back to ", config.ollama_model, config.ollama_url)
            } else {
                String::new()
            },
            config.expand_model
        );
        info!("Image model: Replicate {}", config.image_model);
        info!("Description model: Replicate {}", config.describe_model);
        if config.replicate_api_token.is_none() {
            info!("REPLICATE_API_TOKEN not set; runs need a token from the UI");
        }

        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_expander(&self, token: Option<String>) -> Box<dyn PromptExpansionService> {
        let replicate = Box::new(
            ReplicateExpandClient::new_with_client(
                token,
                self.config.expand_model.clone(),
                self.http_client.clone(),
            )
            .with_temperature(self.config.expand_temperature)
            .with_base_url(self.config.replicate_base_url.clone()),
        );

        if !self.config.ollama_enabled {
            return replicate;
        }

        let ollama = Box::new(OllamaExpandClient::new_with_client(
            self.config.ollama_url.clone(),
            self.config.ollama_model.clone(),
            self.http_client.clone(),
        ));
        Box::new(FallbackExpandClient::new(ollama, replicate))
    }

    fn resolve_token(&self, api_token: Option<String>) -> Option<String> {
        api_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .or_else(|| self.config.replicate_api_token.clone())
    }
}

impl ServicesProvider for ConfiguredServices {
    fn services(&self, api_token: Option<String>) -> Result<LoopServices> {
        let token = self.resolve_token(api_token);

        Ok(LoopServices {
            expand: self.build_expander(token.clone()),
            image_gen: Box::new(ReplicateImageClient::new_with_client(
                token.clone(),
                self.config.image_model.clone(),
                self.config.image_options.clone(),
                self.http_client.clone(),
            )
            .with_base_url(self.config.replicate_base_url.clone())),
            describe: Box::new(ReplicateDescribeClient::new_with_client(
                token,
                self.config.describe_model.clone(),
                self.http_client.clone(),
            )
            .with_base_url(self.config.replicate_base_url.clone())),
            image: Box::new(ImageProcessor::new()),
        })
    }
}
