use super::PromptExpansionService;
use crate::Result;
use async_trait::async_trait;

/// Tries the primary expander and falls back to the secondary on any error.
///
/// Only the secondary's error reaches the caller; the primary's is logged.
pub struct FallbackExpandClient {
    primary: Box<dyn PromptExpansionService>,
    secondary: Box<dyn PromptExpansionService>,
}

impl FallbackExpandClient {
    pub fn new(
        primary: Box<dyn PromptExpansionService>,
        secondary: Box<dyn PromptExpansionService>,
    ) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl PromptExpansionService for FallbackExpandClient {
    async fn expand_prompt(&self, prompt: &str) -> Result<String> {
        match self.primary.expand_prompt(prompt).await {
            Ok(expanded) if !expanded.trim().is_empty() => Ok(expanded),
            Ok(_) => {
                tracing::warn!("Primary expander returned an empty prompt, falling back");
                self.secondary.expand_prompt(prompt).await
            }
            Err(e) => {
                tracing::warn!("Primary expander failed: {}. Falling back", e);
                self.secondary.expand_prompt(prompt).await
            }
        }
    }
}
