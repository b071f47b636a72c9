//! The feedback loop: expand → generate image → describe, repeated, with each
//! description becoming the next iteration's prompt.

use crate::ai::{ImageDescriptionService, ImageGenerationService, PromptExpansionService};
use crate::image::ImageService;
use crate::models::{IterationRecord, LoopEvent, Run, Stage};
use crate::{Error, Result};
use tracing::{error, info};

/// Injectable collaborator bundle used to construct [`FeedbackLoop`].
pub struct LoopServices {
    pub expand: Box<dyn PromptExpansionService>,
    pub image_gen: Box<dyn ImageGenerationService>,
    pub describe: Box<dyn ImageDescriptionService>,
    pub image: Box<dyn ImageService>,
}

pub struct FeedbackLoop {
    services: LoopServices,
}

impl FeedbackLoop {
    pub fn new(services: LoopServices) -> Self {
        Self { services }
    }

    /// Validate the input and drive a fresh run to completion.
    ///
    /// Use [`FeedbackLoop::drive`] with a caller-owned [`Run`] when the records
    /// completed before a failure are needed.
    pub async fn run(&self, seed_prompt: &str, iterations: u32) -> Result<Run> {
        let mut run = Run::new(seed_prompt, iterations)?;
        self.drive(&mut run).await?;
        Ok(run)
    }

    pub async fn drive(&self, run: &mut Run) -> Result<()> {
        self.drive_with(run, |_| {}).await
    }

    /// Drive `run` until it holds its requested number of records, reporting
    /// progress through `on_event`.
    ///
    /// The first collaborator failure stops the loop; records of earlier
    /// iterations stay in `run`, and nothing is appended for the failed one.
    pub async fn drive_with<F>(&self, run: &mut Run, mut on_event: F) -> Result<()>
    where
        F: FnMut(LoopEvent) + Send,
    {
        info!(
            "Starting run {} ({} iterations) from seed: {}",
            run.id(),
            run.iterations(),
            run.seed_prompt()
        );

        while !run.is_complete() {
            let index = run.next_index();
            let prompt = run.current_prompt().to_string();

            let record = match self.iterate(index, run.iterations(), prompt, &mut on_event).await {
                Ok(record) => record,
                Err(e) => {
                    error!("Run {} stopped: {}", run.id(), e);
                    return Err(e);
                }
            };

            run.push(record.clone())?;
            on_event(LoopEvent::RecordCompleted(record));
        }

        info!("Run {} complete", run.id());
        Ok(())
    }

    async fn iterate<F>(
        &self,
        index: u32,
        total: u32,
        input_prompt: String,
        on_event: &mut F,
    ) -> Result<IterationRecord>
    where
        F: FnMut(LoopEvent) + Send,
    {
        let label = format!("[{}/{}]", index + 1, total);

        on_event(LoopEvent::StageStarted {
            iteration: index,
            stage: Stage::ExpandText,
        });
        let expanded_prompt = self
            .services
            .expand
            .expand_prompt(&input_prompt)
            .await
            .and_then(|text| require_text(text, "expanded prompt"))
            .map_err(|e| e.at_stage(index, Stage::ExpandText))?;
        info!("{} Expanded prompt: {}", label, expanded_prompt);

        on_event(LoopEvent::StageStarted {
            iteration: index,
            stage: Stage::GenerateImage,
        });
        let raw_image = self
            .services
            .image_gen
            .generate_image(&expanded_prompt)
            .await
            .map_err(|e| e.at_stage(index, Stage::GenerateImage))?;
        let image = self
            .services
            .image
            .normalize(&raw_image)
            .await
            .map_err(|e| e.at_stage(index, Stage::GenerateImage))?;
        info!(
            "{} Generated {}x{} image ({} bytes)",
            label,
            image.width,
            image.height,
            image.bytes.len()
        );

        on_event(LoopEvent::StageStarted {
            iteration: index,
            stage: Stage::DescribeImage,
        });
        let description = self
            .services
            .describe
            .describe_image(&image)
            .await
            .and_then(|text| require_text(text, "image description"))
            .map_err(|e| e.at_stage(index, Stage::DescribeImage))?;
        info!("{} Description: {}", label, description);

        Ok(IterationRecord {
            index,
            input_prompt,
            expanded_prompt,
            image,
            description,
        })
    }
}

/// An empty collaborator result is a malformed response, not a prompt.
fn require_text(text: String, what: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Service(format!("Collaborator returned an empty {}", what)));
    }
    Ok(trimmed.to_string())
}
