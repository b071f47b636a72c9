//! Request and response payloads for the HTTP API.

use crate::models::{IterationRecord, LoopEvent, Run, Stage};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub seed_prompt: String,
    /// Signed so that negative counts reach validation instead of failing
    /// deserialization.
    pub iterations: i64,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageView {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordView {
    pub index: u32,
    pub input_prompt: String,
    pub expanded_prompt: String,
    pub image: ImageView,
    pub description: String,
}

impl From<&IterationRecord> for RecordView {
    fn from(record: &IterationRecord) -> Self {
        Self {
            index: record.index,
            input_prompt: record.input_prompt.clone(),
            expanded_prompt: record.expanded_prompt.clone(),
            image: ImageView {
                data_url: record.image.to_data_url(),
                width: record.image.width,
                height: record.image.height,
            },
            description: record.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
}

impl From<&Error> for ErrorView {
    fn from(error: &Error) -> Self {
        match error {
            Error::CollaboratorFailure {
                iteration,
                stage,
                source,
            } => Self {
                iteration: Some(*iteration),
                stage: Some(*stage),
                message: source.to_string(),
            },
            other => Self {
                iteration: None,
                stage: None,
                message: other.to_string(),
            },
        }
    }
}

/// A run as returned by `POST /api/runs`, including the records completed
/// before any failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunView {
    pub id: Uuid,
    pub seed_prompt: String,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
    pub records: Vec<RecordView>,
    pub error: Option<ErrorView>,
}

impl RunView {
    pub fn new(run: &Run, error: Option<&Error>) -> Self {
        Self {
            id: run.id(),
            seed_prompt: run.seed_prompt().to_string(),
            iterations: run.iterations(),
            started_at: run.started_at(),
            records: run.records().iter().map(RecordView::from).collect(),
            error: error.map(ErrorView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageView {
    pub iteration: u32,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneView {
    pub id: Uuid,
    pub records: usize,
}

/// One server-sent event of a streamed run.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Stage(StageView),
    Record(RecordView),
    Error(ErrorView),
    Done(DoneView),
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Stage(_) => "stage",
            StreamEvent::Record(_) => "record",
            StreamEvent::Error(_) => "error",
            StreamEvent::Done(_) => "done",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            StreamEvent::Stage(view) => serde_json::to_string(view),
            StreamEvent::Record(view) => serde_json::to_string(view),
            StreamEvent::Error(view) => serde_json::to_string(view),
            StreamEvent::Done(view) => serde_json::to_string(view),
        }
    }
}

impl From<LoopEvent> for StreamEvent {
    fn from(event: LoopEvent) -> Self {
        match event {
            LoopEvent::StageStarted { iteration, stage } => {
                StreamEvent::Stage(StageView { iteration, stage })
            }
            LoopEvent::RecordCompleted(record) => StreamEvent::Record(RecordView::from(&record)),
        }
    }
}
