//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use crate::models::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A hosted model call failed: bad status, malformed or empty payload,
    /// missing credential, or a failed prediction.
    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage} failed on iteration {iteration}: {source}")]
    CollaboratorFailure {
        iteration: u32,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    pub(crate) fn at_stage(self, iteration: u32, stage: Stage) -> Self {
        Error::CollaboratorFailure {
            iteration,
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
