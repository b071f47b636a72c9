//! Text-image feedback loop
//!
//! Expands a seed prompt, renders it as an image, describes the image, and
//! feeds the description back in as the next prompt, for a fixed number of
//! iterations. Collaborators are hosted models; results are shown in a small
//! web UI.

pub mod ai;
pub mod app;
pub mod driver;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod web;

pub use driver::{FeedbackLoop, LoopServices};
pub use error::{Error, Result};
