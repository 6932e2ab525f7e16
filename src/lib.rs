//! Video generation backend for the AI Playground
//!
//! Submits long-running generation jobs to a hosted model, polls them until
//! they settle and hands the finished media back as a self-contained data URI.

pub mod ai;
pub mod app;
pub mod error;
pub mod models;
pub mod poller;
pub mod prompts;

pub use error::{Error, Result};
