//! ccfeed - CodePipeline build-status feed exporter
//!
//! Polls AWS CodePipeline for the current state of every pipeline and
//! stage, translates it into the CCTray build-status feed format, and
//! writes the document to S3 or a local file.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod feed;
pub mod persist;
pub mod pipeline;
pub mod translate;

// Re-export commonly used types
pub use feed::{encode, Activity, BuildStatus, Project};
pub use persist::{FileSink, S3Sink, Sink};
pub use pipeline::{
    ActionState, CodePipelineStateProvider, PipelineState, StageState, StageStatus, StateProvider,
};
pub use translate::translate;
