//! Pipeline state model and upstream fetch
//!
//! Defines one snapshot of delivery-pipeline state as this tool sees it,
//! and the provider that fetches that snapshot from AWS CodePipeline.
//! Every upstream field that can be absent is modeled as an `Option`, so
//! the translation rules can match on presence exhaustively.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_codepipeline::types;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Current state of one pipeline and all of its stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    /// Name of the pipeline.
    pub name: String,
    /// When the pipeline was created.
    pub created: DateTime<Utc>,
    /// States of the pipeline's stages, in pipeline order.
    pub stages: Vec<StageState>,
}

/// Current state of one stage within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageState {
    /// Name of the stage, unique within its pipeline.
    pub name: String,
    /// Status of the stage's latest execution. Absent when the stage has
    /// never executed.
    pub latest_execution: Option<StageStatus>,
    /// States of the stage's actions, in stage order. May be empty.
    pub actions: Vec<ActionState>,
}

/// Current state of one action within a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    /// When the action's latest execution last changed status. Absent
    /// when the action has no recorded execution or the execution has no
    /// recorded status change.
    pub last_status_change: Option<DateTime<Utc>>,
}

/// Execution status vocabulary of the upstream pipeline service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StageStatus {
    InProgress,
    Failed,
    Succeeded,
    Stopped,
    Stopping,
    Superseded,
    Cancelled,
}

/// Provides access to the current state of all pipelines.
#[async_trait]
pub trait StateProvider {
    /// Fetch one snapshot of the current state of every pipeline.
    async fn pipeline_states(&self) -> Result<Vec<PipelineState>>;
}

/// Fetches pipeline state from AWS CodePipeline.
pub struct CodePipelineStateProvider {
    client: aws_sdk_codepipeline::Client,
}

impl CodePipelineStateProvider {
    /// Create a provider backed by the given AWS configuration.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_codepipeline::Client::new(config),
        }
    }
}

#[async_trait]
impl StateProvider for CodePipelineStateProvider {
    /// List every pipeline and fetch its stage states.
    async fn pipeline_states(&self) -> Result<Vec<PipelineState>> {
        let mut states = Vec::new();

        let mut summaries = self.client.list_pipelines().into_paginator().items().send();
        while let Some(summary) = summaries.next().await {
            let summary = summary.context("unable to list pipelines")?;

            let (Some(name), Some(created)) = (summary.name(), summary.created()) else {
                debug!("skipping pipeline summary with no recorded name or creation time");
                continue;
            };
            let Some(created) = to_utc(created) else {
                debug!(pipeline = name, "skipping pipeline with unrepresentable creation time");
                continue;
            };

            let state = self
                .client
                .get_pipeline_state()
                .name(name)
                .send()
                .await
                .with_context(|| format!("unable to get state of pipeline '{name}'"))?;

            let stages = state
                .stage_states()
                .iter()
                .filter_map(stage_from_sdk)
                .collect();

            debug!(pipeline = name, "fetched pipeline state");
            states.push(PipelineState {
                name: name.to_string(),
                created,
                stages,
            });
        }

        Ok(states)
    }
}

/// Convert an SDK stage state into the domain model.
///
/// Stages with no recorded name are malformed upstream records; they are
/// skipped here so the translation core never sees one.
fn stage_from_sdk(stage: &types::StageState) -> Option<StageState> {
    let Some(name) = stage.stage_name() else {
        debug!("skipping stage with no recorded name");
        return None;
    };

    Some(StageState {
        name: name.to_string(),
        latest_execution: stage
            .latest_execution()
            .map(|execution| status_from_sdk(execution.status())),
        actions: stage.action_states().iter().map(action_from_sdk).collect(),
    })
}

fn action_from_sdk(action: &types::ActionState) -> ActionState {
    ActionState {
        last_status_change: action
            .latest_execution()
            .and_then(types::ActionExecution::last_status_change)
            .and_then(to_utc),
    }
}

/// Map the SDK's non-exhaustive status enum onto the domain vocabulary.
fn status_from_sdk(status: &types::StageExecutionStatus) -> StageStatus {
    match status.as_str() {
        "InProgress" => StageStatus::InProgress,
        "Failed" => StageStatus::Failed,
        "Succeeded" => StageStatus::Succeeded,
        "Stopped" => StageStatus::Stopped,
        "Stopping" => StageStatus::Stopping,
        "Cancelled" => StageStatus::Cancelled,
        // Statuses the service may add later behave like any other
        // superseded execution: recorded, but neither failed nor running.
        _ => StageStatus::Superseded,
    }
}

fn to_utc(time: &aws_sdk_codepipeline::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_sdk_covers_vocabulary() {
        let cases = [
            ("InProgress", StageStatus::InProgress),
            ("Failed", StageStatus::Failed),
            ("Succeeded", StageStatus::Succeeded),
            ("Stopped", StageStatus::Stopped),
            ("Stopping", StageStatus::Stopping),
            ("Superseded", StageStatus::Superseded),
            ("Cancelled", StageStatus::Cancelled),
        ];

        for (input, expected) in cases {
            let status = types::StageExecutionStatus::from(input);
            assert_eq!(status_from_sdk(&status), expected);
        }
    }

    #[test]
    fn test_status_from_sdk_folds_unrecognized_statuses() {
        let status = types::StageExecutionStatus::from("SomeFutureStatus");
        assert_eq!(status_from_sdk(&status), StageStatus::Superseded);
    }

    #[test]
    fn test_stage_from_sdk_skips_nameless_stage() {
        let stage = types::StageState::builder().build();
        assert!(stage_from_sdk(&stage).is_none());
    }

    #[test]
    fn test_stage_from_sdk_keeps_stage_without_execution() {
        let stage = types::StageState::builder().stage_name("deploy").build();

        let converted = stage_from_sdk(&stage).unwrap();
        assert_eq!(converted.name, "deploy");
        assert_eq!(converted.latest_execution, None);
        assert!(converted.actions.is_empty());
    }

    #[test]
    fn test_action_from_sdk_without_execution() {
        let action = types::ActionState::builder().build();
        assert_eq!(action_from_sdk(&action).last_status_change, None);
    }

    #[test]
    fn test_action_from_sdk_converts_status_change_time() {
        let action = types::ActionState::builder()
            .latest_execution(
                types::ActionExecution::builder()
                    .last_status_change(aws_sdk_codepipeline::primitives::DateTime::from_secs(
                        1_549_485_195,
                    ))
                    .build(),
            )
            .build();

        let converted = action_from_sdk(&action);
        assert_eq!(
            converted.last_status_change.unwrap().to_rfc3339(),
            "2019-02-06T20:33:15+00:00"
        );
    }
}
