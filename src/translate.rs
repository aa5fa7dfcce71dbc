//! Translation of pipeline state into feed projects
//!
//! Pure, total mapping: every stage of every pipeline snapshot becomes
//! exactly one feed [`Project`], however sparse the upstream record is.
//! Missing data maps to an explicit default (`Unknown`, `Sleeping`, the
//! pipeline creation time), never to an error.

use chrono::{DateTime, Utc};

use crate::feed::{Activity, BuildStatus, Project};
use crate::pipeline::{PipelineState, StageState, StageStatus};

/// Translate pipeline states into feed projects, one per stage.
///
/// Projects are produced in pipeline-then-stage enumeration order; no
/// filtering or merging happens here.
#[must_use]
pub fn translate(pipelines: &[PipelineState]) -> Vec<Project> {
    let mut projects = Vec::new();

    for pipeline in pipelines {
        for stage in &pipeline.stages {
            projects.push(Project {
                name: project_name(&pipeline.name, stage),
                activity: activity(stage),
                last_build_status: last_build_status(stage),
                last_build_time: last_build_time(pipeline.created, stage),
                last_build_label: None,
                next_build_time: None,
                web_url: String::new(),
            });
        }
    }

    projects
}

/// Compose the feed name for a stage: `"{pipeline} :: {stage}"`.
fn project_name(pipeline_name: &str, stage: &StageState) -> String {
    format!("{pipeline_name} :: {}", stage.name)
}

/// Infer the feed build status from a stage's latest execution.
///
/// Only the latest execution is visible upstream, so when it is still
/// running or was stopped there is no way to recover the outcome of the
/// previous completed execution. Those statuses report `Success` rather
/// than a stale or fabricated failure; an accepted approximation.
fn last_build_status(stage: &StageState) -> BuildStatus {
    match stage.latest_execution {
        None => BuildStatus::Unknown,
        Some(StageStatus::Failed) => BuildStatus::Failure,
        Some(StageStatus::Succeeded) => BuildStatus::Success,
        Some(
            StageStatus::InProgress
            | StageStatus::Stopped
            | StageStatus::Stopping
            | StageStatus::Superseded
            | StageStatus::Cancelled,
        ) => BuildStatus::Success,
    }
}

/// A stage is building exactly when its latest execution is in progress.
fn activity(stage: &StageState) -> Activity {
    match stage.latest_execution {
        Some(StageStatus::InProgress) => Activity::Building,
        _ => Activity::Sleeping,
    }
}

/// Infer when a stage last did something.
///
/// The first listed action is treated as representative of the stage's
/// most recent activity; without a recorded status change the stage is
/// assumed to be as old as the pipeline itself.
fn last_build_time(created: DateTime<Utc>, stage: &StageState) -> DateTime<Utc> {
    stage
        .actions
        .first()
        .and_then(|action| action.last_status_change)
        .unwrap_or(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ActionState;

    fn time(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .expect("unable to parse test date")
            .with_timezone(&Utc)
    }

    fn stage(name: &str, status: Option<StageStatus>, changed: Option<&str>) -> StageState {
        StageState {
            name: name.to_string(),
            latest_execution: status,
            actions: vec![ActionState {
                last_status_change: changed.map(time),
            }],
        }
    }

    #[test]
    fn test_translate_one_project_per_stage() {
        let pipeline = PipelineState {
            name: "test-pipeline".to_string(),
            created: time("2019-02-01T12:00:00Z"),
            stages: vec![
                stage(
                    "stage-1",
                    Some(StageStatus::Succeeded),
                    Some("2019-02-06T20:33:15Z"),
                ),
                stage(
                    "stage-2",
                    Some(StageStatus::Failed),
                    Some("2019-02-06T21:14:13Z"),
                ),
                stage(
                    "stage-3",
                    Some(StageStatus::InProgress),
                    Some("2019-02-07T01:12:50Z"),
                ),
            ],
        };

        let projects = translate(&[pipeline]);

        assert_eq!(projects.len(), 3);

        let expected_names = [
            "test-pipeline :: stage-1",
            "test-pipeline :: stage-2",
            "test-pipeline :: stage-3",
        ];
        let expected_statuses = [
            BuildStatus::Success,
            BuildStatus::Failure,
            BuildStatus::Success,
        ];
        let expected_activities = [Activity::Sleeping, Activity::Sleeping, Activity::Building];
        let expected_times = [
            "2019-02-06T20:33:15Z",
            "2019-02-06T21:14:13Z",
            "2019-02-07T01:12:50Z",
        ];

        for (index, project) in projects.iter().enumerate() {
            assert_eq!(project.name, expected_names[index]);
            assert_eq!(project.last_build_status, expected_statuses[index]);
            assert_eq!(project.activity, expected_activities[index]);
            assert_eq!(project.last_build_time, time(expected_times[index]));
        }
    }

    #[test]
    fn test_translate_empty_input() {
        assert!(translate(&[]).is_empty());
    }

    #[test]
    fn test_translate_sparse_stage_never_fails() {
        let pipeline = PipelineState {
            name: "test-pipeline".to_string(),
            created: time("2019-02-01T12:00:00Z"),
            stages: vec![StageState {
                name: "stage-1".to_string(),
                latest_execution: None,
                actions: vec![],
            }],
        };

        let projects = translate(&[pipeline]);

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].last_build_status, BuildStatus::Unknown);
        assert_eq!(projects[0].activity, Activity::Sleeping);
        assert_eq!(projects[0].last_build_time, time("2019-02-01T12:00:00Z"));
    }

    #[test]
    fn test_translate_leaves_caller_fields_unset() {
        let pipeline = PipelineState {
            name: "test-pipeline".to_string(),
            created: time("2019-02-01T12:00:00Z"),
            stages: vec![stage("stage-1", Some(StageStatus::Succeeded), None)],
        };

        let project = &translate(&[pipeline])[0];

        assert_eq!(project.last_build_label, None);
        assert_eq!(project.next_build_time, None);
        assert_eq!(project.web_url, "");
    }

    #[test]
    fn test_project_name_composition() {
        let stage = stage("stage-1", None, None);
        assert_eq!(
            project_name("test-pipeline", &stage),
            "test-pipeline :: stage-1"
        );
    }

    #[test]
    fn test_last_build_status_mapping() {
        let cases = [
            (Some(StageStatus::Failed), BuildStatus::Failure),
            (Some(StageStatus::Succeeded), BuildStatus::Success),
            (Some(StageStatus::InProgress), BuildStatus::Success),
            (Some(StageStatus::Stopped), BuildStatus::Success),
            (Some(StageStatus::Stopping), BuildStatus::Success),
            (Some(StageStatus::Superseded), BuildStatus::Success),
            (Some(StageStatus::Cancelled), BuildStatus::Success),
            (None, BuildStatus::Unknown),
        ];

        for (status, expected) in cases {
            assert_eq!(last_build_status(&stage("stage-1", status, None)), expected);
        }
    }

    #[test]
    fn test_activity_mapping() {
        let cases = [
            (Some(StageStatus::InProgress), Activity::Building),
            (Some(StageStatus::Failed), Activity::Sleeping),
            (Some(StageStatus::Succeeded), Activity::Sleeping),
            (Some(StageStatus::Stopped), Activity::Sleeping),
            (None, Activity::Sleeping),
        ];

        for (status, expected) in cases {
            assert_eq!(activity(&stage("stage-1", status, None)), expected);
        }
    }

    #[test]
    fn test_last_build_time_from_first_action() {
        let created = time("2019-02-01T12:00:00Z");
        let stage = stage("stage-1", None, Some("2019-02-06T20:33:15Z"));

        assert_eq!(
            last_build_time(created, &stage),
            time("2019-02-06T20:33:15Z")
        );
    }

    #[test]
    fn test_last_build_time_falls_back_to_pipeline_creation() {
        let created = time("2019-02-01T12:00:00Z");

        // Action present but no status change recorded.
        let with_blank_action = stage("stage-1", None, None);
        assert_eq!(last_build_time(created, &with_blank_action), created);

        // No actions at all.
        let without_actions = StageState {
            name: "stage-1".to_string(),
            latest_execution: None,
            actions: vec![],
        };
        assert_eq!(last_build_time(created, &without_actions), created);
    }
}
