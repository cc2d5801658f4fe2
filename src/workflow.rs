//! In-memory workflow registry.
//!
//! Tracks multi-step operations as small DAGs. The registry is a single
//! process-wide map behind a `RwLock`; state transitions are serialized
//! per workflow by taking the write lock for the whole transition. A step
//! becomes eligible only when all of its dependencies are completed; a
//! workflow completes when every step does and fails as soon as any step
//! fails.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

/// Workflow lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created, no step started yet.
    Created,
    /// At least one step running.
    InProgress,
    /// All steps completed.
    Completed,
    /// At least one step failed.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

/// Step lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting on dependencies or a caller.
    Pending,
    /// Running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Skipped by the caller.
    Skipped,
}

impl StepStatus {
    /// Parses a status string.
    ///
    /// # Errors
    ///
    /// `validation_error` for unknown statuses.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(Error::Validation(format!("Invalid step status: {other}"))),
        }
    }

    /// Wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    /// Step id, unique within the workflow.
    pub id: String,
    /// What the step does.
    pub description: String,
    /// Current status.
    pub status: StepStatus,
    /// Step ids that must complete before this one starts.
    pub dependencies: Vec<String>,
    /// Result payload supplied on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error detail supplied on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the step entered `in_progress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// When the step reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// One workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    /// Workflow id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Current status.
    pub status: WorkflowStatus,
    /// Steps in insertion order.
    pub steps: Vec<Step>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// When the workflow reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Workflow {
    fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    /// Step ids whose dependencies are all completed and that are still
    /// pending.
    #[must_use]
    pub fn eligible_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Pending)
            .filter(|step| {
                step.dependencies.iter().all(|dep| {
                    self.steps
                        .iter()
                        .any(|s| s.id == *dep && s.status == StepStatus::Completed)
                })
            })
            .map(|s| s.id.clone())
            .collect()
    }
}

static WORKFLOWS: Lazy<RwLock<HashMap<String, Workflow>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn with_registry<T>(f: impl FnOnce(&mut HashMap<String, Workflow>) -> Result<T>) -> Result<T> {
    let mut registry = WORKFLOWS
        .write()
        .map_err(|_| Error::Internal("workflow registry lock poisoned".to_string()))?;
    f(&mut registry)
}

/// Creates a workflow.
///
/// # Errors
///
/// `validation_error` for an empty id, `conflict` when the id exists.
pub fn create(id: &str, name: &str, description: &str) -> Result<Workflow> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Validation("Workflow ID cannot be empty".to_string()));
    }
    with_registry(|registry| {
        if registry.contains_key(id) {
            return Err(Error::Conflict(format!("Workflow '{id}' already exists")));
        }
        let workflow = Workflow {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            status: WorkflowStatus::Created,
            steps: Vec::new(),
            created_at: now(),
            updated_at: now(),
            completed_at: None,
        };
        registry.insert(id.to_string(), workflow.clone());
        Ok(workflow)
    })
}

/// Adds a step to a workflow.
///
/// Dependencies must reference existing steps.
///
/// # Errors
///
/// `not_found` for an unknown workflow, `conflict` for a duplicate step
/// id, `validation_error` for unknown dependencies.
pub fn add_step(
    workflow_id: &str,
    step_id: &str,
    description: &str,
    dependencies: Vec<String>,
) -> Result<Workflow> {
    with_registry(|registry| {
        let workflow = registry
            .get_mut(workflow_id)
            .ok_or_else(|| Error::NotFound(format!("Workflow '{workflow_id}' not found")))?;

        if workflow.steps.iter().any(|s| s.id == step_id) {
            return Err(Error::Conflict(format!(
                "Step '{step_id}' already exists in workflow"
            )));
        }
        let unknown: Vec<&String> = dependencies
            .iter()
            .filter(|dep| !workflow.steps.iter().any(|s| s.id == **dep))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Validation(format!(
                "Invalid dependencies: {unknown:?}"
            )));
        }

        workflow.steps.push(Step {
            id: step_id.to_string(),
            description: description.to_string(),
            status: StepStatus::Pending,
            dependencies,
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
        });
        workflow.updated_at = now();
        Ok(workflow.clone())
    })
}

/// Transitions a step and recomputes the workflow status.
///
/// A step may enter `in_progress` only when every dependency is
/// completed.
///
/// # Errors
///
/// `not_found` for unknown workflow/step, `validation_error` for an
/// ineligible transition.
pub fn update_step(
    workflow_id: &str,
    step_id: &str,
    status: StepStatus,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
) -> Result<Workflow> {
    with_registry(|registry| {
        let workflow = registry
            .get_mut(workflow_id)
            .ok_or_else(|| Error::NotFound(format!("Workflow '{workflow_id}' not found")))?;

        if status == StepStatus::InProgress {
            let eligible = workflow.eligible_steps();
            if !eligible.iter().any(|id| id == step_id) {
                let exists = workflow.steps.iter().any(|s| s.id == step_id);
                if !exists {
                    return Err(Error::NotFound(format!(
                        "Step '{step_id}' not found in workflow"
                    )));
                }
                return Err(Error::Validation(format!(
                    "Step '{step_id}' is not eligible to start; dependencies incomplete"
                )));
            }
        }

        let timestamp = now();
        let step = workflow
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| Error::NotFound(format!("Step '{step_id}' not found in workflow")))?;

        step.status = status;
        step.result = result;
        step.error_message = error_message;
        match status {
            StepStatus::InProgress => {
                if step.started_at.is_none() {
                    step.started_at = Some(timestamp.clone());
                }
            }
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped => {
                step.completed_at = Some(timestamp.clone());
            }
            StepStatus::Pending => {}
        }

        workflow.updated_at = timestamp.clone();
        if workflow.status == WorkflowStatus::Created && status == StepStatus::InProgress {
            workflow.status = WorkflowStatus::InProgress;
        }
        if workflow.failed_steps() > 0 {
            workflow.status = WorkflowStatus::Failed;
        } else if !workflow.steps.is_empty() && workflow.completed_steps() == workflow.steps.len() {
            workflow.status = WorkflowStatus::Completed;
            workflow.completed_at = Some(timestamp);
        }
        Ok(workflow.clone())
    })
}

/// Cancels a workflow.
///
/// # Errors
///
/// `not_found` for an unknown workflow.
pub fn cancel(workflow_id: &str) -> Result<Workflow> {
    with_registry(|registry| {
        let workflow = registry
            .get_mut(workflow_id)
            .ok_or_else(|| Error::NotFound(format!("Workflow '{workflow_id}' not found")))?;
        workflow.status = WorkflowStatus::Cancelled;
        workflow.updated_at = now();
        Ok(workflow.clone())
    })
}

/// Fetches a workflow by id.
///
/// # Errors
///
/// `not_found` for an unknown workflow.
pub fn get(workflow_id: &str) -> Result<Workflow> {
    let registry = WORKFLOWS
        .read()
        .map_err(|_| Error::Internal("workflow registry lock poisoned".to_string()))?;
    registry
        .get(workflow_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("Workflow '{workflow_id}' not found")))
}

/// Lists all workflows.
#[must_use]
pub fn list() -> Vec<Workflow> {
    WORKFLOWS
        .read()
        .map(|registry| registry.values().cloned().collect())
        .unwrap_or_default()
}

/// Deletes a workflow (tests and cleanup).
pub fn remove(workflow_id: &str) {
    if let Ok(mut registry) = WORKFLOWS.write() {
        registry.remove(workflow_id);
    }
}

/// Progress summary for one workflow.
#[must_use]
pub fn progress(workflow: &Workflow) -> serde_json::Value {
    let total = workflow.steps.len();
    let completed = workflow.completed_steps();
    #[allow(clippy::cast_precision_loss)]
    let percentage = if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    };
    serde_json::json!({
        "total_steps": total,
        "completed_steps": completed,
        "failed_steps": workflow.failed_steps(),
        "pending_steps": workflow
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .count(),
        "percentage": (percentage * 10.0).round() / 10.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4())
    }

    #[test]
    fn test_create_and_duplicate() {
        let id = unique("wf");
        let workflow = create(&id, "Test", "").unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Created);
        let err = create(&id, "Test", "").map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "conflict");
        remove(&id);
    }

    #[test]
    fn test_create_empty_id_rejected() {
        let err = create("  ", "x", "").map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_add_step_validates_dependencies() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        add_step(&id, "a", "first", Vec::new()).unwrap();
        let err = add_step(&id, "b", "second", vec!["missing".to_string()])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        let err = add_step(&id, "a", "dup", Vec::new()).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "conflict");
        remove(&id);
    }

    #[test]
    fn test_step_eligibility_gated_on_dependencies() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        add_step(&id, "a", "first", Vec::new()).unwrap();
        let workflow = add_step(&id, "b", "second", vec!["a".to_string()]).unwrap();
        assert_eq!(workflow.eligible_steps(), vec!["a"]);

        // b cannot start before a completes.
        let err = update_step(&id, "b", StepStatus::InProgress, None, None)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        update_step(&id, "a", StepStatus::InProgress, None, None).unwrap();
        update_step(&id, "a", StepStatus::Completed, None, None).unwrap();
        let workflow = update_step(&id, "b", StepStatus::InProgress, None, None).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::InProgress);
        remove(&id);
    }

    #[test]
    fn test_workflow_completes_when_all_steps_do() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        add_step(&id, "a", "", Vec::new()).unwrap();
        add_step(&id, "b", "", Vec::new()).unwrap();
        update_step(&id, "a", StepStatus::InProgress, None, None).unwrap();
        update_step(&id, "a", StepStatus::Completed, None, None).unwrap();
        let mid = get(&id).unwrap();
        assert_eq!(mid.status, WorkflowStatus::InProgress);
        update_step(&id, "b", StepStatus::InProgress, None, None).unwrap();
        let done = update_step(&id, "b", StepStatus::Completed, Some(serde_json::json!({"n": 1})), None)
            .unwrap();
        assert_eq!(done.status, WorkflowStatus::Completed);
        assert!(done.completed_at.is_some());
        remove(&id);
    }

    #[test]
    fn test_workflow_fails_on_any_step_failure() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        add_step(&id, "a", "", Vec::new()).unwrap();
        add_step(&id, "b", "", Vec::new()).unwrap();
        update_step(&id, "a", StepStatus::InProgress, None, None).unwrap();
        let failed = update_step(
            &id,
            "a",
            StepStatus::Failed,
            None,
            Some("boom".to_string()),
        )
        .unwrap();
        assert_eq!(failed.status, WorkflowStatus::Failed);
        remove(&id);
    }

    #[test]
    fn test_progress_percentages() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        add_step(&id, "a", "", Vec::new()).unwrap();
        add_step(&id, "b", "", Vec::new()).unwrap();
        update_step(&id, "a", StepStatus::InProgress, None, None).unwrap();
        update_step(&id, "a", StepStatus::Completed, None, None).unwrap();
        let workflow = get(&id).unwrap();
        let progress = progress(&workflow);
        assert_eq!(progress["total_steps"], serde_json::json!(2));
        assert_eq!(progress["completed_steps"], serde_json::json!(1));
        assert_eq!(progress["percentage"], serde_json::json!(50.0));
        remove(&id);
    }

    #[test]
    fn test_cancel_and_get_not_found() {
        let id = unique("wf");
        create(&id, "Test", "").unwrap();
        let cancelled = cancel(&id).unwrap();
        assert_eq!(cancelled.status, WorkflowStatus::Cancelled);
        remove(&id);
        assert_eq!(get(&id).map(|_| ()).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn test_step_status_parse() {
        assert_eq!(StepStatus::parse("completed").unwrap(), StepStatus::Completed);
        assert_eq!(StepStatus::parse("IN_PROGRESS").unwrap(), StepStatus::InProgress);
        assert!(StepStatus::parse("done").is_err());
    }
}
