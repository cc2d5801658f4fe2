//! Workflow tool handlers.

use super::{action_listing, unknown_action};
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_str, optional_string_list, require_str};
use crate::runtime::RequestContext;
use crate::workflow::{self, StepStatus};
use crate::Result;
use serde_json::{Value, json};

const ACTIONS: &[&str] = &[
    "create",
    "add_step",
    "update_step",
    "get_status",
    "list",
    "cancel",
];

/// Dispatches a workflow tool call.
///
/// The registry is in-process state; no remote calls happen here.
///
/// # Errors
///
/// Propagates validation/conflict/not-found failures from the registry.
pub fn execute(
    _state: &ServerState,
    _ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "workflow",
            ACTIONS,
            "Track multi-step operations as workflows with dependent steps",
        ));
    };
    match action {
        "create" => {
            let workflow_id = require_str(params, "workflow_id")?;
            let name = optional_str(params, "name").unwrap_or_else(|| workflow_id.clone());
            let description = optional_str(params, "description").unwrap_or_default();
            let workflow = workflow::create(&workflow_id, &name, &description)?;
            Ok(json!({
                "workflow_id": workflow_id,
                "workflow": workflow,
                "message": format!("Workflow '{name}' created"),
            }))
        }
        "add_step" => {
            let workflow_id = require_str(params, "workflow_id")?;
            let step_id = require_str(params, "step_id")?;
            let description = optional_str(params, "description").unwrap_or_default();
            let dependencies = optional_string_list(params, "dependencies");
            let workflow = workflow::add_step(&workflow_id, &step_id, &description, dependencies)?;
            Ok(json!({
                "workflow_id": workflow_id,
                "step_id": step_id,
                "total_steps": workflow.steps.len(),
                "workflow_status": workflow.status,
            }))
        }
        "update_step" => {
            let workflow_id = require_str(params, "workflow_id")?;
            let step_id = require_str(params, "step_id")?;
            let status = StepStatus::parse(&require_str(params, "status")?)?;
            let result = params.get("result").cloned();
            let error_message = optional_str(params, "error_message");
            let workflow =
                workflow::update_step(&workflow_id, &step_id, status, result, error_message)?;
            Ok(json!({
                "workflow_id": workflow_id,
                "step_id": step_id,
                "workflow_status": workflow.status,
                "progress": workflow::progress(&workflow),
            }))
        }
        "get_status" => {
            let workflow_id = require_str(params, "workflow_id")?;
            let workflow = workflow::get(&workflow_id)?;
            let eligible = workflow.eligible_steps();
            let can_proceed = !eligible.is_empty()
                && workflow.status != crate::workflow::WorkflowStatus::Failed;
            Ok(json!({
                "workflow": workflow,
                "progress": workflow::progress(&workflow),
                "next_available_steps": eligible,
                "can_proceed": can_proceed,
            }))
        }
        "list" => {
            let workflows = workflow::list();
            Ok(json!({
                "count": workflows.len(),
                "workflows": workflows,
            }))
        }
        "cancel" => {
            let workflow_id = require_str(params, "workflow_id")?;
            let workflow = workflow::cancel(&workflow_id)?;
            Ok(json!({
                "workflow_id": workflow_id,
                "workflow_status": workflow.status,
            }))
        }
        other => Err(unknown_action("workflow", other, ACTIONS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::server::test_auth;

    fn call(action: &str, params: Value) -> Result<Value> {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        execute(&state, &ctx, Some(action), &params)
    }

    #[test]
    fn test_full_lifecycle_through_tool() {
        let id = format!("wf-{}", uuid::Uuid::new_v4());
        let created = call("create", json!({"workflow_id": id, "name": "Demo"})).unwrap();
        assert_eq!(created["workflow"]["status"], json!("created"));

        call("add_step", json!({"workflow_id": id, "step_id": "a"})).unwrap();
        call(
            "add_step",
            json!({"workflow_id": id, "step_id": "b", "dependencies": ["a"]}),
        )
        .unwrap();

        let status = call("get_status", json!({"workflow_id": id})).unwrap();
        assert_eq!(status["next_available_steps"], json!(["a"]));
        assert_eq!(status["can_proceed"], json!(true));

        call(
            "update_step",
            json!({"workflow_id": id, "step_id": "a", "status": "in_progress"}),
        )
        .unwrap();
        call(
            "update_step",
            json!({"workflow_id": id, "step_id": "a", "status": "completed"}),
        )
        .unwrap();
        call(
            "update_step",
            json!({"workflow_id": id, "step_id": "b", "status": "in_progress"}),
        )
        .unwrap();
        let done = call(
            "update_step",
            json!({"workflow_id": id, "step_id": "b", "status": "completed"}),
        )
        .unwrap();
        assert_eq!(done["workflow_status"], json!("completed"));
        assert_eq!(done["progress"]["percentage"], json!(100.0));
        crate::workflow::remove(&id);
    }

    #[test]
    fn test_update_step_rejects_bad_status() {
        let id = format!("wf-{}", uuid::Uuid::new_v4());
        call("create", json!({"workflow_id": id, "name": "Demo"})).unwrap();
        call("add_step", json!({"workflow_id": id, "step_id": "a"})).unwrap();
        let err = call(
            "update_step",
            json!({"workflow_id": id, "step_id": "a", "status": "done"}),
        )
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        crate::workflow::remove(&id);
    }

    #[test]
    fn test_get_status_unknown_workflow() {
        let err = call("get_status", json!({"workflow_id": "missing-wf"}))
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
