//! Stage operation routing
//!
//! Handles: get_stage_status, post_discovery_message, generate_summary,
//! update_summary, generate_people, update_person, generate_research,
//! generate_report, ask_report_question, export_markdown, export_json
//!
//! Every command takes `sessionId` and runs under that session's lock.

use crate::error::{LabError, LabResult};
use crate::research::{available_stages, furthest_stage};
use serde_json::{json, Value};

use super::{get_arg, route_async, route_sync, route_unit, ServerAppState};

/// Route stage operations
pub async fn route_workflow_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> LabResult<Value> {
    let id: String = get_arg(&args, "sessionId")?;
    let mut session = state.open_session(&id).await?;

    match cmd {
        "get_stage_status" => Ok(json!({
            "furthestStage": furthest_stage(session.document()),
            "availableStages": available_stages(session.document()),
            "stages": session.stage_status(),
        })),

        // Discovery and task
        "post_discovery_message" => {
            let text: String = get_arg(&args, "text")?;
            route_async!(session.post_discovery_message(&text))
        }

        "generate_summary" => route_async!(session.generate_summary()),

        "update_summary" => {
            let text: String = get_arg(&args, "text")?;
            route_unit!(session.update_summary(&text))
        }

        // People and research
        "generate_people" => route_async!(session.generate_people()),

        "update_person" => {
            let person_id: String = get_arg(&args, "personId")?;
            let title: String = get_arg(&args, "title")?;
            let description: String = get_arg(&args, "description")?;
            route_sync!(session.update_person(&person_id, &title, &description))
        }

        "generate_research" => route_async!(session.generate_research()),

        // Report and export
        "generate_report" => route_async!(session.generate_report()),

        "ask_report_question" => {
            let text: String = get_arg(&args, "text")?;
            route_async!(session.ask_report_question(&text))
        }

        "export_markdown" => route_sync!(session.export_markdown()),

        "export_json" => Ok(serde_json::to_value(session.export_json())?),

        _ => Err(LabError::validation(format!(
            "Unknown workflow command: {}",
            cmd
        ))),
    }
}

/// Check if a command is a stage operation
pub fn is_workflow_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "get_stage_status"
            | "post_discovery_message"
            | "generate_summary"
            | "update_summary"
            | "generate_people"
            | "update_person"
            | "generate_research"
            | "generate_report"
            | "ask_report_question"
            | "export_markdown"
            | "export_json"
    )
}
