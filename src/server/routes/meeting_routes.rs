//! Meeting command routing
//!
//! Handles: select_meeting, next_speaker, append_meeting_question,
//! take_meeting_turn, auto_run_meeting, summarize_meeting, reset_meeting,
//! run_meeting, run_all_meetings
//!
//! Turn commands act on the meeting chosen with `select_meeting`. The
//! selection and its rotation survive between requests for the same session.

use crate::error::{LabError, LabResult};
use serde_json::{json, Value};

use super::{get_arg, get_opt_arg, route_async, route_sync, ServerAppState};

/// Route meeting commands
pub async fn route_meeting_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> LabResult<Value> {
    let id: String = get_arg(&args, "sessionId")?;
    let mut session = state.open_session(&id).await?;

    match cmd {
        "select_meeting" => {
            let meeting_id: String = get_arg(&args, "meetingId")?;
            route_sync!(session.select_meeting(&meeting_id))
        }

        "next_speaker" => {
            let speaker: Option<usize> = get_opt_arg(&args, "speakerIndex")?;
            route_sync!(session.next_speaker(speaker))
        }

        "append_meeting_question" => {
            let text: String = get_arg(&args, "text")?;
            route_sync!(session.append_question(&text))
        }

        "take_meeting_turn" => {
            let speaker: Option<usize> = get_opt_arg(&args, "speakerIndex")?;
            let question: Option<String> = get_opt_arg(&args, "question")?;
            route_async!(session.take_turn(speaker, question.as_deref()))
        }

        "auto_run_meeting" => {
            let turns: usize = get_arg(&args, "turns")?;
            route_async!(session.auto_run(turns))
        }

        "summarize_meeting" => {
            let report = session.summarize_meeting().await?;
            Ok(json!({ "summaryReport": report }))
        }

        "reset_meeting" => {
            let confirmed: bool = get_opt_arg(&args, "confirmed")?.unwrap_or(false);
            route_sync!(session.reset_meeting(confirmed))
        }

        "run_meeting" => {
            let meeting_id: String = get_arg(&args, "meetingId")?;
            let turns: Option<usize> = get_opt_arg(&args, "turns")?;
            route_async!(session.run_meeting(&meeting_id, turns))
        }

        "run_all_meetings" => {
            let turns: Option<usize> = get_opt_arg(&args, "turns")?;
            let ran = session.run_all_meetings(turns).await?;
            Ok(json!({ "meetingIds": ran }))
        }

        _ => Err(LabError::validation(format!(
            "Unknown meeting command: {}",
            cmd
        ))),
    }
}

/// Check if a command is a meeting command
pub fn is_meeting_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "select_meeting"
            | "next_speaker"
            | "append_meeting_question"
            | "take_meeting_turn"
            | "auto_run_meeting"
            | "summarize_meeting"
            | "reset_meeting"
            | "run_meeting"
            | "run_all_meetings"
    )
}
