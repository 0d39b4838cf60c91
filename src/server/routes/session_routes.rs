//! Session-related command routing
//!
//! Handles: create_session, list_sessions, get_session, replace_session,
//! rename_session, delete_session

use crate::error::{LabError, LabResult};
use serde_json::{json, Value};

use super::{get_arg, route_sync, ServerAppState};

/// Route session-related commands
pub async fn route_session_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> LabResult<Value> {
    match cmd {
        "create_session" => {
            let name: String = get_arg(&args, "name")?;
            route_sync!(state.store.create(&name))
        }

        "list_sessions" => route_sync!(state.store.list()),

        "get_session" => {
            let id: String = get_arg(&args, "sessionId")?;
            let session = state.open_session(&id).await?;
            Ok(json!({
                "session": session.descriptor()?,
                "document": session.document(),
                "selection": session.selection(),
            }))
        }

        "replace_session" => {
            let id: String = get_arg(&args, "sessionId")?;
            let document: Value = get_arg(&args, "document")?;
            // Hold the session lock so a running operation cannot overwrite the import
            let _session = state.open_session(&id).await?;
            route_sync!(state.store.replace_raw(&id, document))
        }

        "rename_session" => {
            let id: String = get_arg(&args, "sessionId")?;
            let name: String = get_arg(&args, "name")?;
            route_sync!(state.store.rename(&id, &name))
        }

        "delete_session" => {
            let id: String = get_arg(&args, "sessionId")?;
            {
                let _session = state.open_session(&id).await?;
                state.store.delete(&id)?;
            }
            state.forget_session(&id);
            Ok(Value::Null)
        }

        _ => Err(LabError::validation(format!(
            "Unknown session command: {}",
            cmd
        ))),
    }
}

/// Check if a command is a session command
pub fn is_session_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "create_session"
            | "list_sessions"
            | "get_session"
            | "replace_session"
            | "rename_session"
            | "delete_session"
    )
}
