//! Command routing modules
//!
//! Commands are grouped into sub-modules by domain:
//! - session_routes: session create/list/load/replace/rename/delete
//! - workflow_routes: discovery, summary, people, research, report and export
//! - meeting_routes: meeting selection, turns, summaries and runs
//! - config_routes: API key, settings and prompt library

pub mod config_routes;
pub mod meeting_routes;
pub mod session_routes;
pub mod workflow_routes;

use crate::error::{LabError, LabResult};
use serde_json::Value;

use super::ServerAppState;

// =============================================================================
// Argument helpers
// =============================================================================

/// Extract a required argument from JSON args
pub fn get_arg<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> LabResult<T> {
    serde_json::from_value(
        args.get(name)
            .ok_or_else(|| LabError::validation(format!("Missing argument: {}", name)))?
            .clone(),
    )
    .map_err(|e| LabError::validation(format!("Invalid argument {}: {}", name, e)))
}

/// Extract an optional argument from JSON args
pub fn get_opt_arg<T: serde::de::DeserializeOwned>(
    args: &Value,
    name: &str,
) -> LabResult<Option<T>> {
    match args.get(name) {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| LabError::validation(format!("Invalid argument {}: {}", name, e))),
        _ => Ok(None),
    }
}

// =============================================================================
// Command Routing Macros
// =============================================================================

/// Routes an async command: awaits the handler and serializes its result
#[macro_export]
macro_rules! route_async {
    ($handler:expr) => {{
        let result = $handler.await?;
        serde_json::to_value(result).map_err($crate::error::LabError::from)
    }};
}

/// Routes a sync command
#[macro_export]
macro_rules! route_sync {
    ($handler:expr) => {{
        let result = $handler?;
        serde_json::to_value(result).map_err($crate::error::LabError::from)
    }};
}

/// Routes a command that returns ()
#[macro_export]
macro_rules! route_unit {
    ($handler:expr) => {{
        $handler?;
        Ok(serde_json::Value::Null)
    }};
}

pub use route_async;
pub use route_sync;
pub use route_unit;

// =============================================================================
// Main Command Dispatcher
// =============================================================================

/// Route a command to its implementation by dispatching to the appropriate sub-router
pub async fn route_command(cmd: &str, args: Value, state: &ServerAppState) -> LabResult<Value> {
    if session_routes::is_session_command(cmd) {
        return session_routes::route_session_command(cmd, args, state).await;
    }

    if workflow_routes::is_workflow_command(cmd) {
        return workflow_routes::route_workflow_command(cmd, args, state).await;
    }

    if meeting_routes::is_meeting_command(cmd) {
        return meeting_routes::route_meeting_command(cmd, args, state).await;
    }

    if config_routes::is_config_command(cmd) {
        return config_routes::route_config_command(cmd, args, state).await;
    }

    Err(LabError::validation(format!("Unknown command: {}", cmd)))
}
