//! Configuration command routing
//!
//! Handles settings commands: get_api_key_status, set_api_key, get_config,
//! update_config
//!
//! Also handles prompt library commands: get_prompts, update_prompts,
//! reset_prompts

use crate::config::ConfigUpdate;
use crate::error::{LabError, LabResult};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{get_arg, route_sync, route_unit, ServerAppState};

/// Route configuration and prompt commands
pub async fn route_config_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> LabResult<Value> {
    match cmd {
        // API key
        "get_api_key_status" => route_sync!(state.config_state.api_key_status()),

        "set_api_key" => {
            let api_key: String = get_arg(&args, "apiKey")?;
            route_sync!(state.config_state.set_api_key(&api_key))
        }

        // Settings. The stored key never leaves the server.
        "get_config" => {
            let mut config = state.config_state.get_config()?;
            let api_key = config.api_key_status();
            config.api_key = None;
            Ok(json!({ "config": config, "apiKey": api_key }))
        }

        "update_config" => {
            let update: ConfigUpdate = get_arg(&args, "update")?;
            let mut config = state.config_state.update(update)?;
            config.api_key = None;
            Ok(serde_json::to_value(config)?)
        }

        // Prompt library
        "get_prompts" => route_sync!(state.prompt_library().map(|p| p.list())),

        "update_prompts" => {
            let prompts: HashMap<String, String> = get_arg(&args, "prompts")?;
            route_sync!(state.modify_prompts(|library| {
                library.update(prompts)?;
                Ok(library.list())
            }))
        }

        "reset_prompts" => route_unit!(state.modify_prompts(|library| library.reset_to_defaults())),

        _ => Err(LabError::validation(format!(
            "Unknown config command: {}",
            cmd
        ))),
    }
}

/// Check if a command is a config command
pub fn is_config_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "get_api_key_status"
            | "set_api_key"
            | "get_config"
            | "update_config"
            | "get_prompts"
            | "update_prompts"
            | "reset_prompts"
    )
}
