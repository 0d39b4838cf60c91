//! Research workflow stages and their entry preconditions

use crate::error::{LabError, LabResult};
use crate::models::SessionDocument;
use serde::{Deserialize, Serialize};

/// Workflow stages in strict forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Chat that establishes what the user wants done
    Discovery,
    /// Executive summary of the task
    Task,
    /// Five-person interdisciplinary team
    People,
    /// Ten precedents, each seeding a meeting
    Research,
    /// Simulated expert meetings
    Meetings,
    /// Final report and report Q&A
    Report,
    /// Markdown and JSON export
    Export,
}

impl Stage {
    /// Get all stages in order
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Discovery,
            Stage::Task,
            Stage::People,
            Stage::Research,
            Stage::Meetings,
            Stage::Report,
            Stage::Export,
        ]
    }

    /// Get the next stage, if any
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Discovery => Some(Stage::Task),
            Stage::Task => Some(Stage::People),
            Stage::People => Some(Stage::Research),
            Stage::Research => Some(Stage::Meetings),
            Stage::Meetings => Some(Stage::Report),
            Stage::Report => Some(Stage::Export),
            Stage::Export => None,
        }
    }

    /// Get the previous stage, if any
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Discovery => None,
            Stage::Task => Some(Stage::Discovery),
            Stage::People => Some(Stage::Task),
            Stage::Research => Some(Stage::People),
            Stage::Meetings => Some(Stage::Research),
            Stage::Report => Some(Stage::Meetings),
            Stage::Export => Some(Stage::Report),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Discovery => "Discovery",
            Stage::Task => "Task",
            Stage::People => "People",
            Stage::Research => "Research",
            Stage::Meetings => "Meetings",
            Stage::Report => "Report",
            Stage::Export => "Export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Discovery => "Chat with the assistant to understand the task",
            Stage::Task => "Executive summary of the task",
            Stage::People => "Assemble an interdisciplinary team of five",
            Stage::Research => "Find ten precedents and seed a meeting for each",
            Stage::Meetings => "Run expert meetings and summarize them",
            Stage::Report => "Write the final report and ask questions about it",
            Stage::Export => "Download the report",
        }
    }

    /// Get the stage index (0-based)
    pub fn index(&self) -> usize {
        match self {
            Stage::Discovery => 0,
            Stage::Task => 1,
            Stage::People => 2,
            Stage::Research => 3,
            Stage::Meetings => 4,
            Stage::Report => 5,
            Stage::Export => 6,
        }
    }

    /// The unmet precondition for entering this stage, if any
    pub fn missing_precondition(&self, doc: &SessionDocument) -> Option<&'static str> {
        match self {
            Stage::Discovery => None,
            Stage::Task if doc.messages.is_empty() => {
                Some("the discovery chat needs at least one message")
            }
            Stage::People | Stage::Research if doc.summary.trim().is_empty() => {
                Some("the task summary is empty")
            }
            Stage::Meetings if doc.people.is_empty() => Some("no team members have been generated"),
            Stage::Meetings if doc.meetings.is_empty() => Some("no meetings have been generated"),
            Stage::Report if doc.closed_meetings().next().is_none() => {
                Some("at least one meeting must have a summary report")
            }
            Stage::Export if doc.final_report.trim().is_empty() => {
                Some("the final report has not been generated")
            }
            _ => None,
        }
    }

    /// Whether the stage's primary artifact exists
    pub fn is_complete(&self, doc: &SessionDocument) -> bool {
        match self {
            Stage::Discovery => !doc.messages.is_empty(),
            Stage::Task => !doc.summary.trim().is_empty(),
            Stage::People => !doc.people.is_empty(),
            Stage::Research => !doc.research_findings.is_empty(),
            Stage::Meetings => doc.closed_meetings().next().is_some(),
            Stage::Report => !doc.final_report.trim().is_empty(),
            Stage::Export => false,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Discovery
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Reject entering `stage` when its precondition is not met
pub fn check_entry(stage: Stage, doc: &SessionDocument) -> LabResult<()> {
    match stage.missing_precondition(doc) {
        Some(reason) => Err(LabError::precondition(format!(
            "Cannot enter {} stage: {}",
            stage.display_name(),
            reason
        ))),
        None => Ok(()),
    }
}

/// Stages whose preconditions are currently met
pub fn available_stages(doc: &SessionDocument) -> Vec<Stage> {
    Stage::all()
        .iter()
        .copied()
        .filter(|s| s.missing_precondition(doc).is_none())
        .collect()
}

/// Furthest stage reachable without skipping an unavailable one
pub fn furthest_stage(doc: &SessionDocument) -> Stage {
    let mut current = Stage::Discovery;
    while let Some(next) = current.next() {
        if next.missing_precondition(doc).is_some() {
            break;
        }
        current = next;
    }
    current
}

/// Per-stage status for UI navigation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub stage: Stage,
    pub display_name: String,
    pub description: String,
    pub available: bool,
    pub complete: bool,
    pub blocked_reason: Option<String>,
}

pub fn stage_statuses(doc: &SessionDocument) -> Vec<StageStatus> {
    Stage::all()
        .iter()
        .map(|stage| {
            let blocked_reason = stage.missing_precondition(doc).map(String::from);
            StageStatus {
                stage: *stage,
                display_name: stage.display_name().to_string(),
                description: stage.description().to_string(),
                available: blocked_reason.is_none(),
                complete: stage.is_complete(doc),
                blocked_reason,
            }
        })
        .collect()
}
