// Meeting transcript models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a meeting transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingMessage {
    pub id: String,
    pub participant_name: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Id of the speaking person, absent for system, user and summary entries
    #[serde(default)]
    pub participant_id: Option<String>,
}

impl MeetingMessage {
    pub fn new(participant_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            participant_name: participant_name.into(),
            content: content.into(),
            timestamp: Utc::now(),
            participant_id: None,
        }
    }

    pub fn from_participant(
        participant_id: &str,
        participant_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(participant_name, content);
        message.participant_id = Some(participant_id.to_string());
        message
    }
}

/// A simulated meeting seeded from one research finding
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meeting {
    pub id: String,
    #[serde(default)]
    pub finding_id: String,
    pub topic: String,
    pub description: String,
    pub messages: Vec<MeetingMessage>,
    #[serde(default)]
    pub summary_report: Option<String>,
}

impl Meeting {
    /// A meeting with a written summary counts toward the final report
    pub fn is_closed(&self) -> bool {
        self.summary_report
            .as_deref()
            .map_or(false, |s| !s.trim().is_empty())
    }
}
