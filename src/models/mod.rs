// Data models for research sessions
//
// Session document keys stay snake_case so documents written by earlier
// versions of the tool load unchanged.

pub mod meeting;

pub use meeting::{Meeting, MeetingMessage};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level keys every session document must carry
pub const REQUIRED_DOCUMENT_KEYS: &[&str] = &[
    "messages",
    "summary",
    "people",
    "research_findings",
    "meetings",
    "final_report",
    "report_chat_messages",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single chat message sent to or received from the completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A generated team member persona
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A precedent found during the research stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchFinding {
    pub id: String,
    pub topic: String,
    pub description: String,
    #[serde(default)]
    pub citation: String,
}

/// Listing metadata for a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a research session produces, persisted as one unit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionDocument {
    /// Discovery chat transcript
    pub messages: Vec<Message>,
    /// Executive task summary
    pub summary: String,
    pub people: Vec<Person>,
    pub research_findings: Vec<ResearchFinding>,
    pub meetings: Vec<Meeting>,
    pub final_report: String,
    /// Q&A about the final report
    pub report_chat_messages: Vec<Message>,
}

impl SessionDocument {
    pub fn find_person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    pub fn meeting_index(&self, id: &str) -> Option<usize> {
        self.meetings.iter().position(|m| m.id == id)
    }

    /// Meetings whose summary report has been written
    pub fn closed_meetings(&self) -> impl Iterator<Item = &Meeting> {
        self.meetings.iter().filter(|m| m.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = Message::assistant("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hello"}"#);
    }

    #[test]
    fn test_document_defaults_are_empty() {
        let doc = SessionDocument::default();
        assert!(doc.messages.is_empty());
        assert!(doc.summary.is_empty());
        assert!(doc.people.is_empty());
        assert!(doc.research_findings.is_empty());
        assert!(doc.meetings.is_empty());
        assert!(doc.final_report.is_empty());
        assert!(doc.report_chat_messages.is_empty());
    }

    #[test]
    fn test_document_serializes_required_keys() {
        let value = serde_json::to_value(SessionDocument::default()).unwrap();
        for key in REQUIRED_DOCUMENT_KEYS {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_loads_legacy_document() {
        // Older documents carry extra meeting bookkeeping and no timestamps
        let json = r#"{
            "messages": [{"role": "user", "content": "Hi"}],
            "summary": "Improve transit",
            "people": [{"id": "p1", "title": "Planner", "description": "Urban planner"}],
            "research_findings": [{"id": "f1", "topic": "Oslo", "description": "Fare reform", "citation": "x"}],
            "meetings": [{
                "id": "m1",
                "topic": "Oslo",
                "description": "Fare reform",
                "messages": [{"id": "a", "participant_name": "Meeting Topic: Oslo", "content": "Fare reform", "participant_id": null}],
                "is_complete": false,
                "turn_count": 0,
                "summary_report": null
            }],
            "final_report": "",
            "report_chat_messages": []
        }"#;

        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.people.len(), 1);
        assert_eq!(doc.meetings[0].messages.len(), 1);
        assert!(doc.meetings[0].summary_report.is_none());
        assert!(!doc.meetings[0].is_closed());
    }

    #[test]
    fn test_closed_meetings_filter() {
        let mut doc = SessionDocument::default();
        let mut open = Meeting::default();
        open.id = "open".to_string();
        let mut closed = Meeting::default();
        closed.id = "closed".to_string();
        closed.summary_report = Some("done".to_string());
        let mut blank = Meeting::default();
        blank.summary_report = Some(String::new());
        doc.meetings = vec![open, closed, blank];

        let ids: Vec<&str> = doc.closed_meetings().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["closed"]);
    }
}
