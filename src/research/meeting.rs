//! Meeting engine: speaker rotation, expert turns, summaries and resets
//!
//! A meeting transcript always starts with one seed message authored by
//! [`SYSTEM_AUTHOR`] carrying the topic and description. Expert turns carry the
//! speaker's person id; user questions are authored by [`USER_AUTHOR`].

use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::{LabError, LabResult};
use crate::models::{Meeting, MeetingMessage, Message, Person, ResearchFinding};
use crate::templates::{builtin, PromptLibrary, TemplateVars};
use serde::{Deserialize, Serialize};

pub const SYSTEM_AUTHOR: &str = "System";
pub const USER_AUTHOR: &str = "You";
pub const SUMMARY_AUTHOR: &str = "Summary";

const READY_ACKNOWLEDGEMENT: &str = "Understood. I'm ready to participate in the meeting.";
const OPENING_REQUEST: &str = "Please share your initial thoughts on this topic.";

/// Build a fresh meeting for a research finding
pub fn initialize_meeting(finding: &ResearchFinding) -> Meeting {
    Meeting {
        id: uuid::Uuid::new_v4().to_string(),
        finding_id: finding.id.clone(),
        topic: finding.topic.clone(),
        description: finding.description.clone(),
        messages: vec![seed_message(&finding.topic, &finding.description)],
        summary_report: None,
    }
}

fn seed_message(topic: &str, description: &str) -> MeetingMessage {
    MeetingMessage::new(
        SYSTEM_AUTHOR,
        format!("Meeting Topic: {}\n\n{}", topic, description),
    )
}

/// Turn cursor for the selected meeting. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingEngine {
    turn_cursor: usize,
}

impl MeetingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn_cursor(&self) -> usize {
        self.turn_cursor
    }

    pub fn reset(&mut self) {
        self.turn_cursor = 0;
    }

    /// Resolve the next speaker index without moving the cursor
    pub fn peek_speaker(&self, people_len: usize, explicit: Option<usize>) -> LabResult<usize> {
        if people_len == 0 {
            return Err(LabError::precondition("The meeting has no participants"));
        }
        match explicit {
            Some(index) if index >= people_len => Err(LabError::validation(format!(
                "Speaker index {} is out of range (team has {} members)",
                index, people_len
            ))),
            Some(index) => Ok(index),
            None => Ok(self.turn_cursor % people_len),
        }
    }

    /// Record a completed turn. Explicit picks leave the rotation where it was.
    pub fn advance(&mut self, explicit: Option<usize>) {
        if explicit.is_none() {
            self.turn_cursor += 1;
        }
    }

    /// Pick the next speaker and move the rotation forward
    pub fn next_speaker(&mut self, people_len: usize, explicit: Option<usize>) -> LabResult<usize> {
        let index = self.peek_speaker(people_len, explicit)?;
        self.advance(explicit);
        Ok(index)
    }
}

/// Messages that count as discussion: expert turns and user questions
fn is_discussion(message: &MeetingMessage) -> bool {
    message.participant_id.is_some() || message.participant_name == USER_AUTHOR
}

/// Append a facilitator question. Does not move the turn cursor.
pub fn append_user_question(meeting: &mut Meeting, text: &str) -> LabResult<MeetingMessage> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LabError::validation("Question cannot be empty"));
    }
    let message = MeetingMessage::new(USER_AUTHOR, text);
    meeting.messages.push(message.clone());
    Ok(message)
}

/// The facilitator question still waiting for an answer, if the transcript ends with one
pub fn pending_question(meeting: &Meeting) -> Option<&str> {
    meeting
        .messages
        .iter()
        .skip(1)
        .last()
        .filter(|m| m.participant_name == USER_AUTHOR)
        .map(|m| m.content.as_str())
}

/// Conversation history for one expert turn
pub fn build_response_history(
    prompts: &PromptLibrary,
    person: &Person,
    meeting: &Meeting,
    summary: &str,
) -> LabResult<Vec<Message>> {
    let instructions = prompts.render(
        builtin::MEETING_EXPERT_INSTRUCTIONS,
        &TemplateVars::new()
            .with("person_title", person.title.as_str())
            .with("person_description", person.description.as_str())
            .with("summary", summary)
            .with("meeting_topic", meeting.topic.as_str())
            .with("meeting_description", meeting.description.as_str()),
    )?;

    let mut history = vec![
        Message::user(instructions),
        Message::assistant(READY_ACKNOWLEDGEMENT),
    ];

    let question = pending_question(meeting);
    let discussion: Vec<&MeetingMessage> = meeting
        .messages
        .iter()
        .skip(1)
        .filter(|m| is_discussion(m))
        .collect();
    let replayed = if question.is_some() {
        &discussion[..discussion.len().saturating_sub(1)]
    } else {
        &discussion[..]
    };

    for message in replayed {
        history.push(Message::user(format!(
            "{} said: {}\n\nPlease respond as the {}.",
            message.participant_name, message.content, person.title
        )));
    }

    if meeting.messages.len() <= 1 {
        history.push(Message::user(OPENING_REQUEST));
    } else if let Some(question) = question {
        history.push(Message::user(format!(
            "The facilitator asks you directly: {}\n\nPlease respond as the {}.",
            question, person.title
        )));
    }

    Ok(history)
}

/// Discussion transcript used for meeting summaries
pub fn build_transcript(meeting: &Meeting) -> String {
    meeting
        .messages
        .iter()
        .skip(1)
        .filter(|m| is_discussion(m))
        .map(|m| format!("[{}]:\n{}", m.participant_name, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Every meeting's discussion and summary, for answering questions about the report
pub fn build_meetings_context(meetings: &[Meeting]) -> String {
    let mut context = String::new();
    for (i, meeting) in meetings.iter().enumerate() {
        context.push_str(&format!("=== MEETING {}: {} ===\n", i + 1, meeting.topic));
        context.push_str(&format!("Description: {}\n", meeting.description));
        context.push_str("Meeting Transcript:\n");
        for message in meeting.messages.iter().skip(1) {
            context.push_str(&format!(
                "\n[{}]: {}",
                message.participant_name, message.content
            ));
        }
        if let Some(summary) = meeting.summary_report.as_deref().filter(|s| !s.is_empty()) {
            context.push_str(&format!("\n\nMeeting Summary: {}", summary));
        }
        context.push_str("\n\n---\n\n");
    }
    context
}

/// Ask `person` for their next contribution and append it to the transcript
pub async fn request_response(
    client: &dyn CompletionClient,
    prompts: &PromptLibrary,
    person: &Person,
    meeting: &mut Meeting,
    summary: &str,
) -> LabResult<MeetingMessage> {
    let history = build_response_history(prompts, person, meeting, summary)?;
    let response = client.complete(CompletionRequest::new(history)).await?;

    let message = MeetingMessage::from_participant(&person.id, person.title.as_str(), response);
    meeting.messages.push(message.clone());
    log::debug!(
        "'{}' spoke in meeting '{}' ({} messages)",
        person.title,
        meeting.topic,
        meeting.messages.len()
    );
    Ok(message)
}

/// Write the meeting's summary report. Requires at least one message past the seed.
pub async fn summarize(
    client: &dyn CompletionClient,
    prompts: &PromptLibrary,
    meeting: &mut Meeting,
) -> LabResult<String> {
    if meeting.messages.len() <= 1 {
        return Err(LabError::precondition(format!(
            "Meeting '{}' has no discussion to summarize",
            meeting.topic
        )));
    }

    let prompt = prompts.render(
        builtin::MEETING_SUB_REPORT,
        &TemplateVars::new()
            .with("meeting_topic", meeting.topic.as_str())
            .with("meeting_description", meeting.description.as_str())
            .with("transcript", build_transcript(meeting)),
    )?;

    let report = client.complete(CompletionRequest::prompt(prompt)).await?;

    meeting
        .messages
        .push(MeetingMessage::new(SUMMARY_AUTHOR, report.as_str()));
    meeting.summary_report = Some(report.clone());
    log::info!("Summarized meeting '{}'", meeting.topic);
    Ok(report)
}

/// Restore the meeting to its seed message. Requires explicit confirmation.
pub fn reset_meeting(meeting: &mut Meeting, confirmed: bool) -> LabResult<()> {
    if !confirmed {
        return Err(LabError::precondition(format!(
            "Resetting meeting '{}' discards its transcript and must be confirmed",
            meeting.topic
        )));
    }
    meeting.messages = vec![seed_message(&meeting.topic, &meeting.description)];
    meeting.summary_report = None;
    log::info!("Reset meeting '{}'", meeting.topic);
    Ok(())
}
