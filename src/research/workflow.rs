//! Session-scoped workflow context
//!
//! A `ResearchSession` owns one loaded session document together with the
//! meeting selection and its turn cursor. Every stage operation goes through
//! it, and every successful mutation is written back before returning.

use super::meeting::{self, MeetingEngine};
use super::parsing::{parse_findings, parse_people};
use super::stage::{check_entry, stage_statuses, Stage, StageStatus};
use crate::completion::{CompletionRequest, SharedCompletionClient};
use crate::config::{LabConfig, ReportChatPolicy, DEFAULT_MEETING_TURNS};
use crate::error::{LabError, LabResult};
use crate::file_storage::SessionStore;
use crate::models::{
    Meeting, MeetingMessage, Message, Person, ResearchFinding, SessionDescriptor, SessionDocument,
};
use crate::templates::{builtin, PromptLibrary, TemplateVars};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MARKDOWN_EXPORT_FILE_NAME: &str = "virtual_lab_report.md";
pub const JSON_EXPORT_FILE_NAME: &str = "virtual_lab_full_export.json";

/// Workflow knobs taken from the user configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub default_meeting_turns: usize,
    pub report_chat_policy: ReportChatPolicy,
}

impl WorkflowSettings {
    pub fn from_config(config: &LabConfig) -> Self {
        Self {
            default_meeting_turns: config.default_meeting_turns,
            report_chat_policy: config.report_chat_on_regenerate,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_meeting_turns: DEFAULT_MEETING_TURNS,
            report_chat_policy: ReportChatPolicy::default(),
        }
    }
}

/// The selected meeting and its rotation state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSelection {
    pub meeting_id: Option<String>,
    pub engine: MeetingEngine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownExport {
    pub file_name: String,
    pub content: String,
}

/// Full data export. Keys stay snake_case to match session documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonExport {
    pub summary: String,
    pub people: Vec<Person>,
    pub research_findings: Vec<ResearchFinding>,
    pub meetings: Vec<Meeting>,
    pub final_report: String,
    pub exported_at: DateTime<Utc>,
}

pub struct ResearchSession {
    id: String,
    store: SessionStore,
    prompts: PromptLibrary,
    client: SharedCompletionClient,
    settings: WorkflowSettings,
    document: SessionDocument,
    selection: MeetingSelection,
}

impl ResearchSession {
    /// Load a session from the store
    pub fn open(
        store: SessionStore,
        id: &str,
        prompts: PromptLibrary,
        client: SharedCompletionClient,
        settings: WorkflowSettings,
    ) -> LabResult<Self> {
        let document = store.load(id)?;
        Ok(Self {
            id: id.to_string(),
            store,
            prompts,
            client,
            settings,
            document,
            selection: MeetingSelection::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &SessionDocument {
        &self.document
    }

    pub fn descriptor(&self) -> LabResult<SessionDescriptor> {
        self.store.descriptor(&self.id)
    }

    pub fn selection(&self) -> &MeetingSelection {
        &self.selection
    }

    /// Reinstate a selection carried over from an earlier request.
    /// A selection pointing at a meeting that no longer exists is dropped.
    pub fn restore_selection(&mut self, selection: MeetingSelection) {
        let still_exists = selection
            .meeting_id
            .as_deref()
            .map_or(false, |id| self.document.meeting_index(id).is_some());
        self.selection = if still_exists {
            selection
        } else {
            MeetingSelection::default()
        };
    }

    pub fn stage_status(&self) -> Vec<StageStatus> {
        stage_statuses(&self.document)
    }

    /// Write `next` and adopt it only once it is on disk. A failed write
    /// leaves the in-memory document as it was.
    fn commit(&mut self, next: SessionDocument) -> LabResult<SessionDescriptor> {
        let descriptor = self.store.replace(&self.id, &next)?;
        self.document = next;
        Ok(descriptor)
    }

    async fn complete(&self, request: CompletionRequest) -> LabResult<String> {
        self.client.complete(request).await
    }

    // Discovery and task

    /// Send a discovery chat message and store both sides once the reply arrives
    pub async fn post_discovery_message(&mut self, text: &str) -> LabResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LabError::validation("Message cannot be empty"));
        }

        let instruction = self
            .prompts
            .render(builtin::DISCOVERY_MESSAGE, &TemplateVars::new())?;
        let mut history = self.document.messages.clone();
        history.push(Message::user(text));
        history.push(Message::user(instruction));

        let reply = Message::assistant(self.complete(CompletionRequest::new(history)).await?);

        let mut next = self.document.clone();
        next.messages.push(Message::user(text));
        next.messages.push(reply.clone());
        self.commit(next)?;
        Ok(reply)
    }

    pub async fn generate_summary(&mut self) -> LabResult<String> {
        check_entry(Stage::Task, &self.document)?;

        let instruction = self
            .prompts
            .render(builtin::DISCOVERY_SUMMARIZE, &TemplateVars::new())?;
        let mut history = self.document.messages.clone();
        history.push(Message::user(instruction));

        let summary = self.complete(CompletionRequest::new(history)).await?;
        let mut next = self.document.clone();
        next.summary = summary.clone();
        self.commit(next)?;
        log::info!("Generated task summary for session {}", self.id);
        Ok(summary)
    }

    /// Manual edit. Downstream artifacts are left as they are.
    pub fn update_summary(&mut self, text: &str) -> LabResult<()> {
        let mut next = self.document.clone();
        next.summary = text.to_string();
        self.commit(next)?;
        Ok(())
    }

    // People and research

    pub async fn generate_people(&mut self) -> LabResult<Vec<Person>> {
        check_entry(Stage::People, &self.document)?;

        let system = self
            .prompts
            .render(builtin::PEOPLE_SYSTEM, &TemplateVars::new())?;
        let prompt = self.prompts.render(
            builtin::PEOPLE_USER,
            &TemplateVars::new().with("executive_summary", self.document.summary.as_str()),
        )?;

        let response = self
            .complete(CompletionRequest::prompt(prompt).with_system(system))
            .await?;
        let people = parse_people(&response)?;

        let mut next = self.document.clone();
        next.people = people.clone();
        self.commit(next)?;
        log::info!("Generated {} people for session {}", people.len(), self.id);
        Ok(people)
    }

    pub fn update_person(&mut self, id: &str, title: &str, description: &str) -> LabResult<Person> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LabError::validation("Person title cannot be empty"));
        }
        let mut next = self.document.clone();
        let person = next
            .people
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LabError::not_found("Person", id))?;

        person.title = title.to_string();
        person.description = description.to_string();
        let updated = person.clone();
        self.commit(next)?;
        Ok(updated)
    }

    /// Replace findings and meetings together, one seeded meeting per finding
    pub async fn generate_research(&mut self) -> LabResult<Vec<ResearchFinding>> {
        check_entry(Stage::Research, &self.document)?;

        let system = self
            .prompts
            .render(builtin::RESEARCH_SYSTEM, &TemplateVars::new())?;
        let prompt = self.prompts.render(
            builtin::RESEARCH_USER,
            &TemplateVars::new().with("executive_summary", self.document.summary.as_str()),
        )?;

        let response = self
            .complete(CompletionRequest::prompt(prompt).with_system(system))
            .await?;
        let findings = parse_findings(&response)?;

        let mut next = self.document.clone();
        next.meetings = findings.iter().map(meeting::initialize_meeting).collect();
        next.research_findings = findings.clone();
        self.commit(next)?;
        self.selection = MeetingSelection::default();
        log::info!(
            "Generated {} findings and meetings for session {}",
            findings.len(),
            self.id
        );
        Ok(findings)
    }

    // Meetings

    pub fn select_meeting(&mut self, meeting_id: &str) -> LabResult<Meeting> {
        check_entry(Stage::Meetings, &self.document)?;
        let index = self
            .document
            .meeting_index(meeting_id)
            .ok_or_else(|| LabError::not_found("Meeting", meeting_id))?;

        self.selection = MeetingSelection {
            meeting_id: Some(meeting_id.to_string()),
            engine: MeetingEngine::new(),
        };
        Ok(self.document.meetings[index].clone())
    }

    fn selected_index(&self) -> LabResult<usize> {
        let id = self
            .selection
            .meeting_id
            .as_deref()
            .ok_or_else(|| LabError::precondition("No meeting is selected"))?;
        self.document
            .meeting_index(id)
            .ok_or_else(|| LabError::not_found("Meeting", id))
    }

    pub fn selected_meeting(&self) -> LabResult<&Meeting> {
        Ok(&self.document.meetings[self.selected_index()?])
    }

    /// Pick the next speaker and advance the rotation without speaking
    pub fn next_speaker(&mut self, explicit: Option<usize>) -> LabResult<Person> {
        self.selected_index()?;
        let index = self
            .selection
            .engine
            .next_speaker(self.document.people.len(), explicit)?;
        Ok(self.document.people[index].clone())
    }

    pub fn append_question(&mut self, text: &str) -> LabResult<MeetingMessage> {
        let index = self.selected_index()?;
        let mut next = self.document.clone();
        let message = meeting::append_user_question(&mut next.meetings[index], text)?;
        self.commit(next)?;
        Ok(message)
    }

    /// One expert turn in the selected meeting.
    ///
    /// The speaker and question are validated before any call. An optional
    /// question is appended only together with the answer, so a failed call
    /// or write leaves the transcript and the rotation untouched.
    pub async fn take_turn(
        &mut self,
        explicit: Option<usize>,
        question: Option<&str>,
    ) -> LabResult<MeetingMessage> {
        let index = self.selected_index()?;
        let speaker = self
            .selection
            .engine
            .peek_speaker(self.document.people.len(), explicit)?;
        let person = self.document.people[speaker].clone();

        let mut working = self.document.meetings[index].clone();
        if let Some(question) = question {
            meeting::append_user_question(&mut working, question)?;
        }

        let message = meeting::request_response(
            self.client.as_ref(),
            &self.prompts,
            &person,
            &mut working,
            &self.document.summary,
        )
        .await?;

        let mut next = self.document.clone();
        next.meetings[index] = working;
        self.commit(next)?;
        self.selection.engine.advance(explicit);
        Ok(message)
    }

    /// Run `turns` round-robin turns, persisting after each.
    /// Stops at the first failure; completed turns are kept.
    pub async fn auto_run(&mut self, turns: usize) -> LabResult<Vec<MeetingMessage>> {
        if turns == 0 {
            return Err(LabError::validation("Number of turns must be at least 1"));
        }
        self.selected_index()?;

        let mut messages = Vec::with_capacity(turns);
        for turn in 0..turns {
            match self.take_turn(None, None).await {
                Ok(message) => messages.push(message),
                Err(e) => {
                    log::warn!(
                        "Auto-run stopped after {} of {} turns in session {}: {}",
                        turn,
                        turns,
                        self.id,
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(messages)
    }

    pub async fn summarize_meeting(&mut self) -> LabResult<String> {
        let index = self.selected_index()?;
        let mut working = self.document.meetings[index].clone();
        let report = meeting::summarize(self.client.as_ref(), &self.prompts, &mut working).await?;

        let mut next = self.document.clone();
        next.meetings[index] = working;
        self.commit(next)?;
        Ok(report)
    }

    pub fn reset_meeting(&mut self, confirmed: bool) -> LabResult<Meeting> {
        let index = self.selected_index()?;
        let mut next = self.document.clone();
        meeting::reset_meeting(&mut next.meetings[index], confirmed)?;
        self.commit(next)?;
        self.selection.engine.reset();
        Ok(self.document.meetings[index].clone())
    }

    /// Select, auto-run and summarize one meeting
    pub async fn run_meeting(&mut self, meeting_id: &str, turns: Option<usize>) -> LabResult<Meeting> {
        let turns = turns.unwrap_or(self.settings.default_meeting_turns);
        self.select_meeting(meeting_id)?;
        self.auto_run(turns).await?;
        self.summarize_meeting().await?;
        self.selected_meeting().cloned()
    }

    /// Run every meeting without a summary report, in order. Returns the ids run.
    pub async fn run_all_meetings(&mut self, turns: Option<usize>) -> LabResult<Vec<String>> {
        check_entry(Stage::Meetings, &self.document)?;
        let pending: Vec<String> = self
            .document
            .meetings
            .iter()
            .filter(|m| !m.is_closed())
            .map(|m| m.id.clone())
            .collect();

        log::info!(
            "Running {} open meetings in session {}",
            pending.len(),
            self.id
        );
        for id in &pending {
            self.run_meeting(id, turns).await?;
        }
        Ok(pending)
    }

    // Report

    /// Sub-reports of closed meetings, numbered among closed meetings only
    fn combined_sub_reports(&self) -> String {
        self.document
            .closed_meetings()
            .enumerate()
            .map(|(i, m)| {
                format!(
                    "=== Meeting {} Summary ===\n\n{}",
                    i + 1,
                    m.summary_report.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    pub async fn generate_report(&mut self) -> LabResult<String> {
        check_entry(Stage::Report, &self.document)?;

        let system = self
            .prompts
            .render(builtin::REPORT_SYSTEM, &TemplateVars::new())?;
        let prompt = self.prompts.render(
            builtin::REPORT_USER,
            &TemplateVars::new()
                .with("discovery_summary", self.document.summary.as_str())
                .with("combined_sub_reports", self.combined_sub_reports()),
        )?;

        let report = self
            .complete(CompletionRequest::prompt(prompt).with_system(system))
            .await?;

        let mut next = self.document.clone();
        next.final_report = report.clone();
        if self.settings.report_chat_policy == ReportChatPolicy::Clear {
            next.report_chat_messages.clear();
        }
        self.commit(next)?;
        log::info!("Generated final report for session {}", self.id);
        Ok(report)
    }

    pub async fn ask_report_question(&mut self, text: &str) -> LabResult<Message> {
        if self.document.final_report.trim().is_empty() {
            return Err(LabError::precondition(
                "Generate the final report before asking questions about it",
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(LabError::validation("Question cannot be empty"));
        }

        let system = self
            .prompts
            .render(builtin::REPORT_CHAT_SYSTEM, &TemplateVars::new())?;
        let prompt = self.prompts.render(
            builtin::REPORT_CHAT_USER,
            &TemplateVars::new()
                .with("executive_summary", self.document.summary.as_str())
                .with("final_report", self.document.final_report.as_str())
                .with(
                    "meeting_transcripts",
                    meeting::build_meetings_context(&self.document.meetings),
                )
                .with("question", text),
        )?;

        let answer = Message::assistant(
            self.complete(CompletionRequest::prompt(prompt).with_system(system))
                .await?,
        );

        let mut next = self.document.clone();
        next.report_chat_messages.push(Message::user(text));
        next.report_chat_messages.push(answer.clone());
        self.commit(next)?;
        Ok(answer)
    }

    // Export

    pub fn export_markdown(&self) -> LabResult<MarkdownExport> {
        check_entry(Stage::Export, &self.document)?;
        Ok(MarkdownExport {
            file_name: MARKDOWN_EXPORT_FILE_NAME.to_string(),
            content: self.document.final_report.clone(),
        })
    }

    pub fn export_json(&self) -> JsonExport {
        JsonExport {
            summary: self.document.summary.clone(),
            people: self.document.people.clone(),
            research_findings: self.document.research_findings.clone(),
            meetings: self.document.meetings.clone(),
            final_report: self.document.final_report.clone(),
            exported_at: Utc::now(),
        }
    }
}
