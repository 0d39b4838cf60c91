//! Research Workflow Module - staged research sessions driven by a completion model
//!
//! ## Stages
//!
//! 1. **Discovery** - Chat that establishes the task
//! 2. **Task** - Executive summary of the chat
//! 3. **People** - Five expert personas
//! 4. **Research** - Ten precedents, each seeding a meeting
//! 5. **Meetings** - Round-robin expert discussion, user questions, summaries
//! 6. **Report** - Final report from closed meetings, plus report Q&A
//! 7. **Export** - Markdown report and full JSON data
//!
//! ## Layout
//!
//! - `stage` - stage order and entry preconditions
//! - `meeting` - transcript seeding, speaker rotation, turns, summaries
//! - `parsing` - JSON arrays out of free-form completion text
//! - `workflow` - `ResearchSession`, the session-scoped context every operation runs through

pub mod meeting;
pub mod parsing;
pub mod stage;
pub mod workflow;


pub use meeting::{MeetingEngine, SUMMARY_AUTHOR, SYSTEM_AUTHOR, USER_AUTHOR};
pub use parsing::{FINDING_COUNT, TEAM_SIZE};
pub use stage::{available_stages, check_entry, furthest_stage, stage_statuses, Stage, StageStatus};
pub use workflow::{
    JsonExport, MarkdownExport, MeetingSelection, ResearchSession, WorkflowSettings,
    JSON_EXPORT_FILE_NAME, MARKDOWN_EXPORT_FILE_NAME,
};
