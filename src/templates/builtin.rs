// Built-in prompt templates

/// Built-in prompt ids
pub const DISCOVERY_MESSAGE: &str = "discovery-message";
pub const DISCOVERY_SUMMARIZE: &str = "discovery-summarize";
pub const PEOPLE_SYSTEM: &str = "people-system-prompt";
pub const PEOPLE_USER: &str = "people-user-prompt";
pub const RESEARCH_SYSTEM: &str = "research-system-prompt";
pub const RESEARCH_USER: &str = "research-user-prompt";
pub const MEETING_EXPERT_INSTRUCTIONS: &str = "meeting-expert-instructions";
pub const MEETING_SUB_REPORT: &str = "meeting-sub-report-prompt";
pub const REPORT_SYSTEM: &str = "report-system-prompt";
pub const REPORT_USER: &str = "report-user-prompt";
pub const REPORT_CHAT_SYSTEM: &str = "report-chat-system-prompt";
pub const REPORT_CHAT_USER: &str = "report-chat-user-prompt";

/// A compiled-in prompt and the placeholders it may reference
#[derive(Debug, Clone, Copy)]
pub struct BuiltinPrompt {
    pub id: &'static str,
    pub name: &'static str,
    pub content: &'static str,
    pub placeholders: &'static [&'static str],
}

/// All built-in prompts in workflow order
pub const BUILTIN_PROMPTS: &[BuiltinPrompt] = &[
    BuiltinPrompt {
        id: DISCOVERY_MESSAGE,
        name: "Discovery Message",
        content: DISCOVERY_MESSAGE_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: DISCOVERY_SUMMARIZE,
        name: "Discovery Summarize",
        content: DISCOVERY_SUMMARIZE_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: PEOPLE_SYSTEM,
        name: "People System Prompt",
        content: PEOPLE_SYSTEM_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: PEOPLE_USER,
        name: "People User Prompt",
        content: PEOPLE_USER_TEMPLATE,
        placeholders: &["executive_summary"],
    },
    BuiltinPrompt {
        id: RESEARCH_SYSTEM,
        name: "Research System Prompt",
        content: RESEARCH_SYSTEM_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: RESEARCH_USER,
        name: "Research User Prompt",
        content: RESEARCH_USER_TEMPLATE,
        placeholders: &["executive_summary"],
    },
    BuiltinPrompt {
        id: MEETING_EXPERT_INSTRUCTIONS,
        name: "Meeting Expert Instructions",
        content: MEETING_EXPERT_INSTRUCTIONS_TEMPLATE,
        placeholders: &[
            "person_title",
            "person_description",
            "summary",
            "meeting_topic",
            "meeting_description",
        ],
    },
    BuiltinPrompt {
        id: MEETING_SUB_REPORT,
        name: "Meeting Sub Report Prompt",
        content: MEETING_SUB_REPORT_TEMPLATE,
        placeholders: &["meeting_topic", "meeting_description", "transcript"],
    },
    BuiltinPrompt {
        id: REPORT_SYSTEM,
        name: "Report System Prompt",
        content: REPORT_SYSTEM_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: REPORT_USER,
        name: "Report User Prompt",
        content: REPORT_USER_TEMPLATE,
        placeholders: &["discovery_summary", "combined_sub_reports"],
    },
    BuiltinPrompt {
        id: REPORT_CHAT_SYSTEM,
        name: "Report Chat System Prompt",
        content: REPORT_CHAT_SYSTEM_TEMPLATE,
        placeholders: &[],
    },
    BuiltinPrompt {
        id: REPORT_CHAT_USER,
        name: "Report Chat User Prompt",
        content: REPORT_CHAT_USER_TEMPLATE,
        placeholders: &[
            "executive_summary",
            "final_report",
            "meeting_transcripts",
            "question",
        ],
    },
];

/// Look up a built-in prompt by id
pub fn get_builtin(id: &str) -> Option<&'static BuiltinPrompt> {
    BUILTIN_PROMPTS.iter().find(|p| p.id == id)
}

/// Placeholders a prompt id may reference, `None` for unknown ids
pub fn allowed_placeholders(id: &str) -> Option<&'static [&'static str]> {
    get_builtin(id).map(|p| p.placeholders)
}

const DISCOVERY_MESSAGE_TEMPLATE: &str = r#"You are going to ask me a series of small concise questions to get to understand a task that I will ask a think tank to tackle. This is the phase where you ask me questions to understand the task and not to find the solution. Ask me questions to see what I care about. Be smart about it, start with broad questions then narrow down to the details. Ask simple one line questions. Be friendly."#;

const DISCOVERY_SUMMARIZE_TEMPLATE: &str = r#"Write a concise summary of the task the user wants to achieve. It should be two paragraphs long. Make it read like an executive task summary from a management consultancy. Don't use hashtags for headings, just bold it."#;

const PEOPLE_SYSTEM_TEMPLATE: &str = r#"You are a helpful assistant that analyzes tasks and identifies appropriate people who could perform them. Return your results as a JSON array of objects with 'title' and 'description' fields."#;

const PEOPLE_USER_TEMPLATE: &str = r#"I'd like to assemble a team of five people from interdisciplinary backgrounds to tackle the following task. Each member should bring a unique perspective, from leading former projects in this space to understanding human behavior and designing strong incentives.

{{ executive_summary }}

Describe five people you would choose for this role. Make it diverse in the skillset. Be creative.

Return your response as a JSON array with exactly 5 objects, each having "title" and "description" fields. Example format:
[{"title": "Title Here", "description": "Description here"}, ...]"#;

const RESEARCH_SYSTEM_TEMPLATE: &str = r#"You will be working on researching information for a task. You are a consultant who finds current, accurate information from reliable sources. The user will provide an executive summary of the task at hand. Output each result with a clear topic name, a detailed description with specific facts, and a proper source citation."#;

const RESEARCH_USER_TEMPLATE: &str = r#"You are working as a consultant for a government client. Your role is to conduct research and identify relevant precedents and examples that can inform policy and implementation strategies.

You have been provided with an executive summary of a task that the user is working to accomplish:

{{ executive_summary }}

Your assignment is to find ten previous examples of similar work done by other nations, companies, organizations, or institutions that are relevant to accomplishing the task described in the executive summary.

Return your response as a JSON array with exactly 10 objects, each having "topic", "description", and "citation" fields. Example format:
[{"topic": "Topic Name", "description": "Detailed description", "citation": "Source URL or publication"}, ...]"#;

const MEETING_EXPERT_INSTRUCTIONS_TEMPLATE: &str = r#"This is who you are: {{ person_title }}. {{ person_description }}

Meeting context: {{ summary }}

Current focus: {{ meeting_topic }}. {{ meeting_description }}

Respond to your colleagues in one simple paragraph. Stay focused on the task, always raise your unique perspective, and collaborate with your team to build great ideas."#;

const MEETING_SUB_REPORT_TEMPLATE: &str = r#"You are creating a summary report for a meeting. The meeting was about:

Topic: {{ meeting_topic }}
Description: {{ meeting_description }}

Here is the full conversation transcript:
{{ transcript }}

Please create a concise summary report that captures:
1. The main insights and perspectives shared by team members
2. Key decisions or recommendations that emerged
3. Important concerns or considerations raised
4. Next steps or action items if any were discussed

Write this as a professional summary report in 2-3 paragraphs."#;

const REPORT_SYSTEM_TEMPLATE: &str = r#"You are a seasoned executive brief writer who has worked for senior government decision-makers. You are tasked with creating a comprehensive final report from the sub reports of various meetings. Create a cohesive report that tells a story. Highlight creative ideas. Give suggestions on implementation. Identify common themes and patterns across all meetings. Organize the ideas and insights in a logical structure. Use paragraphs and formal English. Use markdown formatting for headers and emphasis."#;

const REPORT_USER_TEMPLATE: &str = r#"Create the final report for the following task:

{{ discovery_summary }}

And here are the summaries from the meetings:
{{ combined_sub_reports }}"#;

const REPORT_CHAT_SYSTEM_TEMPLATE: &str = r#"You are an AI assistant helping to answer questions about a policy report and the meetings that led to it.

You have access to:
1. The final report that was generated
2. Full transcripts from all meetings between interdisciplinary experts
3. The original executive summary of the task

When answering questions:
- Search through all meeting transcripts to find relevant insights and nuances
- Quote specific experts when relevant
- Highlight interesting points that may not have made it into the final report
- Be thorough but concise"#;

const REPORT_CHAT_USER_TEMPLATE: &str = r#"EXECUTIVE SUMMARY:
{{ executive_summary }}

FINAL REPORT:
{{ final_report }}

ALL MEETING TRANSCRIPTS:
{{ meeting_transcripts }}

USER QUESTION:
{{ question }}

Please answer the user's question by searching through all the meeting transcripts and the final report. Include specific quotes from experts when relevant."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_are_unique() {
        let mut ids: Vec<&str> = BUILTIN_PROMPTS.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), BUILTIN_PROMPTS.len());
    }

    #[test]
    fn test_allowed_placeholders() {
        assert_eq!(
            allowed_placeholders(PEOPLE_USER),
            Some(&["executive_summary"][..])
        );
        assert_eq!(allowed_placeholders(DISCOVERY_MESSAGE), Some(&[][..]));
        assert!(allowed_placeholders("no-such-prompt").is_none());
    }
}
