//! Prompts for session summarization and architecture generation.

use crate::wiki::FileChange;

/// System prompt for extracting a session summary as JSON.
pub const SESSION_SYSTEM_PROMPT: &str = r#"You summarize coding sessions into durable project knowledge.

Read the session and reply with a single JSON object, nothing else:

{
  "user_goal": "what the user set out to do, one sentence",
  "summary": "what was accomplished, one or two sentences",
  "decisions_made": ["technical decisions with their rationale"],
  "problems_solved": ["problems hit and how they were fixed"],
  "future_work": ["follow-ups left open"],
  "patterns_identified": ["conventions or recurring patterns in this codebase"]
}

Rules:
- Record only facts visible in the session. Leave a list empty rather than guess.
- Write each item as one self-contained sentence.
- Prefix the summary with the most relevant topic tag in brackets when one applies.
"#;

/// System prompt for generating an architecture overview.
pub const ARCHITECT_SYSTEM_PROMPT: &str = r"You write concise architecture overviews of software projects.

Given the project's knowledge file and the files changed in the latest session,
describe the components, how they interact, and the main data flow.
Use markdown with short sections. Do not invent components you cannot see.

Wrap the complete document in <architecture_md></architecture_md> tags.
";

/// Tag delimiting the architecture document in a model reply.
pub const ARCHITECTURE_TAG: &str = "architecture_md";

/// Build the user message for session summarization.
#[must_use]
pub fn format_session_prompt(
    user_prompts: &[String],
    transcript: &str,
    changes: &[FileChange],
    topics: &[String],
) -> String {
    let mut prompt = String::new();

    if !topics.is_empty() {
        prompt.push_str(&format!("Topics: {}\n\n", topics.join(", ")));
    }

    if !user_prompts.is_empty() {
        prompt.push_str("User requests:\n");
        for (i, p) in user_prompts.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, p.trim()));
        }
        prompt.push('\n');
    }

    if !changes.is_empty() {
        prompt.push_str("Files changed:\n");
        prompt.push_str(&format_changes(changes));
        prompt.push('\n');
    }

    if !transcript.is_empty() {
        prompt.push_str(&format!(
            "Session transcript (most recent part):\n{transcript}\n"
        ));
    }

    prompt
}

/// Build the user message for architecture generation.
#[must_use]
pub fn format_architect_prompt(context_md: &str, changes: &[FileChange]) -> String {
    let context = if context_md.trim().is_empty() {
        "(empty)"
    } else {
        context_md.trim()
    };

    format!(
        "Project knowledge file:\n{context}\n\nFiles changed in the latest session:\n{}",
        format_changes(changes)
    )
}

fn format_changes(changes: &[FileChange]) -> String {
    changes
        .iter()
        .map(|c| format!("- {} {}: {}\n", c.action.label(), c.file_path, c.description))
        .collect()
}
