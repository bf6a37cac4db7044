//! File changes derived from the assistant's tool calls.

use crate::wiki::{ChangeAction, FileChange};

use super::transcript::ToolUse;

/// Collect one change per touched file, in first-touch order.
///
/// `Write` creates a file unless the session already touched it, edit tools
/// modify it, and `rm` in a Bash command deletes it. A file created and then
/// edited stays a creation.
#[must_use]
pub fn extract_changes(tool_uses: &[ToolUse]) -> Vec<FileChange> {
    let mut changes: Vec<FileChange> = Vec::new();

    for tool in tool_uses {
        for (path, action, description) in classify(tool) {
            match changes.iter_mut().find(|c| c.file_path == path) {
                Some(existing) => {
                    let action = match (existing.action, action) {
                        (ChangeAction::Create, ChangeAction::Modify) => ChangeAction::Create,
                        (_, ChangeAction::Create) => ChangeAction::Modify,
                        (_, next) => next,
                    };
                    existing.action = action;
                    existing.description = description;
                }
                None => changes.push(FileChange::new(path, action, description)),
            }
        }
    }

    tracing::debug!(count = changes.len(), "Extracted file changes");
    changes
}

/// Human summary of changes, used when the model gives no summary.
#[must_use]
pub fn extract_reasoning(changes: &[FileChange]) -> String {
    if changes.is_empty() {
        return String::new();
    }

    let verb = |action: ChangeAction| match action {
        ChangeAction::Create => "Created",
        ChangeAction::Modify => "Modified",
        ChangeAction::Delete => "Deleted",
    };

    let first = changes[0].action;
    let prefix = if changes.iter().all(|c| c.action == first) {
        verb(first)
    } else {
        "Changed"
    };

    let names: Vec<&str> = changes.iter().take(5).map(FileChange::file_name).collect();
    let more = changes.len().saturating_sub(names.len());
    let noun = if changes.len() == 1 { "file" } else { "files" };

    let text = format!("{prefix} {} {noun}: {}", changes.len(), names.join(", "));
    if more > 0 {
        format!("{text} and {more} more")
    } else {
        text
    }
}

fn classify(tool: &ToolUse) -> Vec<(String, ChangeAction, String)> {
    let str_field = |key: &str| tool.input.get(key).and_then(|v| v.as_str());

    match tool.name.as_str() {
        "Write" => str_field("file_path")
            .map(|p| {
                let lines = str_field("content").map_or(0, |c| c.lines().count());
                vec![(
                    p.to_string(),
                    ChangeAction::Create,
                    format!("Wrote {lines} line{}", plural(lines)),
                )]
            })
            .unwrap_or_default(),
        "Edit" => str_field("file_path")
            .map(|p| vec![(p.to_string(), ChangeAction::Modify, "Edited 1 region".to_string())])
            .unwrap_or_default(),
        "MultiEdit" => str_field("file_path")
            .map(|p| {
                let edits = tool
                    .input
                    .get("edits")
                    .and_then(|e| e.as_array())
                    .map_or(1, Vec::len);
                vec![(
                    p.to_string(),
                    ChangeAction::Modify,
                    format!("Edited {edits} region{}", plural(edits)),
                )]
            })
            .unwrap_or_default(),
        "NotebookEdit" => str_field("notebook_path")
            .map(|p| vec![(p.to_string(), ChangeAction::Modify, "Edited notebook cell".to_string())])
            .unwrap_or_default(),
        "Bash" => str_field("command").map(removed_paths).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Paths removed by `rm` invocations in a shell command.
fn removed_paths(command: &str) -> Vec<(String, ChangeAction, String)> {
    command
        .split(['&', ';', '|', '\n'])
        .filter_map(|segment| {
            let mut words = segment.split_whitespace();
            (words.next() == Some("rm")).then_some(words)
        })
        .flat_map(|words| {
            words
                .filter(|w| !w.starts_with('-'))
                .map(|w| w.trim_matches(|c| c == '"' || c == '\'').to_string())
                .collect::<Vec<_>>()
        })
        .filter(|p| !p.is_empty())
        .map(|p| (p, ChangeAction::Delete, "Deleted file".to_string()))
        .collect()
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
