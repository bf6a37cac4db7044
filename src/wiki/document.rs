//! Wiki document and session data types.

use serde::{Deserialize, Serialize};

/// Parsed content of a project's `context.md` wiki.
///
/// Every list field is always present; an empty section is an empty `Vec`.
/// `architecture` is only read from legacy documents and never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeDocument {
    /// Free-text architecture notes from legacy documents.
    pub architecture: String,
    /// Decisions, most recent first.
    pub decisions: Vec<String>,
    /// Recurring patterns, most recent first.
    pub patterns: Vec<String>,
    /// Bounded log of recent sessions, most recent first.
    pub recent_work: Vec<String>,
}

impl KnowledgeDocument {
    /// Check whether no section carries any content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.architecture.is_empty()
            && self.decisions.is_empty()
            && self.patterns.is_empty()
            && self.recent_work.is_empty()
    }
}

/// Facts extracted from one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    /// What the user asked for.
    pub user_goal: Option<String>,
    /// One-paragraph summary of the work done.
    pub summary: Option<String>,
    /// Decisions taken during the session.
    pub decisions_made: Vec<String>,
    /// Problems that were solved.
    pub problems_solved: Vec<String>,
    /// Follow-up work left open.
    pub future_work: Vec<String>,
    /// Patterns observed in the codebase, when the extractor reports any.
    pub patterns_identified: Vec<String>,
}

impl SessionContext {
    /// Summary text with surrounding whitespace removed, if non-blank.
    #[must_use]
    pub fn summary_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// User goal with surrounding whitespace removed, if non-blank.
    #[must_use]
    pub fn goal_text(&self) -> Option<&str> {
        self.user_goal
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether the session produced anything worth logging.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.summary_text().is_some()
            || !self.decisions_made.is_empty()
            || !self.problems_solved.is_empty()
    }
}

/// Kind of change applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Modify,
    Delete,
}

impl ChangeAction {
    /// Capitalized label used in session entries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Modify => "Modify",
            Self::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A file touched during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    pub action: ChangeAction,
    pub description: String,
}

impl FileChange {
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        action: ChangeAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            action,
            description: description.into(),
        }
    }

    /// Final path component, or the whole path when it has none.
    #[must_use]
    pub fn file_name(&self) -> &str {
        std::path::Path::new(&self.file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.file_path)
    }
}
