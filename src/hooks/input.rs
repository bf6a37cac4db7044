//! Hook input types for the Claude Code `Stop` event.

use serde::{Deserialize, Serialize};

/// Input received on stdin when a session stops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    /// The hook event name (`Stop`, `SessionEnd`, ...).
    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// The session ID for the current Claude Code session.
    #[serde(default)]
    pub session_id: String,

    /// Current working directory. Stop events often omit it.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Path to the transcript file.
    #[serde(default)]
    pub transcript_path: Option<String>,

    /// Whether the stop hook is already running.
    #[serde(default)]
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    /// Get the working directory if it was supplied and is non-empty.
    #[must_use]
    pub fn get_cwd(&self) -> Option<&str> {
        self.cwd.as_deref().filter(|c| !c.is_empty())
    }

    /// Get the transcript path if it was supplied and is non-empty.
    #[must_use]
    pub fn get_transcript_path(&self) -> Option<&str> {
        self.transcript_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether this invocation was triggered by our own stop hook.
    #[must_use]
    pub fn is_reentrant(&self) -> bool {
        self.stop_hook_active == Some(true)
    }
}

/// Response printed on stdout.
///
/// An empty object lets the session end normally; `systemMessage` shows a
/// non-blocking note to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookOutput {
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookOutput {
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            system_message: Some(format!("Context tracker error: {message}")),
        }
    }

    /// Serialize to the single JSON line expected by Claude Code.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
