//! JSONL parser for Claude Code session transcripts.
//!
//! Parses `~/.claude/projects/<encoded-cwd>/<session>.jsonl`. Only the entry
//! kinds needed to summarize a session are typed; everything else is
//! `Unknown`.

use std::path::Path;

use serde::Deserialize;

/// A single entry in a transcript file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TranscriptEntry {
    /// User message or tool result
    User(UserEntry),
    /// Assistant response
    Assistant(AssistantEntry),
    /// Session summary
    Summary(SummaryEntry),
    /// Unknown entry type (forward compatibility)
    #[serde(other)]
    Unknown,
}

/// User message entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub message: Message,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub is_sidechain: Option<bool>,
}

/// Assistant message entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub message: AssistantMessage,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub is_sidechain: Option<bool>,
}

/// Session summary entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryEntry {
    pub summary: String,
}

/// A user message with role and content.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Option<String>,
    pub content: MessageContent,
}

/// Assistant message content blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Message content - can be plain text or structured blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// A content block within a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl MessageContent {
    /// Get the text content as a string.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether this message only carries tool results.
    #[must_use]
    pub fn is_tool_result(&self) -> bool {
        match self {
            MessageContent::Text(_) => false,
            MessageContent::Blocks(blocks) => {
                !blocks.is_empty()
                    && blocks
                        .iter()
                        .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
            }
        }
    }
}

/// A tool invocation made by the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub name: String,
    pub input: serde_json::Value,
}

/// A parsed session transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Parse JSONL content, skipping malformed lines with a warning.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<TranscriptEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse transcript line: {}", e);
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Read and parse a transcript file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content))
    }

    /// All parsed entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Prompts typed by the user, excluding tool results and sidechains.
    #[must_use]
    pub fn user_prompts(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::User(u)
                    if u.is_sidechain != Some(true) && !u.message.content.is_tool_result() =>
                {
                    let text = u.message.content.as_text();
                    let text = text.trim();
                    (!text.is_empty()).then(|| text.to_string())
                }
                _ => None,
            })
            .collect()
    }

    /// Text written by the assistant, excluding sidechains.
    #[must_use]
    pub fn assistant_text(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Assistant(a) if a.is_sidechain != Some(true) => {
                    let text = a
                        .message
                        .content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::Text { text } => Some(text.trim()),
                            _ => None,
                        })
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n");
                    (!text.is_empty()).then_some(text)
                }
                _ => None,
            })
            .collect()
    }

    /// Tool calls made by the assistant, in order.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Assistant(a) => Some(&a.message.content),
                _ => None,
            })
            .flatten()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { name, input, .. } => Some(ToolUse {
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Summaries recorded by Claude Code for this session.
    #[must_use]
    pub fn summaries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Summary(s) => Some(s.summary.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Working directory recorded on the first entry that carries one.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            TranscriptEntry::User(u) => u.cwd.as_deref(),
            TranscriptEntry::Assistant(a) => a.cwd.as_deref(),
            _ => None,
        })
    }

    /// Condensed dialogue used as model input, keeping the most recent
    /// `max_chars` characters.
    #[must_use]
    pub fn condensed(&self, max_chars: usize) -> String {
        let mut parts = Vec::new();
        for entry in &self.entries {
            match entry {
                TranscriptEntry::User(u)
                    if u.is_sidechain != Some(true) && !u.message.content.is_tool_result() =>
                {
                    let text = u.message.content.as_text();
                    if !text.trim().is_empty() {
                        parts.push(format!("USER: {}", text.trim()));
                    }
                }
                TranscriptEntry::Assistant(a) if a.is_sidechain != Some(true) => {
                    for block in &a.message.content {
                        match block {
                            ContentBlock::Text { text } if !text.trim().is_empty() => {
                                parts.push(format!("ASSISTANT: {}", text.trim()));
                            }
                            ContentBlock::ToolUse { name, input, .. } => {
                                parts.push(format!("TOOL {name}: {}", tool_target(input)));
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let joined = parts.join("\n");
        let total = joined.chars().count();
        if total <= max_chars {
            return joined;
        }
        joined.chars().skip(total - max_chars).collect()
    }
}

/// Short description of what a tool call acts on.
fn tool_target(input: &serde_json::Value) -> String {
    ["file_path", "notebook_path", "path", "command", "pattern"]
        .iter()
        .find_map(|key| input.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.lines().next().unwrap_or_default().to_string())
        .unwrap_or_default()
}
