//! Section parser for `context.md` wiki files.
//!
//! Top-level `## Section` headings are located with comrak so that `###`
//! headings and `##` lines inside fenced code are never mistaken for section
//! boundaries. A fence that is never closed only hides headings up to the
//! end of its own line range; every `## ` line after its opening still counts.
//! Bullets inside a section are then picked out line by line.

use std::sync::LazyLock;

use comrak::nodes::NodeValue;
use comrak::{parse_document, Arena, Options};
use regex::Regex;

use super::document::KnowledgeDocument;

/// Heading text of the legacy architecture section.
pub const ARCHITECTURE: &str = "Architecture";
/// Heading text of the decisions section.
pub const DECISIONS: &str = "Decisions";
/// Heading text of the patterns section.
pub const PATTERNS: &str = "Patterns";
/// Heading text of the recent work section.
pub const RECENT_WORK: &str = "Recent Work";

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s+(.+)$").expect("bullet pattern is valid"));
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_No .+ yet\._").expect("placeholder pattern is valid"));

/// Errors from parsing a wiki document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Wiki content is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Heading at line {line} is outside the document ({total} lines)")]
    Structure { line: usize, total: usize },
}

/// A top-level section heading found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Heading {
    /// Zero-based line index of the heading line.
    line: usize,
    title: String,
}

/// Parse wiki markdown, propagating structural failures.
///
/// # Errors
///
/// Returns `ParseError::Structure` if the markdown parser reports a heading
/// position that does not exist in the input.
pub fn try_parse(content: &str) -> Result<KnowledgeDocument, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let headings = top_level_headings(content, &lines)?;

    let architecture = section_body(&lines, &headings, ARCHITECTURE)
        .map(|body| body.join("\n").trim().to_string())
        .unwrap_or_default();

    Ok(KnowledgeDocument {
        architecture,
        decisions: list_items(&lines, &headings, DECISIONS),
        patterns: list_items(&lines, &headings, PATTERNS),
        recent_work: list_items(&lines, &headings, RECENT_WORK),
    })
}

/// Parse wiki markdown, falling back to an empty document on failure.
#[must_use]
pub fn parse(content: &str) -> KnowledgeDocument {
    try_parse(content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Wiki parse failed, treating as empty");
        KnowledgeDocument::default()
    })
}

/// Parse raw file bytes, falling back to an empty document on failure.
#[must_use]
pub fn parse_bytes(bytes: &[u8]) -> KnowledgeDocument {
    match std::str::from_utf8(bytes) {
        Ok(content) => parse(content),
        Err(e) => {
            tracing::warn!(error = %ParseError::from(e), "Wiki parse failed, treating as empty");
            KnowledgeDocument::default()
        }
    }
}

/// Returns true when `context.md` bytes hold something other than a wiki,
/// such as an old per-session log.
///
/// A file is a wiki as soon as one known section heading is present, even if
/// every section only carries a placeholder. Blank files are not legacy.
/// Bytes that are not UTF-8 are treated as legacy so they are never
/// overwritten.
#[must_use]
pub fn is_legacy_format(bytes: &[u8]) -> bool {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return false;
    }
    let Ok(content) = std::str::from_utf8(bytes) else {
        return true;
    };
    let lines: Vec<&str> = content.lines().collect();
    match top_level_headings(content, &lines) {
        Ok(headings) => !headings.iter().any(|h| {
            [ARCHITECTURE, DECISIONS, PATTERNS, RECENT_WORK]
                .iter()
                .any(|name| title_matches(&h.title, name))
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Wiki parse failed, treating as legacy");
            true
        }
    }
}

/// Returns true when architecture or patterns still need enrichment.
///
/// Decisions and recent work are filled by every session, so only the two
/// slow-moving sections are checked.
#[must_use]
pub fn has_empty_sections(doc: &KnowledgeDocument) -> bool {
    if doc.architecture.trim().is_empty() || is_placeholder(&doc.architecture) {
        return true;
    }
    doc.patterns.is_empty()
}

/// Check whether a line is a placeholder such as `_No decisions yet._`.
#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER.is_match(text.trim())
}

fn top_level_headings(content: &str, lines: &[&str]) -> Result<Vec<Heading>, ParseError> {
    let arena = Arena::new();
    let options = Options::default();
    let root = parse_document(&arena, content, &options);

    let mut headings = Vec::new();
    for node in root.children() {
        let ast = node.data.borrow();
        let heading = match &ast.value {
            NodeValue::Heading(heading) => heading,
            NodeValue::CodeBlock(block) if block.fenced => {
                let open = ast.sourcepos.start.line.saturating_sub(1);
                let fence = char::from(block.fence_char);
                if !has_closing_fence(lines, open, fence, block.fence_length) {
                    // The unclosed fence swallowed the rest of the document.
                    headings.extend(line_headings(lines, open + 1));
                    break;
                }
                continue;
            }
            _ => continue,
        };
        if heading.level != 2 {
            continue;
        }

        let line = ast.sourcepos.start.line.saturating_sub(1);
        let raw = lines.get(line).ok_or(ParseError::Structure {
            line: ast.sourcepos.start.line,
            total: lines.len(),
        })?;

        // Setext and indented headings are not section boundaries.
        let Some(title) = heading_title(raw) else {
            continue;
        };
        headings.push(Heading { line, title });
    }
    Ok(headings)
}

fn heading_title(raw: &str) -> Option<String> {
    raw.strip_prefix("## ")
        .map(|title| title.trim().trim_end_matches('#').trim().to_string())
}

/// `## ` lines from `start` to the end, with no block structure applied.
fn line_headings(lines: &[&str], start: usize) -> Vec<Heading> {
    lines
        .iter()
        .enumerate()
        .skip(start)
        .filter_map(|(line, raw)| heading_title(raw).map(|title| Heading { line, title }))
        .collect()
}

/// Whether a fence opened on line `open` is closed by a later line of at
/// least `len` fence characters, indented at most three spaces.
fn has_closing_fence(lines: &[&str], open: usize, fence: char, len: usize) -> bool {
    lines.iter().skip(open + 1).any(|line| {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let body = line.trim_start_matches(' ');
        let run = body.chars().take_while(|&c| c == fence).count();
        indent <= 3 && run >= len && body[run * fence.len_utf8()..].trim().is_empty()
    })
}

fn title_matches(title: &str, name: &str) -> bool {
    title
        .strip_prefix(name)
        .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
}

/// Lines between the named heading and the next top-level heading.
fn section_body<'a>(lines: &[&'a str], headings: &[Heading], name: &str) -> Option<Vec<&'a str>> {
    let idx = headings.iter().position(|h| title_matches(&h.title, name))?;
    let start = headings[idx].line + 1;
    let end = headings.get(idx + 1).map_or(lines.len(), |h| h.line);
    Some(lines.get(start..end).unwrap_or_default().to_vec())
}

fn list_items(lines: &[&str], headings: &[Heading], name: &str) -> Vec<String> {
    section_body(lines, headings, name)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|line| BULLET.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
