//! Merging a session's facts into the wiki.

use chrono::NaiveDate;

use super::document::{KnowledgeDocument, SessionContext};
use super::similarity::{is_similar, DEFAULT_THRESHOLD};

/// Default number of sessions kept in `Recent Work`.
pub const DEFAULT_MAX_RECENT: i64 = 5;

/// Errors from merge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("max_size must be positive, got {0}")]
    InvalidMaxSize(i64),
}

/// Merge `incoming` facts into `existing`, dropping near-duplicates.
///
/// Incoming items are checked last-first against everything kept so far, so
/// within a batch the latest phrasing of a repeated fact wins. Kept items go
/// in front of `existing` in the order they were accepted: incoming
/// `[A, B, C]` over `[X]` yields `[C, B, A, X]`.
#[must_use]
pub fn dedupe(existing: &[String], incoming: &[String], threshold: f64) -> Vec<String> {
    let mut accepted: Vec<String> = Vec::new();

    for item in incoming.iter().rev() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let duplicate = accepted
            .iter()
            .chain(existing.iter())
            .any(|kept| is_similar(kept, item, threshold));

        if duplicate {
            tracing::debug!(item = %item, "Dropping near-duplicate wiki entry");
        } else {
            accepted.push(item.to_string());
        }
    }

    accepted.extend(existing.iter().cloned());
    accepted
}

/// Prepend `new_entry`, keeping at most `max_size` entries.
///
/// # Errors
///
/// Returns `MergeError::InvalidMaxSize` if `max_size` is zero or negative.
pub fn rotate(
    existing: &[String],
    new_entry: impl Into<String>,
    max_size: i64,
) -> Result<Vec<String>, MergeError> {
    let max = window_size(max_size)?;

    let mut rotated = Vec::with_capacity(existing.len().min(max) + 1);
    rotated.push(new_entry.into());
    rotated.extend(existing.iter().take(max - 1).cloned());
    Ok(rotated)
}

fn window_size(max_size: i64) -> Result<usize, MergeError> {
    usize::try_from(max_size)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(MergeError::InvalidMaxSize(max_size))
}

/// Merge one session into the wiki, dating the log line with today's date.
///
/// # Errors
///
/// Returns `MergeError::InvalidMaxSize` if `max_recent` is not positive.
pub fn merge_session(
    doc: &KnowledgeDocument,
    session: &SessionContext,
    max_recent: i64,
) -> Result<KnowledgeDocument, MergeError> {
    merge_session_at(doc, session, max_recent, chrono::Local::now().date_naive())
}

/// Merge one session into the wiki with an explicit log date.
///
/// Decisions and patterns are deduplicated, a `Recent Work` line is rotated in
/// when the session has content, and architecture is passed through.
///
/// # Errors
///
/// Returns `MergeError::InvalidMaxSize` if `max_recent` is not positive.
pub fn merge_session_at(
    doc: &KnowledgeDocument,
    session: &SessionContext,
    max_recent: i64,
    date: NaiveDate,
) -> Result<KnowledgeDocument, MergeError> {
    window_size(max_recent)?;

    let decisions = dedupe(&doc.decisions, &session.decisions_made, DEFAULT_THRESHOLD);
    let patterns = dedupe(
        &doc.patterns,
        &session.patterns_identified,
        DEFAULT_THRESHOLD,
    );

    let recent_work = match recent_work_line(session, date) {
        Some(line) => rotate(&doc.recent_work, line, max_recent)?,
        None => doc.recent_work.clone(),
    };

    tracing::debug!(
        decisions = decisions.len(),
        patterns = patterns.len(),
        recent_work = recent_work.len(),
        "Merged session into wiki"
    );

    Ok(KnowledgeDocument {
        architecture: doc.architecture.clone(),
        decisions,
        patterns,
        recent_work,
    })
}

/// Build the `Recent Work` entry for a session, if it has any content.
#[must_use]
pub fn recent_work_line(session: &SessionContext, date: NaiveDate) -> Option<String> {
    if !session.has_content() {
        return None;
    }

    let description = session
        .summary_text()
        .or_else(|| session.goal_text())
        .map_or_else(|| count_description(session), collapse_whitespace);

    Some(format!("[{}] {description}", date.format("%Y-%m-%d")))
}

fn count_description(session: &SessionContext) -> String {
    let mut parts = Vec::new();
    let decisions = session.decisions_made.len();
    if decisions > 0 {
        parts.push(format!(
            "Made {decisions} decision{}",
            if decisions == 1 { "" } else { "s" }
        ));
    }
    let problems = session.problems_solved.len();
    if problems > 0 {
        parts.push(format!(
            "solved {problems} problem{}",
            if problems == 1 { "" } else { "s" }
        ));
    }

    let text = parts.join(", ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
