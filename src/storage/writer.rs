//! Markdown files under a project's context directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncWriteExt;

use crate::session::GENERAL_TOPIC;
use crate::wiki::{render, FileChange, KnowledgeDocument, SessionContext, DOCUMENT_TITLE};

/// The project wiki.
pub const CONTEXT_FILE: &str = "context.md";
/// Generated architecture overview.
pub const ARCHITECTURE_FILE: &str = "architecture.md";
/// Marker written once legacy topic files have been removed.
pub const MIGRATED_MARKER: &str = ".migrated";
/// Subdirectory receiving copied plan files.
pub const PLANS_DIR: &str = "plans";

/// Errors from reading or writing context files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a file atomically (temp file + sync + rename), creating parents.
///
/// # Errors
///
/// Returns an error if any filesystem step fails.
pub async fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .map_err(io_error(&temp_path))?;
    file.write_all(content.as_bytes())
        .await
        .map_err(io_error(&temp_path))?;
    file.sync_data().await.map_err(io_error(&temp_path))?;
    drop(file);

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(io_error(path))
}

/// Raw bytes of `context.md`, or `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub async fn read_context(dir: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    let path = dir.join(CONTEXT_FILE);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(&path)(e)),
    }
}

/// Render the wiki and write it to `context.md`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_wiki(doc: &KnowledgeDocument, dir: &Path) -> Result<PathBuf, StorageError> {
    let path = dir.join(CONTEXT_FILE);
    write_atomic(&path, &render(doc)).await?;
    tracing::info!(path = %path.display(), "Wrote project wiki");
    Ok(path)
}

/// Prepend a dated session entry to `context.md`, below the title.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub async fn append_session(
    dir: &Path,
    topics: &[String],
    changes: &[FileChange],
    reasoning: &str,
    context: &SessionContext,
) -> Result<PathBuf, StorageError> {
    append_session_at(dir, topics, changes, reasoning, context, Local::now().naive_local()).await
}

/// [`append_session`] with an explicit timestamp.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub async fn append_session_at(
    dir: &Path,
    topics: &[String],
    changes: &[FileChange],
    reasoning: &str,
    context: &SessionContext,
    at: NaiveDateTime,
) -> Result<PathBuf, StorageError> {
    let path = dir.join(CONTEXT_FILE);
    let entry = format_session_entry(topics, changes, reasoning, context, at);

    let existing = match tokio::fs::read_to_string(&path).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_error(&path)(e)),
    };

    let content = match existing {
        None => format!("{DOCUMENT_TITLE}\n\n{entry}"),
        Some(existing) => match existing.strip_prefix(DOCUMENT_TITLE) {
            Some(rest) => format!(
                "{DOCUMENT_TITLE}\n\n{entry}\n{}",
                rest.trim_start_matches(['\r', '\n'])
            ),
            None => format!("{entry}\n{existing}"),
        },
    };

    write_atomic(&path, &content).await?;
    tracing::info!(path = %path.display(), "Prepended session entry");
    Ok(path)
}

fn format_session_entry(
    topics: &[String],
    changes: &[FileChange],
    reasoning: &str,
    context: &SessionContext,
    at: NaiveDateTime,
) -> String {
    let tags = if topics.is_empty() {
        format!("[{GENERAL_TOPIC}]")
    } else {
        topics
            .iter()
            .map(|t| format!("[{t}]"))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut parts = vec![format!("## Session {tags} - {}", at.format("%Y-%m-%d %H:%M"))];

    if let Some(goal) = context.goal_text() {
        parts.push(format!("\n### Goal\n{goal}"));
    }

    match context.summary_text() {
        Some(summary) => parts.push(format!("\n### Summary\n{summary}")),
        None if !reasoning.trim().is_empty() => {
            parts.push(format!("\n### Summary\n{}", reasoning.trim()));
        }
        None => {}
    }

    if !changes.is_empty() {
        let lines: Vec<String> = changes
            .iter()
            .map(|c| format!("- **{}** `{}`: {}", c.action.label(), c.file_name(), c.description))
            .collect();
        parts.push(format!("\n### Changes\n{}", lines.join("\n")));
    }

    let bullets = |items: &[String], prefix: &str| {
        items
            .iter()
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    if !context.decisions_made.is_empty() {
        parts.push(format!("\n### Decisions\n{}", bullets(&context.decisions_made, "- ")));
    }
    if !context.problems_solved.is_empty() {
        parts.push(format!(
            "\n### Problems Solved\n{}",
            bullets(&context.problems_solved, "- ")
        ));
    }
    if !context.future_work.is_empty() {
        parts.push(format!("\n### Future Work\n{}", bullets(&context.future_work, "- [ ] ")));
    }

    parts.push("\n---\n".to_string());
    parts.join("\n")
}

/// Remove legacy per-topic `*.md` files once per project.
///
/// Only the top level is scanned; `context.md` is kept. Returns the number of
/// files removed.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or a file cannot be
/// removed.
pub async fn cleanup_legacy_files(dir: &Path) -> Result<usize, StorageError> {
    let marker = dir.join(MIGRATED_MARKER);
    if tokio::fs::try_exists(&marker).await.unwrap_or(false)
        || !tokio::fs::try_exists(dir).await.unwrap_or(false)
    {
        return Ok(0);
    }

    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        let is_legacy = path.extension().is_some_and(|ext| ext == "md")
            && path.file_name().is_some_and(|name| name != CONTEXT_FILE);

        if is_file && is_legacy {
            tokio::fs::remove_file(&path).await.map_err(io_error(&path))?;
            tracing::info!(file = %path.display(), "Deleted legacy topic file");
            removed += 1;
        }
    }

    tokio::fs::write(&marker, b"")
        .await
        .map_err(io_error(&marker))?;
    Ok(removed)
}

/// Copy markdown plan files touched in the session into `plans/`.
///
/// # Errors
///
/// Returns an error if a plan file cannot be copied.
pub async fn copy_plan_files(
    changes: &[FileChange],
    dir: &Path,
) -> Result<Vec<PathBuf>, StorageError> {
    let plans_dir = dir.join(PLANS_DIR);
    let mut copied = Vec::new();

    for change in changes {
        let source = Path::new(&change.file_path);
        let is_plan = change.file_path.contains("/plans/")
            && source.extension().is_some_and(|ext| ext == "md");
        if !is_plan || !tokio::fs::try_exists(source).await.unwrap_or(false) {
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };

        tokio::fs::create_dir_all(&plans_dir)
            .await
            .map_err(io_error(&plans_dir))?;
        let dest = plans_dir.join(name);
        tokio::fs::copy(source, &dest)
            .await
            .map_err(io_error(source))?;
        tracing::info!(plan = %dest.display(), "Copied plan file");
        copied.push(dest);
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::{parse, ChangeAction};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    fn context() -> SessionContext {
        SessionContext {
            user_goal: Some("Add login".to_string()),
            summary: Some("Added JWT login".to_string()),
            decisions_made: vec!["Use JWT".to_string()],
            problems_solved: vec!["Fixed clock skew".to_string()],
            future_work: vec!["Refresh tokens".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_write_wiki_is_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let doc = KnowledgeDocument {
            decisions: vec!["Use JWT".to_string()],
            ..Default::default()
        };

        let path = write_wiki(&doc, &dir.path().join("nested")).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(parse(&content).decisions, vec!["Use JWT"]);
        assert!(!dir.path().join("nested/.context.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_context_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_context(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_session_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let changes = vec![FileChange::new("/p/src/auth.rs", ChangeAction::Create, "Wrote 40 lines")];

        let path = append_session_at(
            dir.path(),
            &["auth".to_string(), "api".to_string()],
            &changes,
            "unused",
            &context(),
            at(),
        )
        .await
        .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Project Context\n\n## Session [auth] [api] - 2026-03-14 09:05\n"));
        assert!(content.contains("### Goal\nAdd login"));
        assert!(content.contains("### Summary\nAdded JWT login"));
        assert!(content.contains("- **Create** `auth.rs`: Wrote 40 lines"));
        assert!(content.contains("### Problems Solved\n- Fixed clock skew"));
        assert!(content.contains("### Future Work\n- [ ] Refresh tokens"));
        assert!(content.ends_with("---\n"));
    }

    #[tokio::test]
    async fn test_append_session_prepends_below_title() {
        let dir = tempfile::tempdir().unwrap();
        let empty = SessionContext::default();

        append_session_at(dir.path(), &[], &[], "first run", &empty, at())
            .await
            .unwrap();
        let path = append_session_at(dir.path(), &[], &[], "second run", &empty, at())
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("# Project Context").count(), 1);
        let second = content.find("second run").unwrap();
        let first = content.find("first run").unwrap();
        assert!(second < first);
        assert!(content.contains("[general-changes]"));
    }

    #[tokio::test]
    async fn test_legacy_session_log_yields_no_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let path = append_session_at(dir.path(), &[], &[], "", &context(), at())
            .await
            .unwrap();

        let doc = parse(&std::fs::read_to_string(path).unwrap());
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_legacy_files_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("context.md"), "keep").unwrap();
        std::fs::write(dir.path().join("testing.md"), "old").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        std::fs::create_dir(dir.path().join("plans")).unwrap();
        std::fs::write(dir.path().join("plans/plan.md"), "keep").unwrap();

        assert_eq!(cleanup_legacy_files(dir.path()).await.unwrap(), 1);
        assert!(dir.path().join("context.md").exists());
        assert!(!dir.path().join("testing.md").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("plans/plan.md").exists());
        assert!(dir.path().join(MIGRATED_MARKER).exists());

        std::fs::write(dir.path().join("later.md"), "new").unwrap();
        assert_eq!(cleanup_legacy_files(dir.path()).await.unwrap(), 0);
        assert!(dir.path().join("later.md").exists());
    }

    #[tokio::test]
    async fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(cleanup_legacy_files(&missing).await.unwrap(), 0);
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_copy_plan_files() {
        let src = tempfile::tempdir().unwrap();
        let plans = src.path().join("plans");
        std::fs::create_dir(&plans).unwrap();
        std::fs::write(plans.join("design.md"), "# Plan").unwrap();
        std::fs::write(plans.join("data.json"), "{}").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let changes = vec![
            FileChange::new(plans.join("design.md").to_string_lossy(), ChangeAction::Create, "x"),
            FileChange::new(plans.join("data.json").to_string_lossy(), ChangeAction::Create, "x"),
            FileChange::new(plans.join("gone.md").to_string_lossy(), ChangeAction::Delete, "x"),
            FileChange::new("/p/src/main.rs", ChangeAction::Modify, "x"),
        ];

        let copied = copy_plan_files(&changes, dest.path()).await.unwrap();
        assert_eq!(copied, vec![dest.path().join("plans/design.md")]);
        assert_eq!(
            std::fs::read_to_string(dest.path().join("plans/design.md")).unwrap(),
            "# Plan"
        );
    }
}
