//! Stop hook pipeline: transcript in, updated project notes out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::ai::{generate_architecture, AiClient, AiProvider, CHILD_ENV};
use crate::config::{expand_tilde, TrackerConfig};
use crate::git::GitSync;
use crate::project::{cwd_from_transcript, PathClassifier};
use crate::session::{extract_changes, extract_reasoning, SessionAnalyzer, TopicDetector, Transcript};
use crate::storage::{
    append_session, cleanup_legacy_files, copy_plan_files, cooldown_key, in_cooldown,
    read_context, record_run, write_wiki, JsonFileStore, MemoryStore, StateStore, StorageError,
    ARCHITECTURE_FILE,
};
use crate::wiki::{
    has_empty_sections, is_legacy_format, merge_session, parse_bytes, FileChange,
    KnowledgeDocument, MergeError, SessionContext,
};

use super::input::{HookInput, HookOutput};

/// Errors that abort a stop hook run.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Failed to parse hook input: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to read transcript {path}: {source}")]
    Transcript {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Why a run left the notes untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Invoked from our own stop hook.
    Reentrant,
    /// Running inside a `claude` subprocess spawned for summarization.
    ChildSession,
    NoWorkingDirectory,
    NoTranscript,
    Excluded(PathBuf),
    Cooldown(String),
    TooFewChanges { found: usize, required: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reentrant => write!(f, "stop hook already active"),
            Self::ChildSession => write!(f, "summarization subprocess"),
            Self::NoWorkingDirectory => write!(f, "working directory unknown"),
            Self::NoTranscript => write!(f, "no transcript path"),
            Self::Excluded(path) => write!(f, "excluded path {}", path.display()),
            Self::Cooldown(project) => write!(f, "{project} is cooling down"),
            Self::TooFewChanges { found, required } => {
                write!(f, "{found} file changes, need {required}")
            }
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Skipped(SkipReason),
    Updated { path: PathBuf, committed: bool },
}

/// The stop hook with its injected collaborators.
pub struct StopHook {
    config: TrackerConfig,
    classifier: PathClassifier,
    provider: Option<Arc<dyn AiProvider>>,
    state: Arc<dyn StateStore>,
}

impl StopHook {
    /// Hook without a model and with in-memory state.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            classifier: PathClassifier::new(&config),
            config,
            provider: None,
            state: Arc::new(MemoryStore::new()),
        }
    }

    /// Hook wired from configuration: the configured model client and the
    /// JSON state file. A model that cannot be configured is logged and
    /// left out.
    #[must_use]
    pub fn from_config(config: TrackerConfig) -> Self {
        let provider: Option<Arc<dyn AiProvider>> = match AiClient::from_config(config.ai.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Model client unavailable, using heuristics");
                None
            }
        };
        let state = Arc::new(JsonFileStore::new(config.state_file_path()));

        Self {
            provider,
            state,
            ..Self::new(config)
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn AiProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = state;
        self
    }

    /// Run on raw stdin JSON and produce the reply for stdout.
    pub async fn handle_json(&self, raw: &str) -> HookOutput {
        let result = match serde_json::from_str::<HookInput>(raw) {
            Ok(input) => self.run(&input).await,
            Err(e) => Err(HookError::from(e)),
        };

        match result {
            Ok(StopOutcome::Skipped(reason)) => {
                tracing::info!(%reason, "Skipped session");
                HookOutput::ok()
            }
            Ok(StopOutcome::Updated { path, committed }) => {
                tracing::info!(path = %path.display(), committed, "Updated project context");
                HookOutput::ok()
            }
            Err(e) => {
                tracing::error!(error = %e, "Context tracker failed");
                HookOutput::error(e)
            }
        }
    }

    /// Process one stop event.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcript cannot be read or the fallback
    /// session writer cannot write `context.md`. State store failures only
    /// disable the cooldown for this run.
    pub async fn run(&self, input: &HookInput) -> Result<StopOutcome, HookError> {
        if input.is_reentrant() {
            return Ok(StopOutcome::Skipped(SkipReason::Reentrant));
        }
        if std::env::var_os(CHILD_ENV).is_some() {
            return Ok(StopOutcome::Skipped(SkipReason::ChildSession));
        }

        let transcript_path = input.get_transcript_path().map(expand_tilde);
        let cwd = input
            .get_cwd()
            .map(PathBuf::from)
            .or_else(|| transcript_path.as_deref().and_then(cwd_from_transcript));
        let Some(cwd) = cwd else {
            return Ok(StopOutcome::Skipped(SkipReason::NoWorkingDirectory));
        };
        tracing::info!(session = %input.session_id, cwd = %cwd.display(), "Processing session");

        if self.classifier.is_excluded(&cwd) {
            return Ok(StopOutcome::Skipped(SkipReason::Excluded(cwd)));
        }

        let classification = self.classifier.classify(&cwd);
        let relative = self.classifier.relative_path(&cwd, classification);
        let project = format!("{classification}/{}", relative.display());
        let context_dir = self
            .classifier
            .context_dir(&self.config.context_root_path(), &cwd);

        let key = cooldown_key(&project);
        let cooldown = self.config.session.cooldown_secs;
        match in_cooldown(self.state.as_ref(), &key, cooldown, Utc::now()).await {
            Ok(true) => return Ok(StopOutcome::Skipped(SkipReason::Cooldown(project))),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Cooldown check failed, continuing"),
        }

        let Some(transcript_path) = transcript_path else {
            return Ok(StopOutcome::Skipped(SkipReason::NoTranscript));
        };
        let transcript = Transcript::load(&transcript_path)
            .await
            .map_err(|source| HookError::Transcript {
                path: transcript_path.clone(),
                source,
            })?;

        let changes = extract_changes(&transcript.tool_uses());
        let required = self.config.session.min_changes_threshold;
        tracing::info!(count = changes.len(), "Found file changes");
        if changes.len() < required {
            return Ok(StopOutcome::Skipped(SkipReason::TooFewChanges {
                found: changes.len(),
                required,
            }));
        }

        let topics: Vec<String> = TopicDetector::new(&self.config.topics)
            .detect(&changes)
            .into_keys()
            .collect();

        let session = SessionAnalyzer::new(&transcript, self.config.session.max_transcript_chars)
            .extract(self.provider.as_deref(), &changes, &topics)
            .await;

        if let Err(e) = cleanup_legacy_files(&context_dir).await {
            tracing::warn!(error = %e, "Legacy file cleanup failed");
        }

        let wiki = if self.config.wiki.enabled {
            self.update_wiki(&context_dir, &session).await
        } else {
            None
        };

        let path = match &wiki {
            Some((path, _)) => path.clone(),
            None => {
                let reasoning = session
                    .summary_text()
                    .map_or_else(|| extract_reasoning(&changes), str::to_string);
                append_session(&context_dir, &topics, &changes, &reasoning, &session).await?
            }
        };

        if let Some((_, doc)) = &wiki {
            self.maybe_generate_architecture(&context_dir, doc, &changes).await;
        }

        if let Err(e) = copy_plan_files(&changes, &context_dir).await {
            tracing::warn!(error = %e, "Copying plan files failed");
        }

        let project_name = cwd
            .file_name()
            .map_or_else(|| project.clone(), |n| n.to_string_lossy().into_owned());
        let git = GitSync::new(self.config.context_root_path(), self.config.git.clone());
        let committed = match git.commit_and_push(&project_name, &topics).await {
            Ok(committed) => committed,
            Err(e) => {
                tracing::warn!(error = %e, "Git sync failed");
                false
            }
        };

        if cooldown > 0 {
            if let Err(e) = record_run(self.state.as_ref(), &key, Utc::now()).await {
                tracing::warn!(error = %e, "Recording cooldown failed");
            }
        }

        Ok(StopOutcome::Updated { path, committed })
    }

    /// Merge the session into `context.md`.
    ///
    /// `None` means the legacy session writer should run instead: the file is
    /// a legacy session log, or the wiki could not be updated.
    async fn update_wiki(
        &self,
        dir: &Path,
        session: &SessionContext,
    ) -> Option<(PathBuf, KnowledgeDocument)> {
        match self.try_update_wiki(dir, session).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(error = %e, "Wiki update failed, falling back to session format");
                None
            }
        }
    }

    async fn try_update_wiki(
        &self,
        dir: &Path,
        session: &SessionContext,
    ) -> Result<Option<(PathBuf, KnowledgeDocument)>, HookError> {
        let doc = match read_context(dir).await? {
            Some(bytes) if is_legacy_format(&bytes) => {
                tracing::info!("Detected legacy session format, preserving history");
                return Ok(None);
            }
            Some(bytes) => parse_bytes(&bytes),
            None => KnowledgeDocument::default(),
        };

        let merged = merge_session(&doc, session, self.config.wiki.max_recent_sessions)?;
        let path = write_wiki(&merged, dir).await?;
        Ok(Some((path, merged)))
    }

    async fn maybe_generate_architecture(
        &self,
        dir: &Path,
        doc: &KnowledgeDocument,
        changes: &[FileChange],
    ) {
        let Some(provider) = self.provider.as_deref() else {
            return;
        };
        if !self.config.ai.generate_architecture {
            return;
        }

        let architecture = tokio::fs::read_to_string(dir.join(ARCHITECTURE_FILE))
            .await
            .unwrap_or_default();
        let current = KnowledgeDocument {
            architecture: architecture.trim().to_string(),
            ..doc.clone()
        };
        if has_empty_sections(&current) {
            generate_architecture(dir, changes, provider).await;
        }
    }
}
