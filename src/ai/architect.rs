//! Architecture overview generation.

use std::path::{Path, PathBuf};

use crate::storage::{write_atomic, ARCHITECTURE_FILE, CONTEXT_FILE};
use crate::wiki::FileChange;

use super::{
    extract_tagged, format_architect_prompt, AiProvider, ARCHITECTURE_TAG,
    ARCHITECT_SYSTEM_PROMPT,
};

/// Ask the model for an architecture overview and write `architecture.md`.
///
/// Returns the written path, or `None` when the model failed or gave no
/// tagged document. Failures are logged, never propagated.
pub async fn generate_architecture(
    context_dir: &Path,
    changes: &[FileChange],
    provider: &dyn AiProvider,
) -> Option<PathBuf> {
    let context_md = tokio::fs::read_to_string(context_dir.join(CONTEXT_FILE))
        .await
        .unwrap_or_default();
    let prompt = format_architect_prompt(&context_md, changes);

    let response = match provider.generate(ARCHITECT_SYSTEM_PROMPT, &prompt).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Architecture generation failed");
            return None;
        }
    };

    let Some(document) = extract_tagged(&response, ARCHITECTURE_TAG) else {
        tracing::warn!("Model reply had no <{ARCHITECTURE_TAG}> block");
        return None;
    };

    let path = context_dir.join(ARCHITECTURE_FILE);
    match write_atomic(&path, &format!("{document}\n")).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Wrote architecture overview");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to write architecture overview");
            None
        }
    }
}
