//! Working-directory recovery from a transcript path.
//!
//! Claude Code stores transcripts under `~/.claude/projects/<encoded>/`, where
//! `<encoded>` is the project path with every `/` replaced by `-`. Dashes that
//! were part of a directory name are indistinguishable from separators, so the
//! decoder tries every grouping and keeps the first one that exists on disk.

use std::path::{Path, PathBuf};

/// Recover the project directory a transcript belongs to.
///
/// Returns `None` when the parent directory is not an encoded path.
#[must_use]
pub fn cwd_from_transcript(transcript_path: &Path) -> Option<PathBuf> {
    let encoded = transcript_path.parent()?.file_name()?.to_str()?;
    decode_project_dir(encoded, |p| p.exists())
}

/// Decode an encoded project directory name using `exists` to pick between
/// ambiguous groupings. Falls back to treating every dash as a separator.
pub fn decode_project_dir(encoded: &str, exists: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let rest = encoded.strip_prefix('-')?;
    let parts: Vec<&str> = rest.split('-').collect();
    if rest.is_empty() {
        return None;
    }

    // best[i] is a path on disk spelled by parts[..i].
    let mut best: Vec<Option<String>> = vec![None; parts.len() + 1];
    best[0] = Some(String::new());

    for end in 1..=parts.len() {
        for start in 0..end {
            let Some(prefix) = &best[start] else {
                continue;
            };
            let candidate = format!("{prefix}/{}", parts[start..end].join("-"));
            if exists(Path::new(&candidate)) {
                best[end] = Some(candidate);
                break;
            }
        }
    }

    let decoded = best[parts.len()]
        .take()
        .unwrap_or_else(|| format!("/{}", parts.join("/")));
    tracing::debug!(encoded, decoded = %decoded, "Decoded transcript project dir");
    Some(PathBuf::from(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(paths: &[&str]) -> impl Fn(&Path) -> bool {
        let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        move |p: &Path| paths.iter().any(|known| known == p)
    }

    #[test]
    fn test_dashed_directory_name() {
        let exists = fs(&["/home", "/home/u", "/home/u/my-app"]);
        assert_eq!(
            decode_project_dir("-home-u-my-app", exists),
            Some(PathBuf::from("/home/u/my-app"))
        );
    }

    #[test]
    fn test_prefers_first_existing_grouping() {
        let exists = fs(&["/home", "/home/u", "/home/u/my", "/home/u/my/app"]);
        assert_eq!(
            decode_project_dir("-home-u-my-app", exists),
            Some(PathBuf::from("/home/u/my/app"))
        );
    }

    #[test]
    fn test_fallback_joins_with_slashes() {
        assert_eq!(
            decode_project_dir("-srv-data-x", |_| false),
            Some(PathBuf::from("/srv/data/x"))
        );
    }

    #[test]
    fn test_not_encoded() {
        assert!(decode_project_dir("projects", |_| true).is_none());
        assert!(decode_project_dir("-", |_| true).is_none());
    }

    #[test]
    fn test_cwd_from_real_tree() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("my-app");
        std::fs::create_dir(&project).unwrap();

        let encoded = project.to_string_lossy().replace('/', "-");
        let transcript = root.path().join(".claude").join(encoded).join("abc.jsonl");

        assert_eq!(cwd_from_transcript(&transcript), Some(project));
    }

    #[test]
    fn test_cwd_from_path_without_parent() {
        assert!(cwd_from_transcript(Path::new("abc.jsonl")).is_none());
    }
}
