//! Work/personal classification and context-directory layout.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{expand_tilde, TrackerConfig};

/// Which half of the notes repository a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Work,
    Personal,
}

impl Classification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies project directories by configured path prefixes.
///
/// Prefixes match whole path components, so `~/work` does not claim
/// `~/workshop`.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    work: Vec<PathBuf>,
    personal: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    home: Option<PathBuf>,
}

impl PathClassifier {
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self::with_home(config, dirs::home_dir())
    }

    /// Classifier resolving the fallback layout against `home`.
    #[must_use]
    pub fn with_home(config: &TrackerConfig, home: Option<PathBuf>) -> Self {
        let expand = |patterns: &[String]| -> Vec<PathBuf> {
            patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| expand_tilde(p.trim()))
                .collect()
        };

        Self {
            work: expand(&config.work_path_patterns),
            personal: expand(&config.personal_path_patterns),
            excluded: expand(&config.excluded_paths),
            home,
        }
    }

    #[must_use]
    pub fn classify(&self, cwd: &Path) -> Classification {
        if self.work.iter().any(|p| cwd.starts_with(p)) {
            Classification::Work
        } else {
            Classification::Personal
        }
    }

    #[must_use]
    pub fn is_excluded(&self, cwd: &Path) -> bool {
        self.excluded.iter().any(|p| cwd.starts_with(p))
    }

    /// Path of the project below `<context_root>/<classification>/`.
    ///
    /// Strips the matching pattern for the classification, else the home
    /// directory and a leading `<classification>/`, else keeps the last two
    /// components.
    #[must_use]
    pub fn relative_path(&self, cwd: &Path, classification: Classification) -> PathBuf {
        let patterns = match classification {
            Classification::Work => &self.work,
            Classification::Personal => &self.personal,
        };

        if let Some(rest) = patterns.iter().find_map(|p| cwd.strip_prefix(p).ok()) {
            return non_empty_or_name(rest, cwd);
        }

        if let Some(rest) = self.home.as_deref().and_then(|h| cwd.strip_prefix(h).ok()) {
            let rest = rest.strip_prefix(classification.as_str()).unwrap_or(rest);
            return non_empty_or_name(rest, cwd);
        }

        let tail: Vec<_> = cwd.components().rev().take(2).collect();
        tail.into_iter()
            .rev()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect()
    }

    /// `<context_root>/<classification>/<relative path>`.
    #[must_use]
    pub fn context_dir(&self, context_root: &Path, cwd: &Path) -> PathBuf {
        let classification = self.classify(cwd);
        context_root
            .join(classification.as_str())
            .join(self.relative_path(cwd, classification))
    }
}

fn non_empty_or_name(rest: &Path, cwd: &Path) -> PathBuf {
    if rest.as_os_str().is_empty() {
        cwd.file_name().map(PathBuf::from).unwrap_or_default()
    } else {
        rest.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        let config = TrackerConfig {
            work_path_patterns: vec!["/home/u/work".to_string()],
            personal_path_patterns: vec!["/home/u/code".to_string()],
            excluded_paths: vec!["/home/u/secret".to_string()],
            ..TrackerConfig::default()
        };
        PathClassifier::with_home(&config, Some(PathBuf::from("/home/u")))
    }

    #[test]
    fn test_classify() {
        let c = classifier();
        assert_eq!(c.classify(Path::new("/home/u/work/api")), Classification::Work);
        assert_eq!(c.classify(Path::new("/home/u/workshop")), Classification::Personal);
        assert_eq!(c.classify(Path::new("/opt/x")), Classification::Personal);
        assert_eq!(Classification::Work.to_string(), "work");
    }

    #[test]
    fn test_is_excluded() {
        let c = classifier();
        assert!(c.is_excluded(Path::new("/home/u/secret/vault")));
        assert!(!c.is_excluded(Path::new("/home/u/code/app")));
    }

    #[test]
    fn test_relative_path_strips_pattern() {
        let c = classifier();
        assert_eq!(
            c.relative_path(Path::new("/home/u/work/team/api"), Classification::Work),
            PathBuf::from("team/api")
        );
        assert_eq!(
            c.relative_path(Path::new("/home/u/code/app"), Classification::Personal),
            PathBuf::from("app")
        );
    }

    #[test]
    fn test_relative_path_pattern_itself() {
        let c = classifier();
        assert_eq!(
            c.relative_path(Path::new("/home/u/code"), Classification::Personal),
            PathBuf::from("code")
        );
    }

    #[test]
    fn test_relative_path_home_fallback() {
        let c = classifier();
        assert_eq!(
            c.relative_path(Path::new("/home/u/personal/blog"), Classification::Personal),
            PathBuf::from("blog")
        );
        assert_eq!(
            c.relative_path(Path::new("/home/u/misc/tool"), Classification::Personal),
            PathBuf::from("misc/tool")
        );
    }

    #[test]
    fn test_relative_path_last_two_components() {
        let c = classifier();
        assert_eq!(
            c.relative_path(Path::new("/srv/apps/site"), Classification::Personal),
            PathBuf::from("apps/site")
        );
        assert_eq!(
            c.relative_path(Path::new("/site"), Classification::Personal),
            PathBuf::from("site")
        );
    }

    #[test]
    fn test_context_dir() {
        let c = classifier();
        assert_eq!(
            c.context_dir(Path::new("/notes"), Path::new("/home/u/work/api")),
            PathBuf::from("/notes/work/api")
        );
    }
}
