//! Topic detection from changed file paths.

use std::collections::BTreeMap;

use crate::wiki::FileChange;

/// Topic assigned to changes that match no keyword.
pub const GENERAL_TOPIC: &str = "general-changes";

const BUILTIN_TOPICS: &[(&str, &[&str])] = &[
    ("testing", &["test", "spec", "fixture"]),
    ("documentation", &["docs/", "readme", ".md", "changelog"]),
    ("configuration", &["config", ".toml", ".yaml", ".yml", ".env", ".ini"]),
    ("build", &["cargo.toml", "cargo.lock", "makefile", "dockerfile", "package.json", "build."]),
    ("ci", &[".github/", ".gitlab-ci", "workflow"]),
    ("api", &["api/", "routes", "handler", "endpoint"]),
    ("database", &["migration", "schema", ".sql", "db/"]),
    ("frontend", &[".tsx", ".jsx", ".css", ".html", "components/"]),
    ("hooks", &["hooks/"]),
];

/// Maps file changes onto topic labels by path keywords.
#[derive(Debug, Clone)]
pub struct TopicDetector {
    /// Topic label to lowercase keywords.
    topics: BTreeMap<String, Vec<String>>,
}

impl TopicDetector {
    /// Detector using the given keyword table, or the built-in one when empty.
    #[must_use]
    pub fn new(topics: &BTreeMap<String, Vec<String>>) -> Self {
        if topics.is_empty() {
            return Self::default();
        }

        let topics = topics
            .iter()
            .map(|(label, keywords)| {
                let keywords = keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (label.clone(), keywords)
            })
            .collect();
        Self { topics }
    }

    /// Group changes by topic.
    ///
    /// A change belongs to every topic with a keyword in its path. Changes
    /// matching nothing go under [`GENERAL_TOPIC`].
    #[must_use]
    pub fn detect(&self, changes: &[FileChange]) -> BTreeMap<String, Vec<FileChange>> {
        let mut detected: BTreeMap<String, Vec<FileChange>> = BTreeMap::new();

        for change in changes {
            let path = change.file_path.to_lowercase();
            let mut matched = false;

            for (label, keywords) in &self.topics {
                if keywords.iter().any(|k| path.contains(k.as_str())) {
                    detected.entry(label.clone()).or_default().push(change.clone());
                    matched = true;
                }
            }

            if !matched {
                detected
                    .entry(GENERAL_TOPIC.to_string())
                    .or_default()
                    .push(change.clone());
            }
        }

        tracing::debug!(topics = ?detected.keys().collect::<Vec<_>>(), "Detected topics");
        detected
    }
}

impl Default for TopicDetector {
    fn default() -> Self {
        let topics = BUILTIN_TOPICS
            .iter()
            .map(|(label, keywords)| {
                (
                    (*label).to_string(),
                    keywords.iter().map(|k| (*k).to_string()).collect(),
                )
            })
            .collect();
        Self { topics }
    }
}
