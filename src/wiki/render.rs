//! Serialize a wiki document back to `context.md` markdown.

use super::document::KnowledgeDocument;
use super::parser::{DECISIONS, PATTERNS, RECENT_WORK};

/// Title line at the top of every `context.md`.
pub const DOCUMENT_TITLE: &str = "# Project Context";

/// Render the three active sections.
///
/// Architecture is never written; it now lives in `architecture.md`.
#[must_use]
pub fn render(doc: &KnowledgeDocument) -> String {
    let mut out = String::new();
    out.push_str(DOCUMENT_TITLE);
    out.push('\n');

    for (name, items) in [
        (DECISIONS, &doc.decisions),
        (PATTERNS, &doc.patterns),
        (RECENT_WORK, &doc.recent_work),
    ] {
        render_section(&mut out, name, items);
    }

    out
}

/// Placeholder line for an empty section, e.g. `_No recent work yet._`.
#[must_use]
pub fn placeholder(section: &str) -> String {
    format!("_No {} yet._", section.to_lowercase())
}

fn render_section(out: &mut String, name: &str, items: &[String]) {
    out.push_str(&format!("\n## {name}\n\n"));
    if items.is_empty() {
        out.push_str(&placeholder(name));
        out.push('\n');
        return;
    }
    for item in items {
        // A bullet must stay on one line to survive a re-parse.
        let line = item.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str(&format!("- {line}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::parser::{has_empty_sections, parse};

    #[test]
    fn test_render_empty_document() {
        let rendered = render(&KnowledgeDocument::default());
        assert_eq!(
            rendered,
            "# Project Context

## Decisions

_No decisions yet._

## Patterns

_No patterns yet._

## Recent Work

_No recent work yet._
"
        );
    }

    #[test]
    fn test_render_items() {
        let doc = KnowledgeDocument {
            decisions: vec!["Use comrak".to_string(), "Keep regex".to_string()],
            recent_work: vec!["[2024-01-01] Parser work".to_string()],
            ..Default::default()
        };
        let rendered = render(&doc);
        assert!(rendered.contains("## Decisions\n\n- Use comrak\n- Keep regex\n"));
        assert!(rendered.contains("## Patterns\n\n_No patterns yet._\n"));
        assert!(rendered.contains("## Recent Work\n\n- [2024-01-01] Parser work\n"));
    }

    #[test]
    fn test_render_omits_architecture() {
        let doc = KnowledgeDocument {
            architecture: "Legacy architecture text".to_string(),
            ..Default::default()
        };
        let rendered = render(&doc);
        assert!(!rendered.contains("Architecture"));
        assert!(!rendered.contains("Legacy architecture text"));
    }

    #[test]
    fn test_round_trip() {
        let doc = KnowledgeDocument {
            architecture: String::new(),
            decisions: vec!["A decision".to_string(), "Another one".to_string()],
            patterns: vec!["A pattern".to_string()],
            recent_work: vec!["[2024-02-02] Shipped".to_string()],
        };
        assert_eq!(parse(&render(&doc)), doc);
    }

    #[test]
    fn test_round_trip_placeholders_parse_empty() {
        let parsed = parse(&render(&KnowledgeDocument::default()));
        assert!(parsed.is_empty());
        assert!(has_empty_sections(&parsed));
    }

    #[test]
    fn test_multiline_item_rendered_on_one_line() {
        let doc = KnowledgeDocument {
            decisions: vec!["Split\nacross lines".to_string()],
            ..Default::default()
        };
        let parsed = parse(&render(&doc));
        assert_eq!(parsed.decisions, vec!["Split across lines"]);
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(placeholder("Recent Work"), "_No recent work yet._");
        assert_eq!(placeholder("Decisions"), "_No decisions yet._");
    }
}
