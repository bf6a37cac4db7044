//! Session context extraction through the model, with a heuristic fallback.

use crate::ai::{extract_json, format_session_prompt, AiError, AiProvider, SESSION_SYSTEM_PROMPT};
use crate::wiki::{FileChange, SessionContext};

use super::changes::extract_reasoning;
use super::transcript::Transcript;

/// Turns a transcript and its file changes into a [`SessionContext`].
pub struct SessionAnalyzer<'a> {
    transcript: &'a Transcript,
    max_transcript_chars: usize,
}

impl<'a> SessionAnalyzer<'a> {
    #[must_use]
    pub fn new(transcript: &'a Transcript, max_transcript_chars: usize) -> Self {
        Self {
            transcript,
            max_transcript_chars,
        }
    }

    /// Ask the model for a session context; fall back to heuristics when the
    /// provider is absent or its reply is unusable.
    pub async fn extract(
        &self,
        provider: Option<&dyn AiProvider>,
        changes: &[FileChange],
        topics: &[String],
    ) -> SessionContext {
        let Some(provider) = provider else {
            tracing::debug!("No model configured, using heuristic session context");
            return self.heuristic(changes);
        };

        match self.ask(provider, changes, topics).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "Session extraction failed, using heuristic context");
                self.heuristic(changes)
            }
        }
    }

    async fn ask(
        &self,
        provider: &dyn AiProvider,
        changes: &[FileChange],
        topics: &[String],
    ) -> Result<SessionContext, AiError> {
        let prompt = format_session_prompt(
            &self.transcript.user_prompts(),
            &self.transcript.condensed(self.max_transcript_chars),
            changes,
            topics,
        );
        let response = provider.generate(SESSION_SYSTEM_PROMPT, &prompt).await?;
        let context: SessionContext = extract_json(&response)?;
        tracing::debug!(
            decisions = context.decisions_made.len(),
            problems = context.problems_solved.len(),
            "Extracted session context"
        );
        Ok(context)
    }

    /// Context built without the model: first prompt as the goal and a
    /// description of the changed files as the summary.
    #[must_use]
    pub fn heuristic(&self, changes: &[FileChange]) -> SessionContext {
        let reasoning = extract_reasoning(changes);
        SessionContext {
            user_goal: self.transcript.user_prompts().into_iter().next().or_else(|| {
                self.transcript
                    .summaries()
                    .last()
                    .map(|summary| (*summary).to_string())
            }),
            summary: (!reasoning.is_empty()).then_some(reasoning),
            ..SessionContext::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockProvider;
    use crate::wiki::ChangeAction;

    fn transcript() -> Transcript {
        Transcript::parse(
            r#"{"type":"user","message":{"role":"user","content":"Add a Redis cache"}}
{"type":"assistant","message":{"content":[{"type":"text","text":"Adding the cache layer."}]}}"#,
        )
    }

    fn changes() -> Vec<FileChange> {
        vec![FileChange::new("/p/src/cache.rs", ChangeAction::Create, "Wrote 30 lines")]
    }

    #[tokio::test]
    async fn test_model_context_used() {
        let transcript = transcript();
        let mock = MockProvider::new().with_response(
            r#"Result:
{"user_goal": "Cache lookups", "summary": "Added Redis cache", "decisions_made": ["Use Redis for caching"]}"#,
        );

        let context = SessionAnalyzer::new(&transcript, 1000)
            .extract(Some(&mock), &changes(), &["performance".to_string()])
            .await;

        assert_eq!(context.summary.as_deref(), Some("Added Redis cache"));
        assert_eq!(context.decisions_made, vec!["Use Redis for caching"]);
        assert!(context.problems_solved.is_empty());

        let (_, user) = &mock.calls()[0];
        assert!(user.contains("Add a Redis cache"));
        assert!(user.contains("/p/src/cache.rs"));
        assert!(user.contains("performance"));
    }

    #[tokio::test]
    async fn test_bad_reply_falls_back() {
        let transcript = transcript();
        let mock = MockProvider::new().with_response("I could not summarize this.");

        let context = SessionAnalyzer::new(&transcript, 1000)
            .extract(Some(&mock), &changes(), &[])
            .await;

        assert_eq!(context.user_goal.as_deref(), Some("Add a Redis cache"));
        assert_eq!(context.summary.as_deref(), Some("Created 1 file: cache.rs"));
        assert!(context.decisions_made.is_empty());
    }

    #[test]
    fn test_heuristic_goal_from_summary_without_prompts() {
        let transcript = Transcript::parse(
            r#"{"type":"summary","summary":"Cache layer","leafUuid":"1"}
{"type":"summary","summary":"Redis cache rollout","leafUuid":"2"}"#,
        );
        let context = SessionAnalyzer::new(&transcript, 1000).heuristic(&changes());
        assert_eq!(context.user_goal.as_deref(), Some("Redis cache rollout"));
    }

    #[tokio::test]
    async fn test_no_provider_uses_heuristic() {
        let transcript = Transcript::default();
        let context = SessionAnalyzer::new(&transcript, 1000)
            .extract(None, &[], &[])
            .await;
        assert_eq!(context, SessionContext::default());
    }
}
