//! Project wiki merge engine.
//!
//! A project's `context.md` is parsed into a [`KnowledgeDocument`], a session's
//! [`SessionContext`] is merged into it with fuzzy deduplication and a bounded
//! recent-work log, and the result is rendered back to markdown.
//!
//! # Components
//!
//! - [`similarity`]: LCS ratio used to spot near-duplicate bullets
//! - [`parse`] / [`has_empty_sections`]: section extraction
//! - [`dedupe`] / [`rotate`] / [`merge_session`]: merging
//! - [`render`]: serialization

mod document;
mod merge;
mod parser;
mod render;
mod similarity;

pub use document::*;
pub use merge::*;
pub use parser::*;
pub use render::*;
pub use similarity::*;
