//! Session ingestion: transcript parsing, file changes, topics and the
//! extracted session context.

mod changes;
mod context;
mod topics;
mod transcript;

pub use changes::{extract_changes, extract_reasoning};
pub use context::SessionAnalyzer;
pub use topics::{TopicDetector, GENERAL_TOPIC};
pub use transcript::*;
