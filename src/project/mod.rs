//! Project location: which directory a session ran in and where its notes go.

mod classifier;
mod location;

pub use classifier::{Classification, PathClassifier};
pub use location::{cwd_from_transcript, decode_project_dir};
