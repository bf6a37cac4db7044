//! Language-model client, prompts and architecture generation.

mod architect;
mod client;
mod mock;
mod prompts;

pub use architect::generate_architecture;
pub use client::*;
pub use mock::MockProvider;
pub use prompts::*;
