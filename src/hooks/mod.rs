//! Claude Code `Stop` hook.
//!
//! - [`HookInput`] / [`HookOutput`]: the stdin and stdout JSON contract
//! - [`StopHook`]: the pipeline from transcript to updated project notes

mod input;
mod stop;

pub use input::*;
pub use stop::*;
