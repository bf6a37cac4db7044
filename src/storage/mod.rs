//! Notes storage: context files and persisted hook state.

mod state;
mod writer;

pub use state::*;
pub use writer::*;
