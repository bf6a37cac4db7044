//! Git sync for the notes repository.

mod sync;

pub use sync::*;
