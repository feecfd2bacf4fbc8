//! Text continuity refinement between generation and synthesis.
//!
//! The refine engine decides how successive text fragments from the
//! generator should be merged, deduplicated, or demarcated as new
//! thoughts before synthesis, using a bounded window of recently
//! refined text as context.

pub mod engine;
pub mod history;

pub use engine::{RefineConfig, RefineEngine, normalize};
pub use history::HistoryBuffer;
