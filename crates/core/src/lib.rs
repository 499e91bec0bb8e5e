//! Shared domain types for the canvas annotator.
//!
//! Kept free of I/O so the canvas client, the label service client and the
//! pipeline can all depend on it.

pub mod error;
pub mod palette;
pub mod placement;
pub mod types;
