//! Library half of the `annot-worker` binary, split out so the
//! configuration loader can be tested.

pub mod config;
