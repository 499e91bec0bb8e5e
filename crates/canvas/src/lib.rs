//! Canvas HTTP client library.
//!
//! Provides the streaming subscribe-feed reader, the feed record parser and
//! REST wrappers for notes and image downloads.

pub mod api;
pub mod client;
pub mod endpoint;
pub mod messages;
