//! Evidence providers.
//!
//! - [`LocalEvidenceProvider`] - embeds the query and searches a vector index
//! - [`WebEvidenceProvider`] - web search with a hard timeout and optional quota

pub mod local;
pub mod web;

pub use local::LocalEvidenceProvider;
pub use web::WebEvidenceProvider;
