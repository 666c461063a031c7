//! Model and embedding implementations.
//!
//! This module provides reference implementations of the `LanguageModel`
//! and `Embedder` traits. Users can use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
