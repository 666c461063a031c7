//! Domain types for claim verification.

pub mod claim;
pub mod config;
pub mod evidence;
