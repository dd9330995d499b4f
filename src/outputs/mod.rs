//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`json::QueryReport`] per run for the summarization stage

pub mod json;
