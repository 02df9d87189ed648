//! Public facade crate for `textpipe`.
//!
//! This crate intentionally contains no IO or extractor-specific logic.
//! It re-exports the backend-agnostic types/traits from `textpipe-core`.

pub use textpipe_core::*;
