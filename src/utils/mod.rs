//! Utility modules
//!
//! - Normalization: trim/lowercase keys and display title-casing

pub mod normalization;

pub use normalization::{normalize_name, title_case};
