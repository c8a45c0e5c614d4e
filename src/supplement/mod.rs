//! Supplementary tables outside the metric pipeline.
//!
//! Each is a straight read, reshape and write, enabled per table in the
//! `[tables]` config section.

pub mod demographics;
pub mod shap;

pub use demographics::{demographic_counts, quartile_counts};
pub use shap::shap_table;
