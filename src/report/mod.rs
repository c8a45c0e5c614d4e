//! Report output.

pub mod generator;

pub use generator::{generate_preview, render_markdown_table, write_view};
