//! Published table output.
//!
//! This module writes the published views as CSV and renders Markdown
//! previews of any table for the console.

use crate::analysis::PublishedView;
use crate::error::Result;
use crate::frame;
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

/// Write a published view as CSV. Returns the number of rows written.
pub fn write_view(view: &PublishedView, path: &Path) -> Result<usize> {
    let df = view.to_frame()?;
    frame::write_csv(&df, path)?;
    info!(
        "Wrote {} ({} rows) to {}",
        view.kind.title(),
        df.height(),
        path.display()
    );
    Ok(df.height())
}

/// Escape a cell for use inside a Markdown table.
fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// Render a frame as GitHub-flavoured Markdown.
pub fn render_markdown_table(df: &DataFrame) -> Result<String> {
    let mut output = String::new();

    output.push_str("| ");
    output.push_str(
        &df.get_column_names_str()
            .into_iter()
            .map(escape_cell)
            .collect::<Vec<_>>()
            .join(" | "),
    );
    output.push_str(" |\n");

    output.push('|');
    for _ in 0..df.width() {
        output.push_str(":---|");
    }
    output.push('\n');

    for row in frame::rows_as_text(df)? {
        output.push_str("| ");
        output.push_str(
            &row.iter()
                .map(|cell| escape_cell(cell))
                .collect::<Vec<_>>()
                .join(" | "),
        );
        output.push_str(" |\n");
    }

    Ok(output)
}

/// Titled preview with a row count footer.
pub fn generate_preview(title: &str, df: &DataFrame) -> Result<String> {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    if df.height() == 0 {
        section.push_str("*No rows.*\n");
        return Ok(section);
    }
    section.push_str(&render_markdown_table(df)?);
    section.push_str(&format!(
        "\n*{} rows × {} columns*\n",
        df.height(),
        df.width()
    ));

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::slicer::ViewKind;
    use crate::models::{GroupKey, Metric, ShapedRow};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_view() -> PublishedView {
        PublishedView {
            kind: ViewKind::Quartile,
            rows: vec![ShapedRow {
                factor_model: "Within-event".to_string(),
                predictor_set: "{Questions}".to_string(),
                metric: Metric::Ap,
                variable: "Quartile subset".to_string(),
                group: GroupKey::Integer(1),
                risks: [
                    Some("0.50 ± 0.05 (0.32)".to_string()),
                    None,
                    Some("0.41 ± 0.04 (0.20)".to_string()),
                    Some("0.66 ± 0.03 (0.11)".to_string()),
                ],
            }],
        }
    }

    #[test]
    fn test_write_view_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tables").join("table_2.csv");

        let rows = write_view(&create_test_view(), &path).unwrap();

        assert_eq!(rows, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Predictor set,Metric,Group,No risk,Low risk,Moderate risk,High risk\n\
             {Questions},AP,1,0.50 ± 0.05 (0.32),,0.41 ± 0.04 (0.20),0.66 ± 0.03 (0.11)\n"
        );
    }

    #[test]
    fn test_write_view_is_byte_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table_2.csv");

        write_view(&create_test_view(), &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_view(&create_test_view(), &path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_render_markdown_table() {
        let df = frame::text_frame(vec![
            ("Group", vec![Some("a|b".to_string())]),
            ("No risk", vec![None]),
        ])
        .unwrap();

        let markdown = render_markdown_table(&df).unwrap();

        assert_eq!(markdown, "| Group | No risk |\n|:---|:---|\n| a\\|b |  |\n");
    }

    #[test]
    fn test_generate_preview() {
        let df = create_test_view().to_frame().unwrap();
        let preview = generate_preview("Table 2", &df).unwrap();

        assert!(preview.starts_with("## Table 2\n\n"));
        assert!(preview.contains("0.50 ± 0.05 (0.32)"));
        assert!(preview.contains("*1 rows × 7 columns*"));

        let empty = frame::text_frame(vec![("a", Vec::new())]).unwrap();
        assert!(generate_preview("Empty", &empty).unwrap().contains("*No rows.*"));
    }
}
