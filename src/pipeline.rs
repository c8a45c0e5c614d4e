//! End-to-end table build.
//!
//! Collect → persist → shape → slice → write, followed by whichever
//! supplementary tables are enabled. Each stage consumes the complete output
//! of the previous one; a failure stops the run, though files written by
//! earlier stages are left in place.

use crate::analysis::{self, CollectRequest, PublishedView};
use crate::config::{Config, PathLayout};
use crate::frame;
use crate::models::MetricType;
use crate::report;
use crate::supplement;
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};

/// Run-time switches that do not belong in the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Show collection progress bars.
    pub show_progress: bool,
}

/// A table written during the run.
#[derive(Debug, Clone)]
pub struct WrittenTable {
    pub title: String,
    pub path: PathBuf,
    pub table: DataFrame,
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Rows collected per metric type.
    pub collected: Vec<(MetricType, usize)>,
    /// Rows in the shaped table.
    pub shaped_rows: usize,
    /// Every table written, in write order.
    pub tables: Vec<WrittenTable>,
}

fn write_published(
    view: &PublishedView,
    path: PathBuf,
    summary: &mut RunSummary,
) -> Result<()> {
    report::write_view(view, &path)
        .with_context(|| format!("Failed to write {}", view.kind.title()))?;
    summary.tables.push(WrittenTable {
        title: view.kind.title().to_string(),
        path,
        table: view.to_frame()?,
    });
    Ok(())
}

fn write_supplement(
    title: &str,
    table: DataFrame,
    path: PathBuf,
    summary: &mut RunSummary,
) -> Result<()> {
    frame::write_csv(&table, &path).with_context(|| format!("Failed to write {}", title))?;
    info!("Wrote {} ({} rows) to {}", title, table.height(), path.display());
    summary.tables.push(WrittenTable {
        title: title.to_string(),
        path,
        table,
    });
    Ok(())
}

/// Build every table for one manuscript run.
pub fn run(config: &Config, layout: &PathLayout, options: RunOptions) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for metric_type in MetricType::ALL {
        let request = CollectRequest {
            analyses: &config.study.analyses,
            factor_models: &config.study.factor_models,
            metric_type,
        };
        let rows = analysis::aggregate_metric_type(layout, &request, options.show_progress)
            .with_context(|| format!("Failed to aggregate {} results", metric_type))?;
        summary.collected.push((metric_type, rows));
    }

    let combined_path = layout.combined_results(MetricType::Metrics);
    let combined = frame::read_parquet(&combined_path)
        .with_context(|| format!("Failed to reload {}", combined_path.display()))?;
    let shaped = analysis::shape_frame(&combined, &combined_path.display().to_string())
        .context("Failed to shape metric table")?;
    summary.shaped_rows = shaped.rows.len();
    info!("Shaped {} metric rows", shaped.rows.len());
    if shaped.prevalence_conflicts > 0 {
        warn!(
            "{} sample group(s) had disagreeing prevalence; the first value was used",
            shaped.prevalence_conflicts
        );
    }
    if tracing::enabled!(Level::DEBUG) {
        let markdown = shaped
            .to_frame()
            .and_then(|df| report::render_markdown_table(&df))
            .context("Failed to render shaped table")?;
        debug!("Shaped table:\n{}", markdown);
    }

    write_published(
        &analysis::quartile_view(&shaped),
        layout.quartile_table(),
        &mut summary,
    )?;
    write_published(
        &analysis::demographic_view(&shaped),
        layout.demographic_table(),
        &mut summary,
    )?;

    if config.tables.quartile_counts || config.tables.demographic_counts {
        let metadata = frame::read_csv(&layout.metadata()).context("Failed to read metadata")?;
        if config.tables.quartile_counts {
            let table = supplement::quartile_counts(&metadata)?;
            write_supplement(
                "Quartile counts",
                table,
                layout.quartile_counts_table(),
                &mut summary,
            )?;
        }
        if config.tables.demographic_counts {
            let table = supplement::demographic_counts(&metadata)?;
            write_supplement(
                "Demographic counts",
                table,
                layout.demographic_counts_table(),
                &mut summary,
            )?;
        }
    }

    if config.tables.shap_coefficients {
        let coefficients =
            frame::read_csv(&layout.shap_coefs()).context("Failed to read SHAP coefficients")?;
        let dictionary =
            frame::read_csv(&layout.variables()).context("Failed to read variable dictionary")?;
        let table = supplement::shap_table(&coefficients, &dictionary)?;
        write_supplement("SHAP coefficients", table, layout.shap_table(), &mut summary)?;
    }

    Ok(summary)
}
