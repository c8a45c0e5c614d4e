//! Result collection.
//!
//! Loads one result file per (analysis, factor model) for a metric type,
//! tags each with its provenance and stacks them into one long table.

use super::labels::normalize_labels;
use crate::config::PathLayout;
use crate::error::{Result, TableError};
use crate::frame;
use crate::models::{MetricType, COL_FACTOR_MODEL, COL_PREDICTOR_SET};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use tracing::{debug, info};

/// Which runs to collect.
#[derive(Debug, Clone, Copy)]
pub struct CollectRequest<'a> {
    pub analyses: &'a [String],
    pub factor_models: &'a [String],
    pub metric_type: MetricType,
}

impl CollectRequest<'_> {
    pub fn run_count(&self) -> usize {
        self.analyses.len() * self.factor_models.len()
    }
}

fn progress_bar(len: usize, metric_type: MetricType, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:<24} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(metric_type.to_string());
    pb
}

/// Load and concatenate every result file named by `request`.
///
/// Every combination must exist: a missing run fails the whole collection
/// with `MissingInputFile`. The returned frame has the union of the source
/// columns plus `Factor model` and `Predictor set`, already relabelled for
/// publication.
pub fn collect_results(
    layout: &PathLayout,
    request: &CollectRequest<'_>,
    show_progress: bool,
) -> Result<DataFrame> {
    let pb = progress_bar(request.run_count(), request.metric_type, show_progress);
    let mut frames = Vec::with_capacity(request.run_count());

    for analysis in request.analyses {
        for factor_model in request.factor_models {
            let path = layout.analysis_results(factor_model, analysis, request.metric_type);
            debug!("Loading {}", path.display());

            let df = match frame::read_csv(&path) {
                Ok(df) => df,
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            };
            frames.push(df.lazy().with_columns([
                lit(factor_model.as_str()).alias(COL_FACTOR_MODEL),
                lit(analysis.as_str()).alias(COL_PREDICTOR_SET),
            ]));
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    let stacked = frame::concat_diagonal(frames)?
        .collect()
        .map_err(TableError::frame(format!("stacking {} results", request.metric_type)))?;
    let combined = normalize_labels(stacked)?;
    info!(
        "Collected {} {} rows from {} runs",
        combined.height(),
        request.metric_type,
        request.run_count()
    );
    Ok(combined)
}

/// Collect one metric type and persist the combined table as Parquet.
/// Returns the number of rows written.
pub fn aggregate_metric_type(
    layout: &PathLayout,
    request: &CollectRequest<'_>,
    show_progress: bool,
) -> Result<usize> {
    let combined = collect_results(layout, request, show_progress)?;
    let output = layout.combined_results(request.metric_type);
    frame::write_parquet(&combined, &output)?;
    Ok(combined.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_run(layout: &PathLayout, factor_model: &str, analysis: &str, rows: usize) {
        let path = layout.analysis_results(factor_model, analysis, MetricType::Metrics);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut content = String::from("Metric,Variable,Group,Quartile at t+1,value,Prevalence\n");
        for i in 0..rows {
            content.push_str(&format!("AUROC,Quartile subset,1,{},0.7,0.2\n", i % 4 + 1));
        }
        fs::write(path, content).unwrap();
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_collect_row_count_is_sum_of_sources() {
        let dir = TempDir::new().unwrap();
        let layout = Config::default().layout(dir.path());
        write_run(&layout, "within_event", "questions", 3);
        write_run(&layout, "across_event", "questions", 2);
        write_run(&layout, "within_event", "symptoms", 5);
        write_run(&layout, "across_event", "symptoms", 1);

        let analyses = owned(&["questions", "symptoms"]);
        let factor_models = owned(&["within_event", "across_event"]);
        let request = CollectRequest {
            analyses: &analyses,
            factor_models: &factor_models,
            metric_type: MetricType::Metrics,
        };

        let df = collect_results(&layout, &request, false).unwrap();

        assert_eq!(df.height(), 11);
        let fm = frame::strings(&df, COL_FACTOR_MODEL, "test").unwrap();
        let ps = frame::strings(&df, COL_PREDICTOR_SET, "test").unwrap();
        // Analysis-major order: questions/within, questions/across, symptoms/...
        assert_eq!(fm[0].as_deref(), Some("Within-event"));
        assert_eq!(fm[3].as_deref(), Some("Across-event"));
        assert_eq!(ps[0].as_deref(), Some("{Questions}"));
        assert_eq!(ps[10].as_deref(), Some("{CBCL scales}"));
    }

    #[test]
    fn test_missing_run_is_fatal() {
        let dir = TempDir::new().unwrap();
        let layout = Config::default().layout(dir.path());
        write_run(&layout, "within_event", "questions", 2);

        let analyses = owned(&["questions"]);
        let factor_models = owned(&["within_event", "across_event"]);
        let request = CollectRequest {
            analyses: &analyses,
            factor_models: &factor_models,
            metric_type: MetricType::Metrics,
        };

        let err = collect_results(&layout, &request, false).unwrap_err();
        match err {
            TableError::MissingInputFile { path } => {
                assert!(path.ends_with("across_event/questions/results/metrics/metrics.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_aggregate_metric_type_persists_parquet() {
        let dir = TempDir::new().unwrap();
        let layout = Config::default().layout(dir.path());
        write_run(&layout, "within_event", "questions", 4);

        let analyses = owned(&["questions"]);
        let factor_models = owned(&["within_event"]);
        let request = CollectRequest {
            analyses: &analyses,
            factor_models: &factor_models,
            metric_type: MetricType::Metrics,
        };

        let rows = aggregate_metric_type(&layout, &request, false).unwrap();
        assert_eq!(rows, 4);

        let persisted = frame::read_parquet(&layout.combined_results(MetricType::Metrics)).unwrap();
        assert_eq!(persisted.height(), 4);
        assert_eq!(
            frame::strings(&persisted, COL_PREDICTOR_SET, "test").unwrap()[0].as_deref(),
            Some("{Questions}")
        );
    }

    #[test]
    fn test_collect_tolerates_differing_schemas() {
        let dir = TempDir::new().unwrap();
        let layout = Config::default().layout(dir.path());
        write_run(&layout, "within_event", "questions", 2);
        let path = layout.analysis_results("within_event", "symptoms", MetricType::Metrics);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "Metric,Variable,Group,Quartile at t+1,value
AP,Age,10,2,0.6
").unwrap();

        let analyses = owned(&["questions", "symptoms"]);
        let factor_models = owned(&["within_event"]);
        let request = CollectRequest {
            analyses: &analyses,
            factor_models: &factor_models,
            metric_type: MetricType::Metrics,
        };

        let df = collect_results(&layout, &request, false).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(
            frame::floats(&df, "Prevalence", "test").unwrap(),
            vec![Some(0.2), Some(0.2), None]
        );
        assert_eq!(
            frame::strings(&df, "Group", "test").unwrap(),
            vec![Some("1".to_string()), Some("1".to_string()), Some("10".to_string())]
        );
    }
}
