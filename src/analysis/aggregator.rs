//! Metric shaping.
//!
//! Turns the long-format `metrics` table (one row per run × group × quartile)
//! into the wide shaped table: one row per group key with a formatted
//! "mean ± std" cell for each risk level.

use super::stats::{format_mean_std, round_to};
use crate::error::{Result, TableError};
use crate::frame;
use crate::models::{
    GroupKey, Metric, MetricRecord, RiskLevel, ShapedRow, ShapedTable, COL_FACTOR_MODEL,
    COL_GROUP, COL_METRIC, COL_PREDICTOR_SET, COL_PREVALENCE, COL_QUARTILE, COL_VALUE,
    COL_VARIABLE, GROUP_KEYS,
};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Prevalences closer than this are treated as the same value.
const PREVALENCE_TOLERANCE: f64 = 1e-9;

fn parse_risk(quartile: Option<f64>, origin: &str, line: usize) -> Result<RiskLevel> {
    quartile
        .filter(|q| q.fract() == 0.0)
        .and_then(|q| RiskLevel::from_quartile(q as i64))
        .ok_or_else(|| {
            let shown = quartile.map_or_else(|| "null".to_string(), |q| q.to_string());
            TableError::malformed(origin, format!("row {line}: quartile '{shown}' is not in 1-4"))
        })
}

/// Convert the collected long table into typed metric records.
///
/// Every grouping key plus `Quartile at t+1`, `value` and `Prevalence` must
/// be present (`SchemaMismatch` otherwise). Unknown metrics, quartiles outside
/// 1-4 and non-numeric samples are `MalformedInput`.
pub fn records_from_frame(df: &DataFrame, origin: &str) -> Result<Vec<MetricRecord>> {
    let context = format!("metric table {origin}");
    let mut required = GROUP_KEYS.to_vec();
    required.extend([COL_QUARTILE, COL_VALUE, COL_PREVALENCE]);
    frame::require_columns(df, &required, &context)?;

    let text = |name: &str| frame::strings(df, name, &context);
    let factor_models = text(COL_FACTOR_MODEL)?;
    let predictor_sets = text(COL_PREDICTOR_SET)?;
    let metrics = text(COL_METRIC)?;
    let variables = text(COL_VARIABLE)?;
    let groups = text(COL_GROUP)?;
    let quartiles = frame::floats(df, COL_QUARTILE, origin)?;
    let values = frame::floats(df, COL_VALUE, origin)?;
    let prevalences = frame::floats(df, COL_PREVALENCE, origin)?;

    (0..df.height())
        .map(|i| -> Result<MetricRecord> {
            let line = i + 1;
            let metric = metrics[i].as_deref().and_then(Metric::parse).ok_or_else(|| {
                let shown = metrics[i].as_deref().unwrap_or("null");
                TableError::malformed(origin, format!("row {line}: unknown metric '{shown}'"))
            })?;

            Ok(MetricRecord {
                factor_model: factor_models[i].clone().unwrap_or_default(),
                predictor_set: predictor_sets[i].clone().unwrap_or_default(),
                metric,
                variable: variables[i].clone().unwrap_or_default(),
                group: GroupKey::parse(groups[i].as_deref().unwrap_or_default()),
                risk: parse_risk(quartiles[i], origin, line)?,
                value: values[i],
                prevalence: prevalences[i],
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowKey {
    factor_model: String,
    predictor_set: String,
    metric: Metric,
    variable: String,
    group: GroupKey,
}

impl RowKey {
    fn of(record: &MetricRecord) -> Self {
        Self {
            factor_model: record.factor_model.clone(),
            predictor_set: record.predictor_set.clone(),
            metric: record.metric,
            variable: record.variable.clone(),
            group: record.group.clone(),
        }
    }
}

/// Samples gathered for one (row key, risk level).
struct SampleGroup {
    key: RowKey,
    risk: RiskLevel,
    /// Prevalence of the first row seen for this group.
    prevalence: Option<f64>,
    /// Later rows whose prevalence differed from the first one.
    conflicts: usize,
    values: Vec<f64>,
}

impl SampleGroup {
    fn observe_prevalence(&mut self, prevalence: Option<f64>) {
        let agrees = match (self.prevalence, prevalence) {
            (Some(a), Some(b)) => (a - b).abs() <= PREVALENCE_TOLERANCE,
            (None, None) => true,
            _ => false,
        };
        if !agrees {
            self.conflicts += 1;
        }
    }
}

struct Summary {
    key: RowKey,
    risk: RiskLevel,
    display: Option<String>,
}

fn summarize(group: SampleGroup) -> Summary {
    if group.conflicts > 0 {
        warn!(
            "{} {} / {} / {} at {}: {} row(s) disagree with the first prevalence; using {:?}",
            group.key.metric,
            group.key.predictor_set,
            group.key.variable,
            group.key.group,
            group.risk.column_name(),
            group.conflicts,
            group.prevalence
        );
    }

    let prevalence = group.prevalence.map(|p| round_to(p, 2));
    let mean_std = format_mean_std(&group.values);

    let display = match group.key.metric {
        Metric::Auroc => mean_std,
        Metric::Ap => match (mean_std, prevalence) {
            (Some(s), Some(p)) => Some(format!("{s} ({p:.2})")),
            (Some(_), None) => {
                warn!(
                    "AP cell for {} / {} / {} has no prevalence; leaving it empty",
                    group.key.predictor_set, group.key.variable, group.key.group
                );
                None
            }
            (None, _) => None,
        },
    };

    if display.is_none() && group.values.len() < 2 {
        debug!(
            "{} sample(s) for {} {} / {} / {} at {}; cell left empty",
            group.values.len(),
            group.key.metric,
            group.key.predictor_set,
            group.key.variable,
            group.key.group,
            group.risk.column_name()
        );
    }

    Summary {
        key: group.key,
        risk: group.risk,
        display,
    }
}

/// Aggregate metric records into the shaped table.
///
/// Records are grouped by (factor model, predictor set, metric, variable,
/// group, quartile) in first-seen order, each group is summarized as
/// `"{mean:.2} ± {std:.2}"` (AP cells get `" ({prevalence:.2})"` appended),
/// then quartiles are pivoted into the four risk columns. A quartile with no
/// data leaves its cell empty. Rows are finally sorted by the group keys with
/// AUROC before AP.
///
/// The prevalence shown is the first one seen for a group; groups whose
/// rows disagree are counted in `prevalence_conflicts`.
pub fn shape_metrics(records: &[MetricRecord]) -> ShapedTable {
    let mut slots: HashMap<(RowKey, RiskLevel), usize> = HashMap::new();
    let mut groups: Vec<SampleGroup> = Vec::new();

    for record in records {
        let key = RowKey::of(record);
        let mut fresh = false;
        let slot = *slots.entry((key.clone(), record.risk)).or_insert_with(|| {
            fresh = true;
            groups.push(SampleGroup {
                key,
                risk: record.risk,
                prevalence: record.prevalence,
                conflicts: 0,
                values: Vec::new(),
            });
            groups.len() - 1
        });
        if !fresh {
            groups[slot].observe_prevalence(record.prevalence);
        }
        if let Some(v) = record.value {
            groups[slot].values.push(v);
        }
    }

    let prevalence_conflicts = groups.iter().filter(|g| g.conflicts > 0).count();
    let mut summaries: Vec<Summary> = groups.into_iter().map(summarize).collect();
    summaries.sort_by_key(|s| s.risk);

    let mut row_slots: HashMap<RowKey, usize> = HashMap::new();
    let mut rows: Vec<ShapedRow> = Vec::new();
    for summary in summaries {
        let slot = *row_slots.entry(summary.key.clone()).or_insert_with(|| {
            let key = &summary.key;
            rows.push(ShapedRow {
                factor_model: key.factor_model.clone(),
                predictor_set: key.predictor_set.clone(),
                metric: key.metric,
                variable: key.variable.clone(),
                group: key.group.clone(),
                risks: Default::default(),
            });
            rows.len() - 1
        });
        rows[slot].risks[summary.risk.index()] = summary.display;
    }

    rows.sort_by(ShapedRow::cmp_keys);
    ShapedTable {
        rows,
        prevalence_conflicts,
    }
}

/// Convert and shape in one step.
pub fn shape_frame(df: &DataFrame, origin: &str) -> Result<ShapedTable> {
    let records = records_from_frame(df, origin)?;
    Ok(shape_metrics(&records))
}
