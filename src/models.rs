//! Domain models for the cohort summary tables.
//!
//! This module contains the categorical axes of the study (predictor sets,
//! factor models, metrics, risk levels), the typed long-format metric record
//! and the wide shaped table built from it.

use crate::error::Result;
use crate::frame;
use polars::prelude::DataFrame;
use std::cmp::Ordering;
use std::fmt;

pub const COL_FACTOR_MODEL: &str = "Factor model";
pub const COL_PREDICTOR_SET: &str = "Predictor set";
pub const COL_METRIC: &str = "Metric";
pub const COL_VARIABLE: &str = "Variable";
pub const COL_GROUP: &str = "Group";
pub const COL_QUARTILE: &str = "Quartile at t+1";
pub const COL_VALUE: &str = "value";
pub const COL_PREVALENCE: &str = "Prevalence";

/// Sentinel `Variable` value for rows stratified by risk quartile only.
pub const QUARTILE_SUBSET: &str = "Quartile subset";

/// Grouping keys of the shaped table, in sort priority order.
pub const GROUP_KEYS: [&str; 5] = [
    COL_FACTOR_MODEL,
    COL_PREDICTOR_SET,
    COL_METRIC,
    COL_VARIABLE,
    COL_GROUP,
];

/// Kind of per-run result file produced upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    Curves,
    Metrics,
    SensitivitySpecificity,
}

impl MetricType {
    pub const ALL: [MetricType; 3] = [
        MetricType::Curves,
        MetricType::Metrics,
        MetricType::SensitivitySpecificity,
    ];

    /// File stem used in the result path layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Curves => "curves",
            MetricType::Metrics => "metrics",
            MetricType::SensitivitySpecificity => "sensitivity_specificity",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known predictor sets (analyses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictorSet {
    Questions,
    Symptoms,
    QuestionsSymptoms,
    QuestionsMri,
    QuestionsMriSymptoms,
    Autoregressive,
}

impl PredictorSet {
    pub const ALL: [PredictorSet; 6] = [
        PredictorSet::Questions,
        PredictorSet::Symptoms,
        PredictorSet::QuestionsSymptoms,
        PredictorSet::QuestionsMri,
        PredictorSet::QuestionsMriSymptoms,
        PredictorSet::Autoregressive,
    ];

    /// Internal identifier used in directory names.
    pub fn identifier(&self) -> &'static str {
        match self {
            PredictorSet::Questions => "questions",
            PredictorSet::Symptoms => "symptoms",
            PredictorSet::QuestionsSymptoms => "questions_symptoms",
            PredictorSet::QuestionsMri => "questions_mri",
            PredictorSet::QuestionsMriSymptoms => "questions_mri_symptoms",
            PredictorSet::Autoregressive => "autoregressive",
        }
    }

    /// Publication label.
    pub fn label(&self) -> &'static str {
        match self {
            PredictorSet::Questions => "{Questions}",
            PredictorSet::Symptoms => "{CBCL scales}",
            PredictorSet::QuestionsSymptoms => "{Questions, CBCL scales}",
            PredictorSet::QuestionsMri => "{Questions, MRI}",
            PredictorSet::QuestionsMriSymptoms => "{Questions, MRI, CBCL scales}",
            PredictorSet::Autoregressive => "{Previous p-factors}",
        }
    }

    pub fn from_identifier(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.identifier() == s)
    }
}

/// Known factor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorModel {
    WithinEvent,
    AcrossEvent,
}

impl FactorModel {
    pub const ALL: [FactorModel; 2] = [FactorModel::WithinEvent, FactorModel::AcrossEvent];

    pub fn identifier(&self) -> &'static str {
        match self {
            FactorModel::WithinEvent => "within_event",
            FactorModel::AcrossEvent => "across_event",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FactorModel::WithinEvent => "Within-event",
            FactorModel::AcrossEvent => "Across-event",
        }
    }

    pub fn from_identifier(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.identifier() == s)
    }
}

/// Performance metric. Declaration order is the display order: AUROC rows
/// sort before AP rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Auroc,
    Ap,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Auroc => "AUROC",
            Metric::Ap => "AP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUROC" => Some(Metric::Auroc),
            "AP" => Some(Metric::Ap),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk quartile at the next timepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    No,
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::No,
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
    ];

    /// Map a 1-based quartile number to its risk level.
    pub fn from_quartile(quartile: i64) -> Option<Self> {
        match quartile {
            1 => Some(RiskLevel::No),
            2 => Some(RiskLevel::Low),
            3 => Some(RiskLevel::Moderate),
            4 => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            RiskLevel::No => "No risk",
            RiskLevel::Low => "Low risk",
            RiskLevel::Moderate => "Moderate risk",
            RiskLevel::High => "High risk",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Value of the grouping dimension of a metric row.
///
/// Ordinal demographics (age, event year, ADI quartile) are integers and sort
/// numerically; categorical ones sort lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Integer(i64),
    Text(String),
}

impl GroupKey {
    /// Tag a group cell. Integer text and integral floats (`"4"`, `"4.0"`)
    /// compare numerically; anything else compares lexicographically.
    pub fn parse(raw: &str) -> GroupKey {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return GroupKey::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                GroupKey::Integer(f as i64)
            }
            _ => GroupKey::Text(raw.to_string()),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Integer(a), GroupKey::Integer(b)) => a.cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Integer(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Integer(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Integer(i) => write!(f, "{}", i),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// One long-format row of the collected `metrics` results.
///
/// Several upstream runs contribute rows with the same key, so `value` is one
/// sample of a distribution rather than a final number.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub factor_model: String,
    pub predictor_set: String,
    pub metric: Metric,
    pub variable: String,
    pub group: GroupKey,
    pub risk: RiskLevel,
    pub value: Option<f64>,
    pub prevalence: Option<f64>,
}

/// One wide row of the shaped table: a group key plus the formatted
/// "mean ± std" cell for each risk level.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRow {
    pub factor_model: String,
    pub predictor_set: String,
    pub metric: Metric,
    pub variable: String,
    pub group: GroupKey,
    pub risks: [Option<String>; 4],
}

impl ShapedRow {
    pub fn risk(&self, level: RiskLevel) -> Option<&str> {
        self.risks[level.index()].as_deref()
    }

    /// Compare on the group keys in [`GROUP_KEYS`] order.
    pub fn cmp_keys(&self, other: &Self) -> Ordering {
        self.factor_model
            .cmp(&other.factor_model)
            .then_with(|| self.predictor_set.cmp(&other.predictor_set))
            .then_with(|| self.metric.cmp(&other.metric))
            .then_with(|| self.variable.cmp(&other.variable))
            .then_with(|| self.group.cmp(&other.group))
    }

    /// Cell for a named output column. Empty risk cells are `None`.
    pub fn cell(&self, column: &str) -> Option<String> {
        match column {
            COL_FACTOR_MODEL => Some(self.factor_model.clone()),
            COL_PREDICTOR_SET => Some(self.predictor_set.clone()),
            COL_METRIC => Some(self.metric.to_string()),
            COL_VARIABLE => Some(self.variable.clone()),
            COL_GROUP => Some(self.group.to_string()),
            other => RiskLevel::ALL
                .into_iter()
                .find(|level| level.column_name() == other)
                .and_then(|level| self.risk(level).map(str::to_string)),
        }
    }
}

/// Wide table: one row per group key, sorted by [`GROUP_KEYS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapedTable {
    pub rows: Vec<ShapedRow>,
    /// Sample groups whose rows disagreed on prevalence.
    pub prevalence_conflicts: usize,
}

impl ShapedTable {
    /// Full header: the group keys followed by the four risk columns.
    pub fn columns() -> Vec<&'static str> {
        GROUP_KEYS
            .into_iter()
            .chain(RiskLevel::ALL.iter().map(|l| l.column_name()))
            .collect()
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        rows_to_frame(&self.rows, &Self::columns())
    }
}

/// Render shaped rows into a text frame restricted to `columns`.
pub fn rows_to_frame(rows: &[ShapedRow], columns: &[&str]) -> Result<DataFrame> {
    frame::text_frame(
        columns
            .iter()
            .map(|&name| (name, rows.iter().map(|row| row.cell(name)).collect()))
            .collect(),
    )
}
