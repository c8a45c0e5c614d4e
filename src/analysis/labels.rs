//! Publication labels for the categorical axes.
//!
//! Known identifiers map to fixed labels; anything else passes through
//! unchanged. Labels are disjoint from identifiers, so normalizing twice is
//! the same as normalizing once.

use crate::error::{Result, TableError};
use crate::frame;
use crate::models::{FactorModel, PredictorSet, COL_FACTOR_MODEL, COL_PREDICTOR_SET};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Label for a predictor-set identifier, or `None` if it is not a known one.
pub fn predictor_set_label(identifier: &str) -> Option<&'static str> {
    PredictorSet::from_identifier(identifier).map(|p| p.label())
}

/// Label for a factor-model identifier, or `None` if it is not a known one.
pub fn factor_model_label(identifier: &str) -> Option<&'static str> {
    FactorModel::from_identifier(identifier).map(|m| m.label())
}

/// `column` with every known identifier swapped for its label.
fn relabel(column: &str, pairs: impl Iterator<Item = (&'static str, &'static str)>) -> Expr {
    pairs
        .fold(col(column), |rest, (identifier, label)| {
            when(col(column).eq(lit(identifier)))
                .then(lit(label))
                .otherwise(rest)
        })
        .alias(column)
}

fn log_unlabelled(
    df: &DataFrame,
    column: &str,
    lookup: fn(&str) -> Option<&'static str>,
) -> Result<()> {
    let unlabelled: BTreeSet<String> = frame::strings(df, column, "label normalization")?
        .into_iter()
        .flatten()
        .filter(|raw| lookup(raw).is_none())
        .collect();
    for raw in unlabelled {
        debug!("No publication label for {} value '{}'", column, raw);
    }
    Ok(())
}

/// Rewrite the `Predictor set` and `Factor model` columns to publication
/// labels. Either column may be absent.
pub fn normalize_labels(df: DataFrame) -> Result<DataFrame> {
    let mut exprs = Vec::new();
    if df.column(COL_PREDICTOR_SET).is_ok() {
        log_unlabelled(&df, COL_PREDICTOR_SET, predictor_set_label)?;
        exprs.push(relabel(
            COL_PREDICTOR_SET,
            PredictorSet::ALL.iter().map(|p| (p.identifier(), p.label())),
        ));
    }
    if df.column(COL_FACTOR_MODEL).is_ok() {
        log_unlabelled(&df, COL_FACTOR_MODEL, factor_model_label)?;
        exprs.push(relabel(
            COL_FACTOR_MODEL,
            FactorModel::ALL.iter().map(|m| (m.identifier(), m.label())),
        ));
    }
    if exprs.is_empty() {
        return Ok(df);
    }

    df.lazy()
        .with_columns(exprs)
        .collect()
        .map_err(TableError::frame("relabelling predictor sets and factor models"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labelled_frame(predictor_sets: &[&str], factor_model: &str) -> DataFrame {
        df!(
            COL_PREDICTOR_SET => predictor_sets.to_vec(),
            COL_FACTOR_MODEL => vec![factor_model; predictor_sets.len()]
        )
        .unwrap()
    }

    fn column(df: &DataFrame, name: &str) -> Vec<String> {
        frame::strings(df, name, "test")
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_known_identifiers_are_relabelled() {
        let identifiers: Vec<&str> = PredictorSet::ALL.iter().map(|p| p.identifier()).collect();
        let df = normalize_labels(labelled_frame(&identifiers, "across_event")).unwrap();

        assert_eq!(
            column(&df, COL_PREDICTOR_SET),
            vec![
                "{Questions}",
                "{CBCL scales}",
                "{Questions, CBCL scales}",
                "{Questions, MRI}",
                "{Questions, MRI, CBCL scales}",
                "{Previous p-factors}",
            ]
        );
        assert!(column(&df, COL_FACTOR_MODEL)
            .iter()
            .all(|v| v == "Across-event"));
    }

    #[test]
    fn test_unknown_values_pass_through() {
        let df = normalize_labels(labelled_frame(&["genetics"], "pooled")).unwrap();
        assert_eq!(column(&df, COL_PREDICTOR_SET), vec!["genetics"]);
        assert_eq!(column(&df, COL_FACTOR_MODEL), vec!["pooled"]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once =
            normalize_labels(labelled_frame(&["questions", "symptoms"], "within_event")).unwrap();
        let twice = normalize_labels(once.clone()).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(
            column(&once, COL_FACTOR_MODEL),
            vec!["Within-event", "Within-event"]
        );
    }

    #[test]
    fn test_frames_without_label_columns_are_untouched() {
        let df = df!("value" => [0.5]).unwrap();
        let normalized = normalize_labels(df.clone()).unwrap();
        assert!(normalized.equals_missing(&df));
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(predictor_set_label("questions_mri"), Some("{Questions, MRI}"));
        assert_eq!(predictor_set_label("{Questions, MRI}"), None);
        assert_eq!(factor_model_label("within_event"), Some("Within-event"));
    }
}
