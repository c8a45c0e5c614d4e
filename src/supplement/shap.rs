//! Feature-importance (SHAP coefficient) summary.

use crate::error::{Result, TableError};
use crate::frame;
use polars::prelude::*;

const DESCRIPTION_COLUMNS: [&str; 5] = ["dataset", "table", "respondent", "question", "response"];

/// Output header, in order.
const SHAP_COLUMNS: [&str; 8] = [
    "dataset",
    "table",
    "respondent",
    "variable",
    "shap_coef_mean",
    "shap_coef_std",
    "question",
    "response",
];

/// Mean and sample std of each variable's SHAP coefficient, joined with the
/// variable dictionary and sorted by dataset, table, respondent, variable.
///
/// Variables missing from the dictionary keep empty description cells and
/// sort first.
pub fn shap_table(coefficients: &DataFrame, dictionary: &DataFrame) -> Result<DataFrame> {
    frame::require_columns(coefficients, &["variable", "value"], "SHAP coefficients")?;
    frame::require_columns(dictionary, &["column"], "variable dictionary")?;
    frame::require_columns(dictionary, &DESCRIPTION_COLUMNS, "variable dictionary")?;
    // Non-numeric coefficients are rejected up front rather than averaged as null.
    frame::floats(coefficients, "value", "SHAP coefficients")?;

    let summary = coefficients
        .clone()
        .lazy()
        .with_column(col("variable").cast(DataType::String))
        .group_by_stable([col("variable")])
        .agg([
            col("value").cast(DataType::Float64).mean().alias("shap_coef_mean"),
            col("value").cast(DataType::Float64).std(1).alias("shap_coef_std"),
        ]);

    let mut dictionary = dictionary.clone();
    dictionary
        .rename("column", "variable".into())
        .map_err(TableError::frame("renaming dictionary key"))?;
    // polars 0.46 `rename` leaves the cached schema stale; reset it so the
    // lazy plan sees the renamed key.
    dictionary.clear_schema();
    let dictionary = dictionary
        .lazy()
        .with_column(col("variable").cast(DataType::String));

    summary
        .left_join(dictionary, col("variable"), col("variable"))
        .select(SHAP_COLUMNS.iter().map(|c| col(*c)).collect::<Vec<_>>())
        .sort(
            ["dataset", "table", "respondent", "variable"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()
        .map_err(TableError::frame("summarizing SHAP coefficients"))
}
