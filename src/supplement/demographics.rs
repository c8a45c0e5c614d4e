//! Demographic tables built from the subject metadata.

use crate::error::{Result, TableError};
use crate::frame;
use crate::models::GroupKey;
use polars::prelude::*;
use std::collections::BTreeMap;

pub const COL_NEXT_QUARTILE: &str = "Next quartile";
pub const COL_SUBJECT_ID: &str = "Subject ID";

/// Variables crosstabbed against the next-timepoint quartile, in output order.
pub const CROSSTAB_VARIABLES: [&str; 6] = [
    "Sex",
    "Age",
    "Race",
    "Follow-up event",
    "Event year",
    "ADI quartile",
];

/// Per-subject characteristics summarized in the demographic breakdown.
pub const SUBJECT_VARIABLES: [&str; 3] = ["Sex", "Race", "ADI quartile"];

const ALL: &str = "All";
const COUNT: &str = "count";

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn count_cell(count: u64, total: u64) -> String {
    format!("{} ({:.1}%)", count, percentage(count, total))
}

fn counts(df: &DataFrame) -> Result<Vec<u64>> {
    let values = frame::floats(df, COUNT, "group counts")?;
    Ok(values.into_iter().map(|c| c.unwrap_or(0.0) as u64).collect())
}

/// One variable's crosstab: counts per group and quartile (index 0 = quartile 1).
struct Crosstab {
    counts: BTreeMap<GroupKey, [u64; 4]>,
    total: u64,
}

impl Crosstab {
    fn build(metadata: &DataFrame, variable: &str) -> Result<Self> {
        let grouped = metadata
            .clone()
            .lazy()
            .filter(col(variable).is_not_null().and(col(COL_NEXT_QUARTILE).is_not_null()))
            .group_by([col(variable), col(COL_NEXT_QUARTILE)])
            .agg([len().alias(COUNT)])
            .collect()
            .map_err(TableError::frame(format!("counting {variable} by quartile")))?;

        let groups = frame::strings(&grouped, variable, "metadata")?;
        let quartiles = frame::floats(&grouped, COL_NEXT_QUARTILE, "metadata")?;
        let tallies = counts(&grouped)?;

        let mut counts: BTreeMap<GroupKey, [u64; 4]> = BTreeMap::new();
        let mut total = 0;
        for ((group, quartile), count) in groups.iter().zip(&quartiles).zip(tallies) {
            // Quartiles are stored 0-based upstream.
            let index = quartile
                .filter(|q| q.fract() == 0.0 && (0.0..=3.0).contains(q))
                .ok_or_else(|| {
                    TableError::malformed(
                        "metadata",
                        format!("next quartile '{}' is not in 0-3", quartile.unwrap_or(f64::NAN)),
                    )
                })? as usize;
            let key = GroupKey::parse(group.as_deref().unwrap_or_default());
            counts.entry(key).or_default()[index] += count;
            total += count;
        }
        Ok(Self { counts, total })
    }

    fn margin(&self) -> [u64; 4] {
        let mut margin = [0; 4];
        for row in self.counts.values() {
            for (m, c) in margin.iter_mut().zip(row) {
                *m += c;
            }
        }
        margin
    }

    fn row(&self, variable: &str, group: String, counts: &[u64; 4]) -> Vec<String> {
        let mut row = vec![variable.to_string(), group];
        row.extend(counts.iter().map(|&c| count_cell(c, self.total)));
        row.push(count_cell(counts.iter().sum(), self.total));
        row
    }
}

const CROSSTAB_COLUMNS: [&str; 7] = [
    "Variable",
    "Group",
    "Quartile 1",
    "Quartile 2",
    "Quartile 3",
    "Quartile 4",
    "Total",
];

/// Crosstab of each demographic variable against the next-timepoint quartile.
///
/// Cells read `"{count} ({pct:.1}%)"` with percentages of the variable's grand
/// total. The table opens with a single `All` margin row; per-variable margin
/// rows are omitted.
pub fn quartile_counts(metadata: &DataFrame) -> Result<DataFrame> {
    frame::require_columns(metadata, &[COL_NEXT_QUARTILE], "metadata")?;
    frame::require_columns(metadata, &CROSSTAB_VARIABLES, "metadata")?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (i, name) in CROSSTAB_VARIABLES.iter().enumerate() {
        let crosstab = Crosstab::build(metadata, name)?;
        if i == 0 {
            rows.push(crosstab.row(ALL, ALL.to_string(), &crosstab.margin()));
        }
        for (group, counts) in &crosstab.counts {
            rows.push(crosstab.row(name, group.to_string(), counts));
        }
    }

    frame::text_frame(
        CROSSTAB_COLUMNS
            .iter()
            .enumerate()
            .map(|(c, &name)| (name, rows.iter().map(|r| Some(r[c].clone())).collect()))
            .collect(),
    )
}

/// Share of distinct subjects in each category of the per-subject variables.
///
/// Output columns are `variable, value, count, percentage`, sorted by
/// variable then value, with missing values first.
pub fn demographic_counts(metadata: &DataFrame) -> Result<DataFrame> {
    let mut columns = vec![COL_SUBJECT_ID];
    columns.extend(SUBJECT_VARIABLES);
    frame::require_columns(metadata, &columns, "metadata")?;

    let subjects = metadata
        .clone()
        .lazy()
        .select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>())
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
        .map_err(TableError::frame("selecting distinct subjects"))?;
    let n = subjects
        .column(COL_SUBJECT_ID)
        .and_then(|c| c.as_materialized_series().n_unique())
        .map_err(TableError::frame("counting subjects"))? as u64;

    let per_variable = SUBJECT_VARIABLES
        .iter()
        .map(|&variable| {
            subjects
                .clone()
                .lazy()
                .group_by([col(variable).cast(DataType::String).alias("value")])
                .agg([len().alias(COUNT)])
                .with_column(lit(variable).alias("variable"))
        })
        .collect::<Vec<_>>();
    let tallied = frame::concat_diagonal(per_variable)?
        .sort(["variable", "value"], SortMultipleOptions::default())
        .collect()
        .map_err(TableError::frame("counting subject characteristics"))?;

    let tallies = counts(&tallied)?;
    DataFrame::new(vec![
        Column::new("variable".into(), frame::strings(&tallied, "variable", "counts")?),
        Column::new("value".into(), frame::strings(&tallied, "value", "counts")?),
        Column::new(
            COUNT.into(),
            tallies.iter().map(|&c| c as i64).collect::<Vec<_>>(),
        ),
        Column::new(
            "percentage".into(),
            tallies
                .iter()
                .map(|&c| format!("{:.1}%", percentage(c, n)))
                .collect::<Vec<_>>(),
        ),
    ])
    .map_err(TableError::frame("building demographic counts"))
}
