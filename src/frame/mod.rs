//! Dataframe helpers shared by the collection, shaping and supplement stages.
//!
//! Result files produced upstream do not share a single schema (curves,
//! metrics and sensitivity tables all carry different columns), so collection
//! works on untyped polars frames and only the shaping stage pulls columns
//! out into typed records.

pub mod io;

pub use io::{read_csv, read_parquet, write_csv, write_parquet};

use crate::error::{Result, TableError};
use polars::prelude::*;

/// Fail with `SchemaMismatch` on the first of `names` that `df` lacks.
pub fn require_columns(df: &DataFrame, names: &[&str], context: &str) -> Result<()> {
    match names.iter().find(|name| df.column(name).is_err()) {
        Some(name) => Err(TableError::missing_column(*name, context)),
        None => Ok(()),
    }
}

/// Text view of a column. Numbers render the way polars writes them
/// (`10`, `1.0`, `0.25`); nulls stay `None`.
pub fn strings(df: &DataFrame, name: &str, context: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| TableError::missing_column(name, context))?;
    let text = column
        .cast(&DataType::String)
        .map_err(TableError::frame(format!("casting `{name}` to text")))?;
    let values = text
        .str()
        .map_err(TableError::frame(format!("reading `{name}` as text")))?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Numeric view of a column. Any non-null cell that does not parse as a
/// number is `MalformedInput` naming `origin`.
pub fn floats(df: &DataFrame, name: &str, origin: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| TableError::missing_column(name, origin))?;
    let numeric = column.strict_cast(&DataType::Float64).map_err(|_| {
        TableError::malformed(origin, format!("column `{name}` holds non-numeric values"))
    })?;
    let values = numeric
        .f64()
        .map_err(TableError::frame(format!("reading `{name}` as numbers")))?
        .into_iter()
        .collect();
    Ok(values)
}

/// Build a frame of nullable text columns.
pub fn text_frame(columns: Vec<(&str, Vec<Option<String>>)>) -> Result<DataFrame> {
    DataFrame::new(
        columns
            .into_iter()
            .map(|(name, values)| Column::new(name.into(), values))
            .collect(),
    )
    .map_err(TableError::frame("building text table"))
}

/// Row-major text cells, nulls rendered as the empty string.
pub fn rows_as_text(df: &DataFrame) -> Result<Vec<Vec<String>>> {
    let columns = df
        .get_column_names_str()
        .into_iter()
        .map(|name| strings(df, name, "table"))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|column| column[row].clone().unwrap_or_default())
                .collect()
        })
        .collect())
}

/// Stack frames vertically. The header is the union of all headers in
/// first-seen order, cells for columns a frame lacks are null, and columns
/// whose types differ across frames are widened to a common supertype.
pub fn concat_diagonal(frames: Vec<LazyFrame>) -> Result<LazyFrame> {
    if frames.is_empty() {
        return Ok(DataFrame::empty().lazy());
    }
    concat_lf_diagonal(
        frames,
        UnionArgs {
            to_supertypes: true,
            ..Default::default()
        },
    )
    .map_err(TableError::frame("concatenating result tables"))
}
