//! CSV and Parquet reading, and atomic writing through a sibling temp file.

use crate::error::{Result, TableError};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(TableError::MissingInputFile {
            path: path.to_path_buf(),
        })
    }
}

/// Read a headed CSV file.
///
/// Column types are inferred from every row: integer columns stay integers,
/// numeric ones become floats and anything else is text. Empty cells are null.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    ensure_file(path)?;

    let origin = path.display().to_string();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| TableError::malformed(&origin, e.to_string()))?;

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        origin
    );
    Ok(df)
}

/// Load a Parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    ensure_file(path)?;

    let origin = path.display().to_string();
    let file = File::open(path).map_err(|e| TableError::malformed(&origin, e.to_string()))?;
    ParquetReader::new(file)
        .finish()
        .map_err(TableError::frame(format!("reading {origin}")))
}

/// Create a temporary file next to `path` so the final rename stays on one
/// filesystem.
fn create_sibling_temp(path: &Path) -> io::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}

/// Write through `encode` into a sibling temp file, then move it over `path`.
fn write_atomic<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut File) -> PolarsResult<()>,
{
    let write_err = |source: io::Error| TableError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = create_sibling_temp(path).map_err(write_err)?;
    encode(file.as_file_mut()).map_err(TableError::frame(format!(
        "encoding {}",
        path.display()
    )))?;
    file.as_file_mut().flush().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Write a frame as CSV, replacing `path` atomically.
///
/// Parent directories are created as needed. Nulls become empty fields and
/// fields are quoted only when necessary.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut df = df.clone();
    write_atomic(path, |file| {
        CsvWriter::new(file).include_header(true).finish(&mut df)
    })?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Persist a frame as Parquet, replacing `path` atomically.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    let mut df = df.clone();
    write_atomic(path, |file| ParquetWriter::new(file).finish(&mut df).map(|_| ()))?;
    debug!("Persisted {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{floats, strings, text_frame};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_csv_infers_column_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.csv");
        fs::write(
            &path,
            "Metric,Group,Quartile at t+1,value,Prevalence\n\
             AUROC,1,1,0.71,0.25\n\
             AP,Female,2,0.5,\n",
        )
        .unwrap();

        let df = read_csv(&path).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Group").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Quartile at t+1").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::Float64);
        assert_eq!(
            floats(&df, "Prevalence", "test").unwrap(),
            vec![Some(0.25), None]
        );
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, TableError::MissingInputFile { .. }));
    }

    #[test]
    fn test_read_csv_ragged_row_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b\n1,2\n3,4,5\n").unwrap();

        let err = read_csv(&path).unwrap_err();
        assert!(matches!(err, TableError::MalformedInput { .. }));
    }

    #[test]
    fn test_write_csv_quotes_and_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("table.csv");
        let df = text_frame(vec![
            ("Predictor set", vec![Some("{Questions, CBCL scales}".to_string())]),
            ("No risk", vec![Some("0.80 ± 0.10".to_string())]),
            ("Low risk", vec![None]),
        ])
        .unwrap();

        write_csv(&df, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Predictor set,No risk,Low risk\n\"{Questions, CBCL scales}\",0.80 ± 0.10,\n"
        );
        // Only the final file remains next to the output.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_parquet_preserves_types_and_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results").join("metrics.parquet");
        let df = df!(
            "Metric" => ["AP", "AUROC"],
            "Quartile at t+1" => [3i64, 4],
            "value" => [Some(0.42), None],
            "Group" => ["Female", "2"]
        )
        .unwrap();

        write_parquet(&df, &path).unwrap();
        let loaded = read_parquet(&path).unwrap();

        assert_eq!(loaded.get_column_names_str(), df.get_column_names_str());
        assert_eq!(
            loaded.column("Quartile at t+1").unwrap().dtype(),
            &DataType::Int64
        );
        assert_eq!(floats(&loaded, "value", "test").unwrap(), vec![Some(0.42), None]);
        assert_eq!(
            strings(&loaded, "Group", "test").unwrap(),
            vec![Some("Female".to_string()), Some("2".to_string())]
        );
    }
}
