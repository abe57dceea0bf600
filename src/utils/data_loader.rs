//! Data loading utilities

use crate::error::{PredictorError, Result};
use crate::preprocessing::Table;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// CSV loader for training data
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer column types; `None` scans every row
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Scan `rows` rows for type inference; `None` scans the whole file
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path).map_err(|e| {
            PredictorError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PredictorError::DataError(e.to_string()))?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            secs = start.elapsed().as_secs_f64(),
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a CSV file straight into a [`Table`]
    pub fn load_table(&self, path: impl AsRef<Path>) -> Result<Table> {
        let df = self.load_csv(path)?;
        Table::from_dataframe(&df)
    }
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PredictorError::DataError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::ColumnData;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "Id,Area,Location,Price").unwrap();
        writeln!(file, "1,1200,Urban,250000").unwrap();
        writeln!(file, "2,,Rural,180000").unwrap();
        writeln!(file, "3,900,Suburban,210000").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 4);
    }

    #[test]
    fn test_load_table_keeps_nulls() {
        let file = create_test_csv();
        let table = DataLoader::new().load_table(file.path()).unwrap();

        assert_eq!(
            table.column("Area"),
            Some(&ColumnData::Numeric(vec![Some(1200.0), None, Some(900.0)]))
        );
        assert!(matches!(table.column("Location"), Some(ColumnData::Categorical(_))));
    }

    fn half_bath_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "Area,Bathrooms,Price").unwrap();
        for i in 0..150 {
            let baths = if i == 139 { "2.5" } else { "2" };
            writeln!(file, "{},{},{}", 1000 + i, baths, 200000 + i * 100).unwrap();
        }
        file
    }

    #[test]
    fn test_late_decimal_value_is_numeric() {
        let file = half_bath_csv();
        let table = DataLoader::new().load_table(file.path()).unwrap();

        match table.column("Bathrooms") {
            Some(ColumnData::Numeric(values)) => {
                assert_eq!(values.len(), 150);
                assert_eq!(values[139], Some(2.5));
                assert_eq!(values[0], Some(2.0));
            }
            other => panic!("expected numeric Bathrooms, got {:?}", other),
        }
    }

    #[test]
    fn test_short_schema_scan_misreads_late_decimal() {
        let file = half_bath_csv();
        let result = DataLoader::new()
            .with_infer_schema_length(Some(100))
            .load_table(file.path());
        assert!(matches!(result, Err(PredictorError::DataError(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new().load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PredictorError::DataError(_)));
    }

    #[test]
    fn test_save_csv() {
        let mut df = df!(
            "a" => &[1i64, 2, 3],
            "b" => &["x", "y", "z"]
        )
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let loaded = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}
