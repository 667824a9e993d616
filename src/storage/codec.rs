//! On-disk table formats.

use crate::error::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One on-disk table format.
pub trait TableCodec: Send + Sync {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn write(&self, df: &mut DataFrame, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<DataFrame>;

    /// `<dir>/<name>.<ext>`
    fn path_for(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, self.extension()))
    }
}

/// Columnar binary format, preferred.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetCodec;

impl TableCodec for ParquetCodec {
    fn extension(&self) -> &'static str {
        "parquet"
    }

    fn write(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        ParquetWriter::new(file).finish(df)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }
}

/// Comma-separated text, the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvCodec;

impl TableCodec for CsvCodec {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Ok(df)
    }
}
