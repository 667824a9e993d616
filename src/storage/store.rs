//! Table store with ordered format fallback.
//!
//! Saving tries each codec in order and stops at the first success; loading
//! reads the first format present. A table that exists in no format is
//! `Ok(None)`, which callers treat as "no processed data yet".

use super::codec::{CsvCodec, ParquetCodec, TableCodec};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct TableStore {
    dir: PathBuf,
    codecs: Vec<Box<dyn TableCodec>>,
}

impl TableStore {
    /// Parquet first, CSV as the fallback.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_codecs(dir, vec![Box::new(ParquetCodec), Box::new(CsvCodec)])
    }

    /// Store trying `codecs` in the given order.
    pub fn with_codecs(dir: impl Into<PathBuf>, codecs: Vec<Box<dyn TableCodec>>) -> Self {
        Self {
            dir: dir.into(),
            codecs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replace the table stored under `name`. Returns the written path.
    ///
    /// Files of more-preferred formats left over from earlier saves are
    /// removed, since `load` would otherwise read them first.
    pub fn save(&self, df: &DataFrame, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let mut failures = Vec::new();
        for (idx, codec) in self.codecs.iter().enumerate() {
            let path = codec.path_for(&self.dir, name);
            match self.write_replacing(codec.as_ref(), df, &path) {
                Ok(()) => {
                    for stale in &self.codecs[..idx] {
                        let stale_path = stale.path_for(&self.dir, name);
                        if stale_path.exists() {
                            fs::remove_file(&stale_path)?;
                        }
                    }
                    info!("saved {} ({} rows) -> {}", name, df.height(), path.display());
                    return Ok(path);
                }
                Err(e) => {
                    warn!("{} write failed for {}: {}", codec.extension(), name, e);
                    failures.push(format!("{}: {}", codec.extension(), e));
                }
            }
        }

        Err(PipelineError::Persist {
            name: name.to_string(),
            reason: failures.join("; "),
        })
    }

    /// Write to a sibling `.part` file, then rename over the target.
    fn write_replacing(&self, codec: &dyn TableCodec, df: &DataFrame, path: &Path) -> Result<()> {
        let partial = path.with_extension(format!("{}.part", codec.extension()));
        let mut df = df.clone();
        let written = codec
            .write(&mut df, &partial)
            .and_then(|()| fs::rename(&partial, path).map_err(PipelineError::from));
        if written.is_err() && partial.exists() {
            let _ = fs::remove_file(&partial);
        }
        written
    }

    /// Load the table stored under `name`, or `None` when absent.
    pub fn load(&self, name: &str) -> Result<Option<DataFrame>> {
        let mut failures = Vec::new();
        for codec in &self.codecs {
            let path = codec.path_for(&self.dir, name);
            if !path.exists() {
                continue;
            }
            match codec.read(&path) {
                Ok(df) => {
                    debug!("loaded {} from {}", name, path.display());
                    return Ok(Some(df));
                }
                Err(e) => {
                    warn!("could not read {}: {}", path.display(), e);
                    failures.push(format!("{}: {}", codec.extension(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(None)
        } else {
            Err(PipelineError::Persist {
                name: name.to_string(),
                reason: failures.join("; "),
            })
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.codecs
            .iter()
            .any(|codec| codec.path_for(&self.dir, name).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stands in for a build without a working columnar codec.
    struct BrokenCodec;

    impl TableCodec for BrokenCodec {
        fn extension(&self) -> &'static str {
            "parquet"
        }

        fn write(&self, _df: &mut DataFrame, _path: &Path) -> Result<()> {
            Err(PipelineError::Persist {
                name: "broken".to_string(),
                reason: "codec unavailable".to_string(),
            })
        }

        fn read(&self, _path: &Path) -> Result<DataFrame> {
            Err(PipelineError::Persist {
                name: "broken".to_string(),
                reason: "codec unavailable".to_string(),
            })
        }
    }

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("year".into(), [1990i32, 1991]),
            Column::new("co2_global".into(), [Some(1.5), None]),
        ])
        .unwrap()
    }

    #[test]
    fn missing_table_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        assert!(store.load("merged").unwrap().is_none());
        assert!(!store.exists("merged"));
    }

    #[test]
    fn prefers_the_columnar_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let path = store.save(&sample(), "global_aggregates").unwrap();
        assert_eq!(path, dir.path().join("global_aggregates.parquet"));
        assert!(!dir.path().join("global_aggregates.csv").exists());

        let back = store.load("global_aggregates").unwrap().unwrap();
        assert!(back.equals_missing(&sample()));
    }

    #[test]
    fn falls_back_to_csv_with_the_same_stem() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            TableStore::with_codecs(dir.path(), vec![Box::new(BrokenCodec), Box::new(CsvCodec)]);
        let path = store.save(&sample(), "merged").unwrap();
        assert_eq!(path, dir.path().join("merged.csv"));
        assert!(!dir.path().join("merged.parquet").exists());

        let back = store.load("merged").unwrap().unwrap();
        assert_eq!(back.height(), 2);
    }

    #[test]
    fn fallback_save_clears_stale_preferred_file() {
        let dir = tempfile::tempdir().unwrap();
        TableStore::new(dir.path()).save(&sample(), "merged").unwrap();
        assert!(dir.path().join("merged.parquet").exists());

        let degraded =
            TableStore::with_codecs(dir.path(), vec![Box::new(BrokenCodec), Box::new(CsvCodec)]);
        degraded.save(&sample(), "merged").unwrap();
        assert!(!dir.path().join("merged.parquet").exists());
        assert!(dir.path().join("merged.csv").exists());
    }

    #[test]
    fn every_codec_failing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::with_codecs(dir.path(), vec![Box::new(BrokenCodec)]);
        let err = store.save(&sample(), "merged").unwrap_err();
        assert!(matches!(err, PipelineError::Persist { ref name, .. } if name == "merged"));
    }

    #[test]
    fn unreadable_preferred_file_falls_through_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("merged.parquet"), b"not parquet").unwrap();
        TableStore::with_codecs(dir.path(), vec![Box::new(CsvCodec)])
            .save(&sample(), "merged")
            .unwrap();

        let back = TableStore::new(dir.path()).load("merged").unwrap().unwrap();
        assert_eq!(back.height(), 2);
    }
}
