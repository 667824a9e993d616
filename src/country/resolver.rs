//! Country name resolution.
//!
//! The pipeline never branches on whether the reference table could be read:
//! a resolver is picked once at startup and every lookup goes through the
//! same trait. The passthrough resolver simply resolves nothing.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Canonical identity of a country as known to the reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryIdentity {
    pub name_short: String,
    pub iso3: String,
    pub continent: Option<String>,
}

/// Capability to map raw country strings and ISO-3 codes to identities.
pub trait CountryResolver: Send + Sync {
    /// Resolve a raw country name (or an ISO-3 code given as a name).
    /// `None` means unresolved; there is no "not found" sentinel.
    fn resolve_name(&self, raw: &str) -> Option<CountryIdentity>;

    /// Continent for an ISO-3 code.
    fn continent_of(&self, iso3: &str) -> Option<String>;

    fn describe(&self) -> &'static str;
}

/// Resolver used when no reference table is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

impl CountryResolver for PassthroughResolver {
    fn resolve_name(&self, _raw: &str) -> Option<CountryIdentity> {
        None
    }

    fn continent_of(&self, _iso3: &str) -> Option<String> {
        None
    }

    fn describe(&self) -> &'static str {
        "passthrough"
    }
}

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub name_short: String,
    pub iso3: String,
    pub continent: Option<String>,
    pub aliases: Vec<String>,
}

impl ReferenceEntry {
    pub fn new(name_short: &str, iso3: &str, continent: &str, aliases: &[&str]) -> Self {
        Self {
            name_short: name_short.to_string(),
            iso3: iso3.to_string(),
            continent: (!continent.is_empty()).then(|| continent.to_string()),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Resolver backed by an in-memory reference table.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    entries: Vec<CountryIdentity>,
    by_name: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl ReferenceResolver {
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        let mut identities = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::new();
        let mut by_code = HashMap::new();

        for entry in entries {
            let idx = identities.len();
            let code = entry.iso3.trim().to_uppercase();
            by_code.entry(code.clone()).or_insert(idx);
            // First entry wins on alias clashes.
            for name in std::iter::once(&entry.name_short).chain(entry.aliases.iter()) {
                let key = normalize_name(name);
                if !key.is_empty() {
                    by_name.entry(key).or_insert(idx);
                }
            }
            identities.push(CountryIdentity {
                name_short: entry.name_short,
                iso3: code,
                continent: entry.continent,
            });
        }

        Self {
            entries: identities,
            by_name,
            by_code,
        }
    }

    /// Build from a frame with columns `name_short`, `iso3`, `continent`,
    /// and optionally `aliases` (`;`-separated).
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let column = |name: &str| -> Result<Vec<Option<String>>> {
            let col = df.column(name).map_err(|_| PipelineError::SchemaMismatch {
                source_name: "country reference".to_string(),
                column: name.to_string(),
            })?;
            let strings = col.cast(&DataType::String)?;
            Ok(strings
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect())
        };

        let names = column("name_short")?;
        let codes = column("iso3")?;
        let continents = column("continent")?;
        let aliases = if df.get_column_names().iter().any(|c| c.as_str() == "aliases") {
            column("aliases")?
        } else {
            vec![None; df.height()]
        };

        let entries = names
            .into_iter()
            .zip(codes)
            .zip(continents)
            .zip(aliases)
            .filter_map(|(((name, code), continent), alias)| {
                let (name, code) = (name?, code?);
                Some(ReferenceEntry {
                    name_short: name,
                    iso3: code,
                    continent: continent.filter(|c| !c.trim().is_empty()),
                    aliases: alias
                        .map(|a| {
                            a.split(';')
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                })
            })
            .collect();

        Ok(Self::from_entries(entries))
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Self::from_frame(&df)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CountryResolver for ReferenceResolver {
    fn resolve_name(&self, raw: &str) -> Option<CountryIdentity> {
        let trimmed = raw.trim();
        self.by_name
            .get(&normalize_name(trimmed))
            .or_else(|| self.by_code.get(&trimmed.to_uppercase()))
            .map(|&idx| self.entries[idx].clone())
    }

    fn continent_of(&self, iso3: &str) -> Option<String> {
        self.by_code
            .get(&iso3.trim().to_uppercase())
            .and_then(|&idx| self.entries[idx].continent.clone())
    }

    fn describe(&self) -> &'static str {
        "reference table"
    }
}

/// Lowercase, treat `&` as `and`, drop punctuation and a leading "the".
pub fn normalize_name(raw: &str) -> String {
    let spaced: String = raw
        .to_lowercase()
        .replace('&', " and ")
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut words: Vec<&str> = spaced.split_whitespace().collect();
    if words.len() > 1 && words[0] == "the" {
        words.remove(0);
    }
    words.join(" ")
}

/// Pick the resolver for this process. An unreadable or empty reference
/// table selects the passthrough resolver.
pub fn select_resolver(config: &PipelineConfig) -> Box<dyn CountryResolver> {
    let path = config.reference_table_path();
    match ReferenceResolver::from_csv(&path) {
        Ok(resolver) if !resolver.is_empty() => {
            info!(
                "loaded {} countries from reference table {}",
                resolver.len(),
                path.display()
            );
            Box::new(resolver)
        }
        Ok(_) => {
            warn!("country reference table {} is empty; names pass through unchanged", path.display());
            Box::new(PassthroughResolver)
        }
        Err(e) => {
            warn!(
                "country reference table {} unavailable ({}); names pass through unchanged",
                path.display(),
                e
            );
            Box::new(PassthroughResolver)
        }
    }
}
