//! Country identity standardization over a batch of raw entries.

use super::resolver::CountryResolver;

/// Standardized identity for one raw entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardizedCountry {
    pub country_standard: String,
    pub iso_code: Option<String>,
    pub continent: Option<String>,
}

/// Standardize one entry.
///
/// The resolved short name replaces the raw name; an ISO-3 code already
/// present is authoritative and only a missing one is filled in. Unresolved
/// names keep the raw string and leave code/continent as they were.
pub fn standardize_one(
    raw_name: &str,
    existing_iso: Option<&str>,
    resolver: &dyn CountryResolver,
) -> StandardizedCountry {
    let existing_iso = existing_iso
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    match resolver.resolve_name(raw_name) {
        Some(identity) => {
            // The continent follows the code that is kept.
            let continent = match existing_iso.as_deref() {
                Some(code) if code != identity.iso3 => resolver.continent_of(code),
                _ => identity.continent,
            };
            StandardizedCountry {
                country_standard: identity.name_short,
                iso_code: existing_iso.or(Some(identity.iso3)),
                continent,
            }
        }
        None => StandardizedCountry {
            country_standard: raw_name.to_string(),
            continent: existing_iso
                .as_deref()
                .and_then(|code| resolver.continent_of(code)),
            iso_code: existing_iso,
        },
    }
}

/// Standardize parallel sequences of raw names and pre-existing ISO-3 codes.
pub fn standardize_countries(
    names: &[String],
    iso_codes: &[Option<String>],
    resolver: &dyn CountryResolver,
) -> Vec<StandardizedCountry> {
    debug_assert_eq!(names.len(), iso_codes.len());
    names
        .iter()
        .zip(iso_codes)
        .map(|(name, iso)| standardize_one(name, iso.as_deref(), resolver))
        .collect()
}
