//! Country module - name, ISO-3 and continent standardization

mod resolver;
mod standardize;

pub use resolver::{
    normalize_name, select_resolver, CountryIdentity, CountryResolver, PassthroughResolver,
    ReferenceEntry, ReferenceResolver,
};
pub use standardize::{standardize_countries, standardize_one, StandardizedCountry};
