//! Storage module - durable tables with columnar-then-text fallback

mod codec;
mod store;

pub use codec::{CsvCodec, ParquetCodec, TableCodec};
pub use store::TableStore;
