pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod ident;
pub mod snapshot;

pub use catalog::filter::SchemaFilter;
pub use connection::{CatalogConnection, CatalogQuery, CatalogRow, ServerVersion};
pub use error::{CatalogError, CatalogResult};
pub use snapshot::{extract_all, PredataSnapshot};
