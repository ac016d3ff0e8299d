//! In-process caches

pub mod taxonomy;

pub use taxonomy::{TaxonomyCache, TaxonomySnapshot};
