//! Layer catalog: the descriptors the backend publishes for every uploaded layer.
//!
//! A catalog is the ordered list the map viewer receives from the backend's
//! layer listing. Each entry names a layer and (usually) points at the raw
//! geospatial file to download.
//!
//! Parsing a catalog from raw JSON is where malformed input is rejected. Once
//! a [`Catalog`] exists, every entry has an id and a name and ids are unique.

mod descriptor;
mod source;

pub use descriptor::{validate_descriptors, Catalog, LayerDescriptor, LayerId};
pub use source::{CatalogSource, FileCatalogSource, HttpCatalogSource};
