//! Byte access for layer files.
//!
//! [`ByteFetcher`] is the seam between the pipeline and the network: the
//! server and CLI use [`HttpFetcher`], tests substitute in-memory fetchers.
//! The endian helpers read the fixed-width integers of binary formats.

mod endian;
mod fetcher;
mod http_fetcher;

pub use endian::{read_f64_le, read_i32_be, read_i32_le, read_u16_le, read_u32_le};
pub use fetcher::ByteFetcher;
pub use http_fetcher::{create_http_client, HttpFetcher};
