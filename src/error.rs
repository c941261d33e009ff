use thiserror::Error;

/// I/O errors that can occur when fetching remote layer files or catalogs
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The server answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The fetch did not complete in time
    #[error("Timed out after {millis}ms fetching {url}")]
    Timeout { url: String, millis: u64 },

    /// Object not found (HTTP 404)
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The URL could not be parsed or resolved
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Local file could not be read
    #[error("File error: {0}")]
    File(String),
}

/// Errors related to format dispatch
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// Neither the declared format nor the URL extension maps to a decoder
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors raised while decoding fetched layer content
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Content is not valid JSON
    #[error("Malformed JSON: {0}")]
    Json(String),

    /// JSON value has no string `type` member
    #[error("GeoJSON object has no type tag")]
    MissingTypeTag,

    /// JSON value has a type tag that is neither Feature nor FeatureCollection
    #[error("Unexpected GeoJSON type: {0}")]
    UnexpectedType(String),

    /// JSON value has the right tag but the wrong structure
    #[error("Invalid GeoJSON {kind}: {message}")]
    Structure { kind: &'static str, message: String },

    /// ZIP container could not be read
    #[error("Archive error: {0}")]
    Archive(String),

    /// Archive holds no shapefile datasets and no GeoJSON members
    #[error("Archive contains no recognizable datasets")]
    NoDatasets,

    /// Error inside a shapefile dataset
    #[error("Shapefile {dataset}: {source}")]
    Shapefile {
        dataset: String,
        #[source]
        source: ShapefileError,
    },

    /// The decode task panicked or was cancelled
    #[error("Decode task failed: {0}")]
    Task(String),
}

/// Errors that can occur when parsing `.shp` and `.dbf` files
#[derive(Debug, Clone, Error)]
pub enum ShapefileError {
    /// File is too small to contain its header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: usize, actual: usize },

    /// Invalid `.shp` file code (must be 9994)
    #[error("Invalid file code: expected 9994, got {0}")]
    InvalidFileCode(i32),

    /// Invalid `.shp` version (must be 1000)
    #[error("Invalid version: expected 1000, got {0}")]
    InvalidVersion(i32),

    /// Shape type that cannot be expressed as GeoJSON
    #[error("Unsupported shape type: {0}")]
    UnsupportedShapeType(i32),

    /// A record extends past the end of the file
    #[error("Truncated record {record} at offset {offset}")]
    TruncatedRecord { record: usize, offset: usize },

    /// A record carries inconsistent part or point counts
    #[error("Invalid record {record}: {message}")]
    InvalidRecord { record: usize, message: String },

    /// The `.dbf` header or field descriptors are malformed
    #[error("Invalid dBASE table: {0}")]
    InvalidTable(String),
}

/// Errors in the catalog handed to the pipeline (the InvalidInput class)
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The catalog is not a JSON array
    #[error("Catalog must be a sequence, got {found}")]
    NotASequence { found: &'static str },

    /// An entry lacks a required field
    #[error("Catalog entry {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// An entry has a field of the wrong type or an unusable value
    #[error("Catalog entry {index} has invalid `{field}`: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// Two entries share an id
    #[error("Duplicate layer id in catalog: {0}")]
    DuplicateId(String),
}

/// Errors from a catalog source
#[derive(Debug, Clone, Error)]
pub enum CatalogSourceError {
    /// The listing could not be fetched
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The listing was fetched but is not a valid catalog
    #[error("Invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Errors that abort a whole pipeline call
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The catalog argument itself is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CatalogError),
}
