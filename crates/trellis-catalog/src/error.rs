use thiserror::Error;

/// Catalog error types
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog source could not be fetched or parsed. Callers degrade
    /// to an empty, permissive index rather than failing.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog source returned a document in neither supported shape
    #[error("Unrecognized catalog document: {0}")]
    UnrecognizedDocument(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Unavailable(err.to_string())
    }
}
