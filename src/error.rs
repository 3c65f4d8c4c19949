use thiserror::Error;

/// Fatal conversion failures. Anything recoverable inside a document is
/// reported as a [`crate::Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid DOCX: {0}")]
    InvalidDocx(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("document part has no w:body")]
    MissingBody,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
