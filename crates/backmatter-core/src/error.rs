//! Error types for reading, mutating and writing TEI documents.

use thiserror::Error;

/// Errors that can occur while loading or persisting a TEI document.
///
/// Per-identifier lookup failures are not represented here; the resolver
/// reports those as a typed resolution and the pipeline renders them into
/// the document instead of aborting.
///
/// # Examples
///
/// ```rust
/// use backmatter_core::{BackmatterError, TeiDocument};
///
/// match TeiDocument::parse("<TEI><text></TEI>") {
///     Err(BackmatterError::Xml(e)) => eprintln!("XML error: {e}"),
///     Err(BackmatterError::Malformed(msg)) => eprintln!("Malformed: {msg}"),
///     Err(e) => eprintln!("Other error: {e}"),
///     Ok(_) => unreachable!("unbalanced input"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum BackmatterError {
    /// File I/O error (missing input, permission denied, disk full).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Low-level XML syntax error reported by the parser.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Structurally invalid document (no root element, unclosed elements,
    /// content after the root).
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// Input bytes are not valid UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, BackmatterError>;
