//! Checks over enriched letters.

use backmatter_core::{EntityKind, NodeId, TeiDocument};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A problem found in the back matter of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssue {
    /// `birth` elements in `listPerson` without element children.
    EmptyBirth(usize),
    /// `idno` elements in `back` without attributes and without text.
    EmptyIdno(usize),
    Unparsable(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBirth(n) => write!(f, "Found {n} empty birth element(s)"),
            Self::EmptyIdno(n) => write!(f, "Found {n} empty idno element(s) without attributes"),
            Self::Unparsable(msg) => write!(f, "XML parsing error: {msg}"),
        }
    }
}

/// Issues of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate the back matter of a parsed letter (`TEI/text/back`).
#[must_use]
pub fn validate_document(doc: &TeiDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !doc.is_named(doc.root(), "TEI") {
        return issues;
    }

    let backs: Vec<NodeId> = doc
        .children_named(doc.root(), "text")
        .flat_map(|text| doc.children_named(text, "back"))
        .collect();

    let empty_births = backs
        .iter()
        .flat_map(|&back| doc.children_named(back, EntityKind::Person.list_element()))
        .flat_map(|list| doc.descendants_named(list, "birth"))
        .filter(|&birth| doc.element_children(birth).next().is_none())
        .count();
    if empty_births > 0 {
        issues.push(ValidationIssue::EmptyBirth(empty_births));
    }

    let empty_idnos = backs
        .iter()
        .flat_map(|&back| doc.descendants_named(back, "idno"))
        .filter(|&idno| doc.attributes(idno).is_empty() && doc.text_content(idno).is_empty())
        .count();
    if empty_idnos > 0 {
        issues.push(ValidationIssue::EmptyIdno(empty_idnos));
    }

    issues
}

/// Read, parse and validate one file. Read and parse failures are reported
/// as [`ValidationIssue::Unparsable`].
#[must_use]
pub fn validate_file(path: &Path) -> ValidationReport {
    let issues = match std::fs::read(path)
        .map_err(backmatter_core::BackmatterError::from)
        .and_then(|bytes| TeiDocument::parse_bytes(&bytes))
    {
        Ok(doc) => validate_document(&doc),
        Err(e) => vec![ValidationIssue::Unparsable(e.to_string())],
    };
    ValidationReport {
        path: path.to_path_buf(),
        issues,
    }
}
