//! Per-letter driver: extract, scaffold, resolve, augment, normalize, write.

use crate::augment::add_bibliography_authors;
use crate::extract::extract_references;
use crate::normalize::normalize_document;
use crate::resolver::{populate_back, PopulateReport, Resolver};
use crate::scaffold::build_scaffold;
use backmatter_core::{Result, TeiDocument};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What enrichment did to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// No `text` element; the document was left unchanged.
    NoTextBody,
    Enriched(EnrichSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichSummary {
    /// Distinct references found in the letter.
    pub references: usize,
    pub populated: PopulateReport,
    /// Persons added for bibliography authors.
    pub authors: PopulateReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Written,
    /// No text body; nothing was written.
    Unchanged,
    /// Cancelled before writing; the file on disk is untouched.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: FileStatus,
    pub summary: Option<EnrichSummary>,
    pub duration: Duration,
}

/// Runs the enrichment stages against a shared resolver.
#[derive(Debug, Clone)]
pub struct Enricher {
    resolver: Arc<Resolver>,
}

impl Enricher {
    #[must_use]
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Enrich a parsed letter in memory.
    pub fn enrich_document(&self, doc: &mut TeiDocument) -> EnrichOutcome {
        let refs = extract_references(doc);
        let Some(back) = build_scaffold(doc, &refs) else {
            return EnrichOutcome::NoTextBody;
        };

        let populated = populate_back(doc, back, &self.resolver);
        let authors = add_bibliography_authors(doc, back, &self.resolver);
        normalize_document(doc);

        EnrichOutcome::Enriched(EnrichSummary {
            references: refs.total(),
            populated,
            authors,
        })
    }

    /// Enrich one file and write the result to `output` (default: in place).
    ///
    /// The write is skipped when the letter has no text body or when
    /// `cancel` is raised before it happens.
    ///
    /// # Errors
    ///
    /// I/O errors and malformed input; the file on disk is not modified.
    pub fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        cancel: Option<&AtomicBool>,
    ) -> Result<FileReport> {
        let started = Instant::now();
        let output = output.unwrap_or(input).to_path_buf();
        let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::SeqCst));

        log::info!("Processing {}", input.display());
        let bytes = std::fs::read(input)?;
        let mut doc = TeiDocument::parse_bytes(&bytes)?;

        let report = |status, summary| FileReport {
            input: input.to_path_buf(),
            output: output.clone(),
            status,
            summary,
            duration: started.elapsed(),
        };

        if cancelled() {
            return Ok(report(FileStatus::Cancelled, None));
        }

        let summary = match self.enrich_document(&mut doc) {
            EnrichOutcome::NoTextBody => {
                log::warn!("{} has no text element, skipping", input.display());
                return Ok(report(FileStatus::Unchanged, None));
            }
            EnrichOutcome::Enriched(summary) => summary,
        };

        if !write_atomic(&output, &doc.to_file_string(), cancel)? {
            log::warn!("{} cancelled, not written", input.display());
            return Ok(report(FileStatus::Cancelled, Some(summary)));
        }
        Ok(report(FileStatus::Written, Some(summary)))
    }
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, so readers never see a partial document.
///
/// `cancel` is checked once more after the temporary file is synced and
/// before the rename. Returns `false` if it was raised; the temporary file
/// is removed and `path` is untouched. A flag raised after that check no
/// longer stops the rename.
///
/// # Errors
///
/// I/O errors creating, writing or renaming the temporary file.
pub fn write_atomic(path: &Path, contents: &str, cancel: Option<&AtomicBool>) -> Result<bool> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
        return Ok(false);
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LocalIndex;

    fn enricher() -> Enricher {
        Enricher::new(Arc::new(Resolver::new(LocalIndex::default(), 10, None)))
    }

    #[test]
    fn test_no_text_body_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("L1.xml");
        std::fs::write(&path, "<TEI><teiHeader/></TEI>").unwrap();
        let report = enricher().process_file(&path, None, None).unwrap();
        assert_eq!(report.status, FileStatus::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<TEI><teiHeader/></TEI>");
    }

    #[test]
    fn test_cancelled_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("L2.xml");
        let original = r##"<TEI><text><body><persName ref="#pmb1"/></body></text></TEI>"##;
        std::fs::write(&path, original).unwrap();
        let cancel = AtomicBool::new(true);
        let report = enricher().process_file(&path, None, Some(&cancel)).unwrap();
        assert_eq!(report.status, FileStatus::Cancelled);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("L3.xml");
        std::fs::write(&path, "<TEI><text>").unwrap();
        assert!(enricher().process_file(&path, None, None).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<TEI><text>");
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        std::fs::write(&path, "old").unwrap();
        assert!(write_atomic(&path, "new", None).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_skips_rename_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        std::fs::write(&path, "old").unwrap();
        let cancel = AtomicBool::new(true);
        assert!(!write_atomic(&path, "new", Some(&cancel)).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
