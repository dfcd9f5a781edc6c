//! backmatter-pipeline - Back-matter enrichment for TEI letters
//!
//! Builds the `<back>` appendix of a letter from the entities it mentions
//! and resolves each entry against the PMB database.
//!
//! # Stages
//!
//! 1. [`extract`]: collect referenced PMB ids per kind and class
//! 2. [`scaffold`]: replace `back` with placeholder lists
//! 3. [`resolver`]: fill each placeholder from local lists or the PMB API
//! 4. [`augment`]: list the authors of listed works as persons
//! 5. [`normalize`]: dates, `key` attributes, URLs, empty lists
//!
//! [`pipeline::Enricher`] runs all stages on a file; [`validate`] checks
//! the result.
//!
//! # Example
//!
//! ```rust
//! use backmatter_pipeline::{Enricher, EnrichOutcome, LocalIndex, Resolver};
//! use backmatter_core::TeiDocument;
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(Resolver::new(LocalIndex::default(), 1000, None));
//! let enricher = Enricher::new(resolver);
//!
//! let mut doc = TeiDocument::parse(
//!     r##"<TEI><text><body><persName ref="#pmb2121">Arthur</persName></body></text></TEI>"##,
//! )?;
//! assert!(matches!(enricher.enrich_document(&mut doc), EnrichOutcome::Enriched(_)));
//! assert!(doc.to_xml_string().contains("<surname>Schnitzler</surname>"));
//! # Ok::<(), backmatter_core::BackmatterError>(())
//! ```

pub mod augment;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod scaffold;
pub mod validate;

pub use augment::add_bibliography_authors;
pub use extract::{extract_references, ExtractedReferences, ReferenceSet};
pub use normalize::normalize_document;
pub use pipeline::{write_atomic, EnrichOutcome, EnrichSummary, Enricher, FileReport, FileStatus};
pub use resolver::{
    populate_back, EntityRecord, FetchError, HttpFetcher, LocalIndex, PopulateReport,
    RecordCache, RecordFetcher, RecordSource, Resolution, Resolver, ResolverConfig,
    StatsSnapshot,
};
pub use scaffold::build_scaffold;
pub use validate::{validate_document, validate_file, ValidationIssue, ValidationReport};
