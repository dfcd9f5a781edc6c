//! backmatter-core - Document model for TEI letter enrichment
//!
//! Provides the arena XML tree used by every stage of the back-matter
//! pipeline, the entity kinds of the PMB database and identifier
//! normalization.
//!
//! # Example
//!
//! ```rust
//! use backmatter_core::{EntityKind, TeiDocument};
//!
//! let doc = TeiDocument::parse(r##"<TEI><text><body><persName ref="#pmb1"/></body></text></TEI>"##)?;
//! let pers = doc.find_first(EntityKind::Person.name_element().unwrap()).unwrap();
//! assert_eq!(doc.attr(pers, "ref"), Some("#pmb1"));
//! # Ok::<(), backmatter_core::BackmatterError>(())
//! ```

pub mod error;
pub mod ids;
pub mod kind;
pub mod tree;

pub use error::{BackmatterError, Result};
pub use ids::{normalize_pmb_id, pmb_number, CENTRAL_SUBJECT_ID};
pub use kind::{EntityKind, RefClass};
pub use tree::{local_part, Attribute, NodeId, NodeKind, TeiDocument, TreeBuilder};
