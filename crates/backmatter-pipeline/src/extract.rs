//! Reference extraction
//!
//! Walks a letter and collects every PMB identifier it mentions, per entity
//! kind, split into three classes: mentioned in the letter text, mentioned
//! in the editorial commentary, or only implied.

use backmatter_core::{normalize_pmb_id, EntityKind, NodeId, RefClass, TeiDocument};
use std::collections::{BTreeMap, BTreeSet};

/// `handNote/@corresp` value that names a typist rather than a person.
const TYPIST_SENTINEL: &str = "schreibkraft";

/// Normalized ids of one entity kind, per reference class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    pub in_text: BTreeSet<String>,
    pub in_commentary: BTreeSet<String>,
    pub implied: BTreeSet<String>,
}

impl ReferenceSet {
    pub fn insert(&mut self, class: RefClass, id: String) {
        match class {
            RefClass::InText => self.in_text.insert(id),
            RefClass::InCommentary => self.in_commentary.insert(id),
            RefClass::Implied => self.implied.insert(id),
        };
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_text.is_empty() && self.in_commentary.is_empty() && self.implied.is_empty()
    }

    /// Number of distinct ids over all classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_text
            .union(&self.in_commentary)
            .chain(self.implied.iter())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Ids in commentary that do not occur in the text, sorted.
    pub fn commentary_only(&self) -> impl Iterator<Item = &str> {
        self.in_commentary
            .difference(&self.in_text)
            .map(String::as_str)
    }

    /// Implied ids that occur neither in text nor in commentary, sorted.
    pub fn implied_only(&self) -> impl Iterator<Item = &str> {
        self.implied
            .iter()
            .filter(|id| !self.in_text.contains(*id) && !self.in_commentary.contains(*id))
            .map(String::as_str)
    }

    /// Entries for the back matter: `(id, class)` with the strongest class
    /// per id, in-text first, then commentary-only, then implied-only.
    pub fn entries(&self) -> impl Iterator<Item = (&str, RefClass)> {
        self.in_text
            .iter()
            .map(|id| (id.as_str(), RefClass::InText))
            .chain(self.commentary_only().map(|id| (id, RefClass::InCommentary)))
            .chain(self.implied_only().map(|id| (id, RefClass::Implied)))
    }
}

/// References of a whole letter, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedReferences {
    sets: BTreeMap<EntityKind, ReferenceSet>,
}

impl ExtractedReferences {
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&ReferenceSet> {
        self.sets.get(&kind)
    }

    pub fn insert(&mut self, kind: EntityKind, class: RefClass, id: String) {
        self.sets.entry(kind).or_default().insert(class, id);
    }

    /// Non-empty sets in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &ReferenceSet)> {
        self.sets
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(&kind, set)| (kind, set))
    }

    /// Distinct ids summed over all kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.sets.values().map(ReferenceSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.values().all(ReferenceSet::is_empty)
    }
}

/// Collect all references of a letter. Anything inside `back` is ignored.
#[must_use]
pub fn extract_references(doc: &TeiDocument) -> ExtractedReferences {
    let split_on_hash = uses_hash_delimiter(doc);
    let mut refs = ExtractedReferences::default();

    for el in doc.elements() {
        if in_back(doc, el) {
            continue;
        }

        for kind in EntityKind::ALL {
            if !is_candidate(doc, el, kind) {
                continue;
            }
            let Some(raw) = doc.attr(el, "ref").or_else(|| doc.attr(el, "key")) else {
                continue;
            };
            let hash_only = kind == EntityKind::Bibl;
            if hash_only && !raw.contains('#') {
                continue;
            }

            let class = classify(doc, el);
            if hash_only || split_on_hash {
                insert_tokens(&mut refs, kind, class, raw.split('#'));
            } else {
                insert_tokens(&mut refs, kind, class, raw.split_whitespace());
            }
        }

        collect_fixed_sources(doc, el, &mut refs);
    }

    log::debug!("Extracted {} distinct references", refs.total());
    refs
}

/// Sources that always count as in-text: scribes, hand notes and titles of
/// bibliographic structures or of the header.
fn collect_fixed_sources(doc: &TeiDocument, el: NodeId, refs: &mut ExtractedReferences) {
    let Some(local) = doc.local_name(el) else {
        return;
    };
    let (kind, raw) = match local {
        "handShift" => match doc.attr(el, "scribe") {
            Some(raw) => (EntityKind::Person, raw),
            None => return,
        },
        "handNote" => match doc.attr(el, "corresp") {
            Some(raw) if raw.trim().trim_start_matches('#') != TYPIST_SENTINEL => {
                (EntityKind::Person, raw)
            }
            _ => return,
        },
        "title" => match doc.attr(el, "ref") {
            Some(raw) if raw.contains('#') && in_bibliographic_context(doc, el) => {
                (EntityKind::Bibl, raw)
            }
            _ => return,
        },
        _ => return,
    };

    let tokens = raw.split(|c: char| c == '#' || c.is_whitespace());
    insert_tokens(refs, kind, RefClass::InText, tokens);
}

fn insert_tokens<'a>(
    refs: &mut ExtractedReferences,
    kind: EntityKind,
    class: RefClass,
    tokens: impl Iterator<Item = &'a str>,
) {
    for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(id) = normalize_pmb_id(token) {
            refs.insert(kind, class, id);
        }
    }
}

/// True if any `ref` or `key` in the document contains `#`.
fn uses_hash_delimiter(doc: &TeiDocument) -> bool {
    doc.elements().into_iter().any(|el| {
        doc.attributes(el)
            .iter()
            .any(|a| (a.name == "ref" || a.name == "key") && a.value.contains('#'))
    })
}

fn is_candidate(doc: &TeiDocument, el: NodeId, kind: EntityKind) -> bool {
    if doc.attr(el, "type") == Some(kind.typed_value()) {
        return true;
    }
    let Some(local) = doc.local_name(el) else {
        return false;
    };
    kind.name_element() == Some(local) || (kind == EntityKind::Person && local == "author")
}

fn classify(doc: &TeiDocument, el: NodeId) -> RefClass {
    let in_commentary = std::iter::once(el)
        .chain(doc.ancestors(el))
        .any(|n| doc.is_named(n, "note") && doc.attr(n, "type") == Some("commentary"));
    if in_commentary {
        RefClass::InCommentary
    } else if doc.attr(el, "subtype") == Some("implied") {
        RefClass::Implied
    } else {
        RefClass::InText
    }
}

fn in_back(doc: &TeiDocument, el: NodeId) -> bool {
    doc.is_named(el, "back") || doc.ancestors(el).any(|a| doc.is_named(a, "back"))
}

fn in_bibliographic_context(doc: &TeiDocument, el: NodeId) -> bool {
    doc.ancestors(el)
        .any(|a| doc.is_named(a, "biblStruct") || doc.is_named(a, "teiHeader"))
}
