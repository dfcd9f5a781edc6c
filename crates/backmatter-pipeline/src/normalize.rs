//! Final normalization of dates, references and back-matter cleanup.
//!
//! Every step is idempotent, so normalizing an already normalized letter
//! changes nothing.

use backmatter_core::{normalize_pmb_id, EntityKind, NodeId, TeiDocument};

/// Date attributes whose year part is zero-padded on rename.
const PADDED_DATE_ATTRS: &[(&str, &str)] = &[
    ("when-iso", "when"),
    ("notAfter-iso", "notAfter"),
    ("notBefore-iso", "notBefore"),
];

/// Date attributes renamed verbatim.
const VERBATIM_DATE_ATTRS: &[(&str, &str)] = &[("from-iso", "from"), ("to-iso", "to")];

/// Run all normalization steps over the whole document.
pub fn normalize_document(doc: &mut TeiDocument) {
    let elements = doc.elements();

    for &el in &elements {
        for &(from, to) in PADDED_DATE_ATTRS {
            if let Some(value) = doc.attr(el, from).map(pad_year) {
                doc.rename_attr(el, from, to, &value);
            }
        }
        for &(from, to) in VERBATIM_DATE_ATTRS {
            if let Some(value) = doc.attr(el, from).map(str::to_string) {
                doc.rename_attr(el, from, to, &value);
            }
        }
        if let Some(key) = doc.attr(el, "key").map(normalize_key) {
            doc.rename_attr(el, "key", "ref", &key);
        }
    }

    let Some(back) = doc.find_first("back") else {
        return;
    };
    canonicalize_entry_ids(doc, back);
    convert_idno_notes(doc, back);
    remove_collections(doc, back);
    remove_empty_lists(doc, back);
}

/// Left-pad a year of one to three digits to four (`862-05-15` → `0862-05-15`).
#[must_use]
pub fn pad_year(value: &str) -> String {
    match value.split_once('-') {
        Some((year, rest)) if (1..4).contains(&year.chars().count()) => {
            format!("{year:0>4}-{rest}")
        }
        _ => value.to_string(),
    }
}

fn normalize_key(key: &str) -> String {
    let tokens: Vec<String> = key.split_whitespace().filter_map(normalize_pmb_id).collect();
    if tokens.is_empty() {
        key.trim().to_string()
    } else {
        tokens.join(" ")
    }
}

fn canonicalize_entry_ids(doc: &mut TeiDocument, back: NodeId) {
    for el in doc.descendants(back) {
        let is_entry = doc
            .local_name(el)
            .and_then(EntityKind::from_entry_element)
            .is_some();
        if !is_entry {
            continue;
        }
        let canonical = doc
            .attr(el, "xml:id")
            .filter(|id| id.contains("__"))
            .and_then(normalize_pmb_id);
        if let Some(id) = canonical {
            doc.set_attr(el, "xml:id", &id);
        }
    }
}

fn convert_idno_notes(doc: &mut TeiDocument, back: NodeId) {
    let notes: Vec<NodeId> = doc
        .descendants_named(back, "note")
        .into_iter()
        .filter(|&n| doc.attr(n, "type") == Some("IDNO"))
        .collect();

    for note in notes {
        let url = doc.text_content(note);
        let idno = doc.create_element("idno");
        doc.set_attr(idno, "type", "URL");
        doc.set_attr(idno, "subtype", &url_subtype(&url));
        if !url.is_empty() {
            doc.append_text(idno, &url);
        }
        doc.replace_with(note, idno);
    }
}

/// Classify a URL by its site: well-known sources by keyword, otherwise the
/// first label of the host.
#[must_use]
pub fn url_subtype(url: &str) -> String {
    for keyword in ["wikipedia", "wikidata", "geonames"] {
        if url.contains(keyword) {
            return keyword.to_string();
        }
    }
    for scheme in ["https://www.", "http://www.", "https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return rest.split('.').next().unwrap_or_default().to_string();
        }
    }
    match url.split_once('.') {
        Some((head, _)) => head.to_string(),
        None => "unknown".to_string(),
    }
}

fn remove_collections(doc: &mut TeiDocument, back: NodeId) {
    let doomed: Vec<NodeId> = doc
        .descendants(back)
        .into_iter()
        .filter(|&n| {
            if doc.is_named(n, "listBibl") {
                doc.children_named(n, "bibl")
                    .any(|b| doc.attr(b, "type") == Some("collections"))
            } else {
                doc.is_named(n, "note") && doc.attr(n, "type") == Some("collections")
            }
        })
        .collect();
    for node in doomed {
        doc.detach(node);
    }
}

fn remove_empty_lists(doc: &mut TeiDocument, back: NodeId) {
    let empty: Vec<NodeId> = doc
        .element_children(back)
        .filter(|&n| doc.local_name(n).is_some_and(|l| l.starts_with("list")))
        .filter(|&n| doc.element_children(n).next().is_none())
        .collect();
    for list in empty {
        doc.detach(list);
    }
}
