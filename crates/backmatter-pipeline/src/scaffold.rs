//! Placeholder back matter
//!
//! Replaces the `back` element of a letter by one list per entity kind with
//! an empty entry for every referenced id.

use crate::extract::ExtractedReferences;
use backmatter_core::{NodeId, TeiDocument};

/// Build a fresh `back` under the first `text` element.
///
/// Returns `None` (and leaves the document untouched) when the letter has no
/// `text` element.
pub fn build_scaffold(doc: &mut TeiDocument, refs: &ExtractedReferences) -> Option<NodeId> {
    let text = doc.find_first("text")?;

    let stale: Vec<NodeId> = doc.children_named(text, "back").collect();
    for back in stale {
        doc.detach(back);
    }

    let back = doc.append_element(text, "back");
    for (kind, set) in refs.iter() {
        let list = doc.append_element(back, kind.list_element());
        for (id, class) in set.entries() {
            let entry = doc.append_element(list, kind.entry_element());
            doc.set_attr(entry, "xml:id", id);
            if let Some(ana) = class.annotation() {
                doc.set_attr(entry, "ana", ana);
            }
        }
    }
    Some(back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_references;

    #[test]
    fn test_scaffold_orders_entries_by_class() {
        let mut doc = TeiDocument::parse(
            r##"<TEI><text><body>
                <persName ref="#pmb2"/>
                <persName ref="#pmb9" subtype="implied"/>
                <note type="commentary"><persName ref="#pmb1"/></note>
            </body><back><div/></back></text></TEI>"##,
        )
        .unwrap();
        let refs = extract_references(&doc);
        let back = build_scaffold(&mut doc, &refs).unwrap();
        assert_eq!(
            doc.node_to_string(back),
            r#"<back><listPerson><person xml:id="pmb2"/><person xml:id="pmb1" ana="comment"/><person xml:id="pmb9" ana="implied"/></listPerson></back>"#
        );
        assert_eq!(doc.descendants_named(doc.root(), "back").len(), 1);
    }

    #[test]
    fn test_no_refs_gives_empty_back() {
        let mut doc = TeiDocument::parse("<TEI><text><body><p>Hallo</p></body></text></TEI>").unwrap();
        let refs = extract_references(&doc);
        let back = build_scaffold(&mut doc, &refs).unwrap();
        assert!(doc.children(back).is_empty());
    }

    #[test]
    fn test_without_text_body() {
        let mut doc = TeiDocument::parse("<TEI><teiHeader/></TEI>").unwrap();
        let before = doc.clone();
        assert!(build_scaffold(&mut doc, &ExtractedReferences::default()).is_none());
        assert_eq!(doc, before);
    }
}
