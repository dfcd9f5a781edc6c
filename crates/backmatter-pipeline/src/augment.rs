//! Authors of listed works become listed persons.

use crate::resolver::{merge_resolution, PopulateReport, Resolver};
use backmatter_core::{normalize_pmb_id, EntityKind, NodeId, TeiDocument, CENTRAL_SUBJECT_ID};
use std::collections::BTreeSet;

/// Append a resolved `person` to `listPerson` for every author of a
/// `listBibl/bibl` that is not listed yet. The central subject is skipped.
pub fn add_bibliography_authors(
    doc: &mut TeiDocument,
    back: NodeId,
    resolver: &Resolver,
) -> PopulateReport {
    let mut report = PopulateReport::default();

    let authors = bibliography_authors(doc, back);
    if authors.is_empty() {
        return report;
    }

    let person_list = EntityKind::Person.list_element();
    let list = doc.first_child_named(back, person_list);
    let listed: BTreeSet<String> = list
        .map(|list| {
            doc.children_named(list, EntityKind::Person.entry_element())
                .filter_map(|p| doc.attr(p, "xml:id"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let missing: Vec<String> = authors.into_iter().filter(|id| !listed.contains(id)).collect();
    if missing.is_empty() {
        return report;
    }

    let list = match list {
        Some(list) => list,
        None => doc.append_element(back, person_list),
    };

    for id in missing {
        log::debug!("Adding bibliography author {id}");
        let resolution = resolver.resolve(&id, EntityKind::Person);
        let person = doc.append_element(list, EntityKind::Person.entry_element());
        doc.set_attr(person, "xml:id", &id);
        report.record(merge_resolution(doc, person, &id, EntityKind::Person, &resolution));
    }

    report
}

/// Distinct normalized author ids of all listed works, sorted.
fn bibliography_authors(doc: &TeiDocument, back: NodeId) -> BTreeSet<String> {
    let bibl = EntityKind::Bibl;
    doc.children_named(back, bibl.list_element())
        .flat_map(|list| doc.children_named(list, bibl.entry_element()))
        .flat_map(|entry| doc.children_named(entry, "author"))
        .filter_map(|author| doc.attr(author, "ref").or_else(|| doc.attr(author, "key")))
        .flat_map(|raw| raw.split(|c: char| c == '#' || c.is_whitespace()))
        .filter_map(normalize_pmb_id)
        .filter(|id| id != CENTRAL_SUBJECT_ID)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LocalIndex;

    fn offline() -> Resolver {
        Resolver::new(LocalIndex::default(), 10, None)
    }

    #[test]
    fn test_missing_author_creates_list_person() {
        let mut doc = TeiDocument::parse(
            r##"<TEI><text><back><listBibl><bibl xml:id="pmb1"><author ref="#person__555"/><author ref="#pmb2121"/></bibl></listBibl></back></text></TEI>"##,
        )
        .unwrap();
        let back = doc.find_first("back").unwrap();
        let report = add_bibliography_authors(&mut doc, back, &offline());
        assert_eq!(report.entries, 1);
        assert_eq!(
            doc.node_to_string(back),
            r##"<back><listBibl><bibl xml:id="pmb1"><author ref="#person__555"/><author ref="#pmb2121"/></bibl></listBibl><listPerson><person xml:id="pmb555"><error type="person">555</error></person></listPerson></back>"##
        );
    }

    #[test]
    fn test_multi_valued_author_ref_lists_each_person() {
        let mut doc = TeiDocument::parse(
            r##"<TEI><text><back><listBibl><bibl xml:id="pmb1"><author ref="#pmb555 #pmb556"/></bibl></listBibl></back></text></TEI>"##,
        )
        .unwrap();
        let back = doc.find_first("back").unwrap();
        let report = add_bibliography_authors(&mut doc, back, &offline());
        assert_eq!(report.entries, 2);

        let list = doc.first_child_named(back, "listPerson").unwrap();
        let ids: Vec<&str> = doc
            .element_children(list)
            .filter_map(|p| doc.attr(p, "xml:id"))
            .collect();
        assert_eq!(ids, vec!["pmb555", "pmb556"]);
        let errors: Vec<String> = doc
            .descendants_named(list, "error")
            .into_iter()
            .map(|e| doc.text_content(e))
            .collect();
        assert_eq!(errors, vec!["555", "556"]);
    }

    #[test]
    fn test_listed_authors_are_skipped() {
        let mut doc = TeiDocument::parse(
            r#"<TEI><text><back><listPerson><person xml:id="pmb3"/></listPerson><listBibl><bibl><author key="pmb3"/></bibl></listBibl></back></text></TEI>"#,
        )
        .unwrap();
        let back = doc.find_first("back").unwrap();
        let before = doc.node_to_string(back);
        assert_eq!(add_bibliography_authors(&mut doc, back, &offline()).entries, 0);
        assert_eq!(doc.node_to_string(back), before);
    }
}
