//! Built-in record for the edition's central subject.

use super::{EntityRecord, RecordSource};
use backmatter_core::{EntityKind, TeiDocument, CENTRAL_SUBJECT_ID};
use once_cell::sync::Lazy;
use std::sync::Arc;

const CENTRAL_SUBJECT_XML: &str = concat!(
    r#"<person xml:id="pmb2121">"#,
    "<persName><surname>Schnitzler</surname><forename>Arthur</forename></persName>",
    r#"<birth><date when="1862-05-15">15. 5. 1862</date>"#,
    r#"<settlement key="pmb50"><placeName type="pref">Wien</placeName>"#,
    "<location><geo>48,208333 16,373056</geo></location></settlement></birth>",
    r#"<death><date when="1931-10-21">21. 10. 1931</date>"#,
    r#"<settlement key="pmb50"><placeName type="pref">Wien</placeName>"#,
    "<location><geo>48,208333 16,373056</geo></location></settlement></death>",
    r#"<sex value="male"/>"#,
    r#"<occupation ref="pmb90">Schriftsteller/Schriftstellerin</occupation>"#,
    r#"<occupation ref="pmb97">Mediziner/Medizinerin</occupation>"#,
    r#"<idno type="gnd">https://d-nb.info/gnd/118609807/</idno>"#,
    "</person>",
);

static CENTRAL_SUBJECT: Lazy<Option<Arc<EntityRecord>>> = Lazy::new(|| {
    match TeiDocument::parse(CENTRAL_SUBJECT_XML) {
        Ok(fragment) => Some(Arc::new(EntityRecord {
            id: CENTRAL_SUBJECT_ID.to_string(),
            kind: EntityKind::Person,
            source: RecordSource::Fixed,
            fragment,
        })),
        Err(e) => {
            log::error!("Built-in record for {CENTRAL_SUBJECT_ID} is invalid: {e}");
            None
        }
    }
});

pub(crate) fn central_subject() -> Option<Arc<EntityRecord>> {
    CENTRAL_SUBJECT.clone()
}
