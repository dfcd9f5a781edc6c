//! PMB API access
//!
//! `GET {api_base}/{kind}/{number}` returns a TEI fragment for one entity.
//! Requests are made once, with a timeout and without retries.

use super::{EntityRecord, RecordSource};
use backmatter_core::{EntityKind, NodeId, TeiDocument};
use std::time::Duration;
use thiserror::Error;

/// Default PMB TEI endpoint.
pub const DEFAULT_API_BASE: &str = "https://pmb.acdh.oeaw.ac.at/apis/tei";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a remote lookup produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Text appended to the error marker in the letter, if any.
    #[must_use]
    pub fn marker_reason(&self) -> Option<&str> {
        match self {
            Self::Status(_) => None,
            Self::Transport(reason) | Self::Parse(reason) => Some(reason),
        }
    }
}

/// Source of raw entity responses.
pub trait RecordFetcher: Send + Sync {
    /// Fetch the response body for entity `number` of `kind`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Status`] for non-2xx responses, [`FetchError::Transport`]
    /// for connection failures and timeouts.
    fn fetch(&self, kind: EntityKind, number: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    api_base: String,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn url(&self, kind: EntityKind, number: &str) -> String {
        format!("{}/{}/{}", self.api_base, kind.api_segment(), number)
    }
}

impl RecordFetcher for HttpFetcher {
    fn fetch(&self, kind: EntityKind, number: &str) -> Result<String, FetchError> {
        let url = self.url(kind, number);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

const PERSON_FIELDS: &[&str] = &["persName", "birth", "death", "sex", "occupation", "idno"];
const BIBL_FIELDS: &[&str] = &["title", "author", "date", "note", "idno"];
const DELETION_MARKER: &str = "loschen";

/// Turn a response body into a record for `id`, keeping only the fields the
/// back matter uses for persons and works.
pub(crate) fn record_from_response(
    body: &str,
    kind: EntityKind,
    id: &str,
) -> Result<EntityRecord, FetchError> {
    let response = TeiDocument::parse(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let mut fragment = TeiDocument::new(kind.entry_element());
    let root = fragment.root();
    fragment.set_attr(root, "xml:id", id);

    let fields = match kind {
        EntityKind::Person => Some((PERSON_FIELDS, "persName")),
        EntityKind::Bibl => Some((BIBL_FIELDS, "title")),
        _ => None,
    };

    match fields {
        Some((names, deletable)) => {
            let mut kept = Vec::new();
            collect_fields(&response, response.root(), names, deletable, &mut kept);
            for node in kept {
                let copy = fragment.import_node(&response, node);
                fragment.append_child(root, copy);
            }
        }
        None => {
            fragment.import_children(root, &response, response.root());
        }
    }

    Ok(EntityRecord {
        id: id.to_string(),
        kind,
        source: RecordSource::Remote,
        fragment,
    })
}

/// Top-most descendants whose local name is in `names`; elements named
/// `deletable` with the deletion marker type are skipped.
fn collect_fields(
    doc: &TeiDocument,
    node: NodeId,
    names: &[&str],
    deletable: &str,
    out: &mut Vec<NodeId>,
) {
    for child in doc.element_children(node) {
        let Some(local) = doc.local_name(child) else {
            continue;
        };
        let deleted = local == deletable && doc.attr(child, "type") == Some(DELETION_MARKER);
        if names.contains(&local) && !deleted {
            out.push(child);
        } else if !deleted {
            collect_fields(doc, child, names, deletable, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_response_is_filtered() {
        let body = r#"<person xml:id="person__5">
            <persName type="loschen"><surname>Alt</surname></persName>
            <persName><surname>Bahr</surname></persName>
            <birth><date when="1863"/></birth>
            <noise><idno type="gnd">x</idno></noise>
            <listRelation/>
        </person>"#;
        let record = record_from_response(body, EntityKind::Person, "pmb5").unwrap();
        let doc = &record.fragment;
        assert_eq!(
            doc.node_to_string(doc.root()),
            r#"<person xml:id="pmb5"><persName><surname>Bahr</surname></persName><birth><date when="1863"/></birth><idno type="gnd">x</idno></person>"#
        );
        assert_eq!(record.source, RecordSource::Remote);
    }

    #[test]
    fn test_place_response_keeps_all_children() {
        let record =
            record_from_response("<place><placeName>Wien</placeName></place>", EntityKind::Place, "pmb50")
                .unwrap();
        let doc = &record.fragment;
        assert_eq!(doc.element_children(doc.root()).count(), 1);
    }

    #[test]
    fn test_invalid_body_is_a_parse_error() {
        let err = record_from_response("<html>", EntityKind::Org, "pmb1").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        assert!(err.marker_reason().is_some());
        assert_eq!(FetchError::Status(404).marker_reason(), None);
    }

    #[test]
    fn test_url_layout() {
        let fetcher = HttpFetcher::new("https://example.org/apis/tei/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(fetcher.url(EntityKind::Bibl, "9001"), "https://example.org/apis/tei/bibl/9001");
    }
}
