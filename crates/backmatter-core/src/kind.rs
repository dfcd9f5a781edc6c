//! Entity kinds and how references are classified.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five kinds of entity listed in the back matter.
///
/// The derived `Ord` follows declaration order, which is the order lists are
/// created and resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Bibl,
    Place,
    Org,
    Event,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [Self::Person, Self::Bibl, Self::Place, Self::Org, Self::Event];

    /// Entry element in the back matter, also the API path segment.
    #[must_use]
    pub const fn entry_element(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Bibl => "bibl",
            Self::Place => "place",
            Self::Org => "org",
            Self::Event => "event",
        }
    }

    /// Container element holding the entries.
    #[must_use]
    pub const fn list_element(self) -> &'static str {
        match self {
            Self::Person => "listPerson",
            Self::Bibl => "listBibl",
            Self::Place => "listPlace",
            Self::Org => "listOrg",
            Self::Event => "listEvent",
        }
    }

    /// Value of `@type` marking a reference to this kind in the body.
    #[must_use]
    pub const fn typed_value(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Bibl => "work",
            Self::Place => "place",
            Self::Org => "org",
            Self::Event => "event",
        }
    }

    /// Name element that refers to this kind without a `@type`.
    #[must_use]
    pub const fn name_element(self) -> Option<&'static str> {
        match self {
            Self::Person => Some("persName"),
            Self::Bibl => None,
            Self::Place => Some("placeName"),
            Self::Org => Some("orgName"),
            Self::Event => Some("eventName"),
        }
    }

    /// File name of the local PMB export for this kind.
    #[must_use]
    pub const fn list_file(self) -> &'static str {
        match self {
            Self::Person => "listperson.xml",
            Self::Bibl => "listbibl.xml",
            Self::Place => "listplace.xml",
            Self::Org => "listorg.xml",
            Self::Event => "listevent.xml",
        }
    }

    #[inline]
    #[must_use]
    pub const fn api_segment(self) -> &'static str {
        self.entry_element()
    }

    /// Kind whose entry element has this local name.
    #[must_use]
    pub fn from_entry_element(local: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.entry_element() == local)
    }

    /// Kind whose list element has this local name.
    #[must_use]
    pub fn from_list_element(local: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.list_element() == local)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_element())
    }
}

/// Where in a letter a reference occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RefClass {
    InText,
    InCommentary,
    Implied,
}

impl RefClass {
    /// `@ana` value written on back-matter entries of this class.
    #[must_use]
    pub const fn annotation(self) -> Option<&'static str> {
        match self {
            Self::InText => None,
            Self::InCommentary => Some("comment"),
            Self::Implied => Some("implied"),
        }
    }
}
