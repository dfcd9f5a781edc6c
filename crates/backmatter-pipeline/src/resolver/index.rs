//! Local PMB list files.
//!
//! At start-up only the `xml:id`s of each file are read. A record is loaded
//! on demand by streaming its file up to the matching entry.

use backmatter_core::{BackmatterError, EntityKind, Result, TeiDocument, TreeBuilder};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Which list file holds which id.
#[derive(Debug, Default)]
pub struct LocalIndex {
    ids: HashMap<String, EntityKind>,
    files: BTreeMap<EntityKind, PathBuf>,
}

impl LocalIndex {
    /// Index every list file present in `lists_dir`. Missing or unreadable
    /// files are logged and skipped.
    #[must_use]
    pub fn build(lists_dir: &Path) -> Self {
        let mut index = Self::default();

        for kind in EntityKind::ALL {
            let path = lists_dir.join(kind.list_file());
            if !path.is_file() {
                log::warn!("{} not found, skipping {kind} index", path.display());
                continue;
            }
            match scan_ids(&path, kind) {
                Ok(ids) => {
                    log::info!("Indexed {} {kind} ids from {}", ids.len(), path.display());
                    for id in ids {
                        index.ids.insert(id, kind);
                    }
                    index.files.insert(kind, path);
                }
                Err(e) => log::warn!("Failed to index {}: {e}", path.display()),
            }
        }

        log::info!("Total PMB entities indexed: {}", index.ids.len());
        index
    }

    #[must_use]
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.ids.get(id).copied()
    }

    #[must_use]
    pub fn file(&self, kind: EntityKind) -> Option<&Path> {
        self.files.get(&kind).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load the record of an indexed id from its list file.
    ///
    /// # Errors
    ///
    /// I/O and XML errors of the list file.
    pub fn load(&self, id: &str) -> Result<Option<(EntityKind, TeiDocument)>> {
        let Some(kind) = self.kind_of(id) else {
            return Ok(None);
        };
        let Some(path) = self.file(kind) else {
            return Ok(None);
        };
        log::debug!("Searching for {id} in {}", path.display());
        Ok(find_record(path, kind, id)?.map(|doc| (kind, doc)))
    }
}

fn open(path: &Path) -> Result<Reader<BufReader<File>>> {
    let mut reader = Reader::from_reader(BufReader::new(File::open(path)?));
    reader.trim_text(false);
    reader.expand_empty_elements(false);
    Ok(reader)
}

fn xml_id(start: &BytesStart<'_>) -> Result<Option<String>> {
    match start
        .try_get_attribute("xml:id")
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn is_entry(start: &BytesStart<'_>, kind: EntityKind) -> bool {
    start.local_name().as_ref() == kind.entry_element().as_bytes()
}

/// `xml:id`s of all entry elements of `kind` in a list file.
///
/// # Errors
///
/// I/O and XML errors of the list file.
pub fn scan_ids(path: &Path, kind: EntityKind) -> Result<Vec<String>> {
    let mut reader = open(path)?;
    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if is_entry(&e, kind) => {
                if let Some(id) = xml_id(&e)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

/// Stream a list file and build the entry of `kind` with the given `xml:id`.
/// Reading stops right after the entry.
///
/// # Errors
///
/// I/O and XML errors of the list file, or a file ending inside the entry.
pub fn find_record(path: &Path, kind: EntityKind, id: &str) -> Result<Option<TeiDocument>> {
    let mut reader = open(path)?;
    let mut buf = Vec::new();
    let mut builder: Option<TreeBuilder> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;

        if let Some(tree) = builder.as_mut() {
            match event {
                Event::Start(e) => tree.open(&e)?,
                Event::Empty(e) => {
                    tree.open(&e)?;
                    tree.close()?;
                }
                Event::End(_) => tree.close()?,
                Event::Text(e) => tree.text(&e.unescape()?)?,
                Event::CData(e) => tree.cdata(std::str::from_utf8(&e)?)?,
                Event::Comment(e) => {
                    tree.markup(&format!("<!--{}-->", std::str::from_utf8(&e)?));
                }
                Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => {
                    return Err(BackmatterError::Malformed(format!(
                        "{} ends inside record {id}",
                        path.display()
                    )))
                }
            }
            if tree.is_complete() {
                return builder.take().map(TreeBuilder::finish).transpose();
            }
        } else {
            match event {
                Event::Start(e) if is_entry(&e, kind) => {
                    if xml_id(&e)?.as_deref() == Some(id) {
                        let mut tree = TreeBuilder::default();
                        tree.open(&e)?;
                        builder = Some(tree);
                    }
                }
                Event::Empty(e) if is_entry(&e, kind) => {
                    if xml_id(&e)?.as_deref() == Some(id) {
                        let mut tree = TreeBuilder::default();
                        tree.open(&e)?;
                        tree.close()?;
                        return tree.finish().map(Some);
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }

        buf.clear();
    }
}
