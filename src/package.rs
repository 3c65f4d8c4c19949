use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use memmap2::Mmap;

use crate::error::Error;

pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// An unpacked OOXML package: every part, read into memory up front so
/// extraction never touches the archive.
#[derive(Debug, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        // Zero-length files cannot be mapped on every platform.
        match unsafe { Mmap::map(&file) } {
            Ok(data) => Self::from_bytes(&data),
            Err(_) => Self::from_bytes(&std::fs::read(path)?),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;
        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let mut buf = Vec::with_capacity(capacity_hint(entry.size()));
            entry.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }
        Ok(Self { parts })
    }

    /// Build a package from already-extracted parts, for callers that own
    /// their own container handling.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name.trim_start_matches('/')).map(Vec::as_slice)
    }

    /// Part contents as text with any UTF-8 BOM removed.
    pub fn part_text(&self, name: &str) -> Option<Cow<'_, str>> {
        let bytes = self.part(name)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Some(String::from_utf8_lossy(bytes))
    }

    /// Relationships declared for `part` (`word/_rels/document.xml.rels`
    /// for `word/document.xml`). Missing or broken rels yield an empty set.
    pub fn relationships(&self, part: &str) -> Relationships {
        let Some(xml_content) = self.part_text(&rels_path_for(part)) else {
            return Relationships::default();
        };
        Relationships::parse(&xml_content, part)
    }

    /// The main document part named by the package-level officeDocument
    /// relationship, falling back to the conventional location.
    pub fn main_document_part(&self) -> String {
        self.relationships("")
            .target_of_type(OFFICE_DOCUMENT_REL)
            .filter(|target| self.part(target).is_some())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub rel_type: String,
    /// Package part name for internal targets, raw URI for external ones.
    pub target: String,
    pub external: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Relationships {
    by_id: BTreeMap<String, Relationship>,
}

impl Relationships {
    fn parse(xml_content: &str, source_part: &str) -> Self {
        let mut by_id = BTreeMap::new();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            log::warn!("Unreadable relationships for '{source_part}'");
            return Self { by_id };
        };
        for node in xml.root_element().children() {
            if node.tag_name().name() != "Relationship" {
                continue;
            }
            if node
                .tag_name()
                .namespace()
                .is_some_and(|ns| ns != PKG_REL_NS)
            {
                continue;
            }
            let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
                continue;
            };
            let external = node.attribute("TargetMode") == Some("External");
            let target = if external {
                target.to_string()
            } else {
                resolve_target(source_part, target)
            };
            by_id.insert(
                id.to_string(),
                Relationship {
                    rel_type: node.attribute("Type").unwrap_or("").to_string(),
                    target,
                    external,
                },
            );
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// First target whose relationship type ends with `suffix`
    /// (e.g. `/styles`), in id order.
    pub fn target_of_type(&self, suffix: &str) -> Option<&str> {
        self.by_id
            .values()
            .find(|r| !r.external && r.rel_type.ends_with(suffix))
            .map(|r| r.target.as_str())
    }
}

/// Largest up-front allocation made on the strength of a declared entry size.
const MAX_PREALLOC: usize = 1 << 20;

/// Buffer size to reserve for an entry. The declared size comes from the
/// archive and is not trusted beyond `MAX_PREALLOC`.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC))
}

/// "word/header1.xml" → "word/_rels/header1.xml.rels"; "" → "_rels/.rels".
fn rels_path_for(part_path: &str) -> String {
    let (dir, file) = match part_path.rsplit_once('/') {
        Some((d, f)) => (d, f),
        None => ("", part_path),
    };
    if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    }
}

/// Resolve a relationship target against the directory of its source part,
/// collapsing `.` and `..` segments.
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let base_dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
