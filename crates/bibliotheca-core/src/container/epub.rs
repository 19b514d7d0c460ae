use std::io::{Read, Seek};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use tracing::debug;
use zip::ZipArchive;

use super::{Attributes, Container, RawMetadataField};
use crate::error::{LibraryError, Result};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Elements under `<metadata>` that are not Dublin Core fields.
const NON_FIELD_ELEMENTS: &[&[u8]] = &[b"meta", b"link", b"dc-metadata", b"x-metadata"];

/// An opened EPUB. The package metadata is parsed eagerly; the archive stays
/// open for cover lookup and is released when the container is dropped.
pub struct EpubContainer<R: Read + Seek> {
    archive: ZipArchive<R>,
    fields: Vec<RawMetadataField>,
    cover_path: Option<String>,
}

impl<R: Read + Seek> EpubContainer<R> {
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| LibraryError::container(format!("not a ZIP archive: {e}")))?;

        let container_xml = read_text_entry(&mut archive, CONTAINER_PATH)?;
        let package_path = rootfile_path(&container_xml)?;
        let package_xml = read_text_entry(&mut archive, &package_path)?;
        let package = Package::parse(&package_xml)?;

        let cover_path = package
            .cover_href()
            .map(|href| resolve_href(&package_path, href));

        Ok(Self {
            archive,
            fields: package.fields,
            cover_path,
        })
    }

    fn field(&self, name: &str) -> Result<&RawMetadataField> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| LibraryError::FieldUnavailable(name.to_string()))
    }
}

impl<R: Read + Seek> Container for EpubContainer<R> {
    fn metadata_fields(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    fn metadata(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.field(name)?.values.clone())
    }

    fn metadata_attrs(&self, name: &str) -> Result<Vec<Attributes>> {
        Ok(self.field(name)?.attrs.clone())
    }

    fn cover_image(&mut self) -> Option<Vec<u8>> {
        let path = self.cover_path.clone()?;
        match read_entry(&mut self.archive, &path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(path = %path, error = %e, "declared cover is unreadable");
                None
            }
        }
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| LibraryError::container(format!("{name}: {e}")))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| LibraryError::container(format!("{name}: {e}")))?;
    Ok(bytes)
}

fn read_text_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let bytes = read_entry(archive, name)?;
    String::from_utf8(bytes).map_err(|e| LibraryError::container(format!("{name}: {e}")))
}

/// `full-path` of the first `<rootfile>` in `META-INF/container.xml`.
fn rootfile_path(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LibraryError::container(format!("{CONTAINER_PATH}: {e}"))),
            _ => {}
        }
    }
    Err(LibraryError::container(format!("{CONTAINER_PATH}: no rootfile")))
}

/// Resolve a manifest href against the directory of the package document.
fn resolve_href(package_path: &str, href: &str) -> String {
    let base = package_path.rsplit_once('/').map_or("", |(dir, _)| dir);
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn attributes(element: &BytesStart) -> Attributes {
    element
        .attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

/// Text with XML entities decoded. Entities XML does not define (`&nbsp;`)
/// make decoding fail; the raw text is kept so the normalizer can drop them.
fn element_text(text: &BytesText) -> String {
    match text.unescape() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}

#[derive(Debug, Default)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: String,
}

#[derive(Debug, Default)]
struct Package {
    fields: Vec<RawMetadataField>,
    cover_id: Option<String>,
    manifest: Vec<ManifestItem>,
}

/// A metadata element whose text is still being read.
struct OpenField {
    name: String,
    attrs: Attributes,
    text: String,
}

impl Package {
    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut package = Self::default();
        let mut in_metadata = false;
        let mut open: Option<OpenField> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let local = e.local_name();
                    if local.as_ref() == b"metadata" {
                        in_metadata = true;
                    } else if in_metadata {
                        if local.as_ref() == b"meta" {
                            package.note_meta(&e);
                        } else if open.is_none() && !NON_FIELD_ELEMENTS.contains(&local.as_ref()) {
                            open = Some(OpenField {
                                name: String::from_utf8_lossy(local.as_ref()).into_owned(),
                                attrs: attributes(&e),
                                text: String::new(),
                            });
                        }
                    } else if local.as_ref() == b"item" {
                        package.note_item(&e);
                    }
                }
                Ok(Event::Empty(e)) => {
                    let local = e.local_name();
                    if in_metadata {
                        if local.as_ref() == b"meta" {
                            package.note_meta(&e);
                        } else if !NON_FIELD_ELEMENTS.contains(&local.as_ref()) {
                            let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                            package.push_value(&name, String::new(), attributes(&e));
                        }
                    } else if local.as_ref() == b"item" {
                        package.note_item(&e);
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(field) = open.as_mut() {
                        field.text.push_str(&element_text(&t));
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(field) = open.as_mut() {
                        field.text.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Ok(Event::End(e)) => {
                    let local = e.local_name();
                    if local.as_ref() == b"metadata" {
                        in_metadata = false;
                    } else if open
                        .as_ref()
                        .is_some_and(|field| field.name.as_bytes() == local.as_ref())
                    {
                        if let Some(field) = open.take() {
                            package.push_value(&field.name, field.text.trim().to_string(), field.attrs);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(LibraryError::container(format!(
                        "package document at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        Ok(package)
    }

    fn push_value(&mut self, name: &str, value: String, attrs: Attributes) {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.push(value, attrs),
            None => {
                let mut field = RawMetadataField::new(name);
                field.push(value, attrs);
                self.fields.push(field);
            }
        }
    }

    /// EPUB 2 cover declaration: `<meta name="cover" content="item-id"/>`.
    fn note_meta(&mut self, element: &BytesStart) {
        if attribute(element, b"name").as_deref() == Some("cover") {
            self.cover_id = attribute(element, b"content");
        }
    }

    fn note_item(&mut self, element: &BytesStart) {
        self.manifest.push(ManifestItem {
            id: attribute(element, b"id").unwrap_or_default(),
            href: attribute(element, b"href").unwrap_or_default(),
            media_type: attribute(element, b"media-type").unwrap_or_default(),
            properties: attribute(element, b"properties").unwrap_or_default(),
        });
    }

    fn cover_href(&self) -> Option<&str> {
        let declared = self
            .cover_id
            .as_ref()
            .and_then(|id| self.manifest.iter().find(|item| &item.id == id));
        let epub3 = || {
            self.manifest.iter().find(|item| {
                item.properties
                    .split_whitespace()
                    .any(|p| p == "cover-image")
            })
        };
        let guessed = || {
            self.manifest.iter().find(|item| {
                item.media_type.starts_with("image/")
                    && (item.id.to_lowercase().contains("cover")
                        || item.href.to_lowercase().contains("cover"))
            })
        };

        declared
            .or_else(epub3)
            .or_else(guessed)
            .map(|item| item.href.as_str())
    }
}
