//! Shared fixtures for unit tests.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::container::{Attributes, Container, RawMetadataField};
use crate::error::{LibraryError, Result};

const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A minimal EPUB 2 archive whose `<metadata>` holds `metadata_xml`, with an
/// optional PNG cover declared through `<meta name="cover">`.
pub(crate) fn epub_bytes(metadata_xml: &str, cover: Option<&[u8]>) -> Vec<u8> {
    let (cover_meta, cover_item) = if cover.is_some() {
        (
            r#"<meta name="cover" content="cover-img"/>"#,
            r#"<item id="cover-img" href="images/cover.png" media-type="image/png"/>"#,
        )
    } else {
        ("", "")
    };
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uuid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    {metadata_xml}
    {cover_meta}
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    {cover_item}
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(opf.as_bytes()).unwrap();
    zip.start_file("OEBPS/text/ch1.xhtml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<html><body><p>Once upon a time</p></body></html>")
        .unwrap();
    if let Some(bytes) = cover {
        zip.start_file("OEBPS/images/cover.png", stored).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// In-memory container; fields listed in `broken` are reported but fail to read.
#[derive(Debug, Default)]
pub(crate) struct FakeContainer {
    pub fields: Vec<RawMetadataField>,
    pub broken: Vec<String>,
    pub cover: Option<Vec<u8>>,
}

impl FakeContainer {
    pub fn with(mut self, name: &str, values: &[&str]) -> Self {
        let mut field = RawMetadataField::new(name);
        for value in values {
            field.push(*value, Attributes::new());
        }
        self.fields.push(field);
        self
    }

    pub fn with_attrs(mut self, name: &str, values: &[(&str, &[(&str, &str)])]) -> Self {
        let mut field = RawMetadataField::new(name);
        for (value, attrs) in values {
            let attrs = attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            field.push(*value, attrs);
        }
        self.fields.push(field);
        self
    }

    pub fn with_broken(mut self, name: &str) -> Self {
        self.broken.push(name.to_string());
        self
    }

    fn field(&self, name: &str) -> Result<&RawMetadataField> {
        if self.broken.iter().any(|b| b == name) {
            return Err(LibraryError::FieldUnavailable(name.to_string()));
        }
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LibraryError::FieldUnavailable(name.to_string()))
    }
}

impl Container for FakeContainer {
    fn metadata_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.name.clone())
            .chain(self.broken.iter().cloned())
            .collect()
    }

    fn metadata(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.field(name)?.values.clone())
    }

    fn metadata_attrs(&self, name: &str) -> Result<Vec<Attributes>> {
        Ok(self.field(name)?.attrs.clone())
    }

    fn cover_image(&mut self) -> Option<Vec<u8>> {
        self.cover.clone()
    }
}
