//! Open Packaging Conventions layer shared by the docx and pptx writers.
//!
//! Parts are registered with their content type and relationships, then
//! [`OpcPackage::finish`] validates the structure and writes a deterministic
//! ZIP archive (fixed timestamps, insertion order).

use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ExportError, PackageAssemblyError};
use crate::types::ExportFormat;
use crate::xml::{document, XmlElement};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const XML_CONTENT_TYPE: &str = "application/xml";
pub const CORE_PROPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";
pub const APP_PROPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
pub const REL_APP_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const CORE_PROPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const APP_PROPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

pub const APPLICATION_NAME: &str = "export_engine";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Relationship list for one source part. Ids are allocated as `rId1..rIdN`
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    entries: Vec<Relationship>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), false)
    }

    pub fn add_external(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), true)
    }

    fn push(&mut self, rel_type: &str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target,
            external,
        });
        id
    }

    pub fn entries(&self) -> &[Relationship] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_xml(&self) -> Vec<u8> {
        let root = XmlElement::new("Relationships")
            .attr("xmlns", RELS_NS)
            .children(self.entries.iter().map(|rel| {
                let el = XmlElement::new("Relationship")
                    .attr("Id", &rel.id)
                    .attr("Type", &rel.rel_type)
                    .attr("Target", &rel.target);
                if rel.external {
                    el.attr("TargetMode", "External")
                } else {
                    el
                }
            }));
        document(&root)
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`; `""` -> `_rels/.rels`.
pub fn rels_part_for(source: &str) -> String {
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if source.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{source}.rels"),
    }
}

/// Resolve a relationship target relative to the directory of its source part.
pub fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for piece in target.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `docProps/core.xml`. No timestamps, so identical input gives identical bytes.
pub fn core_properties(title: &str) -> Vec<u8> {
    let root = XmlElement::new("cp:coreProperties")
        .attr("xmlns:cp", CORE_PROPS_NS)
        .attr("xmlns:dc", DC_NS)
        .child(XmlElement::with_text("dc:title", title))
        .child(XmlElement::with_text("cp:revision", "1"));
    document(&root)
}

/// `docProps/app.xml` with format-specific statistics appended.
pub fn app_properties(extra: impl IntoIterator<Item = XmlElement>) -> Vec<u8> {
    let root = XmlElement::new("Properties")
        .attr("xmlns", APP_PROPS_NS)
        .child(XmlElement::with_text("Application", APPLICATION_NAME))
        .children(extra);
    document(&root)
}

/// Register `docProps/core.xml` and `docProps/app.xml` and return the root
/// relationships pointing at them and at `main_part`.
pub fn add_document_properties(
    package: &mut OpcPackage,
    main_part: &str,
    title: &str,
    app_extra: impl IntoIterator<Item = XmlElement>,
) -> Relationships {
    package.add_part("docProps/app.xml", APP_PROPS_CONTENT_TYPE, app_properties(app_extra));
    package.add_part("docProps/core.xml", CORE_PROPS_CONTENT_TYPE, core_properties(title));
    let mut rels = Relationships::new();
    rels.add(REL_OFFICE_DOCUMENT, main_part);
    rels.add(REL_CORE_PROPS, "docProps/core.xml");
    rels.add(REL_APP_PROPS, "docProps/app.xml");
    rels
}

pub struct OpcPackage {
    format: ExportFormat,
    parts: Vec<(String, Vec<u8>)>,
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
    relationships: Vec<(String, Relationships)>,
}

impl OpcPackage {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            parts: Vec::new(),
            defaults: vec![
                ("rels".to_string(), RELS_CONTENT_TYPE.to_string()),
                ("xml".to_string(), XML_CONTENT_TYPE.to_string()),
            ],
            overrides: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(ext, _)| ext == extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Add a part with a content-type override.
    pub fn add_part(&mut self, name: impl Into<String>, content_type: &str, bytes: Vec<u8>) {
        let name = name.into();
        self.overrides
            .push((format!("/{name}"), content_type.to_string()));
        self.parts.push((name, bytes));
    }

    /// Add a part covered by an extension default (media files).
    pub fn add_media(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.push((name.into(), bytes));
    }

    /// Register the relationship part of `source` (`""` for the package root).
    pub fn set_relationships(&mut self, source: impl Into<String>, rels: Relationships) {
        self.relationships.push((source.into(), rels));
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    fn content_types_xml(&self) -> Vec<u8> {
        let mut root = XmlElement::new("Types").attr("xmlns", CONTENT_TYPES_NS);
        for (ext, ct) in &self.defaults {
            root.push(
                XmlElement::new("Default")
                    .attr("Extension", ext)
                    .attr("ContentType", ct),
            );
        }
        for (part, ct) in &self.overrides {
            root.push(
                XmlElement::new("Override")
                    .attr("PartName", part)
                    .attr("ContentType", ct),
            );
        }
        document(&root)
    }

    pub fn validate(&self) -> Result<(), PackageAssemblyError> {
        let mut names = BTreeSet::new();
        for (name, _) in &self.parts {
            if !names.insert(name.as_str()) {
                return Err(PackageAssemblyError::DuplicatePart(name.clone()));
            }
        }

        for (part, _) in &self.overrides {
            if !names.contains(part.trim_start_matches('/')) {
                return Err(PackageAssemblyError::MissingPart(part.clone()));
            }
        }

        for (name, _) in &self.parts {
            let has_override = self
                .overrides
                .iter()
                .any(|(part, _)| part.trim_start_matches('/') == name);
            let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
            let has_default = self.defaults.iter().any(|(ext, _)| ext == extension);
            if !has_override && !has_default {
                return Err(PackageAssemblyError::MissingContentType(name.clone()));
            }
        }

        for (source, rels) in &self.relationships {
            if !source.is_empty() && !names.contains(source.as_str()) {
                return Err(PackageAssemblyError::MissingPart(source.clone()));
            }
            for rel in rels.entries().iter().filter(|rel| !rel.external) {
                let target = resolve_target(source, &rel.target);
                if !names.contains(target.as_str()) {
                    return Err(PackageAssemblyError::DanglingRelationship {
                        source_part: source.clone(),
                        id: rel.id.clone(),
                        target,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate and serialize. `[Content_Types].xml` and the root relationships
    /// come first, then each part in registration order followed by its own
    /// relationship part.
    pub fn finish(self) -> Result<Vec<u8>, ExportError> {
        self.validate()?;

        let format = self.format;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let mut write_entry = |name: &str, bytes: &[u8]| -> Result<(), ExportError> {
            zip.start_file(name, options)
                .map_err(|err| ExportError::render(format, err))?;
            zip.write_all(bytes)
                .map_err(|err| ExportError::render(format, err))
        };

        write_entry(CONTENT_TYPES_PART, &self.content_types_xml())?;
        for (source, rels) in &self.relationships {
            if source.is_empty() {
                write_entry(&rels_part_for(source), &rels.to_xml())?;
            }
        }
        for (name, bytes) in &self.parts {
            write_entry(name, bytes)?;
            for (source, rels) in &self.relationships {
                if source == name {
                    write_entry(&rels_part_for(source), &rels.to_xml())?;
                }
            }
        }

        let cursor = zip
            .finish()
            .map_err(|err| ExportError::render(format, err))?;
        Ok(cursor.into_inner())
    }
}
