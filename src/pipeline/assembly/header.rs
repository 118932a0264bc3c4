//! Profile content access: single-entry archive unwrapping and the
//! CGMES `md:FullModel` header parser.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::AssemblyError;
use super::traits::DocumentParser;
use super::types::DocumentHeader;

/// Largest profile accepted once decompressed. Archive headers are read from
/// the feed, so neither the declared nor the actual size is trusted beyond it.
pub const MAX_PROFILE_BYTES: u64 = 512 * 1024 * 1024;

/// Decompress the first entry of a zipped profile.
pub fn unwrap_single_entry(filename: &str, archive: &[u8]) -> Result<Vec<u8>, AssemblyError> {
    unwrap_bounded(filename, archive, MAX_PROFILE_BYTES)
}

fn unwrap_bounded(filename: &str, archive: &[u8], limit: u64) -> Result<Vec<u8>, AssemblyError> {
    let archive_error = |reason: String| AssemblyError::Archive {
        filename: filename.to_string(),
        reason,
    };

    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| archive_error(e.to_string()))?;
    if zip.is_empty() {
        return Err(archive_error("archive has no entry".into()));
    }
    if zip.len() > 1 {
        tracing::warn!(filename, entries = zip.len(), "Profile archive has several entries, using the first");
    }

    let entry = zip.by_index(0).map_err(|e| archive_error(e.to_string()))?;
    if entry.size() > limit {
        return Err(archive_error(format!(
            "entry declares {} bytes, limit is {limit}",
            entry.size()
        )));
    }

    let mut content = Vec::new();
    entry
        .take(limit + 1)
        .read_to_end(&mut content)
        .map_err(|e| archive_error(e.to_string()))?;
    if content.len() as u64 > limit {
        return Err(archive_error(format!("entry inflates beyond {limit} bytes")));
    }
    Ok(content)
}

/// Reads `rdf:about` and every `md:Model.DependentOn/@rdf:resource` from the
/// `md:FullModel` element. Stops at the end of that element.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullModelHeaderParser;

impl FullModelHeaderParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for FullModelHeaderParser {
    fn parse(&self, content: &[u8]) -> Result<DocumentHeader, AssemblyError> {
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut document_id: Option<String> = None;
        let mut dependency_ids = Vec::new();
        let mut in_full_model = false;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                AssemblyError::Header(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(ref e) if e.local_name().as_ref() == b"FullModel" => {
                    document_id = Some(attribute(e, b"about")?.ok_or_else(|| {
                        AssemblyError::Header("FullModel has no rdf:about".into())
                    })?);
                    in_full_model = true;
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"FullModel" => {
                    document_id = attribute(e, b"about")?;
                    break;
                }
                Event::Start(ref e) | Event::Empty(ref e)
                    if in_full_model && e.local_name().as_ref() == b"Model.DependentOn" =>
                {
                    if let Some(resource) = attribute(e, b"resource")? {
                        dependency_ids.push(resource);
                    }
                }
                Event::End(ref e) if e.local_name().as_ref() == b"FullModel" => break,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let document_id = document_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AssemblyError::Header("no FullModel header found".into()))?;
        Ok(DocumentHeader {
            document_id,
            dependency_ids,
        })
    }
}

/// Unescaped value of the attribute with this local name, prefix ignored.
fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, AssemblyError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| AssemblyError::Header(e.to_string()))?;
        if attr.key.local_name().as_ref() == local_name {
            let value = attr
                .unescape_value()
                .map_err(|e| AssemblyError::Header(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
