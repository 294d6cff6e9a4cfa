//! Recursive container flattening.
//!
//! [`flatten`] turns an arbitrary archive payload into a flat map from entry
//! path to raw bytes, descending into nested containers up to
//! [`MAX_ARCHIVE_RECURSION_DEPTH`]. Single-stream compression (gzip, bzip2)
//! is decompressed fully in memory first; the result is presumed to be a tar.
//!
//! Failure policy: a corrupt archive aborts the current nesting level only,
//! returning whatever was accumulated before the failure. Entries with an
//! unrecognized extension are kept so the orchestrator can report them per
//! entry. Nothing in this module propagates an error to its caller.

use crate::formats::{FileType, MAX_ARCHIVE_RECURSION_DEPTH};
use sevenz_rust::{Password, SevenZReader};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tar::Archive as TarArchive;
use uuid::Uuid;
use zip::ZipArchive;

/// Map from normalized entry path to raw file bytes.
pub type DocumentMap = BTreeMap<String, Vec<u8>>;

/// Strip leading `./`, `../` and `/` segments from an entry name.
pub fn clean_file_name(name: &str) -> String {
    let mut cleaned = name;
    loop {
        if let Some(rest) = cleaned.strip_prefix("./") {
            cleaned = rest;
        } else if let Some(rest) = cleaned.strip_prefix("../") {
            cleaned = rest;
        } else if let Some(rest) = cleaned.strip_prefix('/') {
            cleaned = rest;
        } else {
            break;
        }
    }
    cleaned.to_string()
}

/// Join a parent prefix and an entry name with forward slashes.
fn join_entry_path(parent_dir: &str, name: &str) -> String {
    let name = clean_file_name(name);
    let parent = parent_dir.trim_matches('/');
    if parent.is_empty() {
        name
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Traverse the supplied archive recursively (directories and nested
/// archives) and gather all leaf documents with their paths into a flat map.
/// Decompresses the input first when `file_type` is gzip or bzip2.
///
/// `parent_dir` prefixes every collected path; `depth` is the current
/// nesting level (the orchestrator starts at 1). Nested containers beyond
/// [`MAX_ARCHIVE_RECURSION_DEPTH`] are skipped.
pub fn flatten(content: &[u8], file_type: FileType, job_id: Uuid, parent_dir: &str, depth: u32) -> DocumentMap {
    let mut docs = DocumentMap::new();

    // Decompress if necessary. Only tar archives are presumed compressed.
    let decompressed;
    let (bytes, file_type) = if file_type.is_compressed() {
        match decompress(content, file_type) {
            Ok(data) => {
                decompressed = data;
                (decompressed.as_slice(), FileType::Tar)
            }
            Err(error) => {
                tracing::error!(job_id = %job_id, %error, "failed to decompress archive");
                return docs;
            }
        }
    } else {
        (content, file_type)
    };

    match file_type {
        FileType::Zip => flatten_zip(bytes, job_id, parent_dir, depth, &mut docs),
        FileType::Tar => flatten_tar(bytes, job_id, parent_dir, depth, &mut docs),
        FileType::SevenZ => flatten_7z(bytes, job_id, parent_dir, depth, &mut docs),
        other => {
            tracing::warn!(job_id = %job_id, file_type = other.as_str(), "flatten called with a non-container type");
        }
    }

    docs
}

/// What to do with one archive member.
enum EntryAction {
    /// Nested container within the recursion bound; read and recurse.
    Descend(FileType),
    /// Leaf entry; read and keep. Entries with an unrecognized extension
    /// are kept too so the orchestrator can report them per entry.
    Keep,
    /// Over-depth nested container; do not even read it.
    Skip,
}

fn classify_entry(raw_name: &str, job_id: Uuid, depth: u32) -> EntryAction {
    match FileType::for_path(raw_name) {
        Some(ft) if ft.is_container() || ft.is_compressed() => {
            if depth < MAX_ARCHIVE_RECURSION_DEPTH {
                EntryAction::Descend(ft)
            } else {
                tracing::debug!(job_id = %job_id, entry = raw_name, depth, "nested archive exceeds recursion depth, skipping");
                EntryAction::Skip
            }
        }
        Some(_) => EntryAction::Keep,
        None => {
            tracing::debug!(job_id = %job_id, entry = raw_name, "unrecognized extension for archive member");
            EntryAction::Keep
        }
    }
}

/// Fold one read archive member into the result map.
fn absorb_entry(
    docs: &mut DocumentMap,
    raw_name: &str,
    action: EntryAction,
    data: Vec<u8>,
    job_id: Uuid,
    parent_dir: &str,
    depth: u32,
) {
    match action {
        EntryAction::Descend(file_type) => {
            let nested_parent = join_entry_path(parent_dir, raw_name);
            let nested = flatten(&data, file_type, job_id, &nested_parent, depth + 1);
            docs.extend(nested);
        }
        EntryAction::Keep => {
            let path = join_entry_path(parent_dir, raw_name);
            if !data.is_empty() {
                docs.entry(path).or_insert(data);
            }
        }
        EntryAction::Skip => {}
    }
}

fn flatten_zip(content: &[u8], job_id: Uuid, parent_dir: &str, depth: u32, docs: &mut DocumentMap) {
    let mut archive = match ZipArchive::new(Cursor::new(content)) {
        Ok(archive) => archive,
        Err(error) => {
            tracing::error!(job_id = %job_id, %error, "failed to open zip archive");
            return;
        }
    };

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(error) => {
                tracing::error!(job_id = %job_id, %error, "error while reading zip archive, aborting this level");
                return;
            }
        };
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let action = classify_entry(&name, job_id, depth);
        if matches!(action, EntryAction::Skip) {
            continue;
        }

        let mut data = Vec::new();
        if let Err(error) = file.read_to_end(&mut data) {
            tracing::error!(job_id = %job_id, entry = %name, %error, "failed to read zip member, aborting this level");
            return;
        }
        absorb_entry(docs, &name, action, data, job_id, parent_dir, depth);
    }
}

fn flatten_tar(content: &[u8], job_id: Uuid, parent_dir: &str, depth: u32, docs: &mut DocumentMap) {
    let mut archive = TarArchive::new(Cursor::new(content));
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!(job_id = %job_id, %error, "failed to open tar archive");
            return;
        }
    };

    for entry_result in entries {
        let mut entry = match entry_result {
            Ok(entry) => entry,
            Err(error) => {
                tracing::error!(job_id = %job_id, %error, "error while reading tar archive, aborting this level");
                return;
            }
        };
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let name = match entry.path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(error) => {
                tracing::error!(job_id = %job_id, %error, "unreadable tar member path, aborting this level");
                return;
            }
        };
        let action = classify_entry(&name, job_id, depth);
        if matches!(action, EntryAction::Skip) {
            continue;
        }

        let mut data = Vec::new();
        if let Err(error) = entry.read_to_end(&mut data) {
            tracing::error!(job_id = %job_id, entry = %name, %error, "failed to read tar member, aborting this level");
            return;
        }
        absorb_entry(docs, &name, action, data, job_id, parent_dir, depth);
    }
}

fn flatten_7z(content: &[u8], job_id: Uuid, parent_dir: &str, depth: u32, docs: &mut DocumentMap) {
    let mut archive = match SevenZReader::new(Cursor::new(content), content.len() as u64, Password::empty()) {
        Ok(archive) => archive,
        Err(error) => {
            tracing::error!(job_id = %job_id, %error, "failed to open 7z archive");
            return;
        }
    };

    let walked = archive.for_each_entries(|entry, reader| {
        if entry.is_directory() {
            return Ok(true);
        }
        let name = entry.name().to_string();
        let action = classify_entry(&name, job_id, depth);
        if matches!(action, EntryAction::Skip) {
            return Ok(true);
        }

        let mut data = Vec::new();
        match reader.read_to_end(&mut data) {
            Ok(_) => absorb_entry(docs, &name, action, data, job_id, parent_dir, depth),
            Err(error) => {
                tracing::error!(job_id = %job_id, entry = %name, %error, "failed to read 7z member, skipping");
            }
        }
        Ok(true)
    });
    if let Err(error) = walked {
        tracing::error!(job_id = %job_id, %error, "error while reading 7z archive, aborting this level");
    }
}

/// Decompress a gzip or bzip2 stream fully into memory.
fn decompress(content: &[u8], file_type: FileType) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match file_type {
        FileType::Gzip => {
            flate2::read::GzDecoder::new(content).read_to_end(&mut out)?;
        }
        FileType::Bzip2 => {
            bzip2::read::BzDecoder::new(content).read_to_end(&mut out)?;
        }
        other => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a compression format", other.as_str()),
            ));
        }
    }
    Ok(out)
}
