//! Core data model: jobs, request payloads and the read-only job view.

use crate::formats::FileType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }
}

static NUMERIC_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid literal regex"));

/// Infer the shape of client-supplied metadata from its raw string form.
///
/// Brace-delimited strings are parsed as JSON objects, bracket-delimited as
/// JSON arrays, purely numeric strings as numbers. Anything else, including
/// structural strings that fail to parse, is kept verbatim as a plain string.
pub fn parse_meta_info(raw: &str) -> serde_json::Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return serde_json::Value::Null;
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
        return serde_json::Value::String(raw.to_string());
    }
    if NUMERIC_META.is_match(trimmed) {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    serde_json::Value::String(raw.to_string())
}

/// One client-submitted extraction request and its evolving state.
///
/// The id is generated at creation and never changes. Extracted entries and
/// failure reasons are additive with first-write-wins semantics; the
/// aggregated result is only set once all conversion work has completed.
#[derive(Debug, Clone)]
pub struct Job {
    id: Uuid,
    pub status: JobStatus,
    pub notify_destination: Option<String>,
    pub meta_info: serde_json::Value,
    extracted_entries: BTreeMap<String, Vec<u8>>,
    pub aggregated_result: Option<Vec<u8>>,
    pub response_type: Option<String>,
    failure_reasons: BTreeMap<String, String>,
}

impl Job {
    /// Create a fresh in-progress job.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: JobStatus::InProgress,
            notify_destination: None,
            meta_info: serde_json::Value::Null,
            extracted_entries: BTreeMap::new(),
            aggregated_result: None,
            response_type: None,
            failure_reasons: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Add a converted entry. Duplicate names are rejected: the first write
    /// wins and `false` is returned.
    pub fn add_extracted_entry(&mut self, name: impl Into<String>, content: Vec<u8>) -> bool {
        let name = name.into();
        if self.extracted_entries.contains_key(&name) {
            return false;
        }
        self.extracted_entries.insert(name, content);
        true
    }

    pub fn extracted_entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.extracted_entries
    }

    /// Record a non-fatal failure. The first message recorded for a key is
    /// kept; later occurrences of the same key are ignored.
    pub fn add_failure_reason(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.failure_reasons.entry(key.into()).or_insert_with(|| message.into());
    }

    pub fn failure_reasons(&self) -> &BTreeMap<String, String> {
        &self.failure_reasons
    }
}

/// Immutable pair of declared type and raw bytes, the unit of pipeline input.
#[derive(Debug, Clone)]
pub struct RequestContent {
    file_type: FileType,
    content: Vec<u8>,
}

impl RequestContent {
    pub fn new(file_type: FileType, content: Vec<u8>) -> Self {
        Self { file_type, content }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

/// Read-only projection of a job for exposure at the API boundary.
///
/// Carries everything a client may inspect without handing out the raw entry
/// map or the aggregated payload (those are served as bytes separately).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    pub entry_count: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub failure_reasons: BTreeMap<String, String>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id(),
            status: job.status,
            response_type: job.response_type.clone(),
            entry_count: job.extracted_entries().len(),
            failure_reasons: job.failure_reasons().clone(),
        }
    }
}
