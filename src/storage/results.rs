//! Storage result types
//!
//! Defines result structures returned by storage operations.

use mime_guess::Mime;
use serde::Serialize;
use tokio::fs::File;

use crate::error::StorageError;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One item of a directory listing
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Byte size, files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification time in seconds since the Unix epoch.
    pub modified: u64,
    /// Logical path of the entry relative to the data root.
    pub path: String,
}

impl DirectoryEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of a directory listing operation
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub items: Vec<DirectoryEntry>,
}

/// How a client should present a streamed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// An opened file ready to be streamed to a client
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub file_name: String,
    pub size: u64,
    pub content_type: Mime,
    pub disposition: Disposition,
}

/// Result of a mkdir operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MkdirOutcome {
    Created,
    /// The directory was already there.
    AlreadyPresent,
}

impl MkdirOutcome {
    pub fn created(self) -> bool {
        self == MkdirOutcome::Created
    }
}

/// A file arriving for upload: its leaf name and a byte source
#[derive(Debug)]
pub struct UploadItem<R> {
    pub name: String,
    pub content: R,
}

impl<R> UploadItem<R> {
    pub fn new(name: impl Into<String>, content: R) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Outcome of one uploaded file
#[derive(Debug)]
pub struct UploadOutcome {
    pub name: String,
    pub result: Result<u64, StorageError>,
}

#[derive(Serialize)]
struct UploadOutcomeBody<'a> {
    name: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for UploadOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = UploadOutcomeBody {
            name: &self.name,
            success: self.result.is_ok(),
            size: self.result.as_ref().ok().copied(),
            error: self.result.as_ref().err().map(StorageError::client_message),
        };
        body.serialize(serializer)
    }
}

/// Per-item summary of a multi-file upload
#[derive(Debug, Default, Serialize)]
pub struct UploadReport {
    pub results: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn push(&mut self, outcome: UploadOutcome) {
        self.results.push(outcome);
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when every item was written.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|outcome| outcome.result.is_ok())
    }
}
