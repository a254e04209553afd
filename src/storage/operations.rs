//! Storage operations
//!
//! Implements list, download, view, mkdir, upload and delete on top of the
//! path resolver. Every operation resolves each path it receives itself.

use log::{error, info};
use std::cmp::Ordering;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::StorageError;
use crate::storage::content_type::content_type_for;
use crate::storage::results::{
    DirectoryEntry, Disposition, EntryKind, FileDownload, Listing, MkdirOutcome, UploadItem,
    UploadOutcome,
};
use crate::storage::validation::{PathResolver, ResolvedPath, validate_leaf_name};

/// Filesystem gateway confined to a single data root.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    resolver: PathResolver,
}

impl StorageGateway {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Creates the data root if absent and builds a gateway over it.
    pub fn open(data_root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(data_root)?;
        let resolver = PathResolver::new(data_root)?;
        Ok(Self::new(resolver))
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Lists the direct children of a directory, directories first, then by
    /// case-insensitive name.
    ///
    /// Children whose canonical location leaves the data root, or that cannot
    /// be followed, are left out.
    pub async fn list(&self, logical: &str) -> Result<Listing, StorageError> {
        let dir = self.resolver.resolve(logical)?;
        self.require_directory(&dir, logical).await?;

        let mut read_dir = fs::read_dir(dir.as_path())
            .await
            .map_err(|e| not_found_or_io(e, logical))?;
        let mut items = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let Ok(canonical) = fs::canonicalize(&path).await else {
                continue;
            };
            if !self.resolver.contains(&canonical) {
                continue;
            }
            let Ok(metadata) = fs::metadata(&canonical).await else {
                continue;
            };

            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let modified = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|dur| dur.as_secs())
                .unwrap_or(0);

            items.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: (kind == EntryKind::File).then(|| metadata.len()),
                modified,
                path: self.resolver.logical_path(&path),
            });
        }

        items.sort_by(compare_entries);

        info!(
            "Listed directory {:?} - {} entries",
            self.resolver.logical_path(dir.as_path()),
            items.len()
        );

        Ok(Listing { items })
    }

    /// Opens a regular file for streaming as an attachment.
    pub async fn download(&self, logical: &str) -> Result<FileDownload, StorageError> {
        self.open_file(logical, Disposition::Attachment).await
    }

    /// Opens a regular file for inline rendering. Bytes are the same as [`download`](Self::download).
    pub async fn view(&self, logical: &str) -> Result<FileDownload, StorageError> {
        self.open_file(logical, Disposition::Inline).await
    }

    /// Creates a single directory `name` inside `parent`.
    ///
    /// Creating a directory that already exists is a no-op; a file of the
    /// same name is a conflict.
    pub async fn mkdir(&self, parent: &str, name: &str) -> Result<MkdirOutcome, StorageError> {
        let parent_dir = self.resolver.resolve(parent)?;
        let name = validate_leaf_name(name)?;
        self.require_directory(&parent_dir, parent).await?;

        let target = self.resolver.resolve_child(parent, name)?;
        let logical = self.resolver.logical_path(target.as_path());

        if let Some(outcome) = existing_directory(&target, &logical).await? {
            return Ok(outcome);
        }

        match fs::create_dir(target.as_path()).await {
            Ok(()) => {
                info!("Created directory {:?}", logical);
                Ok(MkdirOutcome::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a race with another creator; report what is there now.
                let existing = existing_directory(&target, &logical).await?;
                existing.ok_or(StorageError::AlreadyExists(logical))
            }
            Err(e) => Err(not_found_or_io(e, parent)),
        }
    }

    /// Writes one file into `dest`, replacing any existing file of that name.
    /// Returns the number of bytes written.
    pub async fn upload_file<R>(
        &self,
        dest: &str,
        name: &str,
        content: &mut R,
    ) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let dest_dir = self.resolver.resolve(dest)?;
        self.require_directory(&dest_dir, dest).await?;

        let target = self.resolver.resolve_child(dest, name)?;
        let logical = self.resolver.logical_path(target.as_path());

        if let Ok(metadata) = fs::metadata(target.as_path()).await {
            if metadata.is_dir() {
                return Err(StorageError::AlreadyExists(logical));
            }
        }

        let mut file = File::create(target.as_path())
            .await
            .map_err(|e| not_found_or_io(e, dest))?;
        let written = match copy_into(content, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                error!("Upload of {:?} failed: {}", logical, e);
                drop(file);
                let _ = fs::remove_file(target.as_path()).await;
                return Err(StorageError::Io(e));
            }
        };

        info!("Stored {:?} ({} bytes)", logical, written);
        Ok(written)
    }

    /// Writes one upload item into `dest` and records how it went, so a
    /// failing item never stops the ones after it.
    pub async fn upload_item<R>(&self, dest: &str, item: UploadItem<R>) -> UploadOutcome
    where
        R: AsyncRead + Unpin,
    {
        let UploadItem { name, mut content } = item;
        let result = self.upload_file(dest, &name, &mut content).await;
        UploadOutcome { name, result }
    }

    /// Deletes a file, or a directory with all of its contents.
    /// The data root itself can never be deleted.
    pub async fn delete(&self, logical: &str) -> Result<(), StorageError> {
        let target = self.resolver.resolve(logical)?;
        if target.is_root() {
            return Err(StorageError::Rejected(
                "cannot delete the storage root".into(),
            ));
        }

        let metadata = fs::metadata(target.as_path())
            .await
            .map_err(|e| not_found_or_io(e, logical))?;
        let logical = self.resolver.logical_path(target.as_path());

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(target.as_path()).await
        } else {
            fs::remove_file(target.as_path()).await
        };
        removed.map_err(|e| not_found_or_io(e, &logical))?;

        info!("Deleted {:?}", logical);
        Ok(())
    }

    async fn open_file(
        &self,
        logical: &str,
        disposition: Disposition,
    ) -> Result<FileDownload, StorageError> {
        let target = self.resolver.resolve(logical)?;
        let metadata = fs::metadata(target.as_path())
            .await
            .map_err(|e| not_found_or_io(e, logical))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(logical.to_string()));
        }

        let file = File::open(target.as_path())
            .await
            .map_err(|e| not_found_or_io(e, logical))?;
        let file_name = target.file_name().unwrap_or_else(|| "download".into());

        info!(
            "Opened {:?} for {} ({} bytes)",
            self.resolver.logical_path(target.as_path()),
            disposition.as_str(),
            metadata.len()
        );

        Ok(FileDownload {
            content_type: content_type_for(&file_name),
            file,
            file_name,
            size: metadata.len(),
            disposition,
        })
    }

    async fn require_directory(
        &self,
        dir: &ResolvedPath,
        logical: &str,
    ) -> Result<(), StorageError> {
        match fs::metadata(dir.as_path()).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::NotFound(logical.to_string())),
            Err(e) => Err(not_found_or_io(e, logical)),
        }
    }
}

/// `Some` if `target` is already a directory, a conflict if it is anything else.
async fn existing_directory(
    target: &ResolvedPath,
    logical: &str,
) -> Result<Option<MkdirOutcome>, StorageError> {
    match fs::metadata(target.as_path()).await {
        Ok(metadata) if metadata.is_dir() => Ok(Some(MkdirOutcome::AlreadyPresent)),
        Ok(_) => Err(StorageError::AlreadyExists(logical.to_string())),
        Err(e) if is_missing(&e) => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

async fn copy_into<R>(content: &mut R, file: &mut File) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(content, file).await?;
    file.flush().await?;
    Ok(written)
}

/// A path through a regular file (`file.txt/x`) is as absent as a missing one.
fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn not_found_or_io(e: io::Error, logical: &str) -> StorageError {
    if is_missing(&e) {
        StorageError::NotFound(logical.to_string())
    } else {
        StorageError::Io(e)
    }
}

fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
