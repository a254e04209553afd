//! File system storage management
//!
//! Path resolution, storage operations and their result types.

pub mod content_type;
pub mod operations;
pub mod results;
pub mod validation;

pub use content_type::content_type_for;
pub use operations::StorageGateway;
pub use results::{
    DirectoryEntry, Disposition, EntryKind, FileDownload, Listing, MkdirOutcome, UploadItem,
    UploadOutcome, UploadReport,
};
pub use validation::{PathResolver, ResolvedPath, validate_leaf_name};
