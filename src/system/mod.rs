// System Layer
pub mod archive;
pub mod file_ops;
pub mod vfs;

pub use archive::{detect_archive_format, ArchiveFormat, ArchiveSummary};
