// Data Models
pub mod file_entry;
pub mod item_set;
pub mod operation;
pub mod tab;

pub use file_entry::{DirSizeInfo, FileType};
pub use item_set::ItemSet;
pub use tab::{Tab, VfsKind, VfsMount};
