use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TwinPaneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 파일명을 현재 인코딩으로 표현할 수 없음 (작업 시작 전 실패)
    #[error("Files with invalid encoding, convert first: {path:?}")]
    Expansion { path: PathBuf },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Can't run function: {reason}")]
    WorkerSpawn { reason: String },

    /// 응답을 받기 전에 다음 요청을 보내려 함 (half-duplex 위반)
    #[error("Worker channel busy: previous request still outstanding")]
    ChannelBusy,

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("{message} ({code})")]
    ItemFailure { message: String, code: i32 },

    #[error("Not a directory: {path:?}")]
    NotADirectory { path: PathBuf },

    #[error("{path:?}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("Unsupported archive format: {path:?}")]
    ArchiveUnsupportedFormat { path: PathBuf },

    #[error("Failed to extract archive {path:?}: {reason}")]
    ArchiveExtractFailed { path: PathBuf, reason: String },

    #[error("Failed to create archive {path:?}: {reason}")]
    ArchiveCreateFailed { path: PathBuf, reason: String },

    #[error("Cannot create vfs {path:?}: {reason}")]
    VfsMount { path: PathBuf, reason: String },

    #[error("Cannot regenerate vfs {path:?}: {reason}")]
    VfsUnmount { path: PathBuf, reason: String },

    #[error("Tab is not inside a vfs")]
    NotMounted,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TwinPaneError {
    /// OS 에러 코드 (없으면 0)
    pub fn os_code(&self) -> i32 {
        match self {
            TwinPaneError::Io(e) => e.raw_os_error().unwrap_or(0),
            TwinPaneError::ItemFailure { code, .. } => *code,
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, TwinPaneError>;
