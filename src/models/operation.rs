//! 백그라운드 작업 모델
//!
//! worker로 보내는 작업 단위, worker가 돌려주는 결과, 실행 결과 요약, 진행 상태.

use crate::models::file_entry::DirSizeInfo;
use crate::utils::formatter::{format_counter, percent};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 작업 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
    Rename,
    Backup,
    DirSize,
    Uncompress,
    Compress,
}

impl OperationType {
    /// 진행 창 제목
    pub fn title(&self) -> &'static str {
        match self {
            OperationType::Copy => "Copy files",
            OperationType::Move => "Move files",
            OperationType::Delete => "Delete files",
            OperationType::Rename => "Rename files",
            OperationType::Backup => "Backup files",
            OperationType::DirSize => "Calculate Directories Size",
            OperationType::Uncompress => "Uncompress file",
            OperationType::Compress => "Compress file",
        }
    }

    /// 에러 메시지용 동사 ("Cannot {verb}")
    pub fn verb(&self) -> &'static str {
        match self {
            OperationType::Copy => "copy files",
            OperationType::Move => "move files",
            OperationType::Delete => "delete files",
            OperationType::Rename => "rename files",
            OperationType::Backup => "backup files",
            OperationType::DirSize => "calculate directories size",
            OperationType::Uncompress => "uncompress file",
            OperationType::Compress => "compress file",
        }
    }
}

/// worker에 전달하는 작업 단위 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkItem {
    Copy {
        /// base 기준 상대 경로
        relative: PathBuf,
        base: PathBuf,
        dest: PathBuf,
        /// 디렉토리를 새 이름으로 복사 (첫 경로 요소 제거)
        rename_dir: bool,
        /// false면 대상이 있어도 덮어씀
        check_exists: bool,
    },
    Delete {
        path: PathBuf,
    },
    Rename {
        name: String,
        base: PathBuf,
        new_name: String,
        check_exists: bool,
    },
    Backup {
        name: String,
        base: PathBuf,
        suffix: String,
        check_exists: bool,
    },
    DirSize {
        name: String,
        base: PathBuf,
    },
    Extract {
        archive: PathBuf,
        dest: PathBuf,
    },
    Compress {
        source: PathBuf,
        output: PathBuf,
        /// true면 디렉토리 자신은 빼고 내용물만 담는다 (vfs 재생성)
        contents_only: bool,
    },
}

impl WorkItem {
    /// 로그/에러 표시용 대상 이름
    pub fn target(&self) -> String {
        match self {
            WorkItem::Copy { relative, .. } => relative.display().to_string(),
            WorkItem::Delete { path } => path.display().to_string(),
            WorkItem::Rename { name, .. }
            | WorkItem::Backup { name, .. }
            | WorkItem::DirSize { name, .. } => name.clone(),
            WorkItem::Extract { archive, .. } => archive.display().to_string(),
            WorkItem::Compress { source, .. } => source.display().to_string(),
        }
    }

    /// 덮어쓰기 확인 후 재전송할 요청 (check_exists 해제)
    pub fn with_overwrite(&self) -> Self {
        let mut item = self.clone();
        match &mut item {
            WorkItem::Copy { check_exists, .. }
            | WorkItem::Rename { check_exists, .. }
            | WorkItem::Backup { check_exists, .. } => *check_exists = false,
            _ => {}
        }
        item
    }
}

/// worker가 돌려주는 항목별 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    Done,
    DirSize(DirSizeInfo),
    /// 대상이 이미 존재함 (덮어쓰기 확인 필요)
    Conflict {
        name: String,
    },
    Failed {
        message: String,
        code: i32,
    },
}

impl ItemResult {
    pub fn failed(message: impl Into<String>, code: i32) -> Self {
        ItemResult::Failed {
            message: message.into(),
            code,
        }
    }

    pub fn from_io(error: &std::io::Error) -> Self {
        ItemResult::Failed {
            message: io_message(error),
            code: error.raw_os_error().unwrap_or(0),
        }
    }
}

/// "(os error N)" 꼬리를 뗀 메시지
pub(crate) fn io_message(error: &std::io::Error) -> String {
    let text = error.to_string();
    match text.find(" (os error") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

/// 실패 항목 한 건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub message: String,
    pub code: i32,
}

/// 실행 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// 성공적으로 처리된 항목
    pub processed: Vec<PathBuf>,
    /// 사용자가 건너뛴 항목 (덮어쓰기 거절, 삭제 거절 등)
    pub skipped: Vec<PathBuf>,
    /// 실패한 항목
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    /// 처리되지 않은 항목 (건너뜀 + 실패)
    pub fn unresolved(&self) -> Vec<PathBuf> {
        self.skipped
            .iter()
            .cloned()
            .chain(self.failures.iter().map(|f| f.path.clone()))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, path: PathBuf, message: String, code: i32) {
        self.failures.push(ItemFailure {
            path,
            message,
            code,
        });
    }
}

/// 실행 결과: 끝까지 진행했는지, 사용자가 중지했는지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// 사용자 중지. 이동 작업은 이 경우 원본을 지우면 안 된다.
    Stopped(RunReport),
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Stopped(report) => report,
        }
    }

    pub fn into_report(self) -> RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Stopped(report) => report,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, RunOutcome::Stopped(_))
    }
}

/// 단일 작업 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleOutcome {
    Done(ItemResult),
    Stopped,
}

/// 진행 창에 그릴 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub title: String,
    pub label: String,
    /// 크기 기준 진행률 (ItemSet 작업에서만)
    pub percent_size: Option<u8>,
    /// 개수 기준 진행률
    pub percent_count: u8,
    /// "처리/전체"
    pub counter: String,
}

/// 작업 진행 상태
///
/// 개수/크기 전체 값은 실행 전에 고정되므로 진행률은 100을 넘지 않는다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationProgress {
    pub operation_type: OperationType,
    pub current_file: String,
    pub files_started: usize,
    pub total_files: usize,
    pub bytes_started: u64,
    /// None이면 단일 진행 막대
    pub total_bytes: Option<u64>,
}

impl OperationProgress {
    /// 단일 진행 막대 (개수 기준)
    pub fn by_count(operation_type: OperationType, total_files: usize) -> Self {
        Self {
            operation_type,
            current_file: String::new(),
            files_started: 0,
            total_files,
            bytes_started: 0,
            total_bytes: None,
        }
    }

    /// 이중 진행 막대 (크기 + 개수)
    pub fn by_size(operation_type: OperationType, total_files: usize, total_bytes: u64) -> Self {
        Self {
            total_bytes: Some(total_bytes.max(1)),
            ..Self::by_count(operation_type, total_files)
        }
    }

    /// 다음 항목 시작
    pub fn start_item(&mut self, name: &str, size: u64) {
        self.current_file = name.to_string();
        self.files_started += 1;
        self.bytes_started = self.bytes_started.saturating_add(size);
    }

    pub fn percent_count(&self) -> u8 {
        percent(self.files_started as u64, self.total_files as u64)
    }

    pub fn percent_size(&self) -> Option<u8> {
        self.total_bytes
            .map(|total| percent(self.bytes_started, total))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            title: self.operation_type.title().to_string(),
            label: self.current_file.clone(),
            percent_size: self.percent_size(),
            percent_count: self.percent_count(),
            counter: format_counter(self.files_started, self.total_files),
        }
    }
}
