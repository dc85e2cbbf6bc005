//! 작업별 정의
//!
//! runner는 어떤 작업이든 같은 순서로 돌린다. 작업마다 다른 부분
//! (항목 목록, 전송 전 확인, 덮어쓰기 충돌 처리, 결과 수집)만 여기서 정한다.

use crate::core::confirm::{ConfirmKind, ConfirmPolicy, Verdict};
use crate::models::file_entry::DirSizeInfo;
use crate::models::item_set::ItemSet;
use crate::models::operation::{ItemFailure, ItemResult, OperationType, WorkItem};
use crate::system::archive::ArchiveFormat;
use crate::ui::{ConfirmAnswer, UiBridge};
use std::path::{Path, PathBuf};

/// 실행 계획의 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub item: WorkItem,
    /// 진행 창/에러 메시지용 이름
    pub label: String,
    /// 결과 보고에 쓰는 원본 경로
    pub source: PathBuf,
    pub size: u64,
}

/// 전송 직전 결정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Dispatch(WorkItem),
    Skip,
    Stop,
}

fn from_verdict(verdict: Verdict, item: WorkItem) -> Prepared {
    match verdict {
        Verdict::Proceed => Prepared::Dispatch(item),
        Verdict::SkipThis | Verdict::SkipAll => Prepared::Skip,
        Verdict::StopRun => Prepared::Stop,
    }
}

pub trait Job {
    fn operation(&self) -> OperationType;

    fn plan(&self) -> Vec<PlannedItem>;

    /// 크기 기준 진행 막대의 전체 값 (없으면 개수 막대만)
    fn total_size(&self) -> Option<u64> {
        None
    }

    /// 실행 전에 이미 알려진 실패 (탐색 에러 등)
    fn known_failures(&self) -> Vec<ItemFailure> {
        Vec::new()
    }

    fn prepare(&mut self, planned: &PlannedItem, _ui: &mut dyn UiBridge) -> Prepared {
        Prepared::Dispatch(planned.item.clone())
    }

    /// 대상이 이미 있을 때
    fn resolve_conflict(
        &mut self,
        _planned: &PlannedItem,
        _dispatched: &WorkItem,
        _name: &str,
        _ui: &mut dyn UiBridge,
    ) -> Prepared {
        Prepared::Skip
    }

    fn accept(&mut self, _planned: &PlannedItem, _result: &ItemResult) {}

    /// 실패한 항목 (worker 실패, 전송 실패)
    fn reject(&mut self, _planned: &PlannedItem) {}
}

fn walk_failures(set: &ItemSet) -> Vec<ItemFailure> {
    set.errors()
        .into_iter()
        .map(|e| ItemFailure {
            path: e.path,
            message: e.message,
            code: e.code,
        })
        .collect()
}

/// 예/아니오/취소 덮어쓰기 확인 (이름 변경, 백업)
fn confirm_overwrite(
    title: &str,
    name: &str,
    dispatched: &WorkItem,
    ui: &mut dyn UiBridge,
) -> Prepared {
    match ui.prompt_confirm(title, &format!("Overwrite '{}'", name), true) {
        ConfirmAnswer::Yes => Prepared::Dispatch(dispatched.with_overwrite()),
        ConfirmAnswer::No => Prepared::Skip,
        ConfirmAnswer::Cancel => Prepared::Stop,
    }
}

// === ItemSet 작업 ===

/// 복사 (이동의 첫 단계이기도 함)
pub struct CopyJob<'a> {
    set: &'a ItemSet,
    dest: PathBuf,
    rename_dir: bool,
    policy: ConfirmPolicy,
    operation: OperationType,
}

impl<'a> CopyJob<'a> {
    pub fn new(set: &'a ItemSet, dest: &Path, rename_dir: bool, confirm_overwrite: bool) -> Self {
        Self {
            set,
            dest: dest.to_path_buf(),
            rename_dir,
            policy: ConfirmPolicy::new(ConfirmKind::Overwrite, confirm_overwrite),
            operation: OperationType::Copy,
        }
    }

    /// 이동 작업의 복사 단계로 표시
    pub fn for_move(mut self) -> Self {
        self.operation = OperationType::Move;
        self
    }
}

impl Job for CopyJob<'_> {
    fn operation(&self) -> OperationType {
        self.operation
    }

    fn plan(&self) -> Vec<PlannedItem> {
        let base = self.set.base_path();
        self.set
            .iter(false)
            .map(|entry| PlannedItem {
                item: WorkItem::Copy {
                    relative: entry
                        .path
                        .strip_prefix(base)
                        .unwrap_or(&entry.path)
                        .to_path_buf(),
                    base: base.to_path_buf(),
                    dest: self.dest.clone(),
                    rename_dir: self.rename_dir,
                    check_exists: true,
                },
                label: self.set.label(&entry.path),
                source: entry.path.clone(),
                size: entry.size,
            })
            .collect()
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.set.total_size())
    }

    fn known_failures(&self) -> Vec<ItemFailure> {
        walk_failures(self.set)
    }

    fn prepare(&mut self, planned: &PlannedItem, _ui: &mut dyn UiBridge) -> Prepared {
        if self.policy.applies_to_all() {
            Prepared::Dispatch(planned.item.with_overwrite())
        } else {
            Prepared::Dispatch(planned.item.clone())
        }
    }

    fn resolve_conflict(
        &mut self,
        _planned: &PlannedItem,
        dispatched: &WorkItem,
        name: &str,
        ui: &mut dyn UiBridge,
    ) -> Prepared {
        let verdict = self.policy.decide(self.operation.title(), name, ui);
        from_verdict(verdict, dispatched.with_overwrite())
    }
}

/// 삭제 (하위 항목부터)
pub struct DeleteJob<'a> {
    set: &'a ItemSet,
    policy: ConfirmPolicy,
    operation: OperationType,
}

impl<'a> DeleteJob<'a> {
    pub fn new(set: &'a ItemSet, confirm_delete: bool) -> Self {
        Self {
            set,
            policy: ConfirmPolicy::new(ConfirmKind::Delete, confirm_delete),
            operation: OperationType::Delete,
        }
    }

    /// 이동 작업의 원본 삭제 단계 (확인 없음, 탐색 에러는 복사 단계에서 이미 보고됨)
    pub fn for_move(set: &'a ItemSet) -> Self {
        Self {
            set,
            policy: ConfirmPolicy::new(ConfirmKind::Delete, false),
            operation: OperationType::Move,
        }
    }
}

impl Job for DeleteJob<'_> {
    fn operation(&self) -> OperationType {
        self.operation
    }

    fn plan(&self) -> Vec<PlannedItem> {
        self.set
            .iter(true)
            .map(|entry| PlannedItem {
                item: WorkItem::Delete {
                    path: entry.path.clone(),
                },
                label: self.set.label(&entry.path),
                source: entry.path.clone(),
                size: entry.size,
            })
            .collect()
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.set.total_size())
    }

    fn known_failures(&self) -> Vec<ItemFailure> {
        if self.operation == OperationType::Move {
            return Vec::new();
        }
        walk_failures(self.set)
    }

    fn prepare(&mut self, planned: &PlannedItem, ui: &mut dyn UiBridge) -> Prepared {
        let verdict = self.policy.decide("Delete", &planned.label, ui);
        from_verdict(verdict, planned.item.clone())
    }
}

// === 단순 목록 작업 ===

fn name_items<F>(names: &[String], base: &Path, make: F) -> Vec<PlannedItem>
where
    F: Fn(&str) -> WorkItem,
{
    names
        .iter()
        .map(|name| PlannedItem {
            item: make(name),
            label: name.clone(),
            source: base.join(name),
            size: 0,
        })
        .collect()
}

/// 이름 변경 (항목마다 새 이름을 물어봄)
pub struct RenameJob {
    names: Vec<String>,
    base: PathBuf,
}

impl RenameJob {
    pub fn new(names: Vec<String>, base: &Path) -> Self {
        Self {
            names,
            base: base.to_path_buf(),
        }
    }
}

impl Job for RenameJob {
    fn operation(&self) -> OperationType {
        OperationType::Rename
    }

    fn plan(&self) -> Vec<PlannedItem> {
        name_items(&self.names, &self.base, |name| WorkItem::Rename {
            name: name.to_string(),
            base: self.base.clone(),
            new_name: name.to_string(),
            check_exists: true,
        })
    }

    fn prepare(&mut self, planned: &PlannedItem, ui: &mut dyn UiBridge) -> Prepared {
        let help = format!("Rename '{}' to", planned.label);
        match ui.prompt_text("Rename", &help, &planned.label) {
            Some(new_name) if !new_name.is_empty() && new_name != planned.label => {
                Prepared::Dispatch(WorkItem::Rename {
                    name: planned.label.clone(),
                    base: self.base.clone(),
                    new_name,
                    check_exists: true,
                })
            }
            _ => Prepared::Skip,
        }
    }

    fn resolve_conflict(
        &mut self,
        _planned: &PlannedItem,
        dispatched: &WorkItem,
        name: &str,
        ui: &mut dyn UiBridge,
    ) -> Prepared {
        confirm_overwrite("Rename", name, dispatched, ui)
    }
}

/// 백업 사본 생성 (name + suffix)
pub struct BackupJob {
    names: Vec<String>,
    base: PathBuf,
    suffix: String,
}

impl BackupJob {
    pub fn new(names: Vec<String>, base: &Path, suffix: &str) -> Self {
        Self {
            names,
            base: base.to_path_buf(),
            suffix: suffix.to_string(),
        }
    }
}

impl Job for BackupJob {
    fn operation(&self) -> OperationType {
        OperationType::Backup
    }

    fn plan(&self) -> Vec<PlannedItem> {
        name_items(&self.names, &self.base, |name| WorkItem::Backup {
            name: name.to_string(),
            base: self.base.clone(),
            suffix: self.suffix.clone(),
            check_exists: true,
        })
    }

    fn resolve_conflict(
        &mut self,
        _planned: &PlannedItem,
        dispatched: &WorkItem,
        name: &str,
        ui: &mut dyn UiBridge,
    ) -> Prepared {
        confirm_overwrite("Backup", name, dispatched, ui)
    }
}

/// 디렉토리 크기 계산
pub struct DirSizeJob {
    names: Vec<String>,
    base: PathBuf,
    results: Vec<DirSizeInfo>,
}

impl DirSizeJob {
    pub fn new(names: Vec<String>, base: &Path) -> Self {
        Self {
            names,
            base: base.to_path_buf(),
            results: Vec::new(),
        }
    }

    pub fn into_results(self) -> Vec<DirSizeInfo> {
        self.results
    }
}

impl Job for DirSizeJob {
    fn operation(&self) -> OperationType {
        OperationType::DirSize
    }

    fn plan(&self) -> Vec<PlannedItem> {
        name_items(&self.names, &self.base, |name| WorkItem::DirSize {
            name: name.to_string(),
            base: self.base.clone(),
        })
    }

    fn accept(&mut self, _planned: &PlannedItem, result: &ItemResult) {
        if let ItemResult::DirSize(info) = result {
            self.results.push(info.clone());
        }
    }

    // 결과는 이름 순서와 자리를 맞춘다
    fn reject(&mut self, _planned: &PlannedItem) {
        self.results.push(DirSizeInfo::unknown());
    }
}

/// 여러 아카이브 풀기 / 여러 디렉토리 압축
pub struct ArchiveJob {
    operation: OperationType,
    items: Vec<PlannedItem>,
}

impl ArchiveJob {
    /// 각 아카이브를 `dest` 아래로 풀기
    pub fn uncompress(archives: &[PathBuf], dest: &Path) -> Self {
        let items = archives
            .iter()
            .map(|archive| PlannedItem {
                item: WorkItem::Extract {
                    archive: archive.clone(),
                    dest: dest.to_path_buf(),
                },
                label: display_name(archive),
                source: archive.clone(),
                size: 0,
            })
            .collect();
        Self {
            operation: OperationType::Uncompress,
            items,
        }
    }

    /// 각 디렉토리를 같은 위치에 `<dir><ext>` 아카이브로 압축
    pub fn compress(dirs: &[PathBuf], format: ArchiveFormat) -> Self {
        let items = dirs
            .iter()
            .map(|dir| {
                let mut output = dir.clone().into_os_string();
                output.push(format.extension());
                PlannedItem {
                    item: WorkItem::Compress {
                        source: dir.clone(),
                        output: PathBuf::from(output),
                        contents_only: false,
                    },
                    label: display_name(dir),
                    source: dir.clone(),
                    size: 0,
                }
            })
            .collect();
        Self {
            operation: OperationType::Compress,
            items,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl Job for ArchiveJob {
    fn operation(&self) -> OperationType {
        self.operation
    }

    fn plan(&self) -> Vec<PlannedItem> {
        self.items.clone()
    }
}
