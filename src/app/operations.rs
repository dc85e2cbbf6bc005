use super::AppContext;
use crate::core::jobs::{ArchiveJob, BackupJob, CopyJob, DeleteJob, DirSizeJob, RenameJob};
use crate::core::runner::Runner;
use crate::core::worker::WorkFn;
use crate::models::file_entry::DirSizeInfo;
use crate::models::item_set::ItemSet;
use crate::models::operation::{RunOutcome, RunReport};
use crate::models::tab::{Tab, VfsKind};
use crate::system::archive::ArchiveFormat;
use crate::system::{file_ops, vfs};
use crate::ui::UiBridge;
use crate::utils::error::{Result, TwinPaneError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn work() -> WorkFn {
    Box::new(file_ops::execute)
}

impl<U: UiBridge> AppContext<U> {
    // === ItemSet 작업 ===

    pub fn run_copy(&mut self, set: &ItemSet, dest: &Path, rename_dir: bool) -> Result<RunOutcome> {
        info!(dest = %dest.display(), items = set.total_count(), "copy requested");
        let mut job = CopyJob::new(set, dest, rename_dir, self.options.confirm_overwrite);
        self.runner().run(&mut job, work())
    }

    /// 이동: 복사 후 원본 삭제
    ///
    /// 복사 단계에서 중지되면 아무것도 지우지 않는다. 건너뛰었거나 실패한 항목과
    /// 그 상위 디렉토리는 삭제 단계에서 빠진다.
    pub fn run_move(&mut self, set: &ItemSet, dest: &Path, rename_dir: bool) -> Result<RunOutcome> {
        info!(dest = %dest.display(), items = set.total_count(), "move requested");
        let mut copy = CopyJob::new(set, dest, rename_dir, self.options.confirm_overwrite).for_move();
        let copied = match self.runner().run(&mut copy, work())? {
            RunOutcome::Stopped(report) => return Ok(RunOutcome::Stopped(report)),
            RunOutcome::Completed(report) => report,
        };

        let mut remaining = set.clone();
        let keep = kept_sources(set, &copied.unresolved());
        remaining.remove_entries(&keep);
        debug!(kept = keep.len(), remaining = remaining.total_count(), "move delete pass");

        let mut delete = DeleteJob::for_move(&remaining);
        let outcome = self.runner().run(&mut delete, work())?;
        let stopped = outcome.is_stopped();
        let deleted = outcome.into_report();

        let report = RunReport {
            processed: deleted.processed,
            skipped: copied.skipped,
            failures: copied.failures.into_iter().chain(deleted.failures).collect(),
        };
        Ok(if stopped {
            RunOutcome::Stopped(report)
        } else {
            RunOutcome::Completed(report)
        })
    }

    pub fn run_delete(&mut self, set: &ItemSet) -> Result<RunOutcome> {
        info!(items = set.total_count(), "delete requested");
        let mut job = DeleteJob::new(set, self.options.confirm_delete);
        self.runner().run(&mut job, work())
    }

    // === 단순 목록 작업 ===

    pub fn run_rename(&mut self, names: Vec<String>, base: &Path) -> Result<RunOutcome> {
        let mut job = RenameJob::new(names, base);
        self.runner().run(&mut job, work())
    }

    /// 백업. `suffix`가 없으면 설정의 확장자
    pub fn run_backup(
        &mut self,
        names: Vec<String>,
        base: &Path,
        suffix: Option<&str>,
    ) -> Result<RunOutcome> {
        let suffix = suffix.unwrap_or(&self.options.backup_extension).to_string();
        let mut job = BackupJob::new(names, base, &suffix);
        self.runner().run(&mut job, work())
    }

    /// 디렉토리 크기. 중지되면 `None`
    pub fn run_dir_size(
        &mut self,
        names: Vec<String>,
        base: &Path,
    ) -> Result<Option<Vec<DirSizeInfo>>> {
        let mut job = DirSizeJob::new(names, base);
        let outcome = self.runner().run(&mut job, work())?;
        if outcome.is_stopped() {
            return Ok(None);
        }
        Ok(Some(job.into_results()))
    }

    pub fn run_uncompress(&mut self, archives: &[PathBuf], dest: &Path) -> Result<RunOutcome> {
        let mut job = ArchiveJob::uncompress(archives, dest);
        self.runner().run(&mut job, work())
    }

    pub fn run_compress_dirs(
        &mut self,
        dirs: &[PathBuf],
        format: ArchiveFormat,
    ) -> Result<RunOutcome> {
        let mut job = ArchiveJob::compress(dirs, format);
        self.runner().run(&mut job, work())
    }

    // === 가상 디렉토리 ===

    pub fn mount_archive(&mut self, tab: &mut Tab, archive: &Path) -> Result<bool> {
        let mut runner = Runner::new(&mut self.ui, &self.options);
        vfs::mount_archive(&mut runner, &self.options, tab, archive)
    }

    pub fn unmount_archive(&mut self, tab: &mut Tab) -> Result<bool> {
        match tab.vfs().map(|mount| mount.kind()) {
            Some(VfsKind::Archive(_)) => self.unmount_vfs(tab),
            _ => Err(TwinPaneError::NotMounted),
        }
    }

    pub fn mount_panelize(&mut self, tab: &mut Tab, names: &[String]) -> Result<()> {
        vfs::mount_panelize(&mut self.ui, &self.options, tab, names)
    }

    pub fn unmount_panelize(&mut self, tab: &mut Tab) -> Result<bool> {
        match tab.vfs().map(|mount| mount.kind()) {
            Some(VfsKind::Panelize) => self.unmount_vfs(tab),
            _ => Err(TwinPaneError::NotMounted),
        }
    }

    /// 종류와 상관없이 마운트 해제
    pub fn unmount_vfs(&mut self, tab: &mut Tab) -> Result<bool> {
        let mut runner = Runner::new(&mut self.ui, &self.options);
        vfs::unmount(&mut runner, &self.options, tab)
    }

    /// 다른 탭에 같은 가상 디렉토리 열기
    pub fn duplicate_mount(&self, src: &Tab, dst: &mut Tab) -> Result<()> {
        vfs::duplicate_mount(&self.options, src, dst)
    }

    /// 디렉토리 이동. 마운트 밖으로 나가면 먼저 마운트를 해제한다.
    ///
    /// 가상 경로(`<archive>#vfs/...`)도 받는다. 재생성 확인에서 취소하면 이동하지
    /// 않고 `Ok(false)`.
    pub fn go_to(&mut self, tab: &mut Tab, target: &Path) -> Result<bool> {
        let target = vfs::real_path(tab, target);
        if !target.is_dir() {
            return Err(TwinPaneError::NotADirectory { path: target });
        }
        if tab.leaves_mount(&target) {
            if !self.unmount_vfs(tab)? {
                return Ok(false);
            }
            if tab.path() == target.as_path() {
                return Ok(true);
            }
        }
        tab.set_path(target, None);
        Ok(true)
    }

    /// 상위 디렉토리로. 마운트 루트에서는 마운트를 해제하고 아카이브가 있던 곳으로 간다.
    pub fn exit_dir(&mut self, tab: &mut Tab) -> Result<bool> {
        if tab.at_mount_root() {
            return self.unmount_vfs(tab);
        }
        let current = tab.path().to_path_buf();
        let Some(parent) = current.parent() else {
            return Ok(false);
        };
        let name = current
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        tab.set_path(parent.to_path_buf(), name);
        Ok(true)
    }
}

/// 삭제 단계에서 빼야 할 항목: 처리되지 않은 항목과 그 상위 디렉토리
fn kept_sources(set: &ItemSet, unresolved: &[PathBuf]) -> Vec<PathBuf> {
    let base = set.base_path();
    let mut keep: HashSet<PathBuf> = HashSet::new();
    for path in unresolved {
        keep.insert(path.clone());
        for ancestor in path.ancestors().skip(1) {
            if ancestor == base || !ancestor.starts_with(base) {
                break;
            }
            if set.contains(ancestor) {
                keep.insert(ancestor.to_path_buf());
            }
        }
    }
    let mut keep: Vec<PathBuf> = keep.into_iter().collect();
    keep.sort();
    keep
}

/// 복사/이동 대상 해석
///
/// `(대상 디렉토리 또는 파일, rename_dir)`을 돌려준다. 디렉토리 하나를 없는 이름으로
/// 복사하면 `rename_dir`이 켜진다.
pub fn resolve_destination(input: &str, base: &Path, names: &[String]) -> Result<(PathBuf, bool)> {
    let invalid = |path: &Path, reason: &str| TwinPaneError::InvalidDestination {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(base, "Empty destination"));
    }
    let dest = if Path::new(input).is_absolute() {
        PathBuf::from(input)
    } else {
        base.join(input)
    };

    for name in names {
        let source = base.join(name);
        if is_recursive_path(&source, &dest) {
            return Err(invalid(&dest, "Can't copy a directory into itself"));
        }
    }

    if dest.is_dir() {
        return Ok((dest, false));
    }
    if names.len() != 1 {
        return Err(invalid(&dest, "Not a directory"));
    }

    let source = base.join(&names[0]);
    if dest.exists() {
        if source.is_dir() {
            return Err(invalid(&dest, "Not a directory"));
        }
        return Ok((dest, false));
    }
    if !dest.parent().is_some_and(Path::is_dir) {
        return Err(invalid(&dest, "No such file or directory"));
    }
    let rename_dir = source.is_dir();
    Ok((dest, rename_dir))
}

/// `dest`가 디렉토리 `source` 안쪽인지 (없는 대상은 상위 디렉토리로 판단)
fn is_recursive_path(source: &Path, dest: &Path) -> bool {
    if !source.is_dir() {
        return false;
    }
    let Ok(source) = source.canonicalize() else {
        return false;
    };
    let existing = dest.ancestors().find(|path| path.exists());
    let Some(Ok(dest)) = existing.map(Path::canonicalize) else {
        return false;
    };
    dest.starts_with(&source)
}
