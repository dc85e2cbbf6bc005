//! 가상 디렉토리 (vfs)
//!
//! 아카이브를 임시 디렉토리에 풀어서 일반 디렉토리처럼 탐색하고, 빠져나올 때
//! 변경 내용을 다시 아카이브로 묶는다. panelize는 흩어진 파일을 임시 디렉토리에
//! 모은 것으로, 같은 수명 주기를 따르되 압축 대신 원래 위치로 복사해 돌려놓는다.

use crate::app::config::Options;
use crate::core::runner::Runner;
use crate::models::operation::{ItemResult, SingleOutcome, WorkItem};
use crate::models::tab::{Tab, VfsKind, VfsMount};
use crate::system::archive::detect_archive_format;
use crate::system::file_ops;
use crate::ui::{ConfirmAnswer, UiBridge};
use crate::utils::error::{Result, TwinPaneError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

const VFS_PREFIX: &str = "twinpane-vfs-";
const STAGING_PREFIX: &str = ".twinpane-";

fn create_temp_dir(options: &Options) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(VFS_PREFIX);
    match &options.temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

/// 임시 디렉토리 정리 (실패는 로그만 남김)
fn cleanup(temp_dir: TempDir) {
    let path = temp_dir.path().to_path_buf();
    match temp_dir.close() {
        Ok(()) => debug!(path = %path.display(), "vfs temp dir removed"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove vfs temp dir"),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn ensure_not_mounted(tab: &Tab, path: &Path) -> Result<()> {
    if tab.is_mounted() {
        return Err(TwinPaneError::VfsMount {
            path: path.to_path_buf(),
            reason: "Tab is already inside a vfs".to_string(),
        });
    }
    Ok(())
}

/// 아카이브 마운트
///
/// 풀기에 성공해야만 탭이 임시 트리로 이동한다. 실패하거나 중지되면 임시
/// 디렉토리를 지우고 탭은 그대로 둔다. 중지된 경우 `Ok(false)`.
pub fn mount_archive(
    runner: &mut Runner<'_>,
    options: &Options,
    tab: &mut Tab,
    archive: &Path,
) -> Result<bool> {
    let archive = if archive.is_absolute() {
        archive.to_path_buf()
    } else {
        tab.path().join(archive)
    };
    ensure_not_mounted(tab, &archive)?;
    let format =
        detect_archive_format(&archive).ok_or_else(|| TwinPaneError::ArchiveUnsupportedFormat {
            path: archive.clone(),
        })?;

    let temp_dir = create_temp_dir(options).map_err(|e| TwinPaneError::VfsMount {
        path: archive.clone(),
        reason: e.to_string(),
    })?;
    let item = WorkItem::Extract {
        archive: archive.clone(),
        dest: temp_dir.path().to_path_buf(),
    };

    let outcome = runner.run_single(
        "Creating vfs",
        &file_label(&archive),
        item,
        Box::new(file_ops::execute),
    );
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            cleanup(temp_dir);
            return Err(e);
        }
    };

    match outcome {
        SingleOutcome::Done(ItemResult::Failed { message, code }) => {
            cleanup(temp_dir);
            runner.ui().report_error(&format!(
                "Cannot create vfs (opening compressed file)\n{} ({})",
                message, code
            ));
            Err(TwinPaneError::VfsMount {
                path: archive,
                reason: message,
            })
        }
        SingleOutcome::Done(_) => {
            info!(archive = %archive.display(), format = format.display_name(), "vfs mounted");
            let mount = VfsMount::new(VfsKind::Archive(format), temp_dir, archive);
            tab.attach(mount, Path::new(""));
            Ok(true)
        }
        SingleOutcome::Stopped => {
            cleanup(temp_dir);
            info!(archive = %archive.display(), "vfs mount stopped by user");
            Ok(false)
        }
    }
}

/// panelize 마운트: `names`(탭 현재 위치 기준)를 임시 디렉토리로 모은다
///
/// 항목별 복사 실패는 알리고 건너뛴다. 하위 경로는 디렉토리 구조를 유지한다.
pub fn mount_panelize(
    ui: &mut dyn UiBridge,
    options: &Options,
    tab: &mut Tab,
    names: &[String],
) -> Result<()> {
    let origin = tab.path().to_path_buf();
    ensure_not_mounted(tab, &origin)?;
    let temp_dir = create_temp_dir(options).map_err(|e| TwinPaneError::VfsMount {
        path: origin.clone(),
        reason: e.to_string(),
    })?;

    for name in names {
        let relative = Path::new(name);
        let src = origin.join(relative);
        let dest = temp_dir.path().join(relative);
        let result = match dest.parent() {
            Some(parent) => fs::create_dir_all(parent).and_then(|()| copy_tree(&src, &dest)),
            None => copy_tree(&src, &dest),
        };
        if let Err(e) = result {
            warn!(item = %name, error = %e, "panelize copy failed");
            if let ItemResult::Failed { message, code } = ItemResult::from_io(&e) {
                ui.report_error(&format!(
                    "Cannot create vfs (starting panelize)\n{}: {} ({})",
                    name, message, code
                ));
            }
        }
    }

    info!(origin = %origin.display(), items = names.len(), "panelize mounted");
    tab.attach(VfsMount::new(VfsKind::Panelize, temp_dir, origin), Path::new(""));
    Ok(())
}

/// 마운트 해제
///
/// 설정에 따라 재생성 여부를 묻는다. 확인 창에서 취소하면 마운트를 유지하고
/// `Ok(false)`. 재생성 실패는 에러 창으로 알리고, 임시 디렉토리는 어느 경우든 지운다.
pub fn unmount(runner: &mut Runner<'_>, options: &Options, tab: &mut Tab) -> Result<bool> {
    if !tab.is_mounted() {
        return Err(TwinPaneError::NotMounted);
    }

    let rebuild = if options.ask_rebuild_vfs {
        match runner.ui().prompt_confirm(
            "Rebuild vfs file",
            "Rebuild vfs file",
            options.rebuild_vfs_default,
        ) {
            ConfirmAnswer::Yes => true,
            ConfirmAnswer::No => false,
            ConfirmAnswer::Cancel => return Ok(false),
        }
    } else {
        options.rebuild_vfs_default
    };

    let mount = tab.detach().ok_or(TwinPaneError::NotMounted)?;
    if rebuild {
        let (result, what) = match mount.kind() {
            VfsKind::Archive(_) => (regenerate_archive(runner, &mount), "closing compressed file"),
            VfsKind::Panelize => (regenerate_panelize(&mount), "closing panelize"),
        };
        if let Err(e) = result {
            warn!(origin = %mount.origin().display(), error = %e, "vfs regenerate failed");
            let reason = match &e {
                TwinPaneError::VfsUnmount { reason, .. } => reason.clone(),
                other => other.to_string(),
            };
            runner
                .ui()
                .report_error(&format!("Cannot regenerate vfs ({})\n{}", what, reason));
        }
    }

    info!(origin = %mount.origin().display(), rebuild, "vfs unmounted");
    cleanup(mount.into_temp_dir());
    Ok(true)
}

/// 임시 트리를 새 아카이브로 묶은 뒤 원본과 교체
///
/// 같은 디렉토리의 임시 위치에 먼저 만들고, 성공했을 때만 rename으로 바꿔 끼운다.
/// 중지되면 원본은 건드리지 않는다.
fn regenerate_archive(runner: &mut Runner<'_>, mount: &VfsMount) -> Result<()> {
    let archive = mount.origin();
    let unmount_error = |reason: String| TwinPaneError::VfsUnmount {
        path: archive.to_path_buf(),
        reason,
    };
    let parent = archive
        .parent()
        .ok_or_else(|| unmount_error("Archive has no parent directory".to_string()))?;
    let name = archive
        .file_name()
        .ok_or_else(|| unmount_error("Archive has no file name".to_string()))?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| unmount_error(e.to_string()))?;
    let output = staging.path().join(name);
    let item = WorkItem::Compress {
        source: mount.base().to_path_buf(),
        output: output.clone(),
        contents_only: true,
    };

    let label = format!("'{}'", file_label(archive));
    let outcome = runner.run_single(
        "Compressing Directory",
        &label,
        item,
        Box::new(file_ops::execute),
    )?;
    match outcome {
        SingleOutcome::Done(ItemResult::Failed { message, code }) => {
            Err(unmount_error(format!("{} ({})", message, code)))
        }
        SingleOutcome::Done(_) => {
            if let Ok(meta) = fs::metadata(archive) {
                let _ = fs::set_permissions(&output, meta.permissions());
            }
            fs::rename(&output, archive).map_err(|e| unmount_error(e.to_string()))?;
            info!(archive = %archive.display(), "vfs archive regenerated");
            Ok(())
        }
        SingleOutcome::Stopped => {
            info!(archive = %archive.display(), "vfs regenerate stopped, archive untouched");
            Ok(())
        }
    }
}

/// panelize 임시 트리를 원래 위치로 복사해 돌려놓기
fn regenerate_panelize(mount: &VfsMount) -> Result<()> {
    let dest = mount.origin();
    let unmount_error = |reason: String| TwinPaneError::VfsUnmount {
        path: dest.to_path_buf(),
        reason,
    };

    // 쓰기 가능한지 먼저 확인
    tempfile::tempfile_in(dest).map_err(|e| {
        unmount_error(format!(
            "{}: {} ({})",
            dest.display(),
            e,
            e.raw_os_error().unwrap_or(0)
        ))
    })?;

    let mut errors = Vec::new();
    for child in sorted_children(mount.base()).map_err(|e| unmount_error(e.to_string()))? {
        let name = file_label(&child);
        if let Err(e) = merge_tree(&child, &dest.join(&name)) {
            errors.push(format!("{}: {}", name, e));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(unmount_error(errors.join("\n")))
    }
}

/// 다른 탭에 같은 가상 디렉토리를 열어줌
///
/// 임시 트리는 공유하지 않는다. `dst`는 새 임시 디렉토리의 같은 상대 위치로 간다.
pub fn duplicate_mount(options: &Options, src: &Tab, dst: &mut Tab) -> Result<()> {
    let mount = src.vfs().ok_or(TwinPaneError::NotMounted)?;
    ensure_not_mounted(dst, mount.origin())?;

    let mount_error = |reason: String| TwinPaneError::VfsMount {
        path: mount.origin().to_path_buf(),
        reason,
    };
    let temp_dir = create_temp_dir(options).map_err(|e| mount_error(e.to_string()))?;
    let children = sorted_children(mount.base()).map_err(|e| mount_error(e.to_string()))?;
    for child in children {
        let target = temp_dir.path().join(file_label(&child));
        if let Err(e) = copy_tree(&child, &target) {
            cleanup(temp_dir);
            return Err(mount_error(e.to_string()));
        }
    }

    let relative = src
        .path()
        .strip_prefix(mount.base())
        .unwrap_or(Path::new(""))
        .to_path_buf();
    debug!(origin = %mount.origin().display(), relative = %relative.display(), "vfs duplicated");
    dst.attach(
        VfsMount::new(mount.kind(), temp_dir, mount.origin().to_path_buf()),
        &relative,
    );
    Ok(())
}

/// 화면 표시용 경로
pub fn virtual_path(tab: &Tab) -> PathBuf {
    tab.display_path()
}

/// 표시된 가상 경로를 임시 트리 안의 실제 경로로. 마운트 밖이면 그대로.
pub fn real_path(tab: &Tab, path: &Path) -> PathBuf {
    tab.vfs()
        .and_then(|mount| mount.real_path(path))
        .unwrap_or_else(|| path.to_path_buf())
}

fn sorted_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

/// 새 위치로 트리 복사 (심볼릭 링크는 따라가지 않음)
fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        file_ops::make_symlink(&fs::read_link(src)?, dest)
    } else if meta.is_dir() {
        fs::create_dir(dest)?;
        for child in sorted_children(src)? {
            copy_tree(&child, &dest.join(file_label(&child)))?;
        }
        Ok(())
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}

/// 기존 트리 위에 덮어쓰며 복사 (디렉토리는 합침)
fn merge_tree(src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    let existing = fs::symlink_metadata(dest).ok();
    if meta.is_dir() {
        if !existing.as_ref().is_some_and(|m| m.is_dir()) {
            if existing.is_some() {
                fs::remove_file(dest)?;
            }
            fs::create_dir(dest)?;
        }
        for child in sorted_children(src)? {
            merge_tree(&child, &dest.join(file_label(&child)))?;
        }
        return Ok(());
    }
    if let Some(existing) = existing {
        if existing.is_dir() {
            fs::remove_dir_all(dest)?;
        } else if meta.file_type().is_symlink() {
            fs::remove_file(dest)?;
        }
    }
    if meta.file_type().is_symlink() {
        file_ops::make_symlink(&fs::read_link(src)?, dest)
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::RunSettings;
    use crate::core::worker::WorkerControl;
    use crate::system::archive::{create_archive_from_contents, extract_archive};
    use crate::ui::scripted::{Answer, ScriptedUi};
    use std::time::Duration;

    fn settings() -> RunSettings {
        RunSettings {
            poll_interval: Duration::from_millis(1),
            kill_grace: Duration::from_millis(500),
        }
    }

    fn options(temp_root: &Path) -> Options {
        Options {
            ask_rebuild_vfs: false,
            rebuild_vfs_default: true,
            temp_root: Some(temp_root.to_path_buf()),
            ..Options::default()
        }
    }

    /// `dir/photos.zip` (a.txt, sub/b.txt)
    fn make_zip(dir: &Path) -> PathBuf {
        let content = TempDir::new().unwrap();
        fs::write(content.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(content.path().join("sub")).unwrap();
        fs::write(content.path().join("sub/b.txt"), "beta").unwrap();
        let archive = dir.join("photos.zip");
        create_archive_from_contents(content.path(), &archive, &WorkerControl::new()).unwrap();
        archive
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_mount_archive_moves_tab_into_temp_tree() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = make_zip(work.path());
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());

        let mut ui = ScriptedUi::new();
        let mounted = mount_archive(
            &mut Runner::with_settings(&mut ui, settings()),
            &opts,
            &mut tab,
            Path::new("photos.zip"),
        )
        .unwrap();

        assert!(mounted);
        assert!(tab.path().starts_with(temp_root.path()));
        assert_eq!(fs::read_to_string(tab.path().join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(tab.path().join("sub/b.txt")).unwrap(), "beta");
        let mut expected = archive.into_os_string();
        expected.push("#vfs");
        assert_eq!(virtual_path(&tab), PathBuf::from(expected.clone()));
        assert_eq!(
            real_path(&tab, &PathBuf::from(expected).join("sub")),
            tab.path().join("sub")
        );
        assert_eq!(ui.progress[0].title, "Creating vfs");
        assert_eq!(ui.progress[0].label, "photos.zip");
    }

    #[test]
    fn test_failed_mount_leaves_no_temp_dir_and_tab_unchanged() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = work.path().join("broken.zip");
        fs::write(&archive, "this is not a zip file").unwrap();
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());

        let mut ui = ScriptedUi::new();
        let result = mount_archive(
            &mut Runner::with_settings(&mut ui, settings()),
            &opts,
            &mut tab,
            &archive,
        );

        assert!(matches!(result, Err(TwinPaneError::VfsMount { .. })));
        assert_eq!(entries(temp_root.path()), 0);
        assert_eq!(tab.path(), work.path());
        assert!(!tab.is_mounted());
        assert_eq!(ui.errors.len(), 1);
        assert!(ui.errors[0].starts_with("Cannot create vfs (opening compressed file)\n"));
    }

    #[test]
    fn test_stopped_mount_leaves_no_temp_dir() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        make_zip(work.path());
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());

        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::Yes)])
            .cancel_on("photos.zip");
        let mounted = mount_archive(
            &mut Runner::with_settings(&mut ui, settings()),
            &opts,
            &mut tab,
            Path::new("photos.zip"),
        )
        .unwrap();

        assert!(!mounted);
        assert_eq!(entries(temp_root.path()), 0);
        assert_eq!(tab.path(), work.path());
        assert!(ui.errors.is_empty());
    }

    #[test]
    fn test_nested_mount_is_refused() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        make_zip(work.path());
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::new();
        let mut runner = Runner::with_settings(&mut ui, settings());

        mount_archive(&mut runner, &opts, &mut tab, Path::new("photos.zip")).unwrap();
        let again = mount_archive(&mut runner, &opts, &mut tab, &work.path().join("photos.zip"));
        assert!(matches!(again, Err(TwinPaneError::VfsMount { .. })));
        assert_eq!(entries(temp_root.path()), 1);
    }

    #[test]
    fn test_unmount_rebuilds_archive() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = make_zip(work.path());
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::new();
        let mut runner = Runner::with_settings(&mut ui, settings());

        mount_archive(&mut runner, &opts, &mut tab, &archive).unwrap();
        fs::write(tab.path().join("a.txt"), "changed").unwrap();
        fs::write(tab.path().join("new.txt"), "new").unwrap();

        assert!(unmount(&mut runner, &opts, &mut tab).unwrap());
        assert_eq!(tab.path(), work.path());
        assert_eq!(tab.cursor_target(), Some("photos.zip"));
        assert_eq!(entries(temp_root.path()), 0);
        // 스테이징 디렉토리도 남지 않음
        assert_eq!(entries(work.path()), 1);

        let check = TempDir::new().unwrap();
        extract_archive(&archive, check.path(), &WorkerControl::new()).unwrap();
        assert_eq!(fs::read_to_string(check.path().join("a.txt")).unwrap(), "changed");
        assert_eq!(fs::read_to_string(check.path().join("new.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(check.path().join("sub/b.txt")).unwrap(), "beta");
    }

    #[test]
    fn test_unmount_discard_keeps_archive_bytes() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = make_zip(work.path());
        let before = fs::read(&archive).unwrap();
        let opts = Options {
            ask_rebuild_vfs: true,
            ..options(temp_root.path())
        };
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::No)]);
        let mut runner = Runner::with_settings(&mut ui, settings());

        mount_archive(&mut runner, &opts, &mut tab, &archive).unwrap();
        fs::write(tab.path().join("a.txt"), "changed").unwrap();
        assert!(unmount(&mut runner, &opts, &mut tab).unwrap());
        drop(runner);

        assert_eq!(fs::read(&archive).unwrap(), before);
        assert_eq!(entries(temp_root.path()), 0);
        assert_eq!(ui.prompts, vec!["Rebuild vfs file: Rebuild vfs file"]);
    }

    #[test]
    fn test_unmount_cancel_keeps_mount() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = make_zip(work.path());
        let opts = Options {
            ask_rebuild_vfs: true,
            ..options(temp_root.path())
        };
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::Cancel)]);
        let mut runner = Runner::with_settings(&mut ui, settings());

        mount_archive(&mut runner, &opts, &mut tab, &archive).unwrap();
        let inside = tab.path().to_path_buf();
        assert!(!unmount(&mut runner, &opts, &mut tab).unwrap());
        assert!(tab.is_mounted());
        assert_eq!(tab.path(), inside.as_path());
        assert!(inside.exists());
    }

    #[test]
    fn test_unmount_without_mount_is_error() {
        let work = TempDir::new().unwrap();
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::new();
        let result = unmount(
            &mut Runner::with_settings(&mut ui, settings()),
            &Options::default(),
            &mut tab,
        );
        assert!(matches!(result, Err(TwinPaneError::NotMounted)));
    }

    #[test]
    fn test_panelize_round_trip_writes_back_changes() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        fs::write(work.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(work.path().join("sub")).unwrap();
        fs::write(work.path().join("sub/b.txt"), "beta").unwrap();
        fs::write(work.path().join("untouched.txt"), "keep").unwrap();
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::new();

        let names = vec!["a.txt".to_string(), "sub/b.txt".to_string()];
        mount_panelize(&mut ui, &opts, &mut tab, &names).unwrap();
        assert!(tab.at_mount_root());
        assert!(tab.path().join("sub/b.txt").is_file());
        assert!(!tab.path().join("untouched.txt").exists());

        fs::write(tab.path().join("a.txt"), "edited").unwrap();
        fs::write(tab.path().join("sub/b.txt"), "edited too").unwrap();

        let mut runner = Runner::with_settings(&mut ui, settings());
        assert!(unmount(&mut runner, &opts, &mut tab).unwrap());
        drop(runner);

        assert_eq!(tab.path(), work.path());
        assert_eq!(fs::read_to_string(work.path().join("a.txt")).unwrap(), "edited");
        assert_eq!(
            fs::read_to_string(work.path().join("sub/b.txt")).unwrap(),
            "edited too"
        );
        assert_eq!(fs::read_to_string(work.path().join("untouched.txt")).unwrap(), "keep");
        assert_eq!(entries(temp_root.path()), 0);
        assert!(ui.errors.is_empty());
    }

    #[test]
    fn test_panelize_missing_item_is_reported() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        fs::write(work.path().join("a.txt"), "alpha").unwrap();
        let opts = options(temp_root.path());
        let mut tab = Tab::new(work.path().to_path_buf());
        let mut ui = ScriptedUi::new();

        let names = vec!["a.txt".to_string(), "gone.txt".to_string()];
        mount_panelize(&mut ui, &opts, &mut tab, &names).unwrap();

        assert!(tab.is_mounted());
        assert!(tab.path().join("a.txt").is_file());
        assert_eq!(ui.errors.len(), 1);
        assert!(ui.errors[0].starts_with("Cannot create vfs (starting panelize)\ngone.txt: "));
    }

    #[test]
    fn test_panelize_regenerate_into_missing_origin_reports_error() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let origin = work.path().join("src");
        fs::create_dir(&origin).unwrap();
        fs::write(origin.join("a.txt"), "alpha").unwrap();
        let opts = options(temp_root.path());
        let mut tab = Tab::new(origin.clone());
        let mut ui = ScriptedUi::new();

        mount_panelize(&mut ui, &opts, &mut tab, &["a.txt".to_string()]).unwrap();
        fs::remove_dir_all(&origin).unwrap();

        let mut runner = Runner::with_settings(&mut ui, settings());
        assert!(unmount(&mut runner, &opts, &mut tab).unwrap());
        drop(runner);

        assert!(!tab.is_mounted());
        assert_eq!(entries(temp_root.path()), 0);
        assert_eq!(ui.errors.len(), 1);
        assert!(ui.errors[0].starts_with("Cannot regenerate vfs (closing panelize)\n"));
    }

    #[test]
    fn test_duplicate_mount_is_private_copy() {
        let work = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let archive = make_zip(work.path());
        let opts = options(temp_root.path());
        let mut left = Tab::new(work.path().to_path_buf());
        let mut right = Tab::new(PathBuf::from("/"));
        let mut ui = ScriptedUi::new();

        mount_archive(
            &mut Runner::with_settings(&mut ui, settings()),
            &opts,
            &mut left,
            &archive,
        )
        .unwrap();
        let sub = left.path().join("sub");
        left.set_path(sub, None);

        duplicate_mount(&opts, &left, &mut right).unwrap();
        assert!(right.is_mounted());
        assert_ne!(right.path(), left.path());
        assert!(right.path().ends_with("sub"));
        assert_eq!(virtual_path(&right), virtual_path(&left));

        fs::write(right.path().join("b.txt"), "only right").unwrap();
        assert_eq!(fs::read_to_string(left.path().join("b.txt")).unwrap(), "beta");
        assert_eq!(entries(temp_root.path()), 2);
    }

    #[test]
    fn test_real_path_outside_mount_is_unchanged() {
        let tab = Tab::new(PathBuf::from("/data"));
        assert_eq!(real_path(&tab, Path::new("/data/x")), PathBuf::from("/data/x"));
        assert_eq!(virtual_path(&tab), PathBuf::from("/data"));
    }
}
