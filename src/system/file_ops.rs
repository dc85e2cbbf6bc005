//! 항목별 파일 작업 (worker 스레드에서 실행)
//!
//! 모든 함수는 에러를 밖으로 던지지 않고 `ItemResult`로 돌려준다.
//! 오래 걸리는 작업은 `WorkerControl::checkpoint()`를 중간중간 호출한다.

use crate::core::worker::WorkerControl;
use crate::models::file_entry::{DirSizeInfo, FileType};
use crate::models::operation::{ItemResult, WorkItem};
use crate::system::archive;
use crate::utils::error::TwinPaneError;
use crate::utils::formatter::format_mode;
use filetime::FileTime;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// 복사 버퍼 크기
const COPY_CHUNK_SIZE: usize = 1024 * 1024;

const EEXIST: i32 = 17;

/// worker 작업 함수: 요청 종류에 맞는 작업으로 분기
pub fn execute(item: &WorkItem, control: &WorkerControl) -> ItemResult {
    match item {
        WorkItem::Copy {
            relative,
            base,
            dest,
            rename_dir,
            check_exists,
        } => copy_item(relative, base, dest, *rename_dir, *check_exists, control),
        WorkItem::Delete { path } => delete_item(path),
        WorkItem::Rename {
            name,
            base,
            new_name,
            check_exists,
        } => rename_item(name, base, new_name, *check_exists),
        WorkItem::Backup {
            name,
            base,
            suffix,
            check_exists,
        } => backup_item(name, base, suffix, *check_exists, control),
        WorkItem::DirSize { name, base } => dir_size_item(name, base, control),
        WorkItem::Extract { archive, dest } => extract_item(archive, dest, control),
        WorkItem::Compress {
            source,
            output,
            contents_only,
        } => compress_item(source, output, *contents_only, control),
    }
}

fn killed() -> ItemResult {
    ItemResult::failed("Stopped by user", 0)
}

fn from_error(error: &TwinPaneError) -> ItemResult {
    match error {
        TwinPaneError::Io(e) => ItemResult::from_io(e),
        other => ItemResult::failed(other.to_string(), other.os_code()),
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// 복사 대상 경로
///
/// `dest`가 기존 디렉토리면 그 아래 `relative`로, 아니면 `dest` 자체로 복사한다.
/// `rename_dir`이면 첫 경로 요소를 떼어낸다 (디렉토리를 새 이름으로 복사).
pub fn copy_target(relative: &Path, dest: &Path, rename_dir: bool) -> PathBuf {
    if !dest.is_dir() {
        return dest.to_path_buf();
    }
    if rename_dir {
        let rest: PathBuf = relative.components().skip(1).collect();
        dest.join(rest)
    } else {
        dest.join(relative)
    }
}

pub fn copy_item(
    relative: &Path,
    base: &Path,
    dest: &Path,
    rename_dir: bool,
    check_exists: bool,
    control: &WorkerControl,
) -> ItemResult {
    let src = base.join(relative);
    let target = copy_target(relative, dest, rename_dir);

    let target_meta = fs::symlink_metadata(&target).ok();
    if target_meta.is_some() && check_exists {
        return ItemResult::Conflict {
            name: base_name(&target),
        };
    }

    let meta = match fs::symlink_metadata(&src) {
        Ok(meta) => meta,
        Err(e) => return ItemResult::from_io(&e),
    };

    if meta.file_type().is_symlink() {
        return copy_symlink(&src, &target, target_meta.as_ref());
    }
    if meta.is_dir() {
        return copy_dir_entry(&target, &meta);
    }
    if src == target || is_same_file(&meta, target_meta.as_ref()) {
        return ItemResult::failed("Source and destination are the same file", 0);
    }
    if !meta.is_file() {
        return ItemResult::failed("Special files can't be copied or moved", 0);
    }

    match copy_file_chunked(&src, &target, &meta, control) {
        Ok(true) => ItemResult::Done,
        Ok(false) => killed(),
        Err(e) => ItemResult::from_io(&e),
    }
}

fn copy_symlink(src: &Path, target: &Path, existing: Option<&Metadata>) -> ItemResult {
    let link = match fs::read_link(src) {
        Ok(link) => link,
        Err(e) => return ItemResult::from_io(&e),
    };
    // 덮어쓰기 확인을 거친 경우 (디렉토리는 그대로 둠)
    if existing.is_some_and(|meta| !meta.is_dir()) {
        if let Err(e) = fs::remove_file(target) {
            return ItemResult::from_io(&e);
        }
    }
    match make_symlink(&link, target) {
        Ok(()) => ItemResult::Done,
        Err(e) => ItemResult::from_io(&e),
    }
}

fn copy_dir_entry(target: &Path, meta: &Metadata) -> ItemResult {
    match fs::create_dir(target) {
        Ok(()) => {
            // 권한/시간 복사 실패는 무시
            let _ = fs::set_permissions(target, meta.permissions());
            let _ = filetime::set_file_times(
                target,
                FileTime::from_last_access_time(meta),
                FileTime::from_last_modification_time(meta),
            );
            ItemResult::Done
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            // 덮어쓰기 확인을 거친 기존 디렉토리에는 합친다
            match fs::symlink_metadata(target) {
                Ok(existing) if existing.is_dir() => ItemResult::Done,
                _ => ItemResult::from_io(&e),
            }
        }
        Err(e) => ItemResult::from_io(&e),
    }
}

/// 청크 단위 복사. kill 되면 만들던 파일을 지우고 `Ok(false)`
fn copy_file_chunked(
    src: &Path,
    target: &Path,
    meta: &Metadata,
    control: &WorkerControl,
) -> io::Result<bool> {
    let mut reader = File::open(src)?;
    let mut writer = File::create(target)?;
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

    loop {
        if control.checkpoint().is_err() {
            drop(writer);
            if let Err(e) = fs::remove_file(target) {
                warn!(path = %target.display(), error = %e, "failed to remove partial copy");
            }
            debug!(path = %target.display(), "copy interrupted, partial file removed");
            return Ok(false);
        }
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
    }
    writer.flush()?;
    drop(writer);

    fs::set_permissions(target, meta.permissions())?;
    filetime::set_file_times(
        target,
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )?;
    Ok(true)
}

#[cfg(unix)]
fn is_same_file(meta: &Metadata, other: Option<&Metadata>) -> bool {
    use std::os::unix::fs::MetadataExt;
    other.is_some_and(|other| meta.dev() == other.dev() && meta.ino() == other.ino())
}

#[cfg(not(unix))]
fn is_same_file(_meta: &Metadata, _other: Option<&Metadata>) -> bool {
    false
}

#[cfg(unix)]
pub(crate) fn make_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
pub(crate) fn make_symlink(_link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported",
    ))
}

/// 항목 하나 삭제. 디렉토리는 비어 있어야 한다 (하위 항목이 먼저 지워짐).
pub fn delete_item(path: &Path) -> ItemResult {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ItemResult::Done,
        Err(e) => ItemResult::from_io(&e),
    }
}

pub fn rename_item(name: &str, base: &Path, new_name: &str, check_exists: bool) -> ItemResult {
    let src = base.join(name);
    let dest = if Path::new(new_name).is_absolute() {
        PathBuf::from(new_name)
    } else {
        base.join(new_name)
    };
    let dest = normalize(&dest);

    if src == dest {
        return ItemResult::failed("Source and destination are the same file", 0);
    }
    if dest.parent() != Some(base) {
        return ItemResult::failed("Can't rename to different directory", 0);
    }
    if dest.is_file() && check_exists {
        return ItemResult::Conflict {
            name: base_name(&dest),
        };
    }
    match fs::rename(&src, &dest) {
        Ok(()) => ItemResult::Done,
        Err(e) => ItemResult::from_io(&e),
    }
}

/// `.` 와 `..` 정리 (파일시스템은 보지 않음)
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `name`을 `name+suffix`로 복사 (디렉토리는 재귀)
pub fn backup_item(
    name: &str,
    base: &Path,
    suffix: &str,
    check_exists: bool,
    control: &WorkerControl,
) -> ItemResult {
    let src = base.join(name);
    let dest = base.join(format!("{}{}", name, suffix));

    let src_meta = match fs::symlink_metadata(&src) {
        Ok(meta) => meta,
        Err(e) => return ItemResult::from_io(&e),
    };
    if let Ok(dest_meta) = fs::symlink_metadata(&dest) {
        if check_exists {
            return ItemResult::Conflict {
                name: base_name(&dest),
            };
        }
        if dest_meta.is_dir() != src_meta.is_dir() {
            return ItemResult::failed("File exists", EEXIST);
        }
        let removed = if dest_meta.is_dir() {
            fs::remove_dir_all(&dest)
        } else {
            fs::remove_file(&dest)
        };
        if let Err(e) = removed {
            return ItemResult::from_io(&e);
        }
    }

    match copy_tree(&src, &dest, control) {
        Ok(true) => ItemResult::Done,
        Ok(false) => killed(),
        Err(e) => ItemResult::from_io(&e),
    }
}

/// 재귀 복사 (링크는 링크로). kill 되면 `Ok(false)`
fn copy_tree(src: &Path, dest: &Path, control: &WorkerControl) -> io::Result<bool> {
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        make_symlink(&fs::read_link(src)?, dest)?;
        return Ok(true);
    }
    if !meta.is_dir() {
        return copy_file_chunked(src, dest, &meta, control);
    }

    fs::create_dir(dest)?;
    let mut children = fs::read_dir(src)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    for child in children {
        if !copy_tree(&src.join(&child), &dest.join(&child), control)? {
            return Ok(false);
        }
    }
    let _ = fs::set_permissions(dest, meta.permissions());
    let _ = filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    );
    Ok(true)
}

/// 크기 계산 결과 (타입, 권한, 소유자, 그룹, 재귀 크기, 수정 시간)
pub fn dir_size_item(name: &str, base: &Path, control: &WorkerControl) -> ItemResult {
    let path = base.join(name);
    let meta = match fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(_) => return ItemResult::DirSize(DirSizeInfo::unknown()),
    };
    let file_type = FileType::classify(&path, &meta);
    let size = if meta.is_dir() {
        match tree_size(&path, control) {
            Some(size) => size,
            None => return killed(),
        }
    } else if meta.file_type().is_symlink() {
        0
    } else {
        meta.len()
    };

    let (mode, owner, group) = ownership(&meta);
    ItemResult::DirSize(DirSizeInfo {
        file_type,
        permissions: format_mode(mode),
        owner,
        group,
        size,
        modified: FileTime::from_last_modification_time(&meta).unix_seconds(),
    })
}

/// 디렉토리 아래 파일 크기 합계 (링크는 0, 읽을 수 없는 항목은 건너뜀)
fn tree_size(path: &Path, control: &WorkerControl) -> Option<u64> {
    let mut total = 0u64;
    let Ok(entries) = fs::read_dir(path) else {
        return Some(0);
    };
    for entry in entries.flatten() {
        control.checkpoint().ok()?;
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.file_type().is_symlink() {
            continue;
        }
        if meta.is_dir() {
            total = total.saturating_add(tree_size(&entry.path(), control)?);
        } else {
            total = total.saturating_add(meta.len());
        }
    }
    Some(total)
}

#[cfg(unix)]
fn ownership(meta: &Metadata) -> (u32, String, String) {
    use std::os::unix::fs::MetadataExt;
    (meta.mode(), meta.uid().to_string(), meta.gid().to_string())
}

#[cfg(not(unix))]
fn ownership(meta: &Metadata) -> (u32, String, String) {
    let mode = if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    (mode, "root".to_string(), "root".to_string())
}

pub fn extract_item(archive_path: &Path, dest: &Path, control: &WorkerControl) -> ItemResult {
    match archive::extract_archive(archive_path, dest, control) {
        Ok(summary) if summary.cancelled => killed(),
        Ok(summary) => match summary.errors.first() {
            None => ItemResult::Done,
            Some(first) if summary.errors.len() == 1 => ItemResult::failed(first.clone(), 0),
            Some(first) => ItemResult::failed(
                format!("{} (and {} more)", first, summary.errors.len() - 1),
                0,
            ),
        },
        Err(e) => from_error(&e),
    }
}

/// 압축. 실패하거나 중지되면 만들던 아카이브를 지운다.
pub fn compress_item(
    source: &Path,
    output: &Path,
    contents_only: bool,
    control: &WorkerControl,
) -> ItemResult {
    if fs::symlink_metadata(output).is_ok() {
        return ItemResult::failed(format!("{}: File exists", base_name(output)), EEXIST);
    }

    let result = if contents_only {
        archive::create_archive_from_contents(source, output, control)
    } else {
        archive::create_archive(&[source.to_path_buf()], output, control)
    };
    let outcome = match result {
        Ok(summary) if summary.cancelled => killed(),
        Ok(summary) => match summary.errors.first() {
            None => return ItemResult::Done,
            Some(first) => ItemResult::failed(first.clone(), 0),
        },
        Err(e) => from_error(&e),
    };
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!(path = %output.display(), error = %e, "failed to remove incomplete archive");
        }
    }
    outcome
}
