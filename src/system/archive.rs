//! 아카이브 압축/해제
//!
//! worker 안에서 실행된다. 항목 사이마다 `WorkerControl::checkpoint()`를 호출해서
//! 일시정지/중지 요청에 응답한다.

use crate::core::worker::WorkerControl;
use crate::system::file_ops::make_symlink;
use crate::utils::error::{Result, TwinPaneError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive as TarArchive, Builder as TarBuilder};
use tracing::debug;
use zip::write::SimpleFileOptions as ZipFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};
use zstd::stream::read::Decoder as ZstdDecoder;
use zstd::stream::write::Encoder as ZstdEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarZst,
    SevenZ,
    Jar,
    War,
}

impl ArchiveFormat {
    pub fn display_name(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarZst => "tar.zst",
            ArchiveFormat::SevenZ => "7z",
            ArchiveFormat::Jar => "jar",
            ArchiveFormat::War => "war",
        }
    }

    /// 새 아카이브 파일명에 붙일 확장자 (점 포함)
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarZst => ".tar.zst",
            ArchiveFormat::SevenZ => ".7z",
            ArchiveFormat::Jar => ".jar",
            ArchiveFormat::War => ".war",
        }
    }

    fn is_zip_like(&self) -> bool {
        matches!(
            self,
            ArchiveFormat::Zip | ArchiveFormat::Jar | ArchiveFormat::War
        )
    }
}

/// 압축/해제 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// 처리한 항목 수
    pub entries: usize,
    /// 항목별 실패 ("이름: 사유")
    pub errors: Vec<String>,
    /// 중지 요청으로 중단됨
    pub cancelled: bool,
}

impl ArchiveSummary {
    fn fail(&mut self, name: &str, reason: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", name, reason));
    }
}

#[derive(Debug, Clone)]
struct SourceItem {
    source_path: PathBuf,
    archive_path: PathBuf,
    kind: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Dir,
    File,
    Symlink,
}

/// 파일명으로 형식 판별 (브라우저와 같은 규칙)
pub fn detect_archive_format(path: &Path) -> Option<ArchiveFormat> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return Some(ArchiveFormat::TarGz);
    }
    if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        return Some(ArchiveFormat::TarZst);
    }
    match path
        .extension()
        .and_then(OsStr::to_str)?
        .to_lowercase()
        .as_str()
    {
        "zip" => Some(ArchiveFormat::Zip),
        "tar" => Some(ArchiveFormat::Tar),
        "7z" => Some(ArchiveFormat::SevenZ),
        "jar" => Some(ArchiveFormat::Jar),
        "war" => Some(ArchiveFormat::War),
        _ => None,
    }
}

fn require_format(path: &Path) -> Result<ArchiveFormat> {
    detect_archive_format(path).ok_or_else(|| TwinPaneError::ArchiveUnsupportedFormat {
        path: path.to_path_buf(),
    })
}

/// 아카이브를 `dest_dir` 아래로 풀기
///
/// 이미 있는 항목은 덮어쓴다. 디렉토리끼리 겹치면 그대로 둔다.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    control: &WorkerControl,
) -> Result<ArchiveSummary> {
    let format = require_format(archive_path)?;
    if !dest_dir.is_dir() {
        return Err(TwinPaneError::NotADirectory {
            path: dest_dir.to_path_buf(),
        });
    }

    let mut summary = ArchiveSummary::default();
    let file = File::open(archive_path)?;
    match format {
        ArchiveFormat::Tar => {
            extract_tar_like(TarArchive::new(file), dest_dir, control, &mut summary)?
        }
        ArchiveFormat::TarGz => extract_tar_like(
            TarArchive::new(GzDecoder::new(file)),
            dest_dir,
            control,
            &mut summary,
        )?,
        ArchiveFormat::TarZst => extract_tar_like(
            TarArchive::new(ZstdDecoder::new(file)?),
            dest_dir,
            control,
            &mut summary,
        )?,
        ArchiveFormat::SevenZ => extract_7z(file, archive_path, dest_dir, control, &mut summary)?,
        ArchiveFormat::Zip | ArchiveFormat::Jar | ArchiveFormat::War => {
            extract_zip(file, archive_path, dest_dir, control, &mut summary)?
        }
    }
    debug!(
        archive = %archive_path.display(),
        entries = summary.entries,
        errors = summary.errors.len(),
        cancelled = summary.cancelled,
        "archive extracted"
    );
    Ok(summary)
}

/// 여러 경로를 하나의 아카이브로 묶기 (각 경로의 이름이 최상위 항목)
///
/// 출력 파일이 이미 있으면 실패한다.
pub fn create_archive(
    sources: &[PathBuf],
    output_path: &Path,
    control: &WorkerControl,
) -> Result<ArchiveSummary> {
    let format = require_format(output_path)?;
    if output_path.exists() {
        return Err(TwinPaneError::ArchiveCreateFailed {
            path: output_path.to_path_buf(),
            reason: "Destination archive already exists".to_string(),
        });
    }

    let items = collect_source_items(sources)?;
    let mut summary = ArchiveSummary::default();
    if format == ArchiveFormat::SevenZ {
        create_7z(sources, output_path, control, &mut summary)?;
        if !summary.cancelled {
            summary.entries = items.len();
        }
    } else {
        write_archive(format, output_path, &items, control, &mut summary)?;
    }
    debug!(
        archive = %output_path.display(),
        entries = summary.entries,
        errors = summary.errors.len(),
        cancelled = summary.cancelled,
        "archive created"
    );
    Ok(summary)
}

/// 디렉토리의 내용물(디렉토리 자신은 제외)을 아카이브로 묶기
pub fn create_archive_from_contents(
    source_dir: &Path,
    output_path: &Path,
    control: &WorkerControl,
) -> Result<ArchiveSummary> {
    let mut children = fs::read_dir(source_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    create_archive(&children, output_path, control)
}

fn write_archive(
    format: ArchiveFormat,
    output_path: &Path,
    items: &[SourceItem],
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let file = File::create(output_path)?;
    let create_failed = |e: io::Error| TwinPaneError::ArchiveCreateFailed {
        path: output_path.to_path_buf(),
        reason: e.to_string(),
    };

    if format.is_zip_like() {
        return write_zip(file, output_path, items, control, summary);
    }
    match format {
        ArchiveFormat::TarGz => {
            let mut builder = TarBuilder::new(GzEncoder::new(file, Compression::default()));
            append_tar_items(&mut builder, items, control, summary);
            builder
                .into_inner()
                .and_then(|encoder| encoder.finish())
                .map_err(create_failed)?;
        }
        ArchiveFormat::TarZst => {
            let mut builder = TarBuilder::new(ZstdEncoder::new(file, 3)?);
            append_tar_items(&mut builder, items, control, summary);
            builder
                .into_inner()
                .and_then(|encoder| encoder.finish())
                .map_err(create_failed)?;
        }
        _ => {
            let mut builder = TarBuilder::new(file);
            append_tar_items(&mut builder, items, control, summary);
            builder.into_inner().map_err(create_failed)?;
        }
    }
    Ok(())
}

fn collect_source_items(sources: &[PathBuf]) -> Result<Vec<SourceItem>> {
    let mut items = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        collect_source_item_recursive(source, PathBuf::from(name), &mut items)?;
    }
    Ok(items)
}

fn collect_source_item_recursive(
    source: &Path,
    archive_path: PathBuf,
    items: &mut Vec<SourceItem>,
) -> Result<()> {
    let meta = fs::symlink_metadata(source)?;
    let kind = if meta.file_type().is_symlink() {
        SourceKind::Symlink
    } else if meta.is_dir() {
        SourceKind::Dir
    } else {
        SourceKind::File
    };
    items.push(SourceItem {
        source_path: source.to_path_buf(),
        archive_path: archive_path.clone(),
        kind,
    });

    if kind == SourceKind::Dir {
        let mut children = fs::read_dir(source)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        children.sort();
        for child in children {
            if let Some(name) = child.file_name() {
                let child_archive = archive_path.join(name);
                collect_source_item_recursive(&child, child_archive, items)?;
            }
        }
    }
    Ok(())
}

/// 아카이브 내부 경로 문자열 ('/' 구분)
fn archive_entry_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(v) => Some(v.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn write_zip(
    file: File,
    output_path: &Path,
    items: &[SourceItem],
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let mut writer = ZipWriter::new(file);
    let base_options = ZipFileOptions::default().compression_method(CompressionMethod::Deflated);

    for item in items {
        if control.checkpoint().is_err() {
            summary.cancelled = true;
            break;
        }

        let mut name = archive_entry_name(&item.archive_path);
        let options = match unix_mode(&item.source_path) {
            Some(mode) => base_options.unix_permissions(mode),
            None => base_options,
        };
        let result = match item.kind {
            SourceKind::Dir => {
                name.push('/');
                writer.add_directory(name.clone(), options).map_err(|e| e.to_string())
            }
            SourceKind::Symlink => fs::read_link(&item.source_path)
                .map_err(|e| e.to_string())
                .and_then(|target| {
                    writer
                        .add_symlink(name.clone(), target.to_string_lossy(), options)
                        .map_err(|e| e.to_string())
                }),
            SourceKind::File => (|| -> std::result::Result<(), String> {
                writer
                    .start_file(name.clone(), options)
                    .map_err(|e| e.to_string())?;
                let mut src = File::open(&item.source_path).map_err(|e| e.to_string())?;
                io::copy(&mut src, &mut writer).map_err(|e| e.to_string())?;
                Ok(())
            })(),
        };
        match result {
            Ok(()) => summary.entries += 1,
            Err(e) => summary.fail(&name, e),
        }
    }

    writer
        .finish()
        .map_err(|e| TwinPaneError::ArchiveCreateFailed {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(())
}

fn append_tar_items<W: Write>(
    builder: &mut TarBuilder<W>,
    items: &[SourceItem],
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) {
    builder.follow_symlinks(false);
    for item in items {
        if control.checkpoint().is_err() {
            summary.cancelled = true;
            return;
        }

        let name = archive_entry_name(&item.archive_path);
        let result = match item.kind {
            SourceKind::Dir => builder.append_dir(&name, &item.source_path),
            SourceKind::File | SourceKind::Symlink => {
                builder.append_path_with_name(&item.source_path, &name)
            }
        };
        match result {
            Ok(()) => summary.entries += 1,
            Err(e) => summary.fail(&name, e),
        }
    }
}

fn create_7z(
    sources: &[PathBuf],
    output_path: &Path,
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    if control.checkpoint().is_err() {
        summary.cancelled = true;
        return Ok(());
    }

    // sevenz는 디렉토리 하나를 통째로 압축하므로 대상들을 임시 디렉토리에 모은다
    let staging = tempfile::Builder::new().prefix("twinpane-7z-").tempdir()?;
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        copy_path_recursive(source, &staging.path().join(name), control)?;
        if control.is_killed() {
            summary.cancelled = true;
            return Ok(());
        }
    }

    sevenz_rust2::compress_to_path(staging.path(), output_path).map_err(|e| {
        TwinPaneError::ArchiveCreateFailed {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    Ok(())
}

fn copy_path_recursive(src: &Path, dest: &Path, control: &WorkerControl) -> Result<()> {
    if control.checkpoint().is_err() {
        return Ok(());
    }
    let meta = fs::symlink_metadata(src)?;
    if meta.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_path_recursive(&entry.path(), &dest.join(entry.file_name()), control)?;
        }
        return Ok(());
    }
    if meta.file_type().is_symlink() {
        #[cfg(unix)]
        std::os::unix::fs::symlink(fs::read_link(src)?, dest)?;
        return Ok(());
    }
    fs::copy(src, dest)?;
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::symlink_metadata(path)
        .ok()
        .map(|meta| meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> Option<u32> {
    None
}

/// 기존 항목 정리. `false`면 이 항목은 건너뛴다.
fn clear_destination(
    dest_path: &Path,
    is_dir: bool,
    name: &str,
    summary: &mut ArchiveSummary,
) -> bool {
    let Ok(meta) = fs::symlink_metadata(dest_path) else {
        if let Some(parent) = dest_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                summary.fail(name, e);
                return false;
            }
        }
        return true;
    };
    if is_dir && meta.is_dir() {
        return true;
    }
    let removed = if meta.is_dir() {
        fs::remove_dir_all(dest_path)
    } else {
        fs::remove_file(dest_path)
    };
    match removed {
        Ok(()) => true,
        Err(e) => {
            summary.fail(name, e);
            false
        }
    }
}

fn extract_zip(
    file: File,
    archive_path: &Path,
    dest_dir: &Path,
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let extract_failed = |reason: String| TwinPaneError::ArchiveExtractFailed {
        path: archive_path.to_path_buf(),
        reason,
    };
    let mut archive = ZipArchive::new(file).map_err(|e| extract_failed(e.to_string()))?;

    for idx in 0..archive.len() {
        if control.checkpoint().is_err() {
            summary.cancelled = true;
            return Ok(());
        }

        let mut entry = archive
            .by_index(idx)
            .map_err(|e| extract_failed(e.to_string()))?;
        let name = entry.name().to_string();
        let Some(dest_path) = safe_extract_path(dest_dir, Path::new(&name)) else {
            summary.fail(&name, "blocked unsafe path");
            continue;
        };
        let is_dir = entry.is_dir();
        if !clear_destination(&dest_path, is_dir, &name, summary) {
            continue;
        }

        let mode = entry.unix_mode();
        let is_symlink = mode.is_some_and(|m| m & 0o170000 == 0o120000);
        let result = if is_dir {
            fs::create_dir_all(&dest_path)
        } else if is_symlink {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .and_then(|_| make_symlink(Path::new(&target), &dest_path))
        } else {
            File::create(&dest_path).and_then(|mut out| io::copy(&mut entry, &mut out).map(|_| ()))
        };
        if let Err(e) = result {
            summary.fail(&name, e);
            continue;
        }
        if !is_symlink {
            if let Some(mode) = mode {
                set_mode(&dest_path, mode);
            }
        }
        summary.entries += 1;
    }
    Ok(())
}

fn extract_tar_like<R: Read>(
    mut archive: TarArchive<R>,
    dest_dir: &Path,
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    for entry_result in archive.entries()? {
        if control.checkpoint().is_err() {
            summary.cancelled = true;
            return Ok(());
        }

        let mut entry = match entry_result {
            Ok(v) => v,
            Err(e) => {
                summary.errors.push(e.to_string());
                continue;
            }
        };
        let path_buf = match entry.path() {
            Ok(v) => v.into_owned(),
            Err(e) => {
                summary.errors.push(e.to_string());
                continue;
            }
        };
        let name = archive_entry_name(&path_buf);
        let Some(dest_path) = safe_extract_path(dest_dir, &path_buf) else {
            summary.fail(&name, "blocked unsafe path");
            continue;
        };
        let is_dir = entry.header().entry_type().is_dir();
        if !clear_destination(&dest_path, is_dir, &name, summary) {
            continue;
        }

        match entry.unpack_in(dest_dir) {
            Ok(true) => summary.entries += 1,
            Ok(false) => summary.fail(&name, "blocked unsafe path"),
            Err(e) => summary.fail(&name, e),
        }
    }
    Ok(())
}

fn extract_7z(
    file: File,
    archive_path: &Path,
    dest_dir: &Path,
    control: &WorkerControl,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let mut extract_fn = |entry: &sevenz_rust2::SevenZArchiveEntry,
                          reader: &mut dyn Read,
                          _output_path: &PathBuf|
     -> std::result::Result<bool, sevenz_rust2::Error> {
        if control.checkpoint().is_err() {
            summary.cancelled = true;
            return Ok(false);
        }

        let name = entry.name.clone();
        let Some(dest_path) = safe_extract_path(dest_dir, Path::new(&name)) else {
            summary.fail(&name, "blocked unsafe path");
            return Ok(true);
        };
        if !clear_destination(&dest_path, entry.is_directory, &name, summary) {
            return Ok(true);
        }

        let result = if entry.is_directory {
            fs::create_dir_all(&dest_path)
        } else {
            File::create(&dest_path).and_then(|mut out| io::copy(reader, &mut out).map(|_| ()))
        };
        match result {
            Ok(()) => summary.entries += 1,
            Err(e) => summary.fail(&name, e),
        }
        Ok(true)
    };

    sevenz_rust2::decompress_with_extract_fn(file, dest_dir, &mut extract_fn).map_err(|e| {
        TwinPaneError::ArchiveExtractFailed {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

/// 아카이브 내부 경로를 `dest_root` 아래 경로로 변환 (밖으로 나가는 경로는 거부)
pub fn sanitize_extract_path(dest_root: &Path, raw_path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for comp in raw_path.components() {
        match comp {
            Component::Normal(v) => clean.push(v),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    let out = dest_root.join(clean);
    if out.starts_with(dest_root) {
        Some(out)
    } else {
        None
    }
}

/// `sanitize_extract_path`에 더해, `dest_root`와 대상 사이에 심볼릭 링크가 끼어 있으면 거부
///
/// 앞서 풀린 링크를 거쳐 `dest_root` 밖에 쓰는 것을 막는다.
fn safe_extract_path(dest_root: &Path, raw_path: &Path) -> Option<PathBuf> {
    let out = sanitize_extract_path(dest_root, raw_path)?;
    let relative = out.strip_prefix(dest_root).ok()?;
    let mut current = dest_root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(comp) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(comp);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return None,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn prepare_sample_tree(base: &Path) -> PathBuf {
        let root = base.join("photos");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("alpha.txt"), b"alpha").unwrap();
        fs::write(root.join("nested").join("beta.txt"), b"beta").unwrap();
        root
    }

    fn roundtrip_contents(file_name: &str) {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        let archive = temp.path().join(file_name);
        let control = WorkerControl::new();

        let created = create_archive_from_contents(&root, &archive, &control).unwrap();
        assert!(created.errors.is_empty(), "{:?}", created.errors);
        assert!(!created.cancelled);

        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        let extracted = extract_archive(&archive, &dest, &control).unwrap();
        assert!(extracted.errors.is_empty(), "{:?}", extracted.errors);
        assert_eq!(fs::read(dest.join("alpha.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dest.join("nested/beta.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_detect_archive_format() {
        let cases = [
            ("a.zip", Some(ArchiveFormat::Zip)),
            ("a.JAR", Some(ArchiveFormat::Jar)),
            ("a.war", Some(ArchiveFormat::War)),
            ("a.tar", Some(ArchiveFormat::Tar)),
            ("a.tar.gz", Some(ArchiveFormat::TarGz)),
            ("a.tgz", Some(ArchiveFormat::TarGz)),
            ("a.tar.zst", Some(ArchiveFormat::TarZst)),
            ("a.tzst", Some(ArchiveFormat::TarZst)),
            ("a.7z", Some(ArchiveFormat::SevenZ)),
            ("notes.txt", None),
        ];
        for (name, expected) in cases {
            assert_eq!(
                detect_archive_format(&Path::new("/tmp").join(name)),
                expected,
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_extension_is_detected_back() {
        for format in [
            ArchiveFormat::Zip,
            ArchiveFormat::Tar,
            ArchiveFormat::TarGz,
            ArchiveFormat::TarZst,
            ArchiveFormat::SevenZ,
        ] {
            let path = PathBuf::from(format!("/tmp/x{}", format.extension()));
            assert_eq!(detect_archive_format(&path), Some(format));
        }
    }

    #[test]
    fn test_sanitize_extract_path_blocks_unsafe_paths() {
        let root = PathBuf::from("/tmp/base");
        assert_eq!(
            sanitize_extract_path(&root, Path::new("./ok/file.txt")),
            Some(PathBuf::from("/tmp/base/ok/file.txt"))
        );
        assert!(sanitize_extract_path(&root, Path::new("../evil")).is_none());
        assert!(sanitize_extract_path(&root, Path::new("/abs/path")).is_none());
        assert!(sanitize_extract_path(&root, Path::new(".")).is_none());
    }

    #[test]
    fn test_zip_roundtrip() {
        roundtrip_contents("sample.zip");
    }

    #[test]
    fn test_tar_gz_roundtrip() {
        roundtrip_contents("sample.tar.gz");
    }

    #[test]
    fn test_tar_zst_roundtrip() {
        roundtrip_contents("sample.tar.zst");
    }

    #[test]
    fn test_7z_roundtrip() {
        roundtrip_contents("sample.7z");
    }

    #[test]
    fn test_create_archive_keeps_directory_name() {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        let archive = temp.path().join("photos.tar");
        let control = WorkerControl::new();

        create_archive(&[root], &archive, &control).unwrap();
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        extract_archive(&archive, &dest, &control).unwrap();
        assert!(dest.join("photos/nested/beta.txt").is_file());
    }

    #[test]
    fn test_create_refuses_existing_output() {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        let archive = temp.path().join("exists.zip");
        fs::write(&archive, b"").unwrap();

        match create_archive(&[root], &archive, &WorkerControl::new()) {
            Err(TwinPaneError::ArchiveCreateFailed { reason, .. }) => {
                assert!(reason.contains("already exists"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extract_overwrites_existing_file() {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        let archive = temp.path().join("sample.zip");
        let control = WorkerControl::new();
        create_archive_from_contents(&root, &archive, &control).unwrap();

        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("alpha.txt"), b"old contents").unwrap();
        extract_archive(&archive, &dest, &control).unwrap();
        assert_eq!(fs::read(dest.join("alpha.txt")).unwrap(), b"alpha");
    }

    #[test]
    fn test_extract_zip_blocks_zip_slip() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("evil.zip");
        let mut writer = ZipWriter::new(File::create(&archive).unwrap());
        writer
            .start_file("../escape.txt", ZipFileOptions::default())
            .unwrap();
        writer.write_all(b"escape").unwrap();
        writer.start_file("ok.txt", ZipFileOptions::default()).unwrap();
        writer.write_all(b"ok").unwrap();
        writer.finish().unwrap();

        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        let summary = extract_archive(&archive, &dest, &WorkerControl::new()).unwrap();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(!temp.path().join("escape.txt").exists());
        assert!(dest.join("ok.txt").exists());
    }

    #[test]
    fn test_killed_control_stops_before_first_entry() {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        let archive = temp.path().join("sample.tar");
        create_archive_from_contents(&root, &archive, &WorkerControl::new()).unwrap();

        let control = WorkerControl::new();
        control.kill();
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        let summary = extract_archive(&archive, &dest, &control).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.entries, 0);
    }

    #[test]
    fn test_unsupported_format() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("file.rar");
        fs::write(&path, b"").unwrap();
        assert!(matches!(
            extract_archive(&path, temp.path(), &WorkerControl::new()),
            Err(TwinPaneError::ArchiveUnsupportedFormat { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_keeps_symlinks() {
        let temp = tempdir().unwrap();
        let root = prepare_sample_tree(temp.path());
        std::os::unix::fs::symlink("alpha.txt", root.join("link")).unwrap();
        let archive = temp.path().join("links.tar");
        let control = WorkerControl::new();
        create_archive_from_contents(&root, &archive, &control).unwrap();

        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        extract_archive(&archive, &dest, &control).unwrap();
        let meta = fs::symlink_metadata(dest.join("link")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(dest.join("link")).unwrap(), Path::new("alpha.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_zip_does_not_write_through_symlink() {
        let temp = tempdir().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let archive = temp.path().join("links.zip");
        let mut writer = ZipWriter::new(File::create(&archive).unwrap());
        writer
            .add_symlink("link", outside.to_string_lossy(), ZipFileOptions::default())
            .unwrap();
        writer
            .start_file("link/pwned.txt", ZipFileOptions::default())
            .unwrap();
        writer.write_all(b"pwned").unwrap();
        writer.finish().unwrap();

        let dest = temp.path().join("mount");
        fs::create_dir(&dest).unwrap();
        let summary = extract_archive(&archive, &dest, &WorkerControl::new()).unwrap();
        assert_eq!(summary.errors.len(), 1, "{:?}", summary.errors);
        assert!(!outside.join("pwned.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_does_not_write_through_symlink() {
        let temp = tempdir().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let archive = temp.path().join("links.tar");
        let mut builder = TarBuilder::new(File::create(&archive).unwrap());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder.append_link(&mut header, "link", &outside).unwrap();
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "link/pwned.txt", &b"pwned"[..])
            .unwrap();
        builder.finish().unwrap();

        let dest = temp.path().join("mount");
        fs::create_dir(&dest).unwrap();
        let summary = extract_archive(&archive, &dest, &WorkerControl::new()).unwrap();
        assert_eq!(summary.errors.len(), 1, "{:?}", summary.errors);
        assert!(!outside.join("pwned.txt").exists());
        assert!(fs::symlink_metadata(dest.join("link"))
            .unwrap()
            .file_type()
            .is_symlink());
    }
}
