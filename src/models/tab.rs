use crate::system::archive::ArchiveFormat;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 가상 디렉토리 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsKind {
    /// 아카이브를 임시 디렉토리에 푼 것
    Archive(ArchiveFormat),
    /// 흩어진 선택 항목을 임시 디렉토리에 모은 것
    Panelize,
}

/// 탭에 연결된 가상 디렉토리
///
/// 임시 디렉토리는 이 값이 소유한다. drop 되면 함께 지워진다.
#[derive(Debug)]
pub struct VfsMount {
    kind: VfsKind,
    temp_dir: TempDir,
    /// 아카이브 파일 경로 또는 panelize를 시작한 디렉토리
    origin: PathBuf,
}

impl VfsMount {
    pub fn new(kind: VfsKind, temp_dir: TempDir, origin: PathBuf) -> Self {
        Self {
            kind,
            temp_dir,
            origin,
        }
    }

    pub fn kind(&self) -> VfsKind {
        self.kind
    }

    /// 임시 디렉토리 (가상 트리의 실제 위치)
    pub fn base(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// `<origin>#vfs`
    pub fn virtual_base(&self) -> PathBuf {
        let mut base: OsString = self.origin.clone().into_os_string();
        base.push("#vfs");
        PathBuf::from(base)
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.base())
    }

    /// 임시 트리 안의 경로를 화면 표시용 가상 경로로
    pub fn virtual_path(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(self.base()) {
            Ok(rest) if rest.as_os_str().is_empty() => self.virtual_base(),
            Ok(rest) => self.virtual_base().join(rest),
            Err(_) => path.to_path_buf(),
        }
    }

    /// 가상 경로를 임시 트리 안의 실제 경로로
    pub fn real_path(&self, virtual_path: &Path) -> Option<PathBuf> {
        let rest = virtual_path.strip_prefix(self.virtual_base()).ok()?;
        Some(self.base().join(rest))
    }

    /// 마운트 해제 후 탭이 돌아갈 위치와 커서 대상
    pub fn exit_location(&self) -> (PathBuf, Option<String>) {
        match self.kind {
            VfsKind::Archive(_) => {
                let parent = self
                    .origin
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("/"));
                let name = self
                    .origin
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string());
                (parent, name)
            }
            VfsKind::Panelize => (self.origin.clone(), None),
        }
    }

    /// 임시 디렉토리를 넘겨받음 (정리 시점을 호출자가 정함)
    pub fn into_temp_dir(self) -> TempDir {
        self.temp_dir
    }
}

/// 브라우저 탭: 현재 위치와 (있다면) 가상 디렉토리
#[derive(Debug)]
pub struct Tab {
    path: PathBuf,
    /// 다시 그릴 때 커서를 둘 항목 이름
    cursor: Option<String>,
    vfs: Option<VfsMount>,
}

impl Tab {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cursor: None,
            vfs: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursor_target(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn vfs(&self) -> Option<&VfsMount> {
        self.vfs.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.vfs.is_some()
    }

    /// 경로만 바꿈 (마운트 처리는 호출자 몫)
    pub fn set_path(&mut self, path: PathBuf, cursor: Option<String>) {
        self.path = path;
        self.cursor = cursor;
    }

    /// 현재 위치가 마운트 루트인지
    pub fn at_mount_root(&self) -> bool {
        self.vfs.as_ref().is_some_and(|vfs| vfs.base() == self.path)
    }

    /// `target`으로 가면 가상 디렉토리를 벗어나는지
    pub fn leaves_mount(&self, target: &Path) -> bool {
        self.vfs.as_ref().is_some_and(|vfs| !vfs.contains(target))
    }

    /// 화면 표시용 경로 (가상 디렉토리 안이면 `<archive>#vfs/...`)
    pub fn display_path(&self) -> PathBuf {
        match &self.vfs {
            Some(vfs) => vfs.virtual_path(&self.path),
            None => self.path.clone(),
        }
    }

    /// 마운트 연결. 탭은 임시 트리 안 `relative` 위치로 이동한다.
    pub(crate) fn attach(&mut self, mount: VfsMount, relative: &Path) {
        self.path = mount.base().join(relative);
        self.cursor = None;
        self.vfs = Some(mount);
    }

    /// 마운트 분리. 탭은 마운트 이전 위치로 돌아간다.
    pub(crate) fn detach(&mut self) -> Option<VfsMount> {
        let mount = self.vfs.take()?;
        let (path, cursor) = mount.exit_location();
        self.path = path;
        self.cursor = cursor;
        Some(mount)
    }
}
