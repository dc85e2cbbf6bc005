use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::path::Path;

/// 파일 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// 디렉토리
    Directory,
    /// 디렉토리를 가리키는 심볼릭 링크
    LinkToDirectory,
    /// 심볼릭 링크
    Symlink,
    /// 대상이 없는 심볼릭 링크
    BrokenLink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    /// 실행 파일
    Executable,
    /// 일반 파일
    File,
    Unknown,
}

impl FileType {
    /// 패널 표시용 한 글자 접미사
    pub fn marker(&self) -> char {
        match self {
            FileType::Directory => '/',
            FileType::LinkToDirectory => '~',
            FileType::Symlink => '@',
            FileType::BrokenLink => '!',
            FileType::CharDevice => '-',
            FileType::BlockDevice => '+',
            FileType::Fifo => '|',
            FileType::Socket => '#',
            FileType::Executable => '*',
            FileType::File => ' ',
            FileType::Unknown => '?',
        }
    }

    pub fn is_dir_like(&self) -> bool {
        matches!(self, FileType::Directory | FileType::LinkToDirectory)
    }

    /// 링크 자체의 메타데이터로 타입 판단 (링크는 대상까지 확인)
    pub fn classify(path: &Path, link_metadata: &Metadata) -> Self {
        let file_type = link_metadata.file_type();
        if file_type.is_dir() {
            return FileType::Directory;
        }
        if file_type.is_symlink() {
            return match fs::metadata(path) {
                Ok(target) if target.is_dir() => FileType::LinkToDirectory,
                Ok(_) => FileType::Symlink,
                Err(_) => FileType::BrokenLink,
            };
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::{FileTypeExt, PermissionsExt};
            if file_type.is_char_device() {
                return FileType::CharDevice;
            }
            if file_type.is_block_device() {
                return FileType::BlockDevice;
            }
            if file_type.is_fifo() {
                return FileType::Fifo;
            }
            if file_type.is_socket() {
                return FileType::Socket;
            }
            if file_type.is_file() && link_metadata.permissions().mode() & 0o111 != 0 {
                return FileType::Executable;
            }
        }

        if file_type.is_file() {
            FileType::File
        } else {
            FileType::Unknown
        }
    }
}

/// 디렉토리 크기 계산 결과 한 건
///
/// (타입, 권한, 소유자, 그룹, 크기, 수정 시간) 형태로 패널에 그대로 반영된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirSizeInfo {
    pub file_type: FileType,
    /// rwxr-xr-x 형식
    pub permissions: String,
    /// uid (표시 문자열)
    pub owner: String,
    /// gid (표시 문자열)
    pub group: String,
    /// 재귀 합계 (바이트)
    pub size: u64,
    /// 수정 시간 (unix epoch 초)
    pub modified: i64,
}

impl DirSizeInfo {
    /// lstat 실패 시 사용하는 자리표시 값
    pub fn unknown() -> Self {
        Self {
            file_type: FileType::Unknown,
            permissions: "---------".to_string(),
            owner: "root".to_string(),
            group: "root".to_string(),
            size: 0,
            modified: 0,
        }
    }
}
