//! 작업 대상 집합 (ItemSet)
//!
//! 사용자가 선택한 항목을 재귀적으로 펼친 목록. 심볼릭 링크는 따라가지 않고
//! 크기 0으로 기록하며, 탐색 중 발생한 에러는 항목별로 모아 둔다.

use crate::models::operation::io_message;
use crate::utils::error::{Result, TwinPaneError};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 펼쳐진 항목 한 건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    /// 절대 경로
    pub path: PathBuf,
    /// 바이트 크기 (심볼릭 링크는 0)
    pub size: u64,
}

/// 탐색 중 stat/read_dir 실패한 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    pub path: PathBuf,
    pub code: i32,
    pub message: String,
}

impl WalkError {
    fn from_io(path: &Path, error: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            code: error.raw_os_error().unwrap_or(0),
            message: io_message(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemSet {
    base_path: PathBuf,
    /// 사용자가 직접 고른 최상위 항목 수
    selected: usize,
    entries: Vec<ItemEntry>,
    errors: Vec<WalkError>,
    total_size: u64,
}

impl ItemSet {
    /// 선택 항목(base 기준 상대 경로)을 펼쳐서 생성
    ///
    /// 파일명을 UTF-8로 표현할 수 없으면 아무 작업도 하지 않고 `Expansion` 에러.
    pub fn build<P: AsRef<Path>>(paths: &[P], base_path: &Path) -> Result<Self> {
        if !base_path.is_dir() {
            return Err(TwinPaneError::NotADirectory {
                path: base_path.to_path_buf(),
            });
        }

        let mut set = Self {
            base_path: base_path.to_path_buf(),
            selected: paths.len(),
            entries: Vec::new(),
            errors: Vec::new(),
            total_size: 0,
        };

        for relative in paths {
            let path = base_path.join(relative.as_ref());
            ensure_encodable(&path)?;

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    set.errors.push(WalkError::from_io(&path, &e));
                    continue;
                }
            };

            if metadata.file_type().is_symlink() {
                set.entries.push(ItemEntry { path, size: 0 });
            } else {
                set.entries.push(ItemEntry {
                    path: path.clone(),
                    size: metadata.len(),
                });
                if metadata.is_dir() {
                    set.walk(&path)?;
                }
            }
        }

        set.recompute();
        Ok(set)
    }

    /// 디렉토리 재귀 탐색 (링크 디렉토리는 들어가지 않음)
    fn walk(&mut self, dir: &Path) -> Result<()> {
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                self.errors.push(WalkError::from_io(dir, &e));
                return Ok(());
            }
        };

        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.errors.push(WalkError::from_io(dir, &e));
                    continue;
                }
            };
            let path = entry.path();
            ensure_encodable(&path)?;

            match fs::symlink_metadata(&path) {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    self.entries.push(ItemEntry { path, size: 0 });
                }
                Ok(metadata) => {
                    self.entries.push(ItemEntry {
                        path: path.clone(),
                        size: metadata.len(),
                    });
                    if metadata.is_dir() {
                        self.walk(&path)?;
                    }
                }
                Err(e) => self.errors.push(WalkError::from_io(&path, &e)),
            }
        }
        Ok(())
    }

    fn recompute(&mut self) {
        self.total_size = self.entries.iter().map(|e| e.size).sum();
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 최상위 선택 항목 수
    pub fn selected_count(&self) -> usize {
        self.selected
    }

    /// 펼쳐진 전체 항목 수
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    /// 전체 크기 (0이면 1)
    pub fn total_size(&self) -> u64 {
        self.total_size.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 탐색 에러 (경로순)
    pub fn errors(&self) -> Vec<WalkError> {
        let mut errors = self.errors.clone();
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        errors
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// 경로순 정렬 순회
    ///
    /// `reverse`면 하위 항목이 상위 디렉토리보다 먼저 나온다 (삭제 순서).
    pub fn iter(&self, reverse: bool) -> impl Iterator<Item = &ItemEntry> {
        let mut sorted: Vec<&ItemEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        if reverse {
            sorted.reverse();
        }
        sorted.into_iter()
    }

    /// 주어진 경로 항목 제거 후 합계 재계산
    pub fn remove_entries(&mut self, paths: &[PathBuf]) {
        let targets: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let before = self.entries.len();
        self.entries.retain(|e| !targets.contains(e.path.as_path()));
        let removed = before - self.entries.len();
        self.selected = self.selected.saturating_sub(removed);
        self.recompute();
    }

    /// 진행 표시용 상대 경로
    pub fn label(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_path)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

fn ensure_encodable(path: &Path) -> Result<()> {
    if path.to_str().is_none() {
        return Err(TwinPaneError::Expansion {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
