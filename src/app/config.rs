//! 실행 옵션
//!
//! `~/.config/twinpane/config.toml` 에서 읽는다. 파일이 없으면 기본값을 쓴다.

use crate::utils::error::{Result, TwinPaneError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "twinpane";
const CONFIG_FILE_NAME: &str = "config.toml";

/// 로그 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// EnvFilter 문법 (예: "info", "twinpane=debug")
    pub level: String,
    /// 로그 파일 디렉토리 (None이면 캐시 디렉토리)
    pub directory: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// 백그라운드 작업 엔진이 참조하는 전역 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// 삭제 전 항목마다 확인
    pub confirm_delete: bool,
    /// 덮어쓰기 전 확인
    pub confirm_overwrite: bool,
    /// vfs 종료 시 아카이브 재생성 여부를 물어봄
    pub ask_rebuild_vfs: bool,
    /// 재생성 질문의 기본 답 (질문하지 않을 때는 그대로 적용)
    pub rebuild_vfs_default: bool,
    /// 백업 파일 확장자
    pub backup_extension: String,
    /// 결과 대기 루프의 sleep 간격 (ms)
    pub poll_interval_ms: u64,
    /// kill 후 worker 종료를 기다리는 최대 시간 (ms)
    pub kill_grace_ms: u64,
    /// 임시 디렉토리 루트 (None이면 시스템 기본값)
    pub temp_root: Option<PathBuf>,
    pub log: LogOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            confirm_delete: true,
            confirm_overwrite: true,
            ask_rebuild_vfs: true,
            rebuild_vfs_default: false,
            backup_extension: ".bak".to_string(),
            poll_interval_ms: 1,
            kill_grace_ms: 2000,
            temp_root: None,
            log: LogOptions::default(),
        }
    }
}

impl Options {
    /// 기본 설정 파일 경로
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// 기본 경로에서 로드 (없으면 기본값)
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// 지정 경로에서 로드. 파일이 없으면 기본값
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| TwinPaneError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// TOML로 저장 (상위 디렉토리 자동 생성)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TwinPaneError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_classic_behavior() {
        let options = Options::default();
        assert!(options.confirm_delete);
        assert!(options.confirm_overwrite);
        assert!(options.ask_rebuild_vfs);
        assert!(!options.rebuild_vfs_default);
        assert_eq!(options.backup_extension, ".bak");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let options = Options::from_toml("confirm_delete = false\n[log]\nlevel = \"debug\"\n")
            .unwrap();
        assert!(!options.confirm_delete);
        assert!(options.confirm_overwrite);
        assert_eq!(options.log.level, "debug");
        assert_eq!(options.kill_grace_ms, 2000);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let options = Options::load_from(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "confirm_delete = \"maybe\"").unwrap();
        match Options::load_from(&path) {
            Err(TwinPaneError::Config(msg)) => assert!(msg.contains("config.toml")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let options = Options {
            backup_extension: ".orig".to_string(),
            rebuild_vfs_default: true,
            ..Options::default()
        };
        options.save_to(&path).unwrap();
        assert_eq!(Options::load_from(&path).unwrap(), options);
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let options = Options {
            poll_interval_ms: 0,
            ..Options::default()
        };
        assert_eq!(options.poll_interval(), Duration::from_millis(1));
    }
}
