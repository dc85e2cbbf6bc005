//! 로그 초기화
//!
//! 터미널 UI가 stdout을 점유하므로 로그는 일 단위 롤링 파일로만 남긴다.

use crate::app::config::LogOptions;
use crate::utils::error::{Result, TwinPaneError};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// 환경 변수로 로그 레벨 재정의
pub const LOG_ENV: &str = "TWINPANE_LOG";

const LOG_FILE_PREFIX: &str = "twinpane.log";

/// 로그 디렉토리 (설정값 없으면 캐시 디렉토리)
pub fn log_directory(options: &LogOptions) -> PathBuf {
    options.directory.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("twinpane")
    })
}

/// 전역 subscriber 설치
///
/// 반환된 guard는 프로그램 종료 시까지 유지해야 버퍼가 flush된다.
pub fn init_logging(options: &LogOptions) -> Result<WorkerGuard> {
    let directory = log_directory(options);
    std::fs::create_dir_all(&directory)?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| TwinPaneError::Config(format!("invalid log level: {}", e)))?;

    let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| TwinPaneError::Config(format!("logger already installed: {}", e)))?;

    Ok(guard)
}
