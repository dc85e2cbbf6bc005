//! 듀얼 패널 파일 관리자의 백그라운드 작업 엔진과 아카이브 가상 디렉토리

pub mod app;
pub mod core;
pub mod models;
pub mod system;
pub mod ui;
pub mod utils;

pub use app::config::Options;
pub use app::AppContext;
pub use utils::error::{Result, TwinPaneError};
