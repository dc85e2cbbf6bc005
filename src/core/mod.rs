// Core Layer: 백그라운드 작업 엔진
pub mod cancel;
pub mod channel;
pub mod confirm;
pub mod jobs;
pub mod runner;
pub mod worker;

pub use runner::{RunSettings, Runner};
