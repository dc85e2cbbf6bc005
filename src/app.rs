//! 실행 컨텍스트
//!
//! 옵션과 UI 브리지를 한데 묶어 작업 실행기와 vfs에 넘겨준다.

use crate::app::config::Options;
use crate::core::runner::Runner;
use crate::ui::UiBridge;

pub mod config;
mod operations;


pub use operations::resolve_destination;

pub struct AppContext<U: UiBridge> {
    pub options: Options,
    pub ui: U,
}

impl<U: UiBridge> AppContext<U> {
    pub fn new(options: Options, ui: U) -> Self {
        Self { options, ui }
    }

    /// 현재 옵션으로 실행기 생성
    pub fn runner(&mut self) -> Runner<'_> {
        Runner::new(&mut self.ui, &self.options)
    }
}
