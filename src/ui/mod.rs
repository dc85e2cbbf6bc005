// UI Layer
pub mod terminal;

pub use terminal::TerminalUi;

use crate::models::operation::ProgressSnapshot;

/// 예/아니오/취소 확인 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAnswer {
    Yes,
    No,
    Cancel,
}

/// 예/모두/아니오/중지 확인 결과 (삭제)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAllAnswer {
    Yes,
    All,
    No,
    Stop,
}

/// 예/모두/아니오/모두 아니오/중지 확인 결과 (덮어쓰기)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAllNoneAnswer {
    Yes,
    All,
    No,
    None,
    Stop,
}

/// 작업 엔진이 사용하는 UI 쪽 인터페이스
///
/// 프롬프트는 모두 동기식이다. 프롬프트가 떠 있는 동안 runner는 멈추지만
/// worker는 멈추지 않는다 (중지 확인은 예외: 먼저 worker를 일시정지한다).
pub trait UiBridge {
    fn prompt_confirm(&mut self, title: &str, question: &str, default_yes: bool)
        -> ConfirmAnswer;

    fn prompt_confirm_all(
        &mut self,
        title: &str,
        question: &str,
        default_yes: bool,
    ) -> ConfirmAllAnswer;

    fn prompt_confirm_all_none(
        &mut self,
        title: &str,
        question: &str,
        default_yes: bool,
    ) -> ConfirmAllNoneAnswer;

    /// 문자열 입력. 취소하면 None
    fn prompt_text(&mut self, title: &str, help: &str, default: &str) -> Option<String>;

    fn report_error(&mut self, message: &str);

    fn redraw_progress(&mut self, progress: &ProgressSnapshot);

    /// 취소 키가 눌렸는지 (블로킹하지 않음)
    fn poll_cancel(&mut self) -> bool;

    /// 대기 중 회전 표시
    fn tick_busy(&mut self, frame: char);

    /// 작업 종료 후 진행 창 정리
    fn finish_progress(&mut self) {}
}
