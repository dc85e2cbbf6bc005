//! 취소와 대기 루프
//!
//! 결과를 기다리는 동안 매 반복마다 취소 키 확인, 회전 표시, 채널 확인을
//! 순서대로 수행한다. 취소 키가 눌리면 worker를 먼저 일시정지한 뒤 묻는다.

use crate::core::channel::Reply;
use crate::core::worker::Worker;
use crate::models::operation::ItemResult;
use crate::ui::{ConfirmAnswer, UiBridge};
use tracing::info;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// 대기 중 회전 표시 (진행률과 무관하게 계속 돈다)
#[derive(Debug, Default)]
pub struct BusyIndicator {
    tick: usize,
}

impl BusyIndicator {
    pub fn next_frame(&mut self) -> char {
        let frame = SPINNER[self.tick % SPINNER.len()];
        self.tick = self.tick.wrapping_add(1);
        frame
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wait {
    Result(ItemResult),
    /// 사용자가 중지를 확인함. worker는 일시정지 상태로 남아 있다.
    Stopped,
}

/// 취소 키 처리: 일시정지 → 확인 → 재개 또는 중지
///
/// `true`면 중지가 확인된 것. 호출자가 worker를 kill 해야 한다.
pub fn check_cancel(ui: &mut dyn UiBridge, worker: &Worker, title: &str) -> bool {
    if !ui.poll_cancel() {
        return false;
    }
    worker.control().pause();
    info!(title, "worker paused, asking to stop");

    let question = format!("Stop \"{}\"", title);
    match ui.prompt_confirm("Stop process", &question, true) {
        ConfirmAnswer::Yes => {
            info!(title, "stopped by user");
            true
        }
        ConfirmAnswer::No | ConfirmAnswer::Cancel => {
            worker.control().resume();
            info!(title, "worker resumed");
            false
        }
    }
}

/// 보낸 요청의 결과를 기다림
///
/// 전송/해석 실패는 해당 항목의 실패로 바꿔서 돌려준다.
pub fn wait_for_result(
    ui: &mut dyn UiBridge,
    worker: &mut Worker,
    title: &str,
    indicator: &mut BusyIndicator,
) -> Wait {
    loop {
        if check_cancel(ui, worker, title) {
            return Wait::Stopped;
        }
        ui.tick_busy(indicator.next_frame());
        match worker.try_receive() {
            Ok(Some(Reply::Result(result))) => return Wait::Result(result),
            Ok(Some(Reply::Error(message))) => return Wait::Result(ItemResult::failed(message, 0)),
            Ok(None) => continue,
            Err(e) => return Wait::Result(ItemResult::failed(e.to_string(), e.os_code())),
        }
    }
}
