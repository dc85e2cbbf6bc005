//! Worker 실행 컨텍스트
//!
//! 작업 한 번마다 전용 스레드를 띄운다. 작업 함수의 panic은 worker 안에서
//! 잡아 실패 결과로 돌려주므로 UI 스레드까지 전파되지 않는다.

use crate::core::channel::{self, Reply, Request, SupervisorEnd, WorkerEnd};
use crate::models::operation::{ItemResult, WorkItem};
use crate::utils::error::{Result, TwinPaneError};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const WORKER_THREAD_NAME: &str = "twinpane-worker";

/// 작업 항목 하나를 처리하는 함수 (worker 스레드에서 실행)
pub type WorkFn = Box<dyn Fn(&WorkItem, &WorkerControl) -> ItemResult + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Killed,
}

/// kill 이후 checkpoint가 돌려주는 값
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Killed;

impl fmt::Display for Killed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stopped by user")
    }
}

impl std::error::Error for Killed {}

/// pause/resume/kill 제어 블록
///
/// 긴 작업은 syscall 사이마다 `checkpoint()`를 호출한다. 일시정지 중이면
/// 그 자리에서 대기하고, kill 되었으면 `Err(Killed)`를 돌려준다.
#[derive(Clone)]
pub struct WorkerControl {
    inner: Arc<(Mutex<RunState>, Condvar)>,
}

impl WorkerControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(RunState::Running), Condvar::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, next: RunState) {
        let mut state = self.lock();
        // Killed는 되돌릴 수 없음
        if *state != RunState::Killed {
            *state = next;
        }
        self.inner.1.notify_all();
    }

    pub fn pause(&self) {
        self.set(RunState::Paused);
    }

    pub fn resume(&self) {
        self.set(RunState::Running);
    }

    pub fn kill(&self) {
        self.set(RunState::Killed);
    }

    pub fn state(&self) -> RunState {
        *self.lock()
    }

    pub fn is_killed(&self) -> bool {
        self.state() == RunState::Killed
    }

    pub fn checkpoint(&self) -> std::result::Result<(), Killed> {
        let mut state = self.lock();
        while *state == RunState::Paused {
            state = self
                .inner
                .1
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
        if *state == RunState::Killed {
            Err(Killed)
        } else {
            Ok(())
        }
    }
}

impl Default for WorkerControl {
    fn default() -> Self {
        Self::new()
    }
}

/// 실행 중인 worker 핸들 (supervisor 쪽)
pub struct Worker {
    channel: Option<SupervisorEnd>,
    control: WorkerControl,
    handle: Option<JoinHandle<()>>,
    kill_grace: Duration,
}

impl Worker {
    /// worker 스레드 시작
    pub fn spawn(work: WorkFn, poll_interval: Duration, kill_grace: Duration) -> Result<Self> {
        let (supervisor, worker_end) = channel::pair(poll_interval);
        let control = WorkerControl::new();
        let worker_control = control.clone();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || serve(&worker_end, &worker_control, &work))
            .map_err(|e| TwinPaneError::WorkerSpawn {
                reason: e.to_string(),
            })?;
        debug!("worker started");

        Ok(Self {
            channel: Some(supervisor),
            control,
            handle: Some(handle),
            kill_grace,
        })
    }

    pub fn send(&mut self, request: &Request) -> Result<()> {
        match self.channel.as_mut() {
            Some(channel) => channel.send(request),
            None => Err(TwinPaneError::ChannelClosed),
        }
    }

    pub fn try_receive(&mut self) -> Result<Option<Reply>> {
        match self.channel.as_mut() {
            Some(channel) => channel.try_receive(),
            None => Err(TwinPaneError::ChannelClosed),
        }
    }

    pub fn control(&self) -> &WorkerControl {
        &self.control
    }

    /// quit 전송 후 종료 대기
    pub fn finish(mut self) {
        self.shutdown(false);
    }

    /// 강제 종료. 진행 중이던 항목의 결과는 버린다.
    pub fn kill(mut self) {
        self.shutdown(true);
    }

    fn shutdown(&mut self, kill: bool) {
        if kill {
            self.control.kill();
        }
        if let Some(mut channel) = self.channel.take() {
            if !kill && !channel.is_outstanding() {
                let _ = channel.send(&Request::Quit);
            }
            channel.close();
        }
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + self.kill_grace;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("worker thread panicked outside of a work item");
            }
            debug!("worker stopped");
        } else {
            // 블로킹 syscall 중이면 스레드를 떼어내고 계속 진행
            warn!(
                grace_ms = self.kill_grace.as_millis() as u64,
                "worker did not stop in time, detaching"
            );
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown(true);
        }
    }
}

/// worker 스레드 본체
fn serve(end: &WorkerEnd, control: &WorkerControl, work: &WorkFn) {
    loop {
        let request = match end.recv() {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                if end.reply(&Reply::Error(e.to_string())).is_err() {
                    break;
                }
                continue;
            }
        };

        let item = match request {
            Request::Exec(item) => item,
            Request::Quit => break,
        };

        if control.checkpoint().is_err() {
            break;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| work(&item, control)))
            .unwrap_or_else(|payload| ItemResult::failed(panic_message(&*payload), -1));
        if control.is_killed() {
            break;
        }
        if end.reply(&Reply::Result(result)).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_string()
    }
}
