//! Worker 채널
//!
//! supervisor와 worker 사이의 양방향 메시지 전송. 메시지는 프레임 단위
//! JSON 문서이며, 요청 하나에 응답 하나만 허용한다 (half-duplex).

use crate::models::operation::{ItemResult, WorkItem};
use crate::utils::error::{Result, TwinPaneError};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

/// supervisor → worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "lowercase")]
pub enum Request {
    Exec(WorkItem),
    Quit,
}

/// worker → supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "lowercase")]
pub enum Reply {
    Result(ItemResult),
    /// 요청 자체를 처리할 수 없음 (알 수 없는 명령 등)
    Error(String),
}

/// 채널 쌍 생성
pub fn pair(poll_interval: Duration) -> (SupervisorEnd, WorkerEnd) {
    let (request_tx, request_rx) = mpsc::sync_channel::<Vec<u8>>(1);
    let (reply_tx, reply_rx) = mpsc::sync_channel::<Vec<u8>>(1);
    (
        SupervisorEnd {
            tx: request_tx,
            rx: reply_rx,
            outstanding: false,
            poll_interval,
        },
        WorkerEnd {
            rx: request_rx,
            tx: reply_tx,
        },
    )
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(message).map_err(|e| TwinPaneError::Transport {
        reason: e.to_string(),
    })
}

fn decode<'a, T: Deserialize<'a>>(frame: &'a [u8]) -> Result<T> {
    serde_json::from_slice(frame).map_err(|e| TwinPaneError::Transport {
        reason: format!("Error unmarshaling: {}", e),
    })
}

/// UI 쪽 끝
pub struct SupervisorEnd {
    tx: SyncSender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    /// 응답을 기다리는 exec 요청이 있음
    outstanding: bool,
    poll_interval: Duration,
}

impl SupervisorEnd {
    pub fn send(&mut self, request: &Request) -> Result<()> {
        if self.outstanding {
            return Err(TwinPaneError::ChannelBusy);
        }
        let frame = encode(request)?;
        self.tx
            .send(frame)
            .map_err(|_| TwinPaneError::ChannelClosed)?;
        if matches!(request, Request::Exec(_)) {
            self.outstanding = true;
        }
        Ok(())
    }

    /// 응답 확인 (최대 poll 간격만큼 대기)
    ///
    /// 준비된 응답이 없으면 `Ok(None)`. 해석할 수 없는 프레임이나 끊어진
    /// worker는 `Transport` 에러이며, 이 경우에도 대기 중 요청은 해제된다.
    pub fn try_receive(&mut self) -> Result<Option<Reply>> {
        match self.rx.recv_timeout(self.poll_interval) {
            Ok(frame) => {
                self.outstanding = false;
                decode::<Reply>(&frame).map(Some)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.outstanding = false;
                Err(TwinPaneError::Transport {
                    reason: "Malformed response: worker disconnected".to_string(),
                })
            }
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    pub fn close(self) {}
}

/// worker 쪽 끝
pub struct WorkerEnd {
    rx: Receiver<Vec<u8>>,
    tx: SyncSender<Vec<u8>>,
}

impl WorkerEnd {
    /// 다음 요청 대기 (블로킹). supervisor가 사라지면 `Ok(None)`
    pub fn recv(&self) -> Result<Option<Request>> {
        match self.rx.recv() {
            Ok(frame) => decode::<Request>(&frame).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn reply(&self, reply: &Reply) -> Result<()> {
        let frame = encode(reply)?;
        self.tx.send(frame).map_err(|_| TwinPaneError::ChannelClosed)
    }

    #[cfg(test)]
    pub(crate) fn send_frame(&self, frame: Vec<u8>) {
        let _ = self.tx.send(frame);
    }
}
