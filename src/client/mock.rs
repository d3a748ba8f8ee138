use crate::client::CkdbTransport;
use crate::error::{CkwebError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// 테스트용 전송 계층: cmd 이름별로 고정 응답을 돌려주고 요청을 기록한다
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<(String, u32)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cmd`로 시작하는 요청에 대한 응답 등록
    pub fn reply(self, cmd: &str, rep: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(cmd.to_string(), rep.to_string());
        self
    }

    pub fn sent(&self) -> Vec<(String, u32)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> String {
        self.sent().last().map(|(m, _)| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CkdbTransport for MockTransport {
    async fn send_reply(&self, fun: &str, msg: &str, multiplier: u32) -> Result<String> {
        self.sent.lock().unwrap().push((msg.to_string(), multiplier));

        let cmd = msg.split('.').next().unwrap_or("");
        self.replies
            .lock()
            .unwrap()
            .get(cmd)
            .cloned()
            .ok_or_else(|| CkwebError::ServiceDown(format!("{}() connect(mock) failed 3x", fun)))
    }
}
