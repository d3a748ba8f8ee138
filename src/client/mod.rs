pub mod socket;

#[cfg(test)]
pub mod mock;

pub use socket::{CkdbClient, ClientOptions};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// ckdb listener 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket 파일
    Unix(PathBuf),
    /// 127.0.0.1 TCP 포트
    Tcp(u16),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(port) => write!(f, "127.0.0.1:{}", port),
        }
    }
}

/// ckdb 요청/응답 한 번을 수행하는 전송 계층
#[async_trait]
pub trait CkdbTransport: Send + Sync {
    /// 메시지를 보내고 응답 본문을 받는다
    ///
    /// # Arguments
    /// * `fun` - 로그에 남길 호출자 이름
    /// * `msg` - 인코딩된 요청 (줄바꿈 제외)
    /// * `multiplier` - 기본 타임아웃에 곱할 배수
    async fn send_reply(&self, fun: &str, msg: &str, multiplier: u32) -> Result<String>;
}
