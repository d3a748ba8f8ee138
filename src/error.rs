use thiserror::Error;

#[derive(Error, Debug)]
pub enum CkwebError {
    /// ckdb 연결/송수신 실패. 요청 단위에서 재시도하지 않는다.
    #[error("ckdb service unavailable: {0}")]
    ServiceDown(String),

    #[error("Malformed ckdb reply: {0}")]
    MalformedReply(String),

    #[error("Frame error: {0}")]
    FrameError(String),

    #[error("Invalid field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CkwebError {
    /// 최종 사용자에게 "service down" 페이지를 보여야 하는 에러인지
    pub fn is_service_down(&self) -> bool {
        matches!(
            self,
            CkwebError::ServiceDown(_) | CkwebError::MalformedReply(_) | CkwebError::FrameError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CkwebError>;
