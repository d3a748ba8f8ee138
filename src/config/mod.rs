use crate::client::{ClientOptions, Endpoint};
use crate::error::{CkwebError, Result};
use crate::protocol::{MessageEncoder, Separators};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ckweb 설정
///
/// 설정 파일은 ~/.ckweb/config.toml에 저장됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ckdb listener Unix socket 경로
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// 설정하면 Unix socket 대신 127.0.0.1:<port> TCP로 접속
    #[serde(default)]
    pub tcp_port: Option<u16>,

    /// 소켓 송수신 타임아웃 (초). 요청별 배수가 곱해진다.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 접속 시도 전 대기 시간 목록 (초). 길이가 곧 시도 횟수.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: Vec<u64>,

    /// 요청의 createcode 값
    #[serde(default = "default_create_code")]
    pub create_code: String,

    /// admin 필드를 전달할 수 있는 계정
    #[serde(default)]
    pub admin_user: Option<String>,

    /// HTTP 서버 주소
    #[serde(default = "default_listen")]
    pub listen: String,

    /// 이 파일이 있으면 점검 중 안내를 대신 보여준다
    #[serde(default)]
    pub maintenance_file: Option<String>,

    #[serde(default)]
    pub separators: Separators,
}

fn default_socket_path() -> String {
    "/opt/ckdb/listener".to_string()
}

/// 배수(최대 4)를 곱해도 넉넉한 상한
const MAX_TIMEOUT_SECS: u64 = 600;

fn default_timeout_secs() -> u64 {
    2
}

fn default_retry_backoff() -> Vec<u64> {
    vec![0, 2, 5]
}

fn default_create_code() -> String {
    "php".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            tcp_port: None,
            timeout_secs: default_timeout_secs(),
            retry_backoff_secs: default_retry_backoff(),
            create_code: default_create_code(),
            admin_user: None,
            listen: default_listen(),
            maintenance_file: None,
            separators: Separators::default(),
        }
    }
}

impl Config {
    /// 설정 디렉토리 경로
    fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            CkwebError::ConfigError("Could not find home directory".to_string())
        })?;
        Ok(home.join(".ckweb"))
    }

    /// 기본 설정 파일 경로
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// 기본 경로에서 로드 (없으면 기본값 사용)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// 지정한 경로에서 로드. 파일이 없으면 기본값.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CkwebError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;

        Ok(config)
    }

    /// 설정을 기본 경로에 저장
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        self.save_to(&config_dir.join("config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CkwebError::ConfigError(e.to_string()))?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// 설정 파일 초기화 (기본값으로)
    pub fn init() -> Result<()> {
        Self::default().save()
    }

    fn validate(&self) -> Result<()> {
        let s = &self.separators;
        if s.send_sep == s.fld_sep || s.send_sep == s.val_sep || s.fld_sep == s.val_sep {
            return Err(CkwebError::ConfigError(
                "separators must be distinct".to_string(),
            ));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(CkwebError::ConfigError(format!(
                "timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }
        if self.retry_backoff_secs.is_empty() {
            return Err(CkwebError::ConfigError(
                "retry_backoff_secs needs at least one entry".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        match self.tcp_port {
            Some(port) => Endpoint::Tcp(port),
            None => Endpoint::Unix(PathBuf::from(&self.socket_path)),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            backoff: self
                .retry_backoff_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            ..ClientOptions::default()
        }
    }

    pub fn encoder(&self) -> MessageEncoder {
        MessageEncoder::new(self.separators, self.create_code.clone())
            .with_admin_user(self.admin_user.clone())
    }
}
