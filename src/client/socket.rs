use crate::client::{CkdbTransport, Endpoint};
use crate::error::{CkwebError, Result};
use crate::protocol::frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_BYTES};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, error};

/// 소켓 클라이언트 옵션
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// 송수신 기본 타임아웃
    pub timeout: Duration,
    /// 각 접속 시도 전 대기 시간
    pub backoff: Vec<Duration>,
    pub max_frame_bytes: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            backoff: vec![
                Duration::from_secs(0),
                Duration::from_secs(2),
                Duration::from_secs(5),
            ],
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// 요청마다 새로 접속하는 ckdb 클라이언트
#[derive(Debug, Clone)]
pub struct CkdbClient {
    endpoint: Endpoint,
    options: ClientOptions,
}

enum Conn {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl CkdbClient {
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Self {
        Self { endpoint, options }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn connect_once(&self) -> std::io::Result<Conn> {
        let connect = async {
            match &self.endpoint {
                Endpoint::Unix(path) => UnixStream::connect(path).await.map(Conn::Unix),
                Endpoint::Tcp(port) => TcpStream::connect(("127.0.0.1", *port))
                    .await
                    .map(Conn::Tcp),
            }
        };

        match tokio::time::timeout(self.options.timeout, connect).await {
            Ok(res) => res,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            )),
        }
    }

    /// backoff 목록만큼 접속을 시도한다
    async fn connect(&self, fun: &str) -> Result<Conn> {
        let mut last_err = None;

        for (attempt, delay) in self.options.backoff.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            match self.connect_once().await {
                Ok(conn) => {
                    if attempt > 0 {
                        debug!("{}() connect({}) ok after {} retries", fun, self.endpoint, attempt);
                    }
                    return Ok(conn);
                }
                Err(e) => last_err = Some(e),
            }
        }

        let sockerr = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts".to_string());
        let msg = format!(
            "{}() connect({}) failed {}x",
            fun,
            self.endpoint,
            self.options.backoff.len()
        );
        error!("CKPERR: {} '{}'", msg, sockerr);
        Err(CkwebError::ServiceDown(msg))
    }

    fn io_timeout(&self, multiplier: u32) -> Duration {
        self.options.timeout.saturating_mul(multiplier.max(1))
    }

    /// 응답을 기다리지 않고 보내기만 한다
    pub async fn send(&self, fun: &str, msg: &str) -> Result<()> {
        let tmo = self.io_timeout(1);
        match self.connect(fun).await? {
            Conn::Unix(mut s) => send_only(fun, &mut s, msg, tmo).await,
            Conn::Tcp(mut s) => send_only(fun, &mut s, msg, tmo).await,
        }
    }
}

#[async_trait]
impl CkdbTransport for CkdbClient {
    async fn send_reply(&self, fun: &str, msg: &str, multiplier: u32) -> Result<String> {
        let tmo = self.io_timeout(multiplier);
        let max = self.options.max_frame_bytes;

        // 연결은 이 스코프가 끝나면 닫힌다
        match self.connect(fun).await? {
            Conn::Unix(mut s) => round_trip(fun, &mut s, msg, tmo, max).await,
            Conn::Tcp(mut s) => round_trip(fun, &mut s, msg, tmo, max).await,
        }
    }
}

async fn with_timeout<T, F>(fun: &str, what: &str, tmo: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(tmo, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => {
            error!("CKPERR: {}() {} failed '{}'", fun, what, e);
            Err(CkwebError::ServiceDown(format!("{}() {} failed: {}", fun, what, e)))
        }
        Err(_) => {
            error!("CKPERR: {}() {} timed out after {:?}", fun, what, tmo);
            Err(CkwebError::ServiceDown(format!("{}() {} timed out", fun, what)))
        }
    }
}

async fn send_only<S>(fun: &str, stream: &mut S, msg: &str, tmo: Duration) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let line = format!("{}\n", msg);
    with_timeout(fun, "sendsock()", tmo, write_frame(stream, line.as_bytes())).await
}

async fn round_trip<S>(
    fun: &str,
    stream: &mut S,
    msg: &str,
    tmo: Duration,
    max_frame_bytes: usize,
) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_only(fun, stream, msg, tmo).await?;
    let body = with_timeout(fun, "readsockline()", tmo, read_frame(stream, max_frame_bytes)).await?;

    String::from_utf8(body).map_err(|e| {
        error!("CKPERR: {}() reply is not utf-8", fun);
        CkwebError::MalformedReply(e.to_string())
    })
}
