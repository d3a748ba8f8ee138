//! ckdb 명령 호출 모음
//!
//! 각 함수는 메시지 하나를 인코딩해 한 번 왕복하고 응답을 해석한다.
//! 왕복 실패는 `ServiceDown`으로 그대로 올라가며 여기서 재시도하지 않는다.

use crate::client::CkdbTransport;
use crate::error::{CkwebError, Result};
use crate::protocol::{FieldMap, Message, MessageEncoder, Origin, RawReply, Reply};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// 주소가 포함된 usersettings 요청의 타임아웃 배수
const USERSET_ADDR_MULTIPLIER: u32 = 3;
/// pplns2 계산의 타임아웃 배수
const PPLNS2_MULTIPLIER: u32 = 4;

/// 비밀번호 해시 (sha256, 소문자 hex)
pub fn password_hash(pass: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 지급 주소 한 줄. ratio가 없으면 ckdb 기본값을 쓴다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutAddress {
    pub addr: String,
    pub ratio: Option<String>,
}

/// 2FA 요청 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFaAction {
    /// 현재 상태 조회
    Status,
    Setup,
    Test,
    New,
    Untest,
    Remove,
}

impl TwoFaAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TwoFaAction::Status => "",
            TwoFaAction::Setup => "setup",
            TwoFaAction::Test => "test",
            TwoFaAction::New => "new",
            TwoFaAction::Untest => "untest",
            TwoFaAction::Remove => "remove",
        }
    }
}

/// ckdb에 대한 타입 있는 호출 계층
#[derive(Clone)]
pub struct PoolDb {
    transport: Arc<dyn CkdbTransport>,
    encoder: MessageEncoder,
}

impl PoolDb {
    pub fn new(transport: Arc<dyn CkdbTransport>, encoder: MessageEncoder) -> Self {
        Self { transport, encoder }
    }

    pub fn encoder(&self) -> &MessageEncoder {
        &self.encoder
    }

    fn require_user(origin: &Origin) -> Result<&str> {
        match origin.user.as_deref() {
            Some(u) if !u.is_empty() => Ok(u),
            _ => Err(CkwebError::Unauthenticated),
        }
    }

    /// 인코딩 후 한 번 왕복해서 응답 원문을 돌려준다
    pub async fn request(
        &self,
        fun: &str,
        msg: Message,
        origin: &Origin,
        multiplier: u32,
    ) -> Result<String> {
        let line = self.encoder.encode(&msg, origin)?;
        debug!("{}() -> {}", fun, msg.cmd);
        self.transport.send_reply(fun, &line, multiplier).await
    }

    async fn query(&self, fun: &str, msg: Message, origin: &Origin, multiplier: u32) -> Result<Reply> {
        let rep = self.request(fun, msg, origin, multiplier).await?;
        Reply::decode(&rep, &self.encoder.separators)
    }

    async fn query_raw(
        &self,
        fun: &str,
        msg: Message,
        origin: &Origin,
        multiplier: u32,
    ) -> Result<RawReply> {
        let rep = self.request(fun, msg, origin, multiplier).await?;
        RawReply::decode(&rep, &self.encoder.separators)
    }

    /// 홈페이지 요약. 로그인하지 않았으면 풀 정보만.
    pub async fn home_info(&self, origin: &Origin) -> Result<Reply> {
        let mut msg = Message::new("homepage", "home");
        if let Some(user) = origin.user.as_deref().filter(|u| !u.is_empty()) {
            msg = msg.field("username", user);
        }
        self.query("homepage", msg, origin, 1).await
    }

    pub async fn check_pass(&self, origin: &Origin, pass: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("chkpass", "chkpass")
            .field("username", user)
            .field("passwordhash", password_hash(pass));
        self.query("checkPass", msg, origin, 1).await
    }

    pub async fn set_pass(&self, origin: &Origin, old_pass: &str, new_pass: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("newpass", "newpass")
            .field("username", user)
            .field("oldhash", password_hash(old_pass))
            .field("newhash", password_hash(new_pass));
        self.query("setPass", msg, origin, 1).await
    }

    pub async fn reset_pass(&self, origin: &Origin, new_pass: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("newpass", "newpass")
            .field("username", user)
            .field("newhash", password_hash(new_pass));
        self.query("resetPass", msg, origin, 1).await
    }

    pub async fn user_reg(&self, origin: &Origin, email: &str, pass: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("adduser", "reg")
            .field("username", user)
            .field("emailaddress", email)
            .field("passwordhash", password_hash(pass));
        self.query("userReg", msg, origin, 1).await
    }

    /// 사용자 설정 변경/조회. 아무것도 주지 않으면 조회만 한다.
    pub async fn user_settings(
        &self,
        origin: &Origin,
        email: Option<&str>,
        addrs: Option<&[PayoutAddress]>,
        pass: Option<&str>,
    ) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let mut multiplier = 1;
        let mut msg = Message::new("usersettings", "userset").field("username", user);

        if let Some(email) = email {
            msg = msg.field("email", email);
        }
        if let Some(addrs) = addrs {
            for (i, ar) in addrs.iter().enumerate() {
                msg = msg.field(format!("address:{}", i), ar.addr.as_str());
                if let Some(ratio) = &ar.ratio {
                    msg = msg.field(format!("ratio:{}", i), ratio.as_str());
                }
            }
            msg = msg.field("rows", addrs.len().to_string());
            multiplier = USERSET_ADDR_MULTIPLIER;
        }
        if let Some(pass) = pass {
            msg = msg.field("passwordhash", password_hash(pass));
        }

        self.query("userSettings", msg, origin, multiplier).await
    }

    pub async fn worker_set(&self, origin: &Origin, settings: &FieldMap) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("workerset", "workerset")
            .field("username", user)
            .fields(settings);
        self.query("workerSet", msg, origin, 1).await
    }

    pub async fn all_users(&self, origin: &Origin) -> Result<Reply> {
        Self::require_user(origin)?;
        self.query("getAllUsers", Message::new("allusers", "all"), origin, 1)
            .await
    }

    pub async fn workers(&self, origin: &Origin, stats: bool) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("workers", "work")
            .field("username", user)
            .field("stats", yn(stats));
        self.query("getWorkers", msg, origin, 1).await
    }

    pub async fn percents(&self, origin: &Origin, stats: bool) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("workers", "work")
            .field("username", user)
            .field("stats", yn(stats))
            .field("percent", "Y");
        self.query("getPercents", msg, origin, 1).await
    }

    pub async fn payments(&self, origin: &Origin) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("payments", "pay").field("username", user);
        self.query("getPayments", msg, origin, 1).await
    }

    pub async fn mpayouts(&self, origin: &Origin) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("mpayouts", "mp").field("username", user);
        self.query("getMPayments", msg, origin, 1).await
    }

    fn shifts_msg(origin: &Origin, select: Option<&str>) -> Result<Message> {
        let user = Self::require_user(origin)?;
        let mut msg = Message::new("shifts", "shift").field("username", user);
        if let Some(workers) = select {
            msg = msg.field("select", workers);
        }
        Ok(msg)
    }

    /// `select`: 쉼표로 구분한 워커 이름
    pub async fn shifts(&self, origin: &Origin, select: Option<&str>) -> Result<Reply> {
        let msg = Self::shifts_msg(origin, select)?;
        self.query("getShifts", msg, origin, 1).await
    }

    /// 차트용 원본 데이터
    pub async fn shift_data(&self, origin: &Origin, select: Option<&str>) -> Result<RawReply> {
        let msg = Self::shifts_msg(origin, select)?;
        self.query_raw("getShifts", msg, origin, 1).await
    }

    pub async fn pshifts(&self, origin: &Origin) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("pshift", "pshift").field("username", user);
        self.query("getPShifts", msg, origin, 1).await
    }

    pub async fn pshift_data(&self, origin: &Origin) -> Result<RawReply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("pshift", "pshift").field("username", user);
        self.query_raw("getPShifts", msg, origin, 1).await
    }

    pub async fn blocks(&self, origin: &Origin) -> Result<Reply> {
        Self::require_user(origin)?;
        self.query("getBlocks", Message::new("blocklist", "blk"), origin, 1)
            .await
    }

    pub async fn user_info(&self, origin: &Origin) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("userinfo", "usr").field("username", user);
        self.query("getUserInfo", msg, origin, 1).await
    }

    /// 예: `ua_Reset.str=FortyTwo`, `ua_Reset.date=now+3600`
    pub async fn set_atts(&self, origin: &Origin, atts: &FieldMap) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("setatts", "setatts")
            .field("username", user)
            .fields(atts);
        self.query("setAtts", msg, origin, 1).await
    }

    /// 예: `Reset.str,Reset.dateexp`
    pub async fn get_atts(&self, origin: &Origin, attlist: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("getatts", "getatts")
            .field("username", user)
            .field("attlist", attlist);
        self.query("getAtts", msg, origin, 1).await
    }

    /// 나열한 속성을 만료시킨다
    pub async fn exp_atts(&self, origin: &Origin, attlist: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("expatts", "expatts")
            .field("username", user)
            .field("attlist", attlist);
        self.query("expAtts", msg, origin, 1).await
    }

    /// `oc_<name>.value`는 항상 필요하다
    pub async fn set_opts(&self, origin: &Origin, opts: &FieldMap) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("setopts", "setopts")
            .field("username", user)
            .fields(opts);
        self.query("setOpts", msg, origin, 1).await
    }

    pub async fn get_opts(&self, origin: &Origin, optlist: &str) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("getopts", "getopts")
            .field("username", user)
            .field("optlist", optlist);
        self.query("getOpts", msg, origin, 1).await
    }

    pub async fn get_2fa(
        &self,
        origin: &Origin,
        action: TwoFaAction,
        entropy: u32,
        value: u32,
    ) -> Result<Reply> {
        let user = Self::require_user(origin)?;
        let msg = Message::new("2fa", "2fa")
            .field("username", user)
            .field("action", action.as_str())
            .field("entropy", entropy.to_string())
            .field("value", value.to_string());
        self.query("get2fa", msg, origin, 1).await
    }

    /// ckdb 내부 통계
    pub async fn pool_stats(&self, origin: &Origin) -> Result<Reply> {
        Self::require_user(origin)?;
        self.query("stats", Message::new("stats", "stats"), origin, 1)
            .await
    }

    pub async fn pplns(&self, origin: &Origin, height: &str) -> Result<Reply> {
        let msg = Message::new("pplns", "pplns")
            .field("height", height)
            .field("allow_aged", "Y");
        self.query("pplns", msg, origin, 1).await
    }

    pub async fn pplns2(&self, origin: &Origin, height: &str) -> Result<Reply> {
        let msg = Message::new("pplns2", "pplns2").field("height", height);
        self.query("pplns2", msg, origin, PPLNS2_MULTIPLIER).await
    }

    /// 성공하면 `pong`
    pub async fn ping(&self, origin: &Origin) -> Result<RawReply> {
        self.query_raw("ping", Message::new("ping", "ping"), origin, 1)
            .await
    }

    pub async fn version(&self, origin: &Origin) -> Result<RawReply> {
        self.query_raw("version", Message::new("version", "version"), origin, 1)
            .await
    }
}

fn yn(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}
