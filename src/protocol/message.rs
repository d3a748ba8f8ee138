use crate::error::{CkwebError, Result};
use crate::protocol::fields::FieldMap;
use serde::{Deserialize, Serialize};

/// ckdb 메시지 구분자
///
/// ckdb 버전에 따라 값이 달랐기 때문에 설정 파일에서 바꿀 수 있다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    /// cmd / id / 필드 블록 사이
    #[serde(default = "default_send_sep")]
    pub send_sep: char,
    /// 필드 사이
    #[serde(default = "default_fld_sep")]
    pub fld_sep: char,
    /// 필드 이름과 값 사이
    #[serde(default = "default_val_sep")]
    pub val_sep: char,
}

fn default_send_sep() -> char {
    '.'
}

fn default_fld_sep() -> char {
    '\t'
}

fn default_val_sep() -> char {
    '='
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            send_sep: default_send_sep(),
            fld_sep: default_fld_sep(),
            val_sep: default_val_sep(),
        }
    }
}

/// ckdb로 보낼 요청 하나
#[derive(Debug, Clone)]
pub struct Message {
    pub cmd: String,
    /// id 접두어. 실제 id는 뒤에 `unix_time % 10000`이 붙는다.
    pub id: String,
    pub fields: FieldMap,
}

impl Message {
    pub fn new(cmd: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            id: id.into(),
            fields: FieldMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name, value);
        self
    }

    pub fn fields(mut self, fields: &FieldMap) -> Self {
        self.fields.extend_from(fields);
        self
    }
}

/// 요청을 보낸 쪽 정보 (createby / createinet / admin)
#[derive(Debug, Clone, Default)]
pub struct Origin {
    pub user: Option<String>,
    pub inet: String,
    /// 관리자 계정일 때만 전달되는 `admin` 값
    pub admin: Option<String>,
}

impl Origin {
    pub fn new(user: Option<&str>, inet: impl Into<String>) -> Self {
        Self {
            user: user.map(str::to_string),
            inet: inet.into(),
            admin: None,
        }
    }

    pub fn with_admin(mut self, admin: Option<String>) -> Self {
        self.admin = admin;
        self
    }
}

/// 요청 payload 인코더
#[derive(Debug, Clone)]
pub struct MessageEncoder {
    pub separators: Separators,
    pub create_code: String,
    pub admin_user: Option<String>,
}

impl MessageEncoder {
    pub fn new(separators: Separators, create_code: impl Into<String>) -> Self {
        Self {
            separators,
            create_code: create_code.into(),
            admin_user: None,
        }
    }

    pub fn with_admin_user(mut self, admin_user: Option<String>) -> Self {
        self.admin_user = admin_user;
        self
    }

    /// 현재 시각으로 id를 만들어 인코딩
    pub fn encode(&self, msg: &Message, origin: &Origin) -> Result<String> {
        self.encode_at(msg, origin, chrono::Utc::now().timestamp())
    }

    /// `cmd.id<t>.f1=v1\tf2=v2...\tcreatecode=..\tcreateby=..\tcreateinet=..`
    pub fn encode_at(&self, msg: &Message, origin: &Origin, unix_time: i64) -> Result<String> {
        let seps = &self.separators;

        check_token("cmd", &msg.cmd, seps)?;
        check_token("id", &msg.id, seps)?;

        let user = origin.user.as_deref().unwrap_or("");
        let mut out = format!(
            "{}{}{}{}{}",
            msg.cmd,
            seps.send_sep,
            msg.id,
            unix_time.rem_euclid(10000),
            seps.send_sep
        );

        for (name, value) in msg.fields.iter() {
            push_field(&mut out, name, value, seps)?;
            out.push(seps.fld_sep);
        }
        push_field(&mut out, "createcode", &self.create_code, seps)?;
        out.push(seps.fld_sep);
        push_field(&mut out, "createby", user, seps)?;
        out.push(seps.fld_sep);
        push_field(&mut out, "createinet", &origin.inet, seps)?;

        if let (Some(admin_user), Some(admin)) = (&self.admin_user, &origin.admin) {
            if admin_user == user && !admin.is_empty() {
                out.push(seps.fld_sep);
                push_field(&mut out, "admin", admin, seps)?;
            }
        }

        Ok(out)
    }
}

fn check_token(what: &str, token: &str, seps: &Separators) -> Result<()> {
    if token.contains(seps.send_sep) {
        return Err(CkwebError::InvalidField {
            name: what.to_string(),
            reason: format!("contains '{}'", seps.send_sep.escape_default()),
        });
    }
    Ok(())
}

fn push_field(out: &mut String, name: &str, value: &str, seps: &Separators) -> Result<()> {
    if name.is_empty() || name.contains(seps.val_sep) || name.contains(seps.fld_sep) {
        return Err(CkwebError::InvalidField {
            name: name.to_string(),
            reason: "name is empty or contains a separator".to_string(),
        });
    }
    if value.contains(seps.fld_sep) {
        return Err(CkwebError::InvalidField {
            name: name.to_string(),
            reason: format!("value contains '{}'", seps.fld_sep.escape_default()),
        });
    }

    out.push_str(name);
    out.push(seps.val_sep);
    out.push_str(value);
    Ok(())
}

/// `[fld_sep]name=value`, 값이 없으면 빈 문자열
pub fn fld_encode(fields: &FieldMap, name: &str, first: bool, seps: &Separators) -> String {
    let mut rep = String::new();
    if !first {
        rep.push(seps.fld_sep);
    }
    rep.push_str(name);
    rep.push(seps.val_sep);
    rep.push_str(fields.get(name).unwrap_or(""));
    rep
}
