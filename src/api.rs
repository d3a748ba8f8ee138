//! 외부 폴링용 API (일반 텍스트 또는 JSON)
//!
//! 사용자 속성 `KAPIKey.str`와 일치하는 키를 가진 요청에만 답한다.

use crate::db::PoolDb;
use crate::error::Result;
use crate::protocol::{FieldMap, Origin, Reply, Separators};
use serde::Deserialize;
use tracing::{info, warn};

const API_KEY_ATT: &str = "KAPIKey.str";

/// 작업자 목록에서 내보내지 않는 필드 접두어
const HIDDEN_WORKER_PREFIX: &str = "idlenot";

/// 홈페이지 응답에서 내보내는 필드
const HOME_FIELDS: &[&str] = &[
    "lastbc",
    "lastheight",
    "currndiff",
    "lastblock",
    "lastblockheight",
    "blockacc",
    "blockerr",
    "p_hashrate5m",
    "p_hashrate1hr",
    "u_hashrate5m",
    "u_hashrate1hr",
];

/// API 요청 파라미터
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiParams {
    pub username: Option<String>,
    pub api: Option<String>,
    pub json: Option<String>,
    pub work: Option<String>,
    /// 관리자 계정으로 대신 조회할 때
    pub admin: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ApiParams {
    pub fn wants_json(&self) -> bool {
        self.json.as_deref().is_some_and(|j| !j.is_empty())
    }

    pub fn wants_work(&self) -> bool {
        self.work.as_deref().is_some_and(|w| !w.is_empty())
    }
}

/// API 응답 본문
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAnswer {
    /// 인증 실패 또는 데이터 없음
    Nil { json: bool },
    Fields { fields: FieldMap, json: bool },
}

impl ApiAnswer {
    pub fn is_json(&self) -> bool {
        match self {
            ApiAnswer::Nil { json } | ApiAnswer::Fields { json, .. } => *json,
        }
    }

    /// 텍스트는 `name=value`를 필드 구분자로 이은 것, JSON은 평평한 문자열 객체
    pub fn render(&self, seps: &Separators) -> Result<String> {
        match self {
            ApiAnswer::Nil { json: false } => Ok("nil".to_string()),
            ApiAnswer::Nil { json: true } => Ok(r#"{"nil":"0"}"#.to_string()),
            ApiAnswer::Fields { fields, json: true } => Ok(serde_json::to_string(fields)?),
            ApiAnswer::Fields { fields, json: false } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}{}{}", k, seps.val_sep, v))
                    .collect();
                Ok(parts.join(&seps.fld_sep.to_string()))
            }
        }
    }
}

/// 인증 후 홈 요약 또는 작업자 목록을 돌려준다
///
/// ckdb 연결 실패는 에러로 올라가지만, 홈 요약을 못 얻은 경우는
/// nil로 답한다.
pub async fn show_api(db: &PoolDb, params: &ApiParams, inet: &str) -> Result<ApiAnswer> {
    let json = params.wants_json();
    let nil = ApiAnswer::Nil { json };

    let (user, key) = match (present(&params.username), present(&params.api)) {
        (Some(u), Some(k)) => (u, k),
        _ => return Ok(ApiAnswer::Nil { json: false }),
    };
    let origin =
        Origin::new(Some(user), inet).with_admin(present(&params.admin).map(str::to_string));

    let atts = db.get_atts(&origin, API_KEY_ATT).await?;
    if !atts.is_ok() || atts.get(API_KEY_ATT) != Some(key) {
        warn!("api key rejected for '{}'", user);
        return Ok(nil);
    }

    let fields = if params.wants_work() {
        worker_fields(&db.workers(&origin, true).await?)
    } else {
        match db.home_info(&origin).await {
            Ok(home) => home_fields(&home),
            Err(e) if e.is_service_down() => {
                warn!("api homepage unavailable: {}", e);
                return Ok(nil);
            }
            Err(e) => return Err(e),
        }
    };

    info!("api answered for '{}' ({} fields)", user, fields.len());
    Ok(ApiAnswer::Fields { fields, json })
}

fn home_fields(home: &Reply) -> FieldMap {
    HOME_FIELDS
        .iter()
        .map(|name| (*name, home.get(name).unwrap_or("")))
        .collect()
}

/// `rows`, 각 행의 `name:i`, `arn`, `arp`, 내보낸 이름 목록 `flds` 순
fn worker_fields(work: &Reply) -> FieldMap {
    let mut out = FieldMap::new();
    out.insert("rows", work.get("rows").unwrap_or(""));

    let names: Vec<&str> = work
        .row_field_names()
        .into_iter()
        .filter(|n| !n.starts_with(HIDDEN_WORKER_PREFIX))
        .collect();

    let rows = work.rows();
    for (i, row) in rows.iter().enumerate() {
        for name in &names {
            out.insert(format!("{}:{}", name, i), row.get(name).unwrap_or(""));
        }
    }

    out.insert("arn", work.get("arn").unwrap_or(""));
    out.insert("arp", work.get("arp").unwrap_or(""));
    let emitted = if rows.is_empty() { String::new() } else { names.join(",") };
    out.insert("flds", emitted);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::protocol::MessageEncoder;
    use std::sync::Arc;

    const ATTS_OK: &str = "getatts1.1.ok.KAPIKey.str=secret";

    fn db(mock: MockTransport) -> PoolDb {
        PoolDb::new(
            Arc::new(mock),
            MessageEncoder::new(Separators::default(), "php"),
        )
    }

    fn params(user: &str, key: &str) -> ApiParams {
        ApiParams {
            username: Some(user.to_string()),
            api: Some(key.to_string()),
            ..ApiParams::default()
        }
    }

    #[tokio::test]
    async fn test_missing_params_is_plain_nil() {
        let db = db(MockTransport::new());
        let p = ApiParams {
            username: Some("  ".to_string()),
            json: Some("y".to_string()),
            ..ApiParams::default()
        };

        let ans = show_api(&db, &p, "1.1.1.1").await.unwrap();
        assert_eq!(ans.render(&Separators::default()).unwrap(), "nil");
    }

    #[tokio::test]
    async fn test_wrong_key() {
        let db = db(MockTransport::new().reply("getatts", ATTS_OK));
        let mut p = params("alice", "guess");
        p.json = Some("1".to_string());

        let ans = show_api(&db, &p, "1.1.1.1").await.unwrap();
        assert_eq!(ans.render(&Separators::default()).unwrap(), r#"{"nil":"0"}"#);
    }

    #[tokio::test]
    async fn test_home_summary_text() {
        let db = db(MockTransport::new()
            .reply("getatts", ATTS_OK)
            .reply("homepage", "home1.1.ok.lastheight=330000\tlastbc=99\textra=1"));

        let ans = show_api(&db, &params("alice", "secret"), "1.1.1.1")
            .await
            .unwrap();
        let text = ans.render(&Separators::default()).unwrap();

        assert!(text.starts_with("lastbc=99\tlastheight=330000\tcurrndiff=\t"));
        assert!(text.ends_with("\tu_hashrate1hr="));
        assert!(!text.contains("extra"));
    }

    #[tokio::test]
    async fn test_home_unavailable_is_nil() {
        let db = db(MockTransport::new().reply("getatts", ATTS_OK));

        let ans = show_api(&db, &params("alice", "secret"), "1.1.1.1")
            .await
            .unwrap();
        assert_eq!(ans, ApiAnswer::Nil { json: false });
    }

    #[tokio::test]
    async fn test_worker_list_json() {
        let db = db(MockTransport::new().reply("getatts", ATTS_OK).reply(
            "workers",
            "work1.1.ok.rows=2\tworkername:0=alice.a\tidlenotificationenabled:0=N\tw_hashrate5m:0=1e9\t\
             workername:1=alice.b\tidlenotificationenabled:1=Y\tw_hashrate5m:1=2e9\t\
             flds=workername,idlenotificationenabled,w_hashrate5m\tarn=a\tarp=b",
        ));
        let mut p = params("alice", "secret");
        p.work = Some("y".to_string());
        p.json = Some("y".to_string());

        let ans = show_api(&db, &p, "1.1.1.1").await.unwrap();
        let json = ans.render(&Separators::default()).unwrap();
        assert_eq!(
            json,
            r#"{"rows":"2","workername:0":"alice.a","w_hashrate5m:0":"1e9","workername:1":"alice.b","w_hashrate5m:1":"2e9","arn":"a","arp":"b","flds":"workername,w_hashrate5m"}"#
        );
    }

    #[tokio::test]
    async fn test_worker_list_fills_missing_row_values() {
        let db = db(MockTransport::new().reply("getatts", ATTS_OK).reply(
            "workers",
            "work1.1.ok.rows=2\tworkername:0=alice.a\tworkername:1=alice.b\tw_hashrate5m:1=3\t\
             flds=workername,w_hashrate5m",
        ));
        let mut p = params("alice", "secret");
        p.work = Some("y".to_string());

        let ans = show_api(&db, &p, "1.1.1.1").await.unwrap();
        assert_eq!(
            ans.render(&Separators::default()).unwrap(),
            "rows=2\tworkername:0=alice.a\tw_hashrate5m:0=\tworkername:1=alice.b\tw_hashrate5m:1=3\tarn=\tarp=\tflds=workername,w_hashrate5m"
        );
    }

    #[tokio::test]
    async fn test_key_lookup_failure_propagates() {
        let db = db(MockTransport::new());

        let err = show_api(&db, &params("alice", "secret"), "1.1.1.1")
            .await
            .unwrap_err();
        assert!(err.is_service_down());
    }
}
