use crate::error::{CkwebError, Result};
use crate::protocol::fields::FieldMap;
use crate::protocol::message::Separators;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const STATUS_OK: &str = "ok";

const SYSTEM_ERROR: &str = "system error";

/// 행 단위 필드 이름 (`name:<row>`)
static ROW_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+):(\d+)$").unwrap());

/// `id.stamp.status[.rest]`를 최대 4개로 나눈다
fn split_major<'a>(rep: &'a str, seps: &Separators) -> Result<Vec<&'a str>> {
    let fix = rep.trim_end_matches(['\n', '\r']);
    let major: Vec<&str> = fix.splitn(4, seps.send_sep).collect();
    if major.len() < 3 {
        let head: String = fix.chars().take(30).collect();
        return Err(CkwebError::MalformedReply(format!(
            "expected id{0}stamp{0}status, got '{1}'",
            seps.send_sep, head
        )));
    }
    Ok(major)
}

fn error_for(status: &str, rest: Option<&str>) -> Option<String> {
    if status == STATUS_OK {
        None
    } else {
        Some(rest.unwrap_or(SYSTEM_ERROR).to_string())
    }
}

fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = stamp.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// 필드 목록으로 해석한 ckdb 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: String,
    pub stamp: String,
    pub status: String,
    /// status가 ok가 아닐 때의 에러 메시지
    pub error: Option<String>,
    pub fields: FieldMap,
}

impl Reply {
    /// 응답 문자열을 필드 맵으로 해석한다
    ///
    /// status가 ok가 아니어도 네 번째 블록은 필드로도 해석되며
    /// 동시에 `error`에 원문 그대로 들어간다.
    pub fn decode(rep: &str, seps: &Separators) -> Result<Self> {
        let major = split_major(rep, seps)?;

        let mut fields = FieldMap::new();
        if let Some(blob) = major.get(3) {
            for fld in blob.split(seps.fld_sep).filter(|f| !f.is_empty()) {
                match fld.split_once(seps.val_sep) {
                    Some((name, value)) => fields.insert(name, value),
                    None => fields.insert(fld, ""),
                }
            }
        }

        Ok(Self {
            id: major[0].to_string(),
            stamp: major[1].to_string(),
            status: major[2].to_string(),
            error: error_for(major[2], major.get(3).copied()),
            fields,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    pub fn stamp_time(&self) -> Option<DateTime<Utc>> {
        parse_stamp(&self.stamp)
    }

    /// `rows` 필드 값. 없거나 숫자가 아니면 0.
    pub fn row_count(&self) -> usize {
        self.get("rows")
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0)
    }

    /// `flds`에 나열된 필드 이름들
    pub fn row_field_names(&self) -> Vec<&str> {
        match self.get("flds") {
            Some(flds) if !flds.is_empty() => flds.split(',').collect(),
            _ => Vec::new(),
        }
    }

    /// `name:<i>` 형식의 행 데이터를 행마다 하나의 맵으로 모은다
    ///
    /// `flds`가 있으면 그 순서를 따르고, 없으면 응답에 나온 순서대로
    /// `name:<i>` 필드를 수집한다.
    pub fn rows(&self) -> Vec<FieldMap> {
        // 행마다 필드가 최소 하나는 있다
        let count = self.row_count().min(self.fields.len());
        let mut rows = vec![FieldMap::new(); count];
        let names = self.row_field_names();

        if !names.is_empty() {
            for (i, row) in rows.iter_mut().enumerate() {
                for name in &names {
                    if let Some(value) = self.get(&format!("{}:{}", name, i)) {
                        row.insert(*name, value);
                    }
                }
            }
            return rows;
        }

        for (key, value) in self.fields.iter() {
            if let Some(caps) = ROW_FIELD.captures(key) {
                let idx: usize = match caps[2].parse() {
                    Ok(idx) => idx,
                    Err(_) => continue,
                };
                if let Some(row) = rows.get_mut(idx) {
                    row.insert(&caps[1], value);
                }
            }
        }
        rows
    }
}

/// 네 번째 블록을 해석하지 않고 그대로 둔 ckdb 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub id: String,
    pub stamp: String,
    pub status: String,
    /// status가 ok일 때 나머지 데이터, 아니면 빈 문자열
    pub data: String,
    pub error: Option<String>,
}

impl RawReply {
    pub fn decode(rep: &str, seps: &Separators) -> Result<Self> {
        let major = split_major(rep, seps)?;
        let ok = major[2] == STATUS_OK;

        Ok(Self {
            id: major[0].to_string(),
            stamp: major[1].to_string(),
            status: major[2].to_string(),
            data: if ok {
                major.get(3).copied().unwrap_or("").to_string()
            } else {
                String::new()
            },
            error: error_for(major[2], major.get(3).copied()),
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn stamp_time(&self) -> Option<DateTime<Utc>> {
        parse_stamp(&self.stamp)
    }
}
