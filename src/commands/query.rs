use crate::db::PoolDb;
use crate::error::{CkwebError, Result};
use crate::protocol::{FieldMap, Message, Origin, RawReply, Reply};
use colored::*;

/// `name=value` 인자들을 필드 맵으로
pub fn parse_fields(args: &[String]) -> Result<FieldMap> {
    args.iter()
        .map(|arg| {
            arg.split_once('=').ok_or_else(|| CkwebError::InvalidField {
                name: arg.clone(),
                reason: "expected name=value".to_string(),
            })
        })
        .collect()
}

fn local_origin(user: Option<&str>) -> Origin {
    Origin::new(user, "127.0.0.1")
}

fn print_reply(rep: &Reply) {
    if rep.is_ok() {
        println!("{} {} ({})", "[OK]".green().bold(), rep.id, rep.stamp);
        for (name, value) in rep.fields.iter() {
            println!("  {}={}", name.cyan(), value);
        }
    } else {
        println!(
            "{} {} {}: {}",
            "[X]".red(),
            rep.id,
            rep.status,
            rep.error.as_deref().unwrap_or("")
        );
    }
}

/// 임의의 ckdb 명령 하나를 보낸다
pub async fn run_query(
    db: &PoolDb,
    cmd: &str,
    fields: &FieldMap,
    user: Option<&str>,
    raw: bool,
) -> Result<bool> {
    let origin = local_origin(user);
    let msg = Message::new(cmd, cmd).fields(fields);
    let rep = db.request(cmd, msg, &origin, 1).await?;
    let seps = &db.encoder().separators;

    if raw {
        let raw = RawReply::decode(&rep, seps)?;
        match &raw.error {
            None => println!("{} {}", "[OK]".green().bold(), raw.data),
            Some(e) => println!("{} {}: {}", "[X]".red(), raw.status, e),
        }
        return Ok(raw.is_ok());
    }

    let rep = Reply::decode(&rep, seps)?;
    print_reply(&rep);
    Ok(rep.is_ok())
}

/// ping과 version을 차례로 확인
pub async fn ping_ckdb(db: &PoolDb) -> Result<()> {
    let origin = local_origin(None);

    let pong = db.ping(&origin).await?;
    if !pong.is_ok() {
        eprintln!("{} ckdb ping failed: {}", "[X]".red(), pong.error.unwrap_or_default());
        return Err(CkwebError::ServiceDown(pong.status));
    }
    eprintln!("{} ckdb is running.", "[OK]".green().bold());
    if let Some(t) = pong.stamp_time() {
        eprintln!("  [>] ckdb time: {}", t.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let version = db.version(&origin).await?;
    eprintln!("  [>] Version: {}", version.data);
    Ok(())
}

/// 비밀번호 확인. 맞으면 true.
pub async fn check_password(db: &PoolDb, username: &str, password: &str) -> Result<bool> {
    let rep = db.check_pass(&local_origin(Some(username)), password).await?;
    Ok(rep.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::protocol::{MessageEncoder, Separators};
    use std::sync::Arc;

    #[test]
    fn test_parse_fields() {
        let args = vec!["username=alice".to_string(), "url=a=b".to_string()];
        let fields = parse_fields(&args).unwrap();
        assert_eq!(fields.get("url"), Some("a=b"));

        assert!(parse_fields(&["oops".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_check_password() {
        let mock = Arc::new(
            MockTransport::new().reply("chkpass", "chkpass1.1.failed.Incorrect password"),
        );
        let db = PoolDb::new(mock.clone(), MessageEncoder::new(Separators::default(), "php"));

        assert!(!check_password(&db, "alice", "x").await.unwrap());
        assert!(mock.last_sent().contains("createinet=127.0.0.1"));
    }

    #[tokio::test]
    async fn test_run_query() {
        let mock = Arc::new(MockTransport::new().reply("blocklist", "blocklist1.1.ok.rows=0"));
        let db = PoolDb::new(mock.clone(), MessageEncoder::new(Separators::default(), "php"));
        let fields = parse_fields(&["limit=5".to_string()]).unwrap();

        let ok = run_query(&db, "blocklist", &fields, Some("alice"), false)
            .await
            .unwrap();
        assert!(ok);
        assert!(mock.last_sent().starts_with("blocklist.blocklist"));
        assert!(mock.last_sent().contains("limit=5\tcreatecode=php\tcreateby=alice\t"));
    }
}
