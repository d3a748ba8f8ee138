pub mod console;
pub mod query;
pub mod serve;

pub use console::run_console;
pub use query::{check_password, parse_fields, ping_ckdb, run_query};
pub use serve::start_server;

use crate::client::CkdbClient;
use crate::config::Config;
use crate::db::PoolDb;
use std::sync::Arc;

/// 설정으로 클라이언트와 db 계층을 만든다
pub fn connect(config: &Config) -> (Arc<CkdbClient>, PoolDb) {
    let client = Arc::new(CkdbClient::new(config.endpoint(), config.client_options()));
    let db = PoolDb::new(client.clone(), config.encoder());
    (client, db)
}
