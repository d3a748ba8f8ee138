use crate::commands::connect;
use crate::config::Config;
use crate::error::Result;
use crate::web::{self, AppState};
use colored::*;
use std::path::PathBuf;
use tracing::info;

/// HTTP 서버 시작
pub async fn start_server(config: &Config, listen: Option<&str>) -> Result<()> {
    let listen = listen.unwrap_or(&config.listen);
    let (client, db) = connect(config);

    eprintln!("{} Starting web server...", "[>>]".cyan().bold());
    eprintln!("  ckdb: {}", client.endpoint());
    eprintln!("  Listen: {}", listen);
    info!("ckdb endpoint {}", client.endpoint());

    let state = AppState::new(db).with_maintenance_file(config.maintenance_file.as_ref().map(PathBuf::from));
    web::serve(state, listen).await?;

    eprintln!("{} Web server stopped.", "[BYE]".cyan());
    Ok(())
}
