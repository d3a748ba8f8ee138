use anyhow::Context;
use clap::Parser;
use colored::*;
use dialoguer::Password;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use ckweb::commands::{self, connect};
use ckweb::config::Config;
use cli::{Cli, Command};

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("ckweb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ckweb=info"))
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.debug {
        eprintln!("{} {:?}", "DEBUG:".yellow(), cli);
    }

    if let Command::InitConfig = cli.command {
        Config::init().context("failed to write default config")?;
        eprintln!(
            "{} Wrote {}",
            "[OK]".green(),
            Config::config_path()?.display()
        );
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load config")?;

    match cli.command {
        Command::Serve { listen } => {
            commands::start_server(&config, listen.as_deref()).await?;
        }
        Command::Msg { no_tabs } => {
            let (client, _) = connect(&config);
            let tabs = (!no_tabs).then_some(config.separators.fld_sep);
            let stdin = BufReader::new(tokio::io::stdin());
            commands::run_console(&*client, stdin, tokio::io::stdout(), tabs).await?;
        }
        Command::Query {
            cmd,
            fields,
            user,
            raw,
        } => {
            let (_, db) = connect(&config);
            let fields = commands::parse_fields(&fields)?;
            let ok = commands::run_query(&db, &cmd, &fields, user.as_deref(), raw).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Ping => {
            let (_, db) = connect(&config);
            commands::ping_ckdb(&db).await?;
        }
        Command::Chkpass { username } => {
            let (_, db) = connect(&config);
            let password = Password::new()
                .with_prompt(format!("Password for {}", username))
                .interact()
                .context("failed to read password")?;

            if commands::check_password(&db, &username, &password).await? {
                eprintln!("{} Password accepted.", "[OK]".green().bold());
            } else {
                eprintln!("{} Password rejected.", "[X]".red());
                std::process::exit(1);
            }
        }
        Command::InitConfig => {}
    }

    Ok(())
}
