// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use shopsync_config::ConfigManager;
use std::path::PathBuf;

mod commands;
mod remote;

const RECORD_TYPES: [&str; 4] = ["preferences", "cart", "wishlist", "interaction_history"];

fn build_cli() -> Command {
    Command::new("shopsync")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ShopSync Team")
        .about("Offline-first sync for shopping state across devices")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the user config dir)")
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Local record store directory (overrides storage.data_dir)")
                .global(true),
        )
        .arg(
            Arg::new("remote-dir")
                .long("remote-dir")
                .value_name("DIR")
                .help("Shared remote directory (overrides storage.remote_dir)")
                .global(true),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("USER_ID")
                .help("User to act on (overrides app.default_user)")
                .global(true),
        )
        .subcommand(Command::new("device-id").about("Print this install's device id"))
        .subcommand(
            Command::new("sync")
                .about("Run one synchronization pass")
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .value_name("STRATEGY")
                        .help("Conflict resolution strategy for this pass")
                        .value_parser(["latest_wins", "merge", "manual"]),
                )
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .help("Act as if the device were offline")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Write a payload for one record type")
                .arg(Arg::new("type").required(true).value_name("TYPE").value_parser(RECORD_TYPES).help("Record type"))
                .arg(Arg::new("payload").required(true).value_name("JSON").help("New payload as JSON"))
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .help("Queue the write instead of expecting a sync")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show local records")
                .arg(Arg::new("type").value_name("TYPE").value_parser(RECORD_TYPES).help("Only show this record type")),
        )
        .subcommand(Command::new("watch").about("Sync periodically until interrupted"))
        .subcommand(
            Command::new("queue")
                .about("Inspect the pending-write queue")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List queued writes"))
                .subcommand(Command::new("flush").about("Upload queued writes for the user")),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config file"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("validate").about("Check the config file for problems")),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate config directory")?;
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load config")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();

    let session = commands::Session::from_matches(manager, config, &matches);

    match matches.subcommand() {
        Some(("device-id", _)) => commands::show_device_id(&session).await,
        Some(("sync", sub_matches)) => commands::sync(&session, sub_matches).await,
        Some(("set", sub_matches)) => commands::set_record(&session, sub_matches).await,
        Some(("show", sub_matches)) => commands::show_records(&session, sub_matches).await,
        Some(("watch", _)) => commands::watch(&session).await,
        Some(("queue", sub_matches)) => match sub_matches.subcommand() {
            Some(("list", _)) => commands::queue_list(&session).await,
            Some(("flush", _)) => commands::queue_flush(&session).await,
            _ => unreachable!("subcommand_required"),
        },
        Some(("config", sub_matches)) => match sub_matches.subcommand() {
            Some(("init", _)) => commands::config_init(&session),
            Some(("show", _)) => commands::config_show(&session),
            Some(("validate", _)) => commands::config_validate(&session),
            _ => unreachable!("subcommand_required"),
        },
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
