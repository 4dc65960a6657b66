// FILE: crates/cli/src/commands.rs

use crate::remote::DirectoryGateway;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use shopsync_config::{Config, ConfigManager, DriverConfig};
use shopsync_core::{RecordType, ResolutionStrategy, SyncRecord};
use shopsync_resilience::RetryPolicy;
use shopsync_sync_engine::{
    DriverSettings, EngineSettings, FileStore, SyncDriver, SyncEngine, SyncResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, resolved from flags and config
pub struct Session {
    pub manager: ConfigManager,
    pub config: Config,
    pub data_dir: PathBuf,
    pub remote_dir: PathBuf,
    pub user: Option<String>,
}

impl Session {
    /// Resolves directories and the user from global flags over config
    pub fn from_matches(manager: ConfigManager, config: Config, matches: &ArgMatches) -> Self {
        let data_dir = matches
            .get_one::<String>("data-dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| manager.resolve_path(&config.storage.data_dir));
        let remote_dir = matches
            .get_one::<String>("remote-dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| manager.resolve_path(&config.storage.remote_dir));
        let user = matches
            .get_one::<String>("user")
            .cloned()
            .or_else(|| config.app.default_user.clone());

        Self {
            manager,
            config,
            data_dir,
            remote_dir,
            user,
        }
    }

    fn user(&self) -> Result<&str> {
        match self.user.as_deref() {
            Some(user) if !user.trim().is_empty() => Ok(user),
            _ => bail!("No user given. Pass --user or set app.default_user in the config"),
        }
    }

    async fn engine(&self, offline: bool) -> Result<SyncEngine> {
        let store = FileStore::open(&self.data_dir)
            .await
            .with_context(|| format!("Failed to open data directory {}", self.data_dir.display()))?;
        let gateway = DirectoryGateway::new(&self.remote_dir);
        let settings = EngineSettings {
            strategy: self.config.engine.strategy,
            online: self.config.engine.start_online && !offline,
            tolerance_window_ms: self.config.engine.tolerance_window_ms,
            platform: self.config.engine.platform.clone(),
        };
        Ok(SyncEngine::new(Arc::new(store), Arc::new(gateway), settings))
    }
}

/// Print this install's device id
pub async fn show_device_id(session: &Session) -> Result<()> {
    let engine = session.engine(false).await?;
    println!("{}", engine.device_id().await);
    Ok(())
}

/// Run one sync pass for the user
pub async fn sync(session: &Session, matches: &ArgMatches) -> Result<()> {
    let user = session.user()?;
    let engine = session.engine(matches.get_flag("offline")).await?;

    if let Some(strategy) = matches.get_one::<String>("strategy") {
        let strategy: ResolutionStrategy = strategy.parse()?;
        engine.set_conflict_resolution_strategy(strategy)?;
    }

    let drained = engine
        .process_sync_queue(user)
        .await
        .context("Failed to upload queued writes")?;
    if drained > 0 {
        println!("{} Uploaded {} queued writes", style("↑").cyan(), drained);
    }

    let result = engine.sync_user_data(user).await;
    print_result(user, &result);
    if !result.success && !result.is_offline() {
        bail!("Sync failed");
    }
    Ok(())
}

/// Keep syncing on the configured interval until Ctrl-C
pub async fn watch(session: &Session) -> Result<()> {
    let user = session.user()?.to_string();
    let engine = Arc::new(session.engine(false).await?);
    let settings = driver_settings(&session.config.driver)?;
    let driver = SyncDriver::new(engine, user.clone(), settings);

    let result = driver.force_sync().await;
    print_result(&user, &result);

    if !driver.start_auto_sync() {
        println!("Auto sync is disabled (driver.auto_sync = false)");
        return Ok(());
    }
    println!(
        "Syncing {} every {}s, press Ctrl-C to stop",
        style(&user).bold(),
        session.config.driver.auto_sync_interval_secs
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    driver.stop_auto_sync();

    let status = driver.status()?;
    println!(
        "\nStopped. State: {:?}, consecutive failures: {}",
        status.state, status.consecutive_failures
    );
    Ok(())
}

fn driver_settings(config: &DriverConfig) -> Result<DriverSettings> {
    let backoff = RetryPolicy::new(Duration::from_millis(config.backoff_initial_ms))
        .with_max_delay(Duration::from_secs(config.backoff_max_secs));
    backoff.validate()?;

    Ok(DriverSettings {
        auto_sync: config.auto_sync,
        interval: Duration::from_secs(config.auto_sync_interval_secs),
        sync_on_foreground: config.sync_on_foreground,
        backoff,
    })
}

/// Write a payload for one record type
pub async fn set_record(session: &Session, matches: &ArgMatches) -> Result<()> {
    let user = session.user()?;
    let record_type = parse_record_type(matches)?
        .ok_or_else(|| anyhow::anyhow!("Record type is required"))?;
    let raw = matches
        .get_one::<String>("payload")
        .ok_or_else(|| anyhow::anyhow!("Payload is required"))?;
    let payload: serde_json::Value =
        serde_json::from_str(raw).context("Payload is not valid JSON")?;

    let engine = session.engine(matches.get_flag("offline")).await?;
    let record = engine.write_local(user, record_type, payload).await?;

    println!(
        "{} Wrote {} v{}",
        style("✓").green().bold(),
        record.id,
        record.version
    );
    if !engine.is_device_online()? {
        println!("  Queued for upload ({} pending)", engine.queue().len().await?);
    }
    Ok(())
}

/// Show local records for the user
pub async fn show_records(session: &Session, matches: &ArgMatches) -> Result<()> {
    let user = session.user()?;
    let filter = parse_record_type(matches)?;
    let engine = session.engine(false).await?;

    let records: Vec<SyncRecord> = engine
        .load_local_records(user)
        .await?
        .into_iter()
        .filter(|r| filter.is_none_or(|t| r.record_type == t))
        .collect();

    if records.is_empty() {
        println!("No local records for {}.", user);
        return Ok(());
    }

    println!("\n{} Local Records for {}", style(records.len()).bold().cyan(), user);
    println!("{}", "=".repeat(80));
    for record in &records {
        print_record(record);
    }
    Ok(())
}

/// List queued writes
pub async fn queue_list(session: &Session) -> Result<()> {
    let engine = session.engine(false).await?;
    let entries = engine.queue().entries().await?;

    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!("\n{} Queued Writes", style(entries.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for entry in entries {
        println!(
            "{}  {}  {} v{}  queued at {}",
            style(truncate(&entry.entry_id, 8)).dim(),
            entry.user_id,
            style(&entry.record.id).bold(),
            entry.record.version,
            entry.queued_at
        );
    }
    Ok(())
}

/// Upload the user's queued writes
pub async fn queue_flush(session: &Session) -> Result<()> {
    let user = session.user()?;
    let engine = session.engine(false).await?;
    if !engine.is_device_online()? {
        bail!("Engine starts offline (engine.start_online = false); nothing was uploaded");
    }

    let drained = engine
        .process_sync_queue(user)
        .await
        .context("Failed to upload queued writes")?;
    println!("{} Uploaded {} queued writes", style("✓").green().bold(), drained);
    Ok(())
}

/// Write a default config file
pub fn config_init(session: &Session) -> Result<()> {
    if session.manager.initialize()? {
        println!(
            "{} Created {}",
            style("✓").green().bold(),
            session.manager.config_path().display()
        );
    } else {
        println!(
            "Config already exists at {}",
            session.manager.config_path().display()
        );
    }
    Ok(())
}

/// Print the effective config as TOML
pub fn config_show(session: &Session) -> Result<()> {
    println!("# {}", session.manager.config_path().display());
    let rendered = session
        .config
        .to_toml_string()
        .context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}

/// Validate the config file
pub fn config_validate(session: &Session) -> Result<()> {
    let problems = session.manager.validate()?;
    if problems.is_empty() {
        println!("{} Config is valid", style("✓").green().bold());
        return Ok(());
    }

    for problem in &problems {
        println!("{} {}", style("✗").red().bold(), problem);
    }
    bail!("{} config problem(s)", problems.len())
}

fn parse_record_type(matches: &ArgMatches) -> Result<Option<RecordType>> {
    matches
        .get_one::<String>("type")
        .map(|t| t.parse::<RecordType>())
        .transpose()
        .map_err(Into::into)
}

fn print_result(user: &str, result: &SyncResult) {
    if result.success {
        println!(
            "{} Synced {} records for {}",
            style("✓").green().bold(),
            result.synced_items,
            user
        );
    } else if result.is_offline() {
        println!("{} Device is offline, nothing synced", style("!").yellow().bold());
        return;
    } else {
        println!("{} Sync failed for {}", style("✗").red().bold(), user);
        for error in &result.errors {
            println!("  {}", error);
        }
        return;
    }

    if result.has_conflicts() {
        println!("  {} conflicts:", style(result.conflicts.len()).yellow());
        for conflict in &result.conflicts {
            println!(
                "    {} {} (local v{} / remote v{})",
                conflict.record_id(),
                conflict.conflict_type,
                conflict.local.version,
                conflict.remote.version
            );
        }
    }
}

fn print_record(record: &SyncRecord) {
    println!(
        "{} {}  v{}  {} ({})",
        style("•").cyan(),
        style(&record.id).bold(),
        record.version,
        truncate(&record.device_id, 24),
        record.platform
    );
    println!("  {}", record.payload);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
