use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tstack::config::Config;
use tstack::error::format_error;
use tstack::resource::{
    get_all_resource_keys, get_resource, Attrs, DeleteOptions, Entity, Query, Resize, WaitOptions,
};
use tstack::CloudClient;

/// OpenStack block storage and shared file system client
#[derive(Parser, Debug)]
#[command(name = "tstack", version, about, long_about = None)]
struct Args {
    /// Block storage endpoint (overrides config and OS_BLOCK_STORAGE_ENDPOINT)
    #[arg(long, global = true)]
    block_storage_endpoint: Option<String>,

    /// Shared file system endpoint (overrides config and OS_SHARED_FILE_SYSTEM_ENDPOINT)
    #[arg(long, global = true)]
    shared_file_system_endpoint: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long, global = true)]
    readonly: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Block storage volumes
    #[command(subcommand)]
    Volume(VolumeCommand),
    /// Shared file system shares
    #[command(subcommand)]
    Share(ShareCommand),
    /// List back-end storage pools
    Pools {
        #[arg(long)]
        detail: bool,
        #[command(flatten)]
        filters: Filters,
    },
    /// List shared file system user messages
    Messages {
        #[command(flatten)]
        filters: Filters,
    },
    /// Show a resource schema (or list known resource types)
    Schema { resource: Option<String> },
}

#[derive(ClapArgs, Debug, Clone)]
struct Filters {
    /// Server-side filter, repeatable: --filter status=available
    #[arg(long = "filter", value_parser = parse_key_val)]
    filters: Vec<(String, String)>,
}

impl Filters {
    fn query(&self) -> Query {
        self.filters.iter().cloned().collect()
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct WaitArgs {
    /// Status to wait for
    #[arg(long, default_value = "available")]
    status: String,
    /// Status that aborts the wait, repeatable
    #[arg(long = "failure", default_values_t = ["error".to_string()])]
    failures: Vec<String>,
    /// Seconds between checks
    #[arg(long)]
    interval: Option<u64>,
    /// Seconds before giving up
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone)]
struct WaitDeleteArgs {
    /// Seconds between checks
    #[arg(long)]
    interval: Option<u64>,
    /// Seconds before giving up
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum VolumeCommand {
    List {
        #[arg(long)]
        detail: bool,
        #[command(flatten)]
        filters: Filters,
    },
    Show { id: String },
    /// Create a volume from key=value attributes
    Create {
        #[arg(value_parser = parse_key_val)]
        attrs: Vec<(String, String)>,
    },
    Delete {
        id: String,
        /// Fail if the volume does not exist
        #[arg(long)]
        strict: bool,
    },
    Extend { id: String, size: i64 },
    SetReadonly {
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        readonly: bool,
    },
    Retype {
        id: String,
        new_type: String,
        #[arg(long, default_value = "never")]
        migration_policy: String,
    },
    Wait {
        id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    WaitDelete {
        id: String,
        #[command(flatten)]
        wait: WaitDeleteArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ShareCommand {
    List {
        #[arg(long)]
        detail: bool,
        #[command(flatten)]
        filters: Filters,
    },
    Show { id: String },
    /// Create a share from key=value attributes
    Create {
        #[arg(value_parser = parse_key_val)]
        attrs: Vec<(String, String)>,
    },
    Delete {
        id: String,
        /// Fail if the share does not exist
        #[arg(long)]
        strict: bool,
    },
    Resize {
        id: String,
        size: i64,
        #[arg(long)]
        no_shrink: bool,
        #[arg(long)]
        no_extend: bool,
        #[arg(long)]
        force: bool,
    },
    Revert { id: String, snapshot_id: String },
    ExportLocations { id: String },
    AccessList { id: String },
    Snapshots {
        #[arg(long)]
        detail: bool,
        #[command(flatten)]
        filters: Filters,
    },
    Wait {
        id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    WaitDelete {
        id: String,
        #[command(flatten)]
        wait: WaitDeleteArgs,
    },
}

impl Command {
    fn is_write(&self) -> bool {
        match self {
            Command::Volume(cmd) => matches!(
                cmd,
                VolumeCommand::Create { .. }
                    | VolumeCommand::Delete { .. }
                    | VolumeCommand::Extend { .. }
                    | VolumeCommand::SetReadonly { .. }
                    | VolumeCommand::Retype { .. }
            ),
            Command::Share(cmd) => matches!(
                cmd,
                ShareCommand::Create { .. }
                    | ShareCommand::Delete { .. }
                    | ShareCommand::Resize { .. }
                    | ShareCommand::Revert { .. }
            ),
            _ => false,
        }
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

/// Turn CLI key=value pairs into attributes; JSON literals are parsed as such
fn attrs_from_pairs(pairs: &[(String, String)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(v).unwrap_or_else(|_| serde_json::Value::String(v.clone()));
            (k.clone(), value)
        })
        .collect()
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tstack started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tstack").join("tstack.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tstack").join("tstack.log");
    }
    PathBuf::from("tstack.log")
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", out.trim_end());
    Ok(())
}

fn wait_options(config: &Config, interval: Option<u64>, timeout: Option<u64>) -> WaitOptions {
    WaitOptions::from_secs(
        interval.unwrap_or_else(|| config.effective_poll_interval()),
        timeout.unwrap_or_else(|| config.effective_wait()),
    )
}

fn delete_options(strict: bool) -> DeleteOptions {
    if strict {
        DeleteOptions::strict()
    } else {
        DeleteOptions::default()
    }
}

fn failures(wait: &WaitArgs) -> Vec<&str> {
    wait.failures.iter().map(String::as_str).collect()
}

async fn run_volume(client: &CloudClient, config: &Config, format: OutputFormat, cmd: VolumeCommand) -> Result<()> {
    let volumes = client.block_storage();
    match cmd {
        VolumeCommand::List { detail, filters } => print(format, &volumes.volumes(detail, &filters.query()).await?),
        VolumeCommand::Show { id } => print(format, &volumes.get_volume(&id).await?),
        VolumeCommand::Create { attrs } => print(format, &volumes.create_volume(&attrs_from_pairs(&attrs)).await?),
        VolumeCommand::Delete { id, strict } => Ok(volumes.delete_volume(&id, delete_options(strict)).await?),
        VolumeCommand::Extend { id, size } => Ok(volumes.extend_volume(&id, size).await?),
        VolumeCommand::SetReadonly { id, readonly } => Ok(volumes.set_volume_readonly(&id, readonly).await?),
        VolumeCommand::Retype {
            id,
            new_type,
            migration_policy,
        } => Ok(volumes.retype_volume(&id, &new_type, &migration_policy).await?),
        VolumeCommand::Wait { id, wait } => {
            let volume = volumes.get_volume(&id).await?;
            let volume = volumes
                .wait_for_status(
                    volume,
                    &wait.status,
                    &failures(&wait),
                    wait_options(config, wait.interval, wait.timeout),
                )
                .await?;
            print(format, &volume)
        },
        VolumeCommand::WaitDelete { id, wait } => {
            let def = get_resource("volume").context("volume schema missing")?;
            Ok(volumes
                .wait_for_delete(&Entity::reference(def, &id), wait_options(config, wait.interval, wait.timeout))
                .await?)
        },
    }
}

async fn run_share(client: &CloudClient, config: &Config, format: OutputFormat, cmd: ShareCommand) -> Result<()> {
    let shares = client.shared_file_system();
    match cmd {
        ShareCommand::List { detail, filters } => print(format, &shares.shares(detail, &filters.query()).await?),
        ShareCommand::Show { id } => print(format, &shares.get_share(&id).await?),
        ShareCommand::Create { attrs } => print(format, &shares.create_share(&attrs_from_pairs(&attrs)).await?),
        ShareCommand::Delete { id, strict } => Ok(shares.delete_share(&id, delete_options(strict)).await?),
        ShareCommand::Resize {
            id,
            size,
            no_shrink,
            no_extend,
            force,
        } => {
            match shares.resize_share(&id, size, no_shrink, no_extend, force).await? {
                Some(Resize::Extend { new_size, .. }) => eprintln!("Extending share {} to {} GiB", id, new_size),
                Some(Resize::Shrink { new_size }) => eprintln!("Shrinking share {} to {} GiB", id, new_size),
                None => eprintln!("Share {} left unchanged", id),
            }
            Ok(())
        },
        ShareCommand::Revert { id, snapshot_id } => Ok(shares.revert_share_to_snapshot(&id, &snapshot_id).await?),
        ShareCommand::ExportLocations { id } => print(format, &shares.export_locations(&id).await?),
        ShareCommand::AccessList { id } => print(format, &shares.access_rules(&id, &Query::new()).await?),
        ShareCommand::Snapshots { detail, filters } => {
            print(format, &shares.share_snapshots(detail, &filters.query()).await?)
        },
        ShareCommand::Wait { id, wait } => {
            let share = shares.get_share(&id).await?;
            let share = shares
                .wait_for_status(
                    share,
                    &wait.status,
                    &failures(&wait),
                    wait_options(config, wait.interval, wait.timeout),
                )
                .await?;
            print(format, &share)
        },
        ShareCommand::WaitDelete { id, wait } => {
            let def = get_resource("share").context("share schema missing")?;
            Ok(shares
                .wait_for_delete(&Entity::reference(def, &id), wait_options(config, wait.interval, wait.timeout))
                .await?)
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load().with_env();
    if args.block_storage_endpoint.is_some() {
        config.block_storage_endpoint = args.block_storage_endpoint.clone();
    }
    if args.shared_file_system_endpoint.is_some() {
        config.shared_file_system_endpoint = args.shared_file_system_endpoint.clone();
    }

    if args.readonly && args.command.is_write() {
        anyhow::bail!("Refusing to run a write operation in read-only mode");
    }

    let client = CloudClient::from_config(&config)?;
    let format = args.output;

    match args.command {
        Command::Volume(cmd) => run_volume(&client, &config, format, cmd).await,
        Command::Share(cmd) => run_share(&client, &config, format, cmd).await,
        Command::Pools { detail, filters } => print(
            format,
            &client
                .shared_file_system()
                .storage_pools(detail, &filters.query())
                .await?,
        ),
        Command::Messages { filters } => print(
            format,
            &client.shared_file_system().user_messages(&filters.query()).await?,
        ),
        Command::Schema { resource: None } => print(format, &get_all_resource_keys()),
        Command::Schema { resource: Some(key) } => {
            let def = get_resource(&key).with_context(|| format!("Unknown resource: {}", key))?;
            let fields: Vec<_> = def
                .fields
                .iter()
                .map(|f| (f.name.as_str(), f.wire_key.as_str(), format!("{:?}", f.kind)))
                .collect();
            print(format, &fields)
        },
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:?}", err);
        let message = match err.downcast_ref::<tstack::Error>() {
            Some(e) => format_error(e),
            None => err.to_string(),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_delete_accepts_timing_flags_only() {
        let args = Args::try_parse_from(["tstack", "share", "wait-delete", "s1", "--interval", "1", "--timeout", "30"])
            .unwrap();
        match args.command {
            Command::Share(ShareCommand::WaitDelete { id, wait }) => {
                assert_eq!(id, "s1");
                assert_eq!(wait.interval, Some(1));
                assert_eq!(wait.timeout, Some(30));
            },
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Args::try_parse_from(["tstack", "volume", "wait-delete", "v1", "--status", "deleted"]).is_err());
        assert!(Args::try_parse_from(["tstack", "share", "wait-delete", "s1", "--failure", "error"]).is_err());
    }

    #[test]
    fn test_wait_keeps_status_and_failures() {
        let args = Args::try_parse_from(["tstack", "volume", "wait", "v1", "--status", "in-use"]).unwrap();
        match args.command {
            Command::Volume(VolumeCommand::Wait { wait, .. }) => {
                assert_eq!(wait.status, "in-use");
                assert_eq!(wait.failures, vec!["error".to_string()]);
            },
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_delete_is_lenient_unless_strict() {
        assert_eq!(delete_options(false), DeleteOptions::default());
        assert_eq!(delete_options(true), DeleteOptions::strict());

        let args = Args::try_parse_from(["tstack", "--readonly", "share", "delete", "s1"]).unwrap();
        assert!(args.readonly && args.command.is_write());
    }
}
