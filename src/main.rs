use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use regex::Regex;
use tamr_toolbox::active_jobs;
use tamr_toolbox::build_notifiers;
use tamr_toolbox::enforce_success;
use tamr_toolbox::latest_job;
use tamr_toolbox::metrics;
use tamr_toolbox::monitor_job;
use tamr_toolbox::AdminToolConfigStore;
use tamr_toolbox::ConfigQuery;
use tamr_toolbox::ConfigReconciler;
use tamr_toolbox::ConfigStore;
use tamr_toolbox::ConfigValue;
use tamr_toolbox::Error;
use tamr_toolbox::InstanceAdmin;
use tamr_toolbox::JobClient;
use tamr_toolbox::JobHandle;
use tamr_toolbox::JobState;
use tamr_toolbox::JobStatus;
use tamr_toolbox::MonitorExit;
use tamr_toolbox::MonitorOptions;
use tamr_toolbox::NotificationDispatcher;
use tamr_toolbox::Result;
use tamr_toolbox::TamrJobClient;
use tamr_toolbox::ToolboxConfig;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[derive(Parser, Debug)]
#[command(name = "tbox", author, version, about = "Toolbox for operating a Tamr instance", long_about = None)]
struct Cli {
    /// Settings file merged over the one named by TBOX_CONFIG_PATH
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print the toolbox metrics before exiting
    #[arg(long, global = true, default_value_t = false)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow a job until it ends and notify its state changes
    Monitor {
        job_id: String,

        #[arg(long)]
        poll_interval_ms: Option<u64>,

        #[arg(long)]
        timeout_ms: Option<u64>,

        /// States worth a notification, every state when omitted
        #[arg(long = "notify")]
        notify_states: Vec<JobState>,

        /// Exit with an error unless the job SUCCEEDED
        #[arg(long, default_value_t = false)]
        enforce_success: bool,
    },
    /// List jobs, most recent first
    Jobs {
        #[arg(long, conflicts_with = "latest")]
        active: bool,

        #[arg(long)]
        latest: bool,
    },
    /// Read or change the instance configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Start, stop or restart the instance
    Instance {
        #[command(subcommand)]
        action: InstanceAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    Get {
        #[arg(long, default_value_t = false)]
        user_defined: bool,

        #[arg(long = "name")]
        names: Vec<String>,

        #[arg(long)]
        regex: Option<String>,
    },
    /// Apply KEY=VALUE pairs and print every key that changed
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, ConfigValue)>,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceAction {
    Start(InstanceArgs),
    Stop(InstanceArgs),
    Restart(InstanceArgs),
}

#[derive(Args, Debug)]
struct InstanceArgs {
    /// Leave the dependencies (Elasticsearch, HBase, ...) alone
    #[arg(long, default_value_t = false)]
    no_dependencies: bool,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ToolboxConfig::new()?;
    if let Some(path) = &cli.config {
        settings = settings.with_override_config(path)?;
    }
    let settings = settings.validate()?;

    // Initializing Logs
    let _guard = init_observability(settings.logging.log_dir.as_deref())?;

    let result = run(cli.command, &settings).await;
    if let Err(e) = &result {
        error!("tbox failed: {}", e);
    }
    if cli.print_metrics {
        println!("{}", metrics::gather_text()?);
    }
    result
}

async fn run(
    command: Commands,
    settings: &ToolboxConfig,
) -> Result<()> {
    match command {
        Commands::Monitor {
            job_id,
            poll_interval_ms,
            timeout_ms,
            notify_states,
            enforce_success: enforce,
        } => {
            let mut options = MonitorOptions::from_config(&settings.monitor, &settings.retry)
                .with_notify_states(notify_states);
            if let Some(ms) = poll_interval_ms {
                options = options.with_poll_interval(Duration::from_millis(ms));
            }
            if let Some(ms) = timeout_ms {
                options = options.with_timeout(Some(Duration::from_millis(ms)));
            }
            monitor(settings, JobHandle::new(job_id), options, enforce).await
        }
        Commands::Jobs { active, latest } => {
            let client = TamrJobClient::from_config(&settings.instance)?;
            let jobs = if active {
                active_jobs(&client).await?
            } else if latest {
                latest_job(&client).await?.into_iter().collect()
            } else {
                client.list_jobs().await?
            };
            for job in &jobs {
                print_job(job);
            }
            Ok(())
        }
        Commands::Config { command } => {
            let admin = Arc::new(InstanceAdmin::from_config(&settings.instance, &settings.retry));
            let store = Arc::new(AdminToolConfigStore::new(admin));
            match command {
                ConfigCommands::Get {
                    user_defined,
                    names,
                    regex,
                } => {
                    let mut query = ConfigQuery::all().with_user_defined_only(user_defined);
                    if !names.is_empty() {
                        query.names = Some(names);
                    }
                    if let Some(pattern) = regex {
                        let regex = Regex::new(&pattern)
                            .map_err(|e| Error::Fatal(format!("invalid --regex {}: {}", pattern, e)))?;
                        query = query.with_regex(regex);
                    }
                    for (key, value) in store.get_configs(&query).await?.iter() {
                        println!("{}: {}", key, value);
                    }
                    Ok(())
                }
                ConfigCommands::Set { assignments } => {
                    let requested: BTreeMap<String, ConfigValue> = assignments.into_iter().collect();
                    let changes = ConfigReconciler::new(store).reconcile(&requested).await?;
                    for (key, change) in changes.iter() {
                        println!("{}: {} -> {} ({})", key, change.previous, change.current, change.kind);
                    }
                    Ok(())
                }
            }
        }
        Commands::Instance { action } => {
            let admin = InstanceAdmin::from_config(&settings.instance, &settings.retry);
            match action {
                InstanceAction::Start(args) => admin.start_tamr(!args.no_dependencies).await?,
                InstanceAction::Stop(args) => admin.stop_tamr(!args.no_dependencies).await?,
                InstanceAction::Restart(args) => admin.restart_tamr(!args.no_dependencies).await?,
            }
            Ok(())
        }
    }
}

async fn monitor(
    settings: &ToolboxConfig,
    handle: JobHandle,
    options: MonitorOptions,
    enforce: bool,
) -> Result<()> {
    let client = Arc::new(TamrJobClient::from_config(&settings.instance)?);
    let channels = build_notifiers(&settings.notifications)?;
    let host = settings
        .notifications
        .host_label
        .clone()
        .unwrap_or_else(|| client.host());
    let dispatcher = NotificationDispatcher::with_channels(channels, host, settings.retry.dispatch);

    // Listen on Shutdown Signal
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
            return;
        }
        trigger.cancel();
    });

    let report = monitor_job(client, &dispatcher, handle, options, cancel).await?;
    let failed = report.failed_deliveries().count();
    if failed > 0 {
        info!("{} of {} notifications could not be delivered", failed, report.deliveries.len());
    }

    match &report.exit {
        MonitorExit::Terminal { status } => {
            print_job(status);
            if enforce {
                enforce_success(status)?;
            }
        }
        MonitorExit::Timeout { elapsed, .. } => {
            println!("Gave up after {:?}", elapsed);
        }
        MonitorExit::Cancelled { .. } => {
            println!("Monitoring cancelled");
        }
    }
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }
    Ok(())
}

fn print_job(status: &JobStatus) {
    println!(
        "{}\t{}\t{}",
        status.handle,
        status.state,
        status.description.as_deref().unwrap_or("")
    );
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, ConfigValue), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), ConfigValue::parse_cli(value))),
        _ => Err(format!("expected KEY=VALUE, got {}", raw)),
    }
}

/// Logs go to stderr, or to `{log_dir}/tbox.log` when a log directory is configured.
/// The returned guard flushes the file writer and must live as long as `main`.
pub fn init_observability(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let log_file = tracing_appender::rolling::never(log_dir, "tbox.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let base_subscriber = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter());
            tracing_subscriber::registry().with(base_subscriber).init();
            Ok(Some(guard))
        }
        None => {
            let base_subscriber = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter());
            tracing_subscriber::registry().with(base_subscriber).init();
            Ok(None)
        }
    }
}
