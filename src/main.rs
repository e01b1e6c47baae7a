//! mqcore - wires the topics and sessions providers of an MQTT broker core
//!
//! Usage:
//!   mqcore [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>           Configuration file path
//!   -l, --log-level <LEVEL>       Log level (error, warn, info, debug, trace)
//!   --topics-provider <NAME>      Topics provider (mem, fjall)
//!   --sessions-provider <NAME>    Sessions provider (mem, fjall)
//!   --check                       Validate configuration and wiring, then exit
//!   -h, --help                    Print help

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use mqcore::config::Config;
use mqcore::persistence::{FjallBackend, PersistenceManager, StorageBackend};
use mqcore::registry::{Providers, FJALL};
use mqcore::sessions::{PersistentSessions, SessionsManager};
use mqcore::topics::{PersistentTopics, TopicsManager};

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    fn from_config(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::default(),
        }
    }
}

/// mqcore - MQTT subscription matching, retained messages and sessions
#[derive(Parser, Debug)]
#[command(name = "mqcore")]
#[command(version)]
#[command(about = "Subscription matching, retained messages and session state for MQTT brokers")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,

    /// Topics provider name
    #[arg(long)]
    topics_provider: Option<String>,

    /// Sessions provider name
    #[arg(long)]
    sessions_provider: Option<String>,

    /// Validate configuration and provider wiring, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    // CLI overrides config
    if let Some(name) = args.topics_provider {
        config.topics.provider = name;
    }
    if let Some(name) = args.sessions_provider {
        config.sessions.provider = name;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let log_level = args
        .log_level
        .unwrap_or_else(|| LogLevel::from_config(&config.log.level));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.to_tracing_level())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let mut providers = Providers::with_builtin(config.topics.qos_policy);

    let persistence = if config.persistence.enabled {
        let backend: Arc<dyn StorageBackend> =
            Arc::new(FjallBackend::open(&config.persistence.path)?);
        let manager = Arc::new(PersistenceManager::new(
            backend,
            config.persistence.flush_interval,
            config.persistence.max_batch_size,
        ));
        let data = manager.load_all().await?;

        providers.topics.register(
            FJALL,
            Arc::new(PersistentTopics::new(
                config.topics.qos_policy,
                manager.clone(),
                data.retained,
            )),
        );
        providers.sessions.register(
            FJALL,
            Arc::new(PersistentSessions::new(manager.clone(), data.sessions)),
        );
        Some(manager)
    } else {
        None
    };

    let topics = TopicsManager::new(&providers, &config.topics.provider)?;
    let sessions = SessionsManager::new(&providers, &config.sessions.provider)?;

    let stats = topics.stats();
    info!("mqcore ready");
    info!(
        "  Topics provider: {} (available: {})",
        topics.provider_name(),
        providers.topics.names().join(", ")
    );
    info!("  QoS policy: {:?}", config.topics.qos_policy);
    info!(
        "  Sessions provider: {} (available: {})",
        sessions.provider_name(),
        providers.sessions.names().join(", ")
    );
    if config.persistence.enabled {
        info!(
            "  Persistence: enabled ({}, flush every {:?}, batch {})",
            config.persistence.path.display(),
            config.persistence.flush_interval,
            config.persistence.max_batch_size
        );
    } else {
        info!("  Persistence: disabled");
    }
    info!(
        "  Restored: {} retained messages, {} sessions",
        stats.retained,
        sessions.count()
    );

    if !args.check {
        info!("Waiting for shutdown signal");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
    }

    if let Err(e) = topics.close() {
        error!("Failed to close topics provider: {}", e);
    }
    if let Err(e) = sessions.close() {
        error!("Failed to close sessions provider: {}", e);
    }
    if let Some(manager) = persistence {
        manager.shutdown().await?;
    }

    Ok(())
}
