// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer: reads the configuration, wires the HTTP address
// source, the Cloudflare record store and the notifier into a `Reconciler`,
// and dispatches the selected command. Reconciliation logic lives in
// cfddns-core.
//
// ## Commands
//
// - (none): reconcile every `engine.interval_secs` until SIGTERM/SIGINT
// - `once`: one pass, exit 1 if any family failed
// - `now`: print the current record content per family
// - `v4 <IP>` / `v6 <IP>`: set the record to the given address
// - `tgtest`: send a test notification
//
// ## Configuration
//
// TOML file at `--config` (or `CFDDNS_CONFIG`, default `conf.toml`). A missing
// file is replaced by a commented template and the process exits with 1.
// `CFDDNS_API_TOKEN` and `CFDDNS_TG_TOKEN` override the secrets in the file.
//
// ## Example
//
// ```bash
// export CFDDNS_API_TOKEN=...
// cfddnsd --config /etc/cfddns/conf.toml
// ```

mod cli;

use anyhow::{Context, Result};
use cfddns_core::traits::{AddressFamily, NoopNotifier, Notifier};
use cfddns_core::{AddressResolver, CfDdnsConfig, Error, Reconciler};
use cfddns_ip_http::HttpAddressSource;
use cfddns_notify_telegram::TelegramNotifier;
use cfddns_provider_cloudflare::CloudflareRecordStore;
use clap::Parser;
use cli::{Cli, Command};
use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Message sent by `tgtest`
const TEST_MESSAGE: &str = "This is a test message from cfddns.";

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown or successful command
/// - 1: Configuration error or failed single-shot command
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error, or a single-shot command that failed
    Failure = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Why a configuration could not be used
#[derive(Debug)]
enum ConfigFailure {
    /// No file existed; a template was written in its place
    TemplateWritten,
    /// The file could not be read, parsed, or validated
    Invalid(anyhow::Error),
}

/// Load, override and validate the configuration at `path`
///
/// `lookup` resolves environment overrides.
fn load_config(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> std::result::Result<CfDdnsConfig, ConfigFailure> {
    if !path.exists() {
        CfDdnsConfig::write_default(path)
            .with_context(|| format!("Failed to write configuration template to {}", path.display()))
            .map_err(ConfigFailure::Invalid)?;
        return Err(ConfigFailure::TemplateWritten);
    }

    let mut config = CfDdnsConfig::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))
        .map_err(ConfigFailure::Invalid)?;
    config.apply_overrides(lookup);
    config
        .validate()
        .context("Configuration validation error")
        .map_err(ConfigFailure::Invalid)?;
    Ok(config)
}

/// Build the log filter: `RUST_LOG` wins, then the configured level
fn log_filter(level: &str) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::try_from_default_env().context("Invalid RUST_LOG environment variable");
    }
    EnvFilter::try_new(level).with_context(|| format!("Invalid log.level '{}'", level))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(ConfigFailure::TemplateWritten) => {
            eprintln!(
                "Configuration file not found. A template was written to {}; \
                 fill in your Cloudflare credentials and run again.",
                cli.config.display()
            );
            return DdnsExitCode::Failure.into();
        }
        Err(ConfigFailure::Invalid(e)) => {
            eprintln!("{:#}", e);
            return DdnsExitCode::Failure.into();
        }
    };

    let filter = match log_filter(&config.log.level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{:#}", e);
            return DdnsExitCode::Failure.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::Failure.into();
    }

    debug!("Configuration loaded: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(cli.command, config).await {
            Ok(code) => code,
            Err(e) => {
                error!("{:#}", e);
                DdnsExitCode::Failure
            }
        }
    });

    code.into()
}

/// Wire the components into a reconciler
fn build_reconciler(config: &CfDdnsConfig) -> Result<Reconciler> {
    let source = HttpAddressSource::from_config(&config.discovery);
    let resolver = AddressResolver::with_policy(
        Box::new(source),
        config.discovery.attempts(),
        config.discovery.retry_delay(),
    );

    let store = CloudflareRecordStore::from_config(&config.cloudflare)
        .context("Failed to create Cloudflare record store")?;

    let notifier: Box<dyn Notifier> = if config.notify.enabled {
        Box::new(
            TelegramNotifier::from_config(&config.notify)
                .context("Failed to create Telegram notifier")?,
        )
    } else {
        info!("Notifications disabled");
        Box::new(NoopNotifier)
    };

    Ok(Reconciler::new(
        resolver,
        Box::new(store),
        notifier,
        config.reconcile_settings(),
    )?)
}

/// Dispatch `command`
async fn run(command: Option<Command>, config: CfDdnsConfig) -> Result<DdnsExitCode> {
    match command {
        None => {
            let reconciler = build_reconciler(&config)?;
            let shutdown = shutdown_signal()?;
            info!("Starting cfddnsd {}", env!("CARGO_PKG_VERSION"));
            reconciler
                .run_with_shutdown(config.engine.interval(), shutdown)
                .await;
            info!("Shutting down daemon");
            Ok(DdnsExitCode::CleanShutdown)
        }
        Some(Command::Once) => {
            let report = build_reconciler(&config)?.run_pass().await;
            Ok(if report.has_failures() {
                DdnsExitCode::Failure
            } else {
                DdnsExitCode::CleanShutdown
            })
        }
        Some(Command::Now) => Ok(print_current_records(&build_reconciler(&config)?).await),
        Some(Command::V4 { ip }) => force_set(&build_reconciler(&config)?, AddressFamily::V4, &ip).await,
        Some(Command::V6 { ip }) => force_set(&build_reconciler(&config)?, AddressFamily::V6, &ip).await,
        // Needs only the notifier, so broken Cloudflare settings do not block it
        Some(Command::Tgtest) => send_test_notification(&config).await,
    }
}

async fn print_current_records(reconciler: &Reconciler) -> DdnsExitCode {
    let name = &reconciler.settings().record_name;
    let mut code = DdnsExitCode::CleanShutdown;

    for (family, record) in reconciler.current_records().await {
        match record {
            Ok(Some(record)) => println!(
                "{} ({}) record for {}: {}",
                family,
                family.record_type(),
                name,
                record.content
            ),
            Ok(None) => println!("{} ({}) record for {}: not found", family, family.record_type(), name),
            Err(e) => {
                error!("Failed to fetch {} record for {}: {}", family, name, e);
                code = DdnsExitCode::Failure;
            }
        }
    }

    code
}

async fn force_set(reconciler: &Reconciler, family: AddressFamily, ip: &str) -> Result<DdnsExitCode> {
    let outcome = match reconciler.force_set(family, ip).await {
        Ok(outcome) => outcome,
        Err(Error::InvalidInput(message)) => {
            error!("{}", message);
            return Ok(DdnsExitCode::Failure);
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", outcome.describe(family, &reconciler.settings().record_name));
    Ok(if outcome.is_failure() {
        DdnsExitCode::Failure
    } else {
        DdnsExitCode::CleanShutdown
    })
}

/// Send [`TEST_MESSAGE`], surfacing delivery errors
async fn send_test_notification(config: &CfDdnsConfig) -> Result<DdnsExitCode> {
    if !config.notify.enabled {
        warn!("Notifications are disabled; set notify.enabled = true to test them");
        return Ok(DdnsExitCode::Failure);
    }

    let notifier = TelegramNotifier::from_config(&config.notify)?;
    match notifier.send(TEST_MESSAGE).await {
        Ok(()) => {
            info!("Test notification sent");
            Ok(DdnsExitCode::CleanShutdown)
        }
        Err(e) => {
            error!("Test notification failed: {}", e);
            Ok(DdnsExitCode::Failure)
        }
    }
}

/// Install shutdown handlers (SIGTERM, SIGINT)
///
/// The handlers are live once this returns, so a signal that arrives during
/// the first pass is still seen. The returned future resolves on the first
/// signal.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Install the Ctrl-C handler
///
/// Fallback implementation for Windows.
#[cfg(windows)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c().context("Failed to setup Ctrl-C handler")?;

    Ok(async move {
        ctrl_c.recv().await;
        info!("Received shutdown signal: Ctrl-C");
    })
}
