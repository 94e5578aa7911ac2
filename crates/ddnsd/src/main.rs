// # ddnsd - single-pass DDNS updater
//
// Thin integration layer: all reconcile logic lives in ddns-core.
//
// ddnsd is responsible for:
// 1. Parsing the command line and loading the TOML configuration
// 2. Initializing logging
// 3. Wiring the DNSPod provider, HTTP IP detector and system resolver
// 4. Running exactly one reconcile pass and mapping the result to an exit code
//
// It is meant to be run periodically by cron or a systemd timer; it keeps
// no state between invocations.
//
// ## Configuration
//
// ```toml
// enable = true
//
// [tencent]
// secretid = "AKID..."
// secretkey = "..."
//
// [dns]
// domain = "example.com"
// subdomain = "home"
// enableIPv6 = true
//
// [log]
// level = "info"
// file = "ddns.log"
// ```
//
// ## Environment
//
// - `DDNS_CONFIG`: path to the configuration file (default `config.toml`)
// - `DDNS_LOG_LEVEL`: overrides `[log] level`
// - `DDNS_MODE=dry-run`: read records but only log writes
//
// ## Example
//
// ```bash
// */5 * * * * /usr/local/bin/ddnsd --config /etc/ddns/config.toml
// ```

use anyhow::Context;
use clap::Parser;
use ddns_core::config::validate_log_level;
use ddns_core::{Error, Outcome, ReconcileConfig, ReconcileReport, Reconciler, SystemResolver};
use ddns_ip_http::HttpIpDetector;
use ddns_provider_dnspod::DnspodProvider;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Pass completed (including disabled and unchanged)
/// - 1: Configuration or startup error, before any network activity
/// - 2: Runtime error (IP detection, provider transport)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Pass completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&Error> for DdnsExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) => DdnsExitCode::ConfigError,
            _ => DdnsExitCode::RuntimeError,
        }
    }
}

/// Keep a DNSPod A/AAAA record in sync with this host's public address
#[derive(Debug, Parser)]
#[command(name = "ddnsd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "DDNS_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the file
    #[arg(long, env = "DDNS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Read records but only log create/update/delete calls
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// `--dry-run` or `DDNS_MODE=dry-run`
    fn dry_run(&self) -> bool {
        self.dry_run
            || std::env::var("DDNS_MODE").is_ok_and(|mode| mode.eq_ignore_ascii_case("dry-run"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Everything here happens before any network activity
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("ddnsd {} starting for {}", env!("CARGO_PKG_VERSION"), config.fqdn());

    // One pass, strictly sequential
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let dry_run = cli.dry_run();
    let code = rt.block_on(async move {
        tokio::select! {
            code = run_once(config, dry_run) => code,
            signal = wait_for_shutdown() => {
                warn!("Received {} during the pass, stopping", signal);
                DdnsExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Load, override and validate the configuration
fn load_config(cli: &Cli) -> anyhow::Result<ReconcileConfig> {
    let mut config = ReconcileConfig::load(&cli.config)?;

    if let Some(level) = &cli.log_level {
        validate_log_level(level)?;
        config.log.level = level.clone();
    }

    config
        .validate()
        .with_context(|| format!("{} is invalid", cli.config.display()))?;
    Ok(config)
}

/// Log to the configured file (append) or to stderr
fn init_tracing(config: &ReconcileConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(config.log.level.to_lowercase())
        .with_context(|| format!("invalid log level '{}'", config.log.level))?;

    match &config.log.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
    }

    Ok(())
}

/// Wire the components and run one reconcile pass
async fn run_once(config: ReconcileConfig, dry_run: bool) -> DdnsExitCode {
    if dry_run {
        info!("Dry-run mode: provider writes will only be logged");
    }

    let components = DnspodProvider::new(config.tencent.clone(), dry_run).and_then(|provider| {
        let detector = HttpIpDetector::from_config(&config.ip)?;
        Ok((provider, detector))
    });
    let (provider, detector) = match components {
        Ok(components) => components,
        Err(e) => {
            error!("Startup failed: {}", e);
            return DdnsExitCode::from(&e);
        }
    };

    let (reconciler, mut events) = match Reconciler::new(Box::new(provider), config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Startup failed: {}", e);
            return DdnsExitCode::from(&e);
        }
    };

    let result = reconciler.run(&detector, &SystemResolver).await;

    while let Ok(event) = events.try_recv() {
        debug!("event: {:?}", event);
    }

    match result {
        Ok(report) => {
            log_report(&report);
            DdnsExitCode::Success
        }
        Err(e) => {
            error!("Pass aborted: {}", e);
            DdnsExitCode::from(&e)
        }
    }
}

fn log_report(report: &ReconcileReport) {
    match report.outcome {
        Outcome::Disabled => info!("Disabled by configuration"),
        Outcome::Unchanged => info!("Records up to date"),
        Outcome::Reconciled if report.failed() > 0 => warn!(
            "Pass finished with {} rejected sub-action(s) ({} applied, {} skipped)",
            report.failed(),
            report.applied(),
            report.skipped()
        ),
        Outcome::Reconciled => info!(
            "Pass finished: {} applied, {} skipped",
            report.applied(),
            report.skipped()
        ),
    }
}

/// Resolve on SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> &'static str {
    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        warn!("Failed to install signal handlers");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Resolve on CTRL-C
#[cfg(not(unix))]
async fn wait_for_shutdown() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Failed to wait for CTRL-C: {}", e);
            std::future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::try_parse_from(["ddnsd", "-c", "/etc/ddns.toml", "--log-level", "debug", "--dry-run"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ddns.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.dry_run());
    }

    #[test]
    fn exit_code_follows_error_class() {
        assert_eq!(
            DdnsExitCode::from(&Error::config("missing")),
            DdnsExitCode::ConfigError
        );
        assert_eq!(
            DdnsExitCode::from(&Error::network("unreachable")),
            DdnsExitCode::RuntimeError
        );
        assert_eq!(
            DdnsExitCode::from(&Error::transport("reset")),
            DdnsExitCode::RuntimeError
        );
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let cli = Cli::try_parse_from(["ddnsd", "--config", "/nonexistent/ddns/config.toml"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn log_level_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "enable = false\n").unwrap();
        let path = path.to_str().unwrap();

        let ok = Cli::try_parse_from(["ddnsd", "-c", path, "--log-level", "warn"]).unwrap();
        assert_eq!(load_config(&ok).unwrap().log.level, "warn");

        let bad = Cli::try_parse_from(["ddnsd", "-c", path, "--log-level", "loud"]).unwrap();
        assert!(load_config(&bad).is_err());
    }
}
