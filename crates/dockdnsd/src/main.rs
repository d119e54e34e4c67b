// # dockdnsd - DockDNS Daemon
//
// A THIN integration layer: all reconciliation, scheduling and provider
// logic lives in the library crates. The daemon:
//
// 1. Parses the command line
// 2. Loads the configuration (TOML file + `DOCKDNS_*` environment overlay)
// 3. Installs the tracing subscriber
// 4. Registers providers and builds one provider per zone
// 5. Runs one pass (`interval < 0`) or the scheduler until SIGINT/SIGTERM
//
// ## Example
//
// ```bash
// dockdnsd --config /etc/dockdns/dockdns.toml
// DOCKDNS_DNS__PURGE_UNKNOWN=true dockdnsd --dry-run
// ```

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use dockdns_core::{
    AppConfig, EngineEvent, IntervalTrigger, ProviderRegistry, Scheduler, ShutdownHandle,
    SyncEngine, ZoneTarget,
};
use dockdns_ip_http::TraceIpSource;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Keeps DNS records in line with static configuration and container labels.
#[derive(Parser, Debug)]
#[command(name = "dockdnsd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "DOCKDNS_CONFIG", default_value = "dockdns.toml")]
    config: PathBuf,

    /// Log intended changes instead of writing them
    #[arg(long, env = "DOCKDNS_DRY_RUN")]
    dry_run: bool,
}

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DockdnsExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DockdnsExitCode> for ExitCode {
    fn from(code: DockdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match settings::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DockdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("{:#}", e);
        return DockdnsExitCode::ConfigError.into();
    }

    info!(
        config_file = %args.config.display(),
        zones = config.zones.len(),
        domains = config.domains.len(),
        dry_run = args.dry_run,
        "Starting dockdnsd"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DockdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let daemon = match Daemon::build(&config, args.dry_run) {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return DockdnsExitCode::ConfigError;
            }
        };

        match daemon.run(&config).await {
            Ok(()) => DockdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DockdnsExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Wired-up components
struct Daemon {
    engine: Arc<SyncEngine>,
    events: mpsc::Receiver<EngineEvent>,
    #[cfg(feature = "docker")]
    docker: Option<Arc<dockdns_docker::DockerClient>>,
}

impl Daemon {
    fn build(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let registry = ProviderRegistry::new();

        #[cfg(feature = "cloudflare")]
        dockdns_provider_cloudflare::register(&registry);
        #[cfg(feature = "technitium")]
        dockdns_provider_technitium::register(&registry);
        #[cfg(feature = "rfc2136")]
        dockdns_provider_rfc2136::register(&registry);

        info!(providers = ?registry.list_providers(), "Registered DNS providers");

        let mut targets = Vec::with_capacity(config.zones.len());
        for zone in &config.zones {
            let provider = registry
                .create_provider(zone, dry_run)
                .with_context(|| format!("Zone '{}'", zone.key()))?;
            targets.push(ZoneTarget::new(zone.clone(), provider));
        }

        let ip_source = TraceIpSource::new()?;
        let (engine, events) = SyncEngine::new(
            config.dns.clone(),
            config.domains.clone(),
            targets,
            Box::new(ip_source),
        )?;

        #[cfg(feature = "docker")]
        let docker = if config.docker.enabled {
            Some(Arc::new(dockdns_docker::DockerClient::from_config(
                &config.docker,
            )?))
        } else {
            info!("Docker integration disabled");
            None
        };

        #[cfg(feature = "docker")]
        let engine = match &docker {
            Some(client) => engine.with_domain_source(Box::new(client.as_ref().clone())),
            None => engine,
        };

        Ok(Self {
            engine: Arc::new(engine),
            events,
            #[cfg(feature = "docker")]
            docker,
        })
    }

    async fn run(self, config: &AppConfig) -> Result<()> {
        let Daemon {
            engine,
            events,
            #[cfg(feature = "docker")]
            docker,
        } = self;

        let reporter = tokio::spawn(report_events(events));

        if config.run_once() {
            info!("Running a single DNS update pass");
            engine.sync().await;
        } else {
            let mut scheduler = Scheduler::new(
                engine.clone(),
                config.debounce(),
                config.max_debounce(),
            )
            .with_run_at_start(true);

            if config.interval > 0 {
                scheduler.register(Arc::new(IntervalTrigger::new(config.interval())));
            }

            #[cfg(feature = "docker")]
            if let Some(client) = docker {
                scheduler.register(Arc::new(dockdns_core::DockerTrigger::new(client)));
            }

            let handle = ShutdownHandle::new();
            let listener = handle.listener();
            let scheduler_task = tokio::spawn(async move { scheduler.run(listener).await });

            let signal = wait_for_shutdown().await;
            match &signal {
                Ok(name) => info!("Received shutdown signal: {}", name),
                Err(e) => warn!("Signal handling failed, shutting down: {:#}", e),
            }

            handle.trigger();
            scheduler_task.await.context("Scheduler task failed")?;
            signal?;
        }

        // Closing the engine's event channel ends the reporter
        drop(engine);
        reporter.await.context("Event reporter failed")?;

        info!("dockdnsd shutdown complete");
        Ok(())
    }
}

/// Log a summary of passes that had failures
async fn report_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        if let EngineEvent::PassFinished(summary) = event {
            if summary.failed > 0 {
                warn!(
                    failed = summary.failed,
                    created = summary.created,
                    updated = summary.updated,
                    "DNS update pass finished with failures"
                );
            }
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
