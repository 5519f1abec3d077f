// # edgesyncd - EdgeSync Daemon
//
// The edgesyncd daemon is responsible for:
// 1. Reading daemon settings from environment variables
// 2. Initializing the runtime and logging
// 3. Registering the provider adapters
// 4. Starting the reconciliation engine on its timer loop
//
// Service definitions (CDN domains, DNS records, credentials, webhook)
// live in the JSON configuration file; the daemon itself is configured
// via environment variables:
//
// - `EDGESYNC_CONFIG_PATH`: path to the configuration file (default
//   `~/.edgesync.json`, falling back to `./edgesync.json` when no home
//   directory is available)
// - `EDGESYNC_INTERVAL_SECS`: reconciliation interval in seconds
//   (default 300, minimum 10)
// - `EDGESYNC_DNS_SERVER`: optional DNS server (`host` or `host:port`)
//   checked by the startup self-test
// - `EDGESYNC_LOG`: tracing filter (default `info`)
// - `EDGESYNC_CDN_REFRESH_CYCLES` / `EDGESYNC_DNS_REFRESH_CYCLES`:
//   forced-refresh countdown, read by the engine
//
// ## Example
//
// ```bash
// export EDGESYNC_CONFIG_PATH=/etc/edgesync/config.json
// export EDGESYNC_INTERVAL_SECS=300
// export EDGESYNC_LOG=info
//
// edgesyncd
// ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use edgesync_core::{
    AdapterRegistry, EdgeSyncEngine, EngineEvent, FileConfigStore, WebhookNotifier,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_INTERVAL_SECS: u64 = 300;
const MIN_INTERVAL_SECS: u64 = 10;

/// Public resolvers raced by the startup self-test when no custom server
/// is configured
const DNS_CANDIDATES: [&str; 3] = ["223.5.5.5", "114.114.114.114", "119.29.29.29"];
const DNS_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const DNS_SERVER_BUDGET: Duration = Duration::from_secs(2);
const DNS_RACE_BUDGET: Duration = Duration::from_secs(5);

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 2: Configuration error
/// - 3: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    CleanShutdown = 0,
    ConfigError = 2,
    RuntimeError = 3,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings from environment variables
struct DaemonConfig {
    config_path: PathBuf,
    interval: Duration,
    dns_server: Option<String>,
}

impl DaemonConfig {
    fn from_env() -> Result<Self> {
        let config_path = match env::var("EDGESYNC_CONFIG_PATH") {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_config_path(),
        };

        let interval_secs = match env::var("EDGESYNC_INTERVAL_SECS") {
            Ok(raw) => {
                let parsed: u64 = raw.parse().map_err(|_| {
                    anyhow::anyhow!("EDGESYNC_INTERVAL_SECS must be a number, got '{}'", raw)
                })?;
                if parsed < MIN_INTERVAL_SECS {
                    warn!(
                        "EDGESYNC_INTERVAL_SECS={} is below the minimum, using {}s",
                        parsed, MIN_INTERVAL_SECS
                    );
                    MIN_INTERVAL_SECS
                } else {
                    parsed
                }
            }
            Err(_) => DEFAULT_INTERVAL_SECS,
        };

        let dns_server = env::var("EDGESYNC_DNS_SERVER")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            config_path,
            interval: Duration::from_secs(interval_secs),
            dns_server,
        })
    }
}

/// `~/.edgesync.json`, or `./edgesync.json` without a home directory
fn default_config_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".edgesync.json"),
        _ => PathBuf::from("edgesync.json"),
    }
}

fn main() -> ExitCode {
    // Initialize tracing first so configuration loading can log
    let filter = EnvFilter::try_from_env("EDGESYNC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!("Starting edgesyncd");
    info!(
        "Configuration file: {} [interval={}s]",
        config.config_path.display(),
        config.interval.as_secs()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    dns_self_test(config.dns_server.as_deref()).await;

    let registry = Arc::new(AdapterRegistry::new());

    #[cfg(feature = "aliyun")]
    {
        info!("Registering Aliyun adapters");
        edgesync_provider_aliyun::register(&registry);
    }

    #[cfg(feature = "baidu")]
    {
        info!("Registering Baidu adapter");
        edgesync_provider_baidu::register(&registry);
    }

    #[cfg(feature = "tencent")]
    {
        info!("Registering Tencent adapter");
        edgesync_provider_tencent::register(&registry);
    }

    info!(
        "Providers registered [cdn: {:?}, dns: {:?}]",
        registry.list_cdn(),
        registry.list_dns()
    );

    let store = FileConfigStore::new(&config.config_path);
    let notifier = WebhookNotifier::new()?;
    let resolver = edgesync_sources::standard_resolver()?;

    let (engine, mut events) =
        EdgeSyncEngine::new(Box::new(store), registry, Box::new(notifier), resolver);

    // Engine events become log lines
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(event);
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(name) => info!("Received {}, shutting down", name),
            Err(e) => error!("Signal handler failed: {}; shutting down", e),
        }
        let _ = shutdown_tx.send(());
    });

    engine
        .run_with_shutdown(config.interval, Some(shutdown_rx))
        .await?;

    event_logger.abort();
    info!("Shutdown complete");
    Ok(())
}

fn log_event(event: EngineEvent) {
    match event {
        EngineEvent::Started { interval_secs } => {
            info!("Engine started [interval={}s]", interval_secs);
        }
        EngineEvent::ServiceProcessed {
            kind,
            service,
            status,
        } => {
            debug!(
                "Service processed [kind={}, service={}, status={}]",
                kind, service, status
            );
        }
        EngineEvent::WebhookDispatched {
            kind,
            service,
            status,
            delivered,
        } => {
            if delivered {
                info!(
                    "Webhook delivered [kind={}, service={}, status={}]",
                    kind, service, status
                );
            } else {
                warn!(
                    "Webhook not delivered [kind={}, service={}, status={}]",
                    kind, service, status
                );
            }
        }
        EngineEvent::ConfigPersisted => {
            info!("Configuration snapshot persisted");
        }
        EngineEvent::CycleCompleted {
            cdn_services,
            dns_services,
        } => {
            debug!(
                "Cycle completed [cdn={}, dns={}]",
                cdn_services, dns_services
            );
        }
        EngineEvent::Stopped { reason } => {
            info!("Engine stopped: {}", reason);
        }
    }
}

/// Startup reachability check for DNS servers
///
/// Purely diagnostic: the HTTP stack keeps the system resolver either way.
/// A configured server is probed and reported; otherwise the public
/// candidates race and the first reachable one is reported.
async fn dns_self_test(custom: Option<&str>) {
    if let Some(server) = custom {
        let address = if server.contains(':') {
            server.to_string()
        } else {
            format!("{}:53", server)
        };
        if probe_dns_server(&address).await {
            info!("Custom DNS server {} is reachable", address);
        } else {
            warn!(
                "Custom DNS server {} did not answer, name resolution may be degraded",
                address
            );
        }
        return;
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(DNS_CANDIDATES.len());
    for candidate in DNS_CANDIDATES {
        let tx = tx.clone();
        tokio::spawn(async move {
            let works = probe_dns_server(&format!("{}:53", candidate)).await;
            let _ = tx.send((candidate, works)).await;
        });
    }
    drop(tx);

    let race = async {
        while let Some((candidate, works)) = rx.recv().await {
            if works {
                return Some(candidate);
            }
        }
        None
    };

    match tokio::time::timeout(DNS_RACE_BUDGET, race).await {
        Ok(Some(candidate)) => info!("Reachable public DNS: {}", candidate),
        Ok(None) => info!("No public DNS candidate answered, relying on the system resolver"),
        Err(_) => info!("DNS self-test timed out, relying on the system resolver"),
    }
}

/// One server probe: UDP and TCP connection attempts run concurrently;
/// either succeeding counts as reachable
async fn probe_dns_server(address: &str) -> bool {
    let (tx, mut rx) = tokio::sync::mpsc::channel(2);

    let udp_tx = tx.clone();
    let udp_address = address.to_string();
    tokio::spawn(async move {
        let _ = udp_tx.send(udp_connects(&udp_address).await).await;
    });

    let tcp_address = address.to_string();
    tokio::spawn(async move {
        let _ = tx.send(tcp_connects(&tcp_address).await).await;
    });

    let wait = async {
        while let Some(connected) = rx.recv().await {
            if connected {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(DNS_SERVER_BUDGET, wait)
        .await
        .unwrap_or(false)
}

async fn udp_connects(address: &str) -> bool {
    let Ok(socket) = tokio::net::UdpSocket::bind("0.0.0.0:0").await else {
        return false;
    };
    matches!(
        tokio::time::timeout(DNS_DIAL_TIMEOUT, socket.connect(address)).await,
        Ok(Ok(()))
    )
}

async fn tcp_connects(address: &str) -> bool {
    matches!(
        tokio::time::timeout(DNS_DIAL_TIMEOUT, tokio::net::TcpStream::connect(address)).await,
        Ok(Ok(_))
    )
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to set up SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to set up SIGINT handler: {}", e))?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Wait for CTRL-C (non-Unix platforms)
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
