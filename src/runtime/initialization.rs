//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, probe server
//! startup, Kubernetes client and the shared controller setup context.

use crate::cloudflare::CloudflareClientFactory;
use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::controller::SetupContext;
use crate::observability;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Command-line overrides applied on top of the environment configuration
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Log at debug level unless `RUST_LOG` says otherwise
    pub debug: bool,
    /// Poll interval as a Kubernetes duration string
    pub poll: Option<String>,
    /// Global reconcile rate and per-controller concurrency
    pub max_reconcile_rate: Option<u16>,
}

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Shared dependencies for the controller setup functions
    pub setup_context: SetupContext,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("setup_context", &self.setup_context)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Apply command-line overrides to the loaded configuration
///
/// # Errors
///
/// Returns an error if the poll interval override is not a valid duration.
pub fn apply_overrides(mut config: ControllerConfig, options: &RuntimeOptions) -> Result<ControllerConfig> {
    if let Some(poll) = &options.poll {
        config = config.with_poll_interval(poll)?;
    }
    if let Some(rate) = options.max_reconcile_rate {
        config = config.with_max_reconcile_rate(rate);
    }
    Ok(config)
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "r2_credentials_controller=debug,kube_runtime=info"
    } else {
        "r2_credentials_controller=info"
    };
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .try_init()
    {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Cloudflare client factory and shared rate limiter
///
/// # Errors
///
/// Returns an error if configuration is invalid, the probe server does not
/// come up, or no Kubernetes client can be built.
pub async fn initialize(options: &RuntimeOptions) -> Result<InitializationResult> {
    // Must happen before anything touches rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    init_tracing(options.debug);
    info!("Starting R2 Credentials Controller v{}", env!("CARGO_PKG_VERSION"));

    let (config, server_config) = load_config()?;
    let config = apply_overrides(config, options)?;
    info!(
        poll_interval = ?config.poll_interval,
        reconcile_timeout = ?config.reconcile_timeout,
        max_reconcile_rate = config.max_reconcile_rate,
        "Loaded controller configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let token_clients = Arc::new(CloudflareClientFactory::new(&config.api_base_url)?);
    let setup_context = SetupContext::new(client.clone(), config, token_clients);

    info!("Controller initialized, starting controllers...");

    Ok(InitializationResult {
        client,
        setup_context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
