//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and client setup.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::Certificate;
use crate::observability;
use crate::provider::aws::AwsCertificateManager;
use crate::store::KubeCertificateStore;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// API for Certificate resources across all namespaces
    pub certificates: Api<Certificate>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over the default filter; `log_format` selects JSON or text.
pub fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "acm_certificate_controller=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        // Tests and embedders may have installed one already
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes and ACM client creation
/// - Reconciler setup
/// - Reconcile existing resources
pub async fn initialize() -> Result<InitializationResult> {
    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    init_tracing(&controller_config.log_format);

    // Must happen before any rustls client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting ACM Certificate Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());

    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_listening(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let certificates: Api<Certificate> = Api::all(client.clone());

    let provider = AwsCertificateManager::new(
        controller_config.aws_region.as_deref(),
        controller_config.aws_call_timeout(),
    )
    .await
    .context("Failed to create ACM client")?;
    let store = KubeCertificateStore::new(client);

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(provider),
        Arc::new(store),
        controller_config.clone(),
    ));

    reconcile_existing_resources(&certificates, &reconciler).await?;

    server_state.set_ready(true);
    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        certificates,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to bind its port
async fn wait_for_server_listening(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_listening.load(Ordering::Relaxed) {
            info!("HTTP server is accepting connections");
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

/// Reconcile existing Certificate resources before starting the watch
///
/// Passes run one at a time; the watch picks up anything that fails here.
async fn reconcile_existing_resources(
    certificates: &Api<Certificate>,
    reconciler: &Arc<Reconciler>,
) -> Result<()> {
    let list = certificates
        .list(&ListParams::default())
        .await
        .context("Certificate CRD is not queryable; is it installed?")?;

    info!(
        "CRD is queryable, found {} existing Certificate resources",
        list.items.len()
    );

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(item.name_any());
    }
    for (namespace, names) in &by_namespace {
        info!("  {}: {}", namespace, names.join(", "));
    }

    for item in list.items {
        let key = format!(
            "{}/{}",
            item.namespace().unwrap_or_else(|| "default".to_string()),
            item.name_any()
        );
        if let Err(e) = reconcile(Arc::new(item), Arc::clone(reconciler)).await {
            warn!("Startup reconciliation of {} failed, the watch will retry: {}", key, e);
        }
    }

    Ok(())
}
