//! # Watch Loop
//!
//! Controller watch loop that monitors `Certificate` resources and triggers
//! reconciliation when changes are detected.
//!
//! `kube_runtime::Controller` is the work queue: it deduplicates pending
//! triggers per object and never runs two passes for the same object at once.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::Certificate;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the watch whenever the stream ends, until a shutdown signal
/// clears readiness.
pub async fn run_watch_loop(
    certificates: Api<Certificate>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    info!("Starting controller watch loop...");

    let backoff_duration_ms = Arc::new(AtomicU64::new(config.backoff_start_ms));

    tokio::spawn(mark_not_ready_on(shutdown_signal(), Arc::clone(&server_state)));

    let concurrency = u16::try_from(config.max_concurrent_reconciliations).unwrap_or(u16::MAX);

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let backoff = Arc::clone(&backoff_duration_ms);
        let filter_config = config.clone();
        let watch_span = tracing::info_span!("controller.watch", operation = "watch_loop");

        Controller::new(certificates.clone(), watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(
                reconcile,
                |obj, error, ctx| handle_reconciliation_error(&obj, error, &ctx),
                Arc::clone(&reconciler),
            )
            .filter_map(move |result| {
                let backoff = Arc::clone(&backoff);
                let config = filter_config.clone();
                async move {
                    match &result {
                        Ok((object, _action)) => {
                            backoff.store(config.backoff_start_ms, Ordering::Relaxed);
                            debug!(resource = %object.name, "watch.event.success");
                            Some(result)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                config.backoff_max_ms,
                                config.watch_restart_delay_duration(),
                            )
                            .await
                            .then_some(result)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(watch_span)
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Clear readiness once `signal` resolves so the loop stops restarting the watch
async fn mark_not_ready_on(signal: impl Future<Output = ()>, server_state: Arc<ServerState>) {
    signal.await;
    info!("Received shutdown signal, initiating graceful shutdown...");
    server_state.set_ready(false);
    info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
}

/// Resolves on SIGINT or SIGTERM
///
/// Kubernetes sends SIGTERM, interactive runs send SIGINT.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => debug!("SIGINT received"),
        () = terminate => debug!("SIGTERM received"),
    }
}
