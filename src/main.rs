//! # ACM Certificate Controller
//!
//! A Kubernetes controller that keeps `Certificate` resources in sync with
//! AWS Certificate Manager.
//!
//! ## Overview
//!
//! 1. **Watching Certificates** - Monitors `Certificate` resources across all namespaces
//! 2. **Requesting or importing** - Creates the ACM certificate on first sight, either
//!    by requesting it from ACM or importing key material held in Secrets
//! 3. **Tracking issuance** - Re-describes the certificate on a fixed cadence and
//!    projects its status, validation records and conditions onto the resource
//! 4. **Converging drift** - Applies tag and option changes made to the spec
//! 5. **Cleaning up** - Deletes the ACM certificate before releasing the finalizer
//!
//! ## Features
//!
//! - **Prometheus metrics** on `/metrics`
//! - **Health probes** on `/healthz` and `/readyz`

use acm_certificate_controller::runtime::initialization::initialize;
use acm_certificate_controller::runtime::watch_loop::run_watch_loop;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.certificates,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
