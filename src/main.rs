// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use wireguard_operator::{
    config::{Cli, OperatorConfig},
    constants::{ERROR_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS},
    context::{peers_referencing, Context, EventNotifier},
    crd::{Wireguard, WireguardPeer},
    keys::X25519KeyProvider,
    metrics,
    reconcilers::{reconcile, store::KubeStore, TunnelResource},
    server::{start_server, ServerState},
};

type OperatorContext = Context<KubeStore>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] wireguard_operator::errors::Error);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("wireguard-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (text or json)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting WireGuard Operator");

    // Fail fast: a missing runtime image would break every pass later
    let cli = Cli::parse();
    let config = OperatorConfig::from_cli(&cli)?;
    info!(
        image = %config.wireguard_image,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Arc::new(Context::new(
        KubeStore::new(client.clone()),
        Arc::new(X25519KeyProvider),
        Arc::new(EventNotifier::new(client.clone())),
        config.clone(),
    ));

    let server_state = Arc::new(ServerState::new());

    info!("Starting all controllers");
    let wireguard_controller = run_wireguard_controller(client.clone(), ctx.clone());
    let peer_controller = run_peer_controller(client, ctx);
    server_state.mark_ready();

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = wireguard_controller => {
            error!("CRITICAL: Wireguard controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Wireguard controller exited unexpectedly without error")
        }
        result = peer_controller => {
            error!("CRITICAL: WireguardPeer controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("WireguardPeer controller exited unexpectedly without error")
        }
        result = start_server(config.metrics_port, server_state) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `Wireguard` controller
async fn run_wireguard_controller(client: Client, ctx: Arc<OperatorContext>) -> Result<()> {
    info!("Starting Wireguard controller");

    let api = Api::<Wireguard>::all(client.clone());

    Controller::new(api, Config::default())
        .owns(Api::<Secret>::all(client.clone()), Config::default())
        .owns(Api::<ConfigMap>::all(client.clone()), Config::default())
        .owns(Api::<Deployment>::all(client.clone()), Config::default())
        .owns(Api::<Service>::all(client), Config::default())
        .shutdown_on_signal()
        .run(reconcile_wrapper::<Wireguard>, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `WireguardPeer` controller
///
/// Besides its own children, a peer is re-reconciled whenever the server it
/// references changes, since its configuration embeds the server's key and endpoint.
async fn run_peer_controller(client: Client, ctx: Arc<OperatorContext>) -> Result<()> {
    info!("Starting WireguardPeer controller");

    let api = Api::<WireguardPeer>::all(client.clone());
    let controller = Controller::new(api, Config::default());
    let peers = controller.store();

    controller
        .owns(Api::<Secret>::all(client.clone()), Config::default())
        .owns(Api::<ConfigMap>::all(client.clone()), Config::default())
        .owns(Api::<Deployment>::all(client.clone()), Config::default())
        .owns(Api::<Service>::all(client.clone()), Config::default())
        .watches(
            Api::<Wireguard>::all(client),
            Config::default(),
            move |wg| peers_referencing(&peers.state(), &wg),
        )
        .shutdown_on_signal()
        .run(reconcile_wrapper::<WireguardPeer>, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper shared by both kinds
async fn reconcile_wrapper<K: TunnelResource>(
    resource: Arc<K>,
    ctx: Arc<OperatorContext>,
) -> Result<Action, ReconcileError> {
    let kind = K::kind(&());
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let start = Instant::now();

    debug!(
        namespace = %namespace,
        name = %name,
        "Reconcile wrapper called for {}", kind
    );

    match reconcile::<K, _>(&ctx, &namespace, &name).await {
        Ok(requeue) => {
            match requeue.metric_reason() {
                Some(reason) => metrics::record_reconciliation_requeue(&kind, reason),
                None => {
                    info!("Successfully reconciled {}: {}/{}", kind, namespace, name);
                    metrics::record_reconciliation_success(&kind, start.elapsed());
                }
            }
            Ok(requeue.into_action())
        }
        Err(e) if e.is_conflict() => {
            warn!("Conflict reconciling {} {}/{}, retrying: {}", kind, namespace, name, e);
            metrics::record_reconciliation_error(&kind, e.metric_label(), start.elapsed());
            Err(e.into())
        }
        Err(e) => {
            error!("Failed to reconcile {} {}/{}: {}", kind, namespace, name, e);
            metrics::record_reconciliation_error(&kind, e.metric_label(), start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for both controllers
fn error_policy<K>(_resource: Arc<K>, _err: &ReconcileError, _ctx: Arc<OperatorContext>) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
