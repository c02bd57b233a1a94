//! The bootstrap sequence of the server command.
//!
//! ```text
//! --loglevel → LogSettings → install subscriber
//!   → resolve connection descriptor (kubeconfig / ambient / in-cluster + overrides)
//!   → KubeClientset (+ reachability check) → AppClientset
//!   → ApiServer → run
//! ```
//!
//! Every step either succeeds or aborts the whole sequence; nothing is
//! retried.

use crate::cli::ServerArgs;
use crate::k8s::app_clientset::AppClientset;
use crate::k8s::clientset::KubeClientset;
use crate::k8s::kube_config::{resolve_client_config, ResolveError};
use crate::logging::{LogSettings, ParseLevelError};
use crate::server::{ApiServer, ServerError};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    LogLevel(#[from] ParseLevelError),

    #[error(transparent)]
    Credentials(#[from] ResolveError),

    #[error("unable to create Kubernetes client")]
    KubeClient(#[source] kube::Error),

    #[error("unable to reach the Kubernetes API server at {target}")]
    Unreachable {
        target: String,
        #[source]
        source: kube::Error,
    },

    #[error("unable to create application client")]
    AppClient(#[source] kube::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Runs every step up to, but not including, starting the server.
pub async fn prepare(args: &ServerArgs) -> Result<ApiServer, BootstrapError> {
    let log_settings = LogSettings::parse(&args.log_level)?;
    if !log_settings.install() {
        debug!("a log subscriber is already installed; keeping it");
    }
    info!(log_level = %log_settings.level(), "log level set");

    let config = resolve_client_config(&args.kubeconfig, &args.overrides).await?;

    let kube_clientset =
        KubeClientset::new_for_config(config.clone()).map_err(BootstrapError::KubeClient)?;
    let version = kube_clientset
        .server_version()
        .await
        .map_err(|source| BootstrapError::Unreachable {
            target: kube_clientset.target().to_string(),
            source,
        })?;
    info!(
        target_cluster = %kube_clientset.target(),
        server_version = %version.git_version,
        "connected to Kubernetes API server"
    );

    let app_clientset = AppClientset::new_for_config(config).map_err(BootstrapError::AppClient)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    Ok(ApiServer::new(
        kube_clientset,
        app_clientset,
        &args.static_assets_dir,
        &args.config_map,
        addr,
        log_settings,
    ))
}

/// Prepares the server and runs it until it exits.
pub async fn execute(args: ServerArgs) -> Result<(), BootstrapError> {
    let server = prepare(&args).await?;
    server.run().await?;
    info!("server stopped");
    Ok(())
}
