//! The API server instance started by the bootstrap command.
//!
//! It owns both cluster clients and serves a small read-only HTTP API plus the
//! optional static assets directory of the web UI.

use self::http::http_router::Router;
use self::http::http_routes::{routes, FallbackRoute};
use self::http::http_server::start_http_server;
use self::static_assets::StaticAssets;
use crate::k8s::app_clientset::AppClientset;
use crate::k8s::clientset::KubeClientset;
use crate::logging::LogSettings;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod http;
pub mod static_assets;

pub const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unable to listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// State shared by every connection.
#[derive(Debug)]
pub struct ServerState {
    pub kube_clientset: KubeClientset,
    pub app_clientset: AppClientset,
    pub static_assets: Option<StaticAssets>,
    pub configmap: String,
    pub router: Router,
}

#[derive(Debug)]
pub struct ApiServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
    log_settings: LogSettings,
}

impl ApiServer {
    /// An empty `static_assets_dir` disables static asset serving.
    pub fn new(
        kube_clientset: KubeClientset,
        app_clientset: AppClientset,
        static_assets_dir: &str,
        configmap: &str,
        addr: SocketAddr,
        log_settings: LogSettings,
    ) -> Self {
        let static_assets = if static_assets_dir.is_empty() {
            None
        } else {
            Some(StaticAssets::new(static_assets_dir))
        };
        let router = Router::new(routes(), Box::new(FallbackRoute::new()));

        Self {
            state: Arc::new(ServerState {
                kube_clientset,
                app_clientset,
                static_assets,
                configmap: configmap.to_string(),
                router,
            }),
            addr,
            log_settings,
        }
    }

    pub fn kube_clientset(&self) -> &KubeClientset {
        &self.state.kube_clientset
    }

    pub fn app_clientset(&self) -> &AppClientset {
        &self.state.app_clientset
    }

    pub fn static_assets(&self) -> Option<&Path> {
        self.state.static_assets.as_ref().map(StaticAssets::root)
    }

    pub fn configmap(&self) -> &str {
        &self.state.configmap
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn log_settings(&self) -> LogSettings {
        self.log_settings
    }

    /// Dispatches a single request through the router.
    pub async fn handle(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        self.state
            .router
            .handle_request(method, path, Arc::clone(&self.state))
            .await
    }

    /// Binds the configured address and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve_with_shutdown(listener, shutdown_signal()).await;
        Ok(())
    }

    /// Serves an already bound listener until `shutdown` resolves.
    pub async fn serve_with_shutdown(self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        if let Some(root) = self.static_assets() {
            if !root.is_dir() {
                warn!(path = %root.display(), "static assets directory does not exist");
            }
        }
        info!(
            target_cluster = %self.state.kube_clientset.target(),
            configmap = %self.state.configmap,
            log_level = %self.log_settings.level(),
            "starting API server"
        );
        start_http_server(listener, self.state, shutdown).await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("unable to listen for SIGINT: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
