//! Cluster connection resolution.
//!
//! The connection descriptor is a [`kube::Config`] loaded from an explicit
//! kubeconfig file, or from the ambient kubeconfig, or from the in-cluster
//! service account, in that order. Command-line overrides are merged on top
//! field by field: a field that is set always wins, an unset one leaves the
//! loaded value untouched.

use clap::Args;
use kube::config::{InClusterError, KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::Config;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unable to load kubeconfig {}", path.display())]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error(
        "no cluster credentials available: kubeconfig: {kubeconfig}; in-cluster: {in_cluster}"
    )]
    NoCredentials {
        kubeconfig: KubeconfigError,
        in_cluster: InClusterError,
    },

    #[error("invalid --server value {0:?}: {1}")]
    InvalidServer(String, String),

    #[error("unable to read certificate authority {}", path.display())]
    CertificateAuthority {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("certificate authority {} contains no certificates", .0.display())]
    EmptyCertificateAuthority(PathBuf),

    #[error("invalid --request-timeout value {0:?} (expected e.g. 0, 30, 30s, 1m30s, 500ms)")]
    InvalidTimeout(String),
}

/// Per-field overrides of the loaded cluster configuration.
///
/// Mirrors the standard kubectl override flags.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// The address and port of the Kubernetes API server
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Path to a cert file for the certificate authority
    #[arg(long)]
    pub certificate_authority: Option<PathBuf>,

    /// If true, the server's certificate will not be checked for validity
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,

    /// Server name to use for server certificate validation
    #[arg(long)]
    pub tls_server_name: Option<String>,

    /// Bearer token for authentication to the API server
    #[arg(long)]
    pub token: Option<String>,

    /// Username for basic authentication to the API server
    #[arg(long)]
    pub username: Option<String>,

    /// Password for basic authentication to the API server
    #[arg(long)]
    pub password: Option<String>,

    /// Path to a client certificate file for TLS
    #[arg(long)]
    pub client_certificate: Option<String>,

    /// Path to a client key file for TLS
    #[arg(long)]
    pub client_key: Option<String>,

    /// Username to impersonate for the operation
    #[arg(long = "as")]
    pub impersonate: Option<String>,

    /// Group to impersonate for the operation, can be repeated
    #[arg(long = "as-group")]
    pub impersonate_groups: Vec<String>,

    /// The name of the kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// The name of the kubeconfig cluster to use
    #[arg(long)]
    pub cluster: Option<String>,

    /// The name of the kubeconfig user to use
    #[arg(long)]
    pub user: Option<String>,

    /// If present, the namespace scope for this CLI request
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// The length of time to wait before giving up on a single server request
    #[arg(long)]
    pub request_timeout: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ConfigOverrides {
    fn certificate_authority(&self) -> Option<&Path> {
        self.certificate_authority
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Context, cluster and user selection for the kubeconfig loader.
    pub fn kube_config_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: non_empty(&self.context).map(str::to_string),
            cluster: non_empty(&self.cluster).map(str::to_string),
            user: non_empty(&self.user).map(str::to_string),
        }
    }

    /// Applies every set field to `config`, leaving unset ones alone.
    ///
    /// TLS settings follow kubectl: a CA override turns verification back
    /// on, skipping verification drops the loaded CA, and a new server
    /// forgets the loaded TLS server name unless one is given too.
    pub fn apply(&self, config: &mut Config) -> Result<(), ResolveError> {
        if let Some(server) = non_empty(&self.server) {
            config.cluster_url = server
                .parse()
                .map_err(|e: hyper::http::uri::InvalidUri| {
                    ResolveError::InvalidServer(server.to_string(), e.to_string())
                })?;
            config.tls_server_name = None;
        }
        if let Some(path) = self.certificate_authority() {
            config.root_cert = Some(read_certificate_authority(path)?);
            config.accept_invalid_certs = false;
        }
        if self.insecure_skip_tls_verify {
            config.accept_invalid_certs = true;
            config.root_cert = None;
        }
        if let Some(name) = non_empty(&self.tls_server_name) {
            config.tls_server_name = Some(name.to_string());
        }
        if let Some(namespace) = non_empty(&self.namespace) {
            config.default_namespace = namespace.to_string();
        }
        if let Some(raw) = non_empty(&self.request_timeout) {
            config.read_timeout = parse_request_timeout(raw)?;
        }

        let auth = &mut config.auth_info;
        if let Some(token) = non_empty(&self.token) {
            auth.token = Some(token.to_string().into());
            auth.token_file = None;
        }
        if let Some(username) = non_empty(&self.username) {
            auth.username = Some(username.to_string());
        }
        if let Some(password) = non_empty(&self.password) {
            auth.password = Some(password.to_string().into());
        }
        if let Some(cert) = non_empty(&self.client_certificate) {
            auth.client_certificate = Some(cert.to_string());
            auth.client_certificate_data = None;
        }
        if let Some(key) = non_empty(&self.client_key) {
            auth.client_key = Some(key.to_string());
            auth.client_key_data = None;
        }
        if let Some(user) = non_empty(&self.impersonate) {
            auth.impersonate = Some(user.to_string());
        }
        let groups: Vec<String> = self
            .impersonate_groups
            .iter()
            .filter(|g| !g.is_empty())
            .cloned()
            .collect();
        if !groups.is_empty() {
            auth.impersonate_groups = Some(groups);
        }
        Ok(())
    }
}

const NANOS_PER_UNIT: [(&str, f64); 7] = [
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parses kubectl request timeouts.
///
/// A bare integer is seconds. Anything else uses Go duration syntax, a
/// sequence of decimal numbers each followed by a unit (`1m30s`, `500ms`,
/// `1.5h`). Zero disables the timeout.
pub fn parse_request_timeout(raw: &str) -> Result<Option<Duration>, ResolveError> {
    let invalid = || ResolveError::InvalidTimeout(raw.to_string());
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = trimmed.parse().map_err(|_| invalid())?;
        return Ok((secs > 0).then(|| Duration::from_secs(secs)));
    }

    let mut nanos = 0f64;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let (_, per_unit) = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .ok_or_else(invalid)?;

        nanos += value * per_unit;
        rest = tail;
    }

    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    let nanos = nanos.round() as u64;
    Ok((nanos > 0).then(|| Duration::from_nanos(nanos)))
}

fn read_certificate_authority(path: &Path) -> Result<Vec<Vec<u8>>, ResolveError> {
    let io_err = |source| ResolveError::CertificateAuthority {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut certs = Vec::new();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(io_err)?;
        certs.push(cert.as_ref().to_vec());
    }
    if certs.is_empty() {
        return Err(ResolveError::EmptyCertificateAuthority(path.to_path_buf()));
    }
    Ok(certs)
}

/// Builds the connection descriptor from an already parsed kubeconfig.
pub async fn config_from_kubeconfig(
    kubeconfig: Kubeconfig,
    overrides: &ConfigOverrides,
) -> Result<Config, KubeconfigError> {
    Config::from_custom_kubeconfig(kubeconfig, &overrides.kube_config_options()).await
}

/// Resolves the cluster connection descriptor.
///
/// An empty `kubeconfig` path means ambient credentials: the kubeconfig found
/// through `KUBECONFIG` or `~/.kube/config`, then the in-cluster service
/// account.
pub async fn resolve_client_config(
    kubeconfig: &str,
    overrides: &ConfigOverrides,
) -> Result<Config, ResolveError> {
    let mut config = if kubeconfig.is_empty() {
        load_ambient(overrides).await?
    } else {
        let path = PathBuf::from(kubeconfig);
        debug!(kubeconfig = %path.display(), "loading kubeconfig");
        let loaded = match Kubeconfig::read_from(&path) {
            Ok(loaded) => config_from_kubeconfig(loaded, overrides).await,
            Err(err) => Err(err),
        };
        loaded.map_err(|source| ResolveError::Kubeconfig { path, source })?
    };

    overrides.apply(&mut config)?;
    debug!(
        cluster_url = %config.cluster_url,
        namespace = %config.default_namespace,
        "resolved cluster connection"
    );
    Ok(config)
}

async fn load_ambient(overrides: &ConfigOverrides) -> Result<Config, ResolveError> {
    let kubeconfig = match Config::from_kubeconfig(&overrides.kube_config_options()).await {
        Ok(config) => {
            debug!("using ambient kubeconfig");
            return Ok(config);
        }
        Err(err) => err,
    };
    match Config::incluster() {
        Ok(config) => {
            debug!("using in-cluster service account");
            Ok(config)
        }
        Err(in_cluster) => Err(ResolveError::NoCredentials {
            kubeconfig,
            in_cluster,
        }),
    }
}
