use hyper::Uri;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{Api, Client, Config};
use std::fmt;

/// Effective target of a client: where it connects and which namespace it
/// uses by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTarget {
    pub cluster_url: Uri,
    pub namespace: String,
}

impl ClientTarget {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cluster_url: config.cluster_url.clone(),
            namespace: config.default_namespace.clone(),
        }
    }
}

impl fmt::Display for ClientTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (namespace {})", self.cluster_url, self.namespace)
    }
}

/// Client for built-in cluster resources.
#[derive(Clone)]
pub struct KubeClientset {
    client: Client,
    target: ClientTarget,
}

impl fmt::Debug for KubeClientset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClientset")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl KubeClientset {
    pub fn new_for_config(config: Config) -> Result<Self, kube::Error> {
        let target = ClientTarget::from_config(&config);
        let client = Client::try_from(config)?;
        Ok(Self { client, target })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn target(&self) -> &ClientTarget {
        &self.target
    }

    /// Asks the API server for its version; fails when it is unreachable or
    /// rejects the credentials.
    pub async fn server_version(&self) -> Result<Info, kube::Error> {
        self.client.apiserver_version().await
    }

    pub async fn config_map(&self, name: &str) -> Result<ConfigMap, kube::Error> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.target.namespace);
        config_maps.get(name).await
    }
}
