use crate::k8s::application::Application;
use crate::k8s::clientset::ClientTarget;
use kube::api::ListParams;
use kube::{Api, Client, Config};
use std::fmt;

/// Client for `Application` custom resources.
#[derive(Clone)]
pub struct AppClientset {
    client: Client,
    target: ClientTarget,
}

impl fmt::Debug for AppClientset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppClientset")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl AppClientset {
    pub fn new_for_config(config: Config) -> Result<Self, kube::Error> {
        let target = ClientTarget::from_config(&config);
        let client = Client::try_from(config)?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &ClientTarget {
        &self.target
    }

    pub fn applications(&self) -> Api<Application> {
        Api::namespaced(self.client.clone(), &self.target.namespace)
    }

    pub async fn list(&self) -> Result<Vec<Application>, kube::Error> {
        let list = self.applications().list(&ListParams::default()).await?;
        Ok(list.items)
    }

    pub async fn get(&self, name: &str) -> Result<Application, kube::Error> {
        self.applications().get(name).await
    }
}
