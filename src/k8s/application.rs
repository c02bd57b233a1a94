use kube::CustomResource;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &str = "appctl.dev";
pub const API_VERSION: &str = "v1alpha1";

/// A deployable application: where its manifests come from and where they go.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "appctl.dev",
    version = "v1alpha1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub source: ApplicationSource,
    pub destination: ApplicationDestination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDestination {
    pub server: String,
    pub namespace: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn resource_identity() {
        assert_eq!(Application::group(&()), API_GROUP);
        assert_eq!(Application::version(&()), API_VERSION);
        assert_eq!(Application::plural(&()), "applications");
    }

    #[test]
    fn deserializes_wire_format() {
        let app: Application = serde_json::from_value(json!({
            "apiVersion": "appctl.dev/v1alpha1",
            "kind": "Application",
            "metadata": { "name": "guestbook", "namespace": "apps" },
            "spec": {
                "source": { "repoURL": "https://example.com/guestbook.git", "path": "deploy" },
                "destination": { "server": "https://kubernetes.default.svc", "namespace": "guestbook" }
            },
            "status": { "sync": { "status": "Synced", "revision": "abc123" } }
        }))
        .unwrap();

        assert_eq!(app.metadata.name.as_deref(), Some("guestbook"));
        assert_eq!(app.spec.source.repo_url, "https://example.com/guestbook.git");
        assert_eq!(app.spec.source.target_revision, None);
        assert_eq!(
            app.status.and_then(|s| s.sync).map(|s| s.status),
            Some("Synced".to_string())
        );
    }
}
