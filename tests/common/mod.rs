//! Shared utilities for integration tests: a mock Kubernetes API server and
//! kubeconfig files pointing at it.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::io::Write;
use std::net::SocketAddr;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

pub const NAMESPACE: &str = "apps";

/// A mock API server serving `/version`, one config map and two
/// applications in [`NAMESPACE`].
pub struct MockApiServer {
    addr: SocketAddr,
}

impl MockApiServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (tcp, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(tcp), service_fn(respond))
                        .await;
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Address of a port nothing listens on.
#[allow(dead_code)]
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Writes a kubeconfig with a single token-authenticated context.
pub fn write_kubeconfig(server: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"apiVersion: v1
kind: Config
current-context: mock
clusters:
- name: mock
  cluster:
    server: {server}
contexts:
- name: mock
  context:
    cluster: mock
    user: mock
    namespace: {NAMESPACE}
users:
- name: mock
  user:
    token: mock-token
"#
    )
    .unwrap();
    file
}

fn application(name: &str) -> Value {
    json!({
        "apiVersion": "appctl.dev/v1alpha1",
        "kind": "Application",
        "metadata": { "name": name, "namespace": NAMESPACE },
        "spec": {
            "source": { "repoURL": format!("https://git.example.com/{name}.git"), "path": "deploy" },
            "destination": { "server": "https://kubernetes.default.svc", "namespace": name }
        }
    })
}

fn not_found(what: &str) -> (StatusCode, Value) {
    (
        StatusCode::NOT_FOUND,
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("{what} not found"),
            "reason": "NotFound",
            "code": 404
        }),
    )
}

async fn respond(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let apps = format!("/apis/appctl.dev/v1alpha1/namespaces/{NAMESPACE}/applications");
    let config_maps = format!("/api/v1/namespaces/{NAMESPACE}/configmaps/");
    let path = req.uri().path();

    let (status, body) = if path == "/version" {
        (
            StatusCode::OK,
            json!({
                "major": "1", "minor": "31", "gitVersion": "v1.31.0",
                "gitCommit": "mock", "gitTreeState": "clean", "buildDate": "2024-08-13T07:28:49Z",
                "goVersion": "go1.22.5", "compiler": "gc", "platform": "linux/amd64"
            }),
        )
    } else if path == apps {
        (
            StatusCode::OK,
            json!({
                "apiVersion": "appctl.dev/v1alpha1",
                "kind": "ApplicationList",
                "metadata": { "resourceVersion": "1" },
                "items": [application("guestbook"), application("billing")]
            }),
        )
    } else if let Some(name) = path.strip_prefix(&format!("{apps}/")) {
        match name {
            "guestbook" | "billing" => (StatusCode::OK, application(name)),
            _ => not_found(name),
        }
    } else if let Some(name) = path.strip_prefix(&config_maps) {
        match name {
            "appctl-cm" => (
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": { "name": name, "namespace": NAMESPACE },
                    "data": { "url": "https://appctl.example.com" }
                }),
            ),
            _ => not_found(name),
        }
    } else {
        not_found(path)
    };

    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    Ok(response)
}
