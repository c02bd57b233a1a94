mod common;

use appctl_server::bootstrap::prepare;
use appctl_server::cli::ServerArgs;
use appctl_server::server::ApiServer;
use bytes::Bytes;
use common::{write_kubeconfig, MockApiServer};
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tempfile::{NamedTempFile, TempDir};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct Fixture {
    server: ApiServer,
    _mock: MockApiServer,
    _kubeconfig: NamedTempFile,
}

async fn fixture(static_assets_dir: &str) -> Fixture {
    let mock = MockApiServer::start().await;
    let kubeconfig = write_kubeconfig(&mock.url());
    let args = ServerArgs {
        kubeconfig: kubeconfig.path().display().to_string(),
        static_assets_dir: static_assets_dir.to_string(),
        ..ServerArgs::default()
    };
    let server = prepare(&args).await.unwrap();
    Fixture {
        server,
        _mock: mock,
        _kubeconfig: kubeconfig,
    }
}

fn ui_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>ui</html>").unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
    dir
}

async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: Response<Full<Bytes>>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn healthz() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "ok");
}

#[tokio::test]
async fn version_reports_package_version() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/version").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn lists_applications() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/v1/applications").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["metadata"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["guestbook", "billing"]);
}

#[tokio::test]
async fn gets_single_application() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/v1/applications/guestbook").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["metadata"]["name"], "guestbook");
    assert_eq!(body["spec"]["source"]["repoURL"], "https://git.example.com/guestbook.git");
}

#[tokio::test]
async fn missing_application_keeps_api_status() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/v1/applications/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_application_name_is_not_routed() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/v1/applications/Not_Valid").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_come_from_the_config_map() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/api/v1/settings").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "appctl-cm");
    assert_eq!(body["data"]["url"], "https://appctl.example.com");
}

#[tokio::test]
async fn unknown_paths_are_not_found_without_static_assets() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::GET, "/some/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_get_methods_are_not_found() {
    let f = fixture("").await;
    let response = f.server.handle(&Method::POST, "/api/v1/applications").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_static_assets_with_index_fallback() {
    let ui = ui_dir();
    let f = fixture(&ui.path().display().to_string()).await;

    let response = f.server.handle(&Method::GET, "/assets/app.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");
    assert_eq!(body_bytes(response).await, "console.log(1)");

    let response = f.server.handle(&Method::GET, "/applications/guestbook").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "<html>ui</html>");

    let response = f.server.handle(&Method::GET, "/api/v1/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_over_tcp_until_shutdown() {
    let f = fixture("").await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(f.server.serve_with_shutdown(listener, async move {
        let _ = stop_rx.await;
    }));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);
    let request = Request::builder()
        .uri("/api/v1/applications/billing")
        .header("host", addr.to_string())
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = sender.send_request(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["metadata"]["name"], "billing");

    stop_tx.send(()).unwrap();
    serving.await.unwrap();
}
