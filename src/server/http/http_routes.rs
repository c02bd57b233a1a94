use super::http_router::{error_response, Handlable, ParamType, RouteData};
use crate::server::ServerState;
use crate::version::VersionInfo;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serde JSON error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] hyper::http::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RouteError {
    /// API server rejections keep their status; everything else is a 500.
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::KubeError(kube::Error::Api(response)) => {
                StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every route the API server exposes, in matching order.
pub fn routes() -> Vec<Box<dyn Handlable>> {
    vec![
        Box::new(HealthRoute {
            data: RouteData::get("/healthz"),
        }),
        Box::new(VersionRoute {
            data: RouteData::get("/api/version"),
        }),
        Box::new(SettingsRoute {
            data: RouteData::get("/api/v1/settings"),
        }),
        Box::new(ApplicationListRoute {
            data: RouteData::get("/api/v1/applications"),
        }),
        Box::new(ApplicationRoute {
            data: RouteData::get("/api/v1/applications/{name}")
                .with_param("name", ParamType::ResourceName),
        }),
    ]
}

//"healthz" route
#[derive(Debug)]
pub struct HealthRoute {
    pub data: RouteData,
}

#[async_trait]
impl Handlable for HealthRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    async fn handle_data(
        &self,
        _route_req_params: HashMap<String, String>,
        _req_path: &str,
        _state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        Ok(self.prepare_response(Bytes::from_static(b"ok"), StatusCode::OK, "text/plain")?)
    }
}

//"version" route
#[derive(Debug)]
pub struct VersionRoute {
    pub data: RouteData,
}

#[async_trait]
impl Handlable for VersionRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    async fn handle_data(
        &self,
        _route_req_params: HashMap<String, String>,
        _req_path: &str,
        _state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        self.json_response(&VersionInfo::current(), StatusCode::OK)
    }
}

//"settings" route: the data of the configured config map
#[derive(Debug)]
pub struct SettingsRoute {
    pub data: RouteData,
}

#[async_trait]
impl Handlable for SettingsRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    async fn handle_data(
        &self,
        _route_req_params: HashMap<String, String>,
        _req_path: &str,
        state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        let config_map = state.kube_clientset.config_map(&state.configmap).await?;
        let body = json!({
            "name": state.configmap,
            "data": config_map.data.unwrap_or_default(),
        });
        self.json_response(&body, StatusCode::OK)
    }
}

//"application list" route
#[derive(Debug)]
pub struct ApplicationListRoute {
    pub data: RouteData,
}

#[async_trait]
impl Handlable for ApplicationListRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    async fn handle_data(
        &self,
        _route_req_params: HashMap<String, String>,
        _req_path: &str,
        state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        let items = state.app_clientset.list().await?;
        self.json_response(&json!({ "items": items }), StatusCode::OK)
    }
}

//"application" route
#[derive(Debug)]
pub struct ApplicationRoute {
    pub data: RouteData,
}

#[async_trait]
impl Handlable for ApplicationRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    fn params(&self) -> Option<&HashMap<String, ParamType>> {
        self.data.params.as_ref()
    }
    async fn handle_data(
        &self,
        route_req_params: HashMap<String, String>,
        _req_path: &str,
        state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        let Some(name) = route_req_params.get("name") else {
            return Ok(error_response(StatusCode::BAD_REQUEST, "missing application name"));
        };
        let application = state.app_clientset.get(name).await?;
        self.json_response(&application, StatusCode::OK)
    }
}

//fallback route: static assets when configured, 404 otherwise
#[derive(Debug)]
pub struct FallbackRoute {
    pub data: RouteData,
}

impl FallbackRoute {
    pub fn new() -> Self {
        Self {
            data: RouteData::get("/404"),
        }
    }
}

#[async_trait]
impl Handlable for FallbackRoute {
    fn method(&self) -> &Method {
        &self.data.method
    }
    fn path(&self) -> &str {
        &self.data.path
    }
    async fn handle_data(
        &self,
        _route_req_params: HashMap<String, String>,
        req_path: &str,
        state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError> {
        let Some(assets) = state.static_assets.as_ref() else {
            return Ok(error_response(StatusCode::NOT_FOUND, "not found"));
        };
        if req_path.starts_with("/api/") {
            return Ok(error_response(StatusCode::NOT_FOUND, "not found"));
        }
        match assets.load(req_path).await? {
            Some(asset) => Ok(self.prepare_response(
                Bytes::from(asset.body),
                StatusCode::OK,
                asset.content_type,
            )?),
            None => Ok(error_response(StatusCode::NOT_FOUND, "not found")),
        }
    }
}
