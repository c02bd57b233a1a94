use super::http_routes::RouteError;
use crate::server::ServerState;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::http::Error;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[async_trait]
pub trait Handlable: Send + Sync + Debug {
    fn method(&self) -> &Method;
    fn path(&self) -> &str;
    fn params(&self) -> Option<&HashMap<String, ParamType>> {
        None
    }

    async fn handle_data(
        &self,
        route_req_params: HashMap<String, String>,
        req_path: &str,
        state: Arc<ServerState>,
    ) -> Result<Response<Full<Bytes>>, RouteError>;

    fn prepare_response(
        &self,
        body: Bytes,
        status: StatusCode,
        content_type: &str,
    ) -> Result<Response<Full<Bytes>>, Error> {
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(body))
    }

    fn json_response<T: Serialize + Sync>(
        &self,
        value: &T,
        status: StatusCode,
    ) -> Result<Response<Full<Bytes>>, RouteError>
    where
        Self: Sized,
    {
        let body = serde_json::to_vec(value)?;
        Ok(self.prepare_response(Bytes::from(body), status, JSON_CONTENT_TYPE)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    AnyString,
    /// A Kubernetes object name (RFC 1123 subdomain).
    ResourceName,
}

impl ParamType {
    fn accepts(&self, segment: &str) -> bool {
        match self {
            ParamType::AnyString => !segment.is_empty(),
            ParamType::ResourceName => is_resource_name(segment),
        }
    }
}

fn is_resource_name(value: &str) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 253
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-' || *b == b'.')
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
}

#[derive(Debug)]
pub struct RouteData {
    pub method: Method,
    pub path: String,
    pub params: Option<HashMap<String, ParamType>>,
}

impl RouteData {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            params: None,
        }
    }

    pub fn with_param(mut self, name: &str, param_type: ParamType) -> Self {
        self.params
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), param_type);
        self
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

#[derive(Debug)]
pub struct Router {
    routes: Vec<Box<dyn Handlable>>,
    not_found_route: Box<dyn Handlable>,
}

impl Router {
    pub fn new(routes: Vec<Box<dyn Handlable>>, not_found_route: Box<dyn Handlable>) -> Self {
        Self {
            routes,
            not_found_route,
        }
    }

    pub async fn handle_request(
        &self,
        method: &Method,
        req_path: &str,
        state: Arc<ServerState>,
    ) -> Response<Full<Bytes>> {
        let Some((route, route_req_params)) = self.route(method, req_path) else {
            debug!(method = %method, path = req_path, "no route");
            return error_response(StatusCode::NOT_FOUND, "not found");
        };
        debug!(method = %method, path = req_path, route = route.path(), "routing request");

        match route.handle_data(route_req_params, req_path, state).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.status();
                warn!(method = %method, path = req_path, status = status.as_u16(), "request failed: {}", err);
                error_response(status, &err.to_string())
            }
        }
    }

    /// Finds the first route whose method, static segments and typed
    /// parameters all match. Unmatched requests go to the not-found route
    /// when its method matches, otherwise nothing handles them.
    pub fn route(
        &self,
        req_method: &Method,
        req_path: &str,
    ) -> Option<(&dyn Handlable, HashMap<String, String>)> {
        let req_path_segments = segments(req_path);

        for route in &self.routes {
            if route.method() != req_method {
                continue;
            }
            if let Some(params) = match_segments(route.as_ref(), &req_path_segments) {
                return Some((route.as_ref(), params));
            }
        }

        if self.not_found_route.method() == req_method {
            return Some((self.not_found_route.as_ref(), HashMap::new()));
        }
        None
    }
}

fn match_segments(route: &dyn Handlable, req_path_segments: &[&str]) -> Option<HashMap<String, String>> {
    let route_segments = segments(route.path());
    if route_segments.len() != req_path_segments.len() {
        return None;
    }

    let mut route_req_params = HashMap::new();
    for (route_segment, req_segment) in route_segments.iter().zip(req_path_segments) {
        match placeholder(route_segment) {
            Some(name) => {
                let param_type = route
                    .params()
                    .and_then(|params| params.get(name))
                    .copied()
                    .unwrap_or(ParamType::AnyString);
                if !param_type.accepts(req_segment) {
                    return None;
                }
                route_req_params.insert(name.to_string(), req_segment.to_string());
            }
            None if route_segment == req_segment => {}
            None => return None,
        }
    }
    Some(route_req_params)
}

pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
