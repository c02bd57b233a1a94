use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const INDEX_FILE: &str = "index.html";

/// A file read from the static assets directory.
#[derive(Debug)]
pub struct Asset {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Serves files below a root directory, falling back to `index.html` for
/// paths that do not name a file (client-side routing of the web UI).
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path below the root. `None` when the path tries to
    /// leave the root.
    pub fn resolve(&self, req_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in req_path.split('/').filter(|s| !s.is_empty()) {
            if segment.contains('\\') {
                return None;
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                _ => return None,
            }
        }
        Some(resolved)
    }

    pub async fn load(&self, req_path: &str) -> Result<Option<Asset>, io::Error> {
        let Some(path) = self.resolve(req_path) else {
            debug!(path = req_path, "rejected static asset path");
            return Ok(None);
        };
        if is_file(&path).await {
            return read(&path).await.map(Some);
        }
        let index = self.root.join(INDEX_FILE);
        if is_file(&index).await {
            return read(&index).await.map(Some);
        }
        Ok(None)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn read(path: &Path) -> Result<Asset, io::Error> {
    let body = tokio::fs::read(path).await?;
    Ok(Asset {
        body,
        content_type: content_type(path),
    })
}

pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
