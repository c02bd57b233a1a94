use crate::server::ServerState;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Source of incoming connections for [`start_http_server`].
#[async_trait]
pub trait Listener: Send {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Next connection and a printable peer address.
    async fn accept(&mut self) -> io::Result<(Self::Io, String)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Listener for TcpListener {
    type Io = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, String)> {
        let (tcp, remote) = TcpListener::accept(self).await?;
        Ok((tcp, remote.to_string()))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Accept failures (e.g. running out of file descriptors) are logged and
/// retried with a doubling delay capped at one second.
pub async fn start_http_server<L: Listener>(
    mut listener: L,
    state: Arc<ServerState>,
    shutdown: impl Future<Output = ()>,
) {
    let http_service = HttpService { state };

    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    tokio::pin!(shutdown);
    let mut backoff: Option<Duration> = None;
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                return;
            }
        };
        let (io, remote) = match accepted {
            Ok(accepted) => {
                backoff = None;
                accepted
            }
            Err(err) => {
                let delay = backoff
                    .map(|d| (d * 2).min(MAX_ACCEPT_BACKOFF))
                    .unwrap_or(MIN_ACCEPT_BACKOFF);
                backoff = Some(delay);
                warn!("Error accepting connection: {}; retrying in {:?}", err, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        // Use an adapter to access something implementing `tokio::io` traits as if they implement
        // `hyper::rt` IO traits.
        let io = TokioIo::new(io);

        let http_service_cloned = http_service.clone();
        // Serve each connection on its own task so the accept loop keeps going
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, http_service_cloned)
                .await
            {
                warn!(remote = %remote, "Error serving connection: {:?}", err);
            }
        });
    }
}

#[derive(Debug, Clone)]
struct HttpService {
    state: Arc<ServerState>,
}

impl Service<Request<Incoming>> for HttpService {
    type Response = Response<Full<Bytes>>;

    type Error = Infallible;

    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let state = self.state.clone();
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let response = state.router.handle_request(&method, &path, state.clone()).await;
            debug!(method = %method, path = %path, status = response.status().as_u16(), "request served");
            Ok(response)
        })
    }
}
