//! HTTP listener for the module proxy protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::resolver::Resolver;

pub struct ProxyServer {
    addr: SocketAddr,
    resolver: Arc<Resolver>,
}

impl ProxyServer {
    pub fn new(addr: SocketAddr, resolver: Arc<Resolver>) -> Self {
        Self { addr, resolver }
    }

    /// Accept loop; serves until the process exits.
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("module proxy listening on {}", self.addr);
        Self::serve(listener, Arc::clone(&self.resolver)).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(listener: TcpListener, resolver: Arc<Resolver>) -> anyhow::Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, remote)) => {
                    let resolver = Arc::clone(&resolver);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            handle_request(Arc::clone(&resolver), req, remote)
                        });
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            debug!("connection error from {remote}: {e}");
                        }
                    });
                }
                Err(e) => error!("failed to accept connection: {e}"),
            }
        }
    }
}

/// Auxiliary diagnostics listener, enabled by `--pprof`.
pub async fn run_diagnostics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("diagnostics listening on {addr}");

    loop {
        let (stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(|req: Request<Incoming>| async move {
                let response = match req.uri().path() {
                    "/debug/health" => plain_response(StatusCode::OK, "ok"),
                    _ => plain_response(StatusCode::NOT_FOUND, "not found"),
                };
                Ok::<_, hyper::Error>(response)
            });
            let _ = http1::Builder::new().serve_connection(io, service).await;
        });
    }
}

async fn handle_request(
    resolver: Arc<Resolver>,
    req: Request<Incoming>,
    remote: SocketAddr,
) -> Result<Response<Full<Bytes>>, Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = route(resolver, &method, &path).await?;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        remote = %remote,
        elapsed = ?started.elapsed(),
        "handled request"
    );

    Ok(response)
}

async fn route(
    resolver: Arc<Resolver>,
    method: &Method,
    path: &str,
) -> Result<Response<Full<Bytes>>, Error> {
    if method != Method::GET {
        return Ok(plain_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        ));
    }

    match resolver.query(path).await {
        Ok(body) => Ok(Response::new(Full::new(body))),
        // A cancelled query carries no status body guarantee: failing the
        // service tears the connection down without a status line, which
        // also covers waiters that inherited the cancellation from
        // another client's single-flight slot.
        Err(Error::Cancelled) => {
            debug!("query cancelled for {path}");
            Err(Error::Cancelled)
        }
        Err(err) => Ok(error_response(path, err)),
    }
}

fn error_response(path: &str, err: Error) -> Response<Full<Bytes>> {
    match err {
        Error::NotFound => plain_response(StatusCode::NOT_FOUND, "not found"),
        Error::InvalidResource(_) => plain_response(StatusCode::BAD_REQUEST, "bad request"),
        err => {
            error!("query failed for {path}: {err}");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
