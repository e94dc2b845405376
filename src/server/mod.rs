//! HTTP server
//!
//! A `tiny_http` accept loop runs on the blocking pool and hands each request
//! to a tokio task. Reading the body and writing the response happen on the
//! blocking pool as well; routing and the service calls are async.

pub mod multipart;
pub mod response;
pub mod routes;

pub use response::HttpReply;
pub use routes::{dispatch, ApiRequest};

use crate::{
    config::ServerConfig,
    error::{RetouchError, Result},
    removal::build_remover,
    services::RetouchService,
    store::FsImageStore,
    tracing_config::spans,
};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Request, Server};
use tracing::{debug, info, warn, Instrument};

/// Bound server ready to accept requests
pub struct RetouchServer {
    server: Arc<Server>,
    addr: SocketAddr,
    service: Arc<RetouchService>,
}

/// Stops a running [`RetouchServer`] from another task
#[derive(Clone)]
pub struct ShutdownHandle {
    server: Arc<Server>,
}

impl ShutdownHandle {
    /// Make the accept loop return after the request in flight
    pub fn shutdown(&self) {
        self.server.unblock();
    }
}

impl RetouchServer {
    /// Bind to `addr`; port 0 picks a free port
    pub fn bind(addr: SocketAddr, service: Arc<RetouchService>) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| {
            RetouchError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("Failed to bind {addr}: {e}"),
            ))
        })?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| RetouchError::internal("Server is not bound to an IP address"))?;

        Ok(Self {
            server: Arc::new(server),
            addr,
            service,
        })
    }

    /// The bound address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server: Arc::clone(&self.server),
        }
    }

    /// Serve until the shutdown handle is triggered
    pub async fn run(self) -> Result<()> {
        let span = spans::server(&self.addr, self.service.remover_name());
        let runtime = tokio::runtime::Handle::current();
        let server = Arc::clone(&self.server);
        let service = self.service;

        info!(parent: &span, "accepting requests");

        let accept_span = span.clone();
        tokio::task::spawn_blocking(move || {
            for request in server.incoming_requests() {
                let service = Arc::clone(&service);
                let request_span = request_span(&request);
                request_span.follows_from(&accept_span);
                runtime.spawn(handle_request(service, request).instrument(request_span));
            }
        })
        .await?;

        info!(parent: &span, "accept loop stopped");
        Ok(())
    }
}

fn request_span(request: &Request) -> tracing::Span {
    let request_id = uuid::Uuid::new_v4().to_string();
    spans::http_request(&request_id, request.method().as_str(), request.url())
}

async fn handle_request(service: Arc<RetouchService>, request: Request) {
    let limit = service.max_upload_bytes();
    let current = tracing::Span::current();

    let read = tokio::task::spawn_blocking(move || {
        let _entered = current.enter();
        let mut request = request;
        let api_request = read_request(&mut request, limit);
        (request, api_request)
    })
    .await;

    let (request, api_request) = match read {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "request reader task failed");
            return;
        }
    };

    let reply = match api_request {
        Ok(api_request) => dispatch(&service, api_request).await,
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            HttpReply::text(400, "Failed to read request body")
        }
    };

    let status = reply.status;
    let size = reply.body.len();
    let current = tracing::Span::current();
    let sent = tokio::task::spawn_blocking(move || {
        let _entered = current.enter();
        request.respond(reply.into_response())
    })
    .await;

    match sent {
        Ok(Ok(())) => info!(status, size, "request completed"),
        Ok(Err(e)) => debug!(status, error = %e, "client went away before the response"),
        Err(e) => warn!(error = %e, "response writer task failed"),
    }
}

/// Read the request head and at most `limit + 1` body bytes
///
/// A body longer than `limit` is left truncated at `limit + 1` bytes so the
/// routes can answer 413 without buffering the whole upload.
fn read_request(request: &mut Request, limit: usize) -> std::io::Result<ApiRequest> {
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_string());

    let mut body = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    request.as_reader().take(cap).read_to_end(&mut body)?;

    let mut api_request = ApiRequest::new(request.method().clone(), request.url());
    api_request.content_type = content_type;
    api_request.body = body;
    Ok(api_request)
}

/// Build the configured remover and filesystem store, bind and serve until Ctrl-C
pub async fn serve(config: &ServerConfig) -> Result<()> {
    config.validate()?;

    let remover = build_remover(config)?;
    let store = Arc::new(FsImageStore::open(&config.upload_dir)?);
    let service = Arc::new(RetouchService::new(config, remover, store));

    let server = RetouchServer::bind(config.bind_addr(), service)?;
    info!(
        addr = %server.addr(),
        upload_dir = %config.upload_dir.display(),
        remover = %config.remover,
        "retouch server listening"
    );

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.shutdown();
        }
    });

    server.run().await
}
