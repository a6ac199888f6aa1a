//! Routing and the HTTP server lifecycle.
//!
//! Every request, matched or not, passes through the same stack
//! (outermost first):
//! 1. Request tracing
//! 2. Request-timeout guard (120s default, answers 504)
//! 3. JSON content type on every response
//! 4. Configured latency
//! 5. Handler
//!
//! Connections additionally carry read and write stall limits (30s each).
//!
//! # Shutdown
//!
//! [`Server::shutdown`] stops the accept loop, asks each open connection to
//! finish its in-flight request and close, and waits for the drain up to a
//! deadline.

mod io;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder as ConnBuilder,
};
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};
use tower::{timeout::TimeoutLayer, ServiceBuilder, ServiceExt};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    handlers,
    middleware::{delay, handle_timeout, JSON_CONTENT_TYPE},
    store::Store,
    AppState,
};
use self::io::TimeoutStream;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("connections still open after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Creates the router with both product routes and the shared middleware.
pub fn create_router(store: Arc<dyn Store>, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_timeout))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ))
        .layer(from_fn_with_state(config.latency, delay));

    Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .layer(middleware)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServeState {
    Idle,
    Serving,
    Stopped,
}

/// The product API server.
///
/// Share it behind an `Arc` to call [`shutdown`](Server::shutdown) while
/// [`listen_and_serve`](Server::listen_and_serve) is running.
pub struct Server {
    addr: String,
    config: ServerConfig,
    router: Router,
    shutdown: watch::Sender<bool>,
    state: watch::Sender<ServeState>,
}

impl Server {
    pub fn new(addr: impl Into<String>, store: Arc<dyn Store>, config: ServerConfig) -> Self {
        let router = create_router(store, &config);
        Self {
            addr: addr.into(),
            config,
            router,
            shutdown: watch::Sender::new(false),
            state: watch::Sender::new(ServeState::Idle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until shut down.
    pub async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve connections from `listener` until [`shutdown`](Server::shutdown)
    /// is called or accepting fails for good.
    ///
    /// Returns once every connection has been drained. Returns immediately
    /// if the server was already shut down.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let mut shutdown = self.shutdown.subscribe();
        let closed = *shutdown.borrow_and_update();
        if closed {
            return Ok(());
        }
        self.state.send_replace(ServeState::Serving);

        info!(%addr, latency = ?self.config.latency, "Listening on http://{}", addr);

        let mut connections = JoinSet::new();
        let mut backoff = AcceptBackoff::default();
        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break Ok(()),

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => {
                            backoff.reset();
                            conn
                        }
                        Err(err) if is_retryable(&err) => {
                            let pause = backoff.next_delay();
                            warn!(error = %err, ?pause, "accept failed, retrying");
                            tokio::time::sleep(pause).await;
                            continue;
                        }
                        Err(err) => break Err(ServerError::Accept(err)),
                    };
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        self.router.clone(),
                        self.config.clone(),
                        self.shutdown.subscribe(),
                    ));
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        drop(listener);
        self.shutdown.send_replace(true);
        info!(in_flight = connections.len(), "Draining connections");
        while connections.join_next().await.is_some() {}

        self.state.send_replace(ServeState::Stopped);
        info!("Server stopped");
        result
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight
    /// requests to finish.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ServerError> {
        self.shutdown.send_replace(true);

        let mut state = self.state.subscribe();
        let drained = tokio::time::timeout(deadline, async {
            loop {
                let current = *state.borrow_and_update();
                if current != ServeState::Serving || state.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;

        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(?deadline, "Shutdown deadline elapsed with connections open");
                Err(ServerError::ShutdownTimeout(deadline))
            }
        }
    }
}

#[cfg(unix)]
const ENFILE: i32 = 23;
#[cfg(unix)]
const EMFILE: i32 = 24;

/// Accept failures that clear up on their own: a peer that went away, or
/// a process/system out of file descriptors until connections close.
fn is_retryable(err: &std::io::Error) -> bool {
    let transient_kind = matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
    );
    #[cfg(unix)]
    let out_of_descriptors = matches!(err.raw_os_error(), Some(EMFILE | ENFILE));
    #[cfg(not(unix))]
    let out_of_descriptors = false;

    transient_kind || out_of_descriptors
}

/// Pause between retried accepts: 5ms, doubling up to 1s, reset by the
/// next successful accept.
#[derive(Debug, Default)]
struct AcceptBackoff {
    delay: Option<Duration>,
}

impl AcceptBackoff {
    const MIN: Duration = Duration::from_millis(5);
    const MAX: Duration = Duration::from_secs(1);

    fn next_delay(&mut self) -> Duration {
        let next = match self.delay {
            None => Self::MIN,
            Some(delay) => (delay * 2).min(Self::MAX),
        };
        self.delay = Some(next);
        next
    }

    fn reset(&mut self) {
        self.delay = None;
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let closed = *shutdown.borrow_and_update();
        if closed || shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    config: ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(TimeoutStream::new(
        stream,
        config.read_timeout,
        config.write_timeout,
    ));
    let service = service_fn(move |req: hyper::Request<Incoming>| {
        router.clone().oneshot(req.map(Body::new))
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        () = wait_for_shutdown(&mut shutdown) => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(err) = result {
        debug!(%peer, error = %err, "connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn dropped_peers_are_retried() {
        for kind in [
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::Interrupted,
        ] {
            assert!(is_retryable(&io::Error::from(kind)), "{kind:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_exhaustion_is_retried() {
        assert!(is_retryable(&io::Error::from_raw_os_error(EMFILE)));
        assert!(is_retryable(&io::Error::from_raw_os_error(ENFILE)));
    }

    #[test]
    fn other_accept_failures_end_serving() {
        assert!(!is_retryable(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_retryable(&io::Error::other("listener broken")));
    }

    #[test]
    fn backoff_doubles_up_to_one_second() {
        let mut backoff = AcceptBackoff::default();
        let delays: Vec<u64> = (0..10)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 320, 640, 1000, 1000]);
    }

    #[test]
    fn backoff_restarts_after_success() {
        let mut backoff = AcceptBackoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }
}
