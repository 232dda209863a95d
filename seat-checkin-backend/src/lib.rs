pub mod checkin;
pub mod components;
pub mod csrf_protection;
pub mod error;
pub mod routes;
pub mod session;

use core::convert::Infallible;
use core::time::Duration;
use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{pin_mut, Future};
use headers::{Header, HeaderMapExt as _};
use http::{Method, Request, Response};
use http_body::Body;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use seat_checkin_config::Config;
use seat_checkin_sheets::TableStore;
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, debug_span, error, info, warn, Instrument as _};

use crate::checkin::CheckInService;
use crate::error::AppError;
use crate::routes::checkin::checkin;
use crate::routes::health::health;
use crate::routes::index::index;
use crate::routes::indexcss::indexcss;
use crate::session::Session;

pub trait ResponseTypedHeaderExt {
    #[must_use]
    fn typed_header<H: Header>(self, header: H) -> Self;
}

impl ResponseTypedHeaderExt for http::response::Builder {
    fn typed_header<H: Header>(mut self, header: H) -> Self {
        if let Some(res) = self.headers_mut() {
            res.typed_insert(header);
        }
        self
    }
}

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Everything a request handler needs, shared by all connections.
pub struct AppState<S> {
    pub config: Config,
    pub check_in: CheckInService<S>,
}

impl<S: TableStore> AppState<S> {
    pub fn new(config: Config, store: S) -> Self {
        let check_in = CheckInService::new(store, &config);
        Self { config, check_in }
    }
}

#[tracing::instrument(
    name = "request",
    skip_all,
    fields(method = %request.method(), path = %request.uri().path())
)]
pub async fn handle<S, B>(request: Request<B>, state: Arc<AppState<S>>) -> Response<Full<Bytes>>
where
    S: TableStore,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let session = Session::new(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let result = match (method, path.as_str()) {
        (Method::GET | Method::HEAD, "/") => index(session.clone(), &state.config),
        (Method::POST, "/") => checkin(request, &session, &state).await,
        (Method::GET | Method::HEAD, "/index.css") => indexcss(&request),
        (Method::GET | Method::HEAD, "/health") => health(),
        _ => Err(AppError::NotFound),
    };

    match result {
        Ok(response) => {
            debug!(status = %response.status(), "handled");
            response
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(%status, "{err}");
            } else {
                warn!(%status, "{err}");
            }
            err.build_error_template(session, &state.config)
        }
    }
}

/// Binds the configured address. The returned future runs the server until
/// Ctrl-C or SIGTERM.
pub async fn run_server<S: TableStore + 'static>(
    state: AppState<S>,
) -> Result<impl Future<Output = Result<(), AppError>>, AppError> {
    let listener = TcpListener::bind(state.config.listen).await?;
    info!(address = %listener.local_addr()?, mode = ?state.config.mode, "listening");
    Ok(serve(listener, Arc::new(state), shutdown_signal()))
}

/// Accepts connections until `shutdown` completes, then waits for the open
/// connections to finish gracefully.
pub async fn serve<S, F>(
    listener: TcpListener,
    state: Arc<AppState<S>>,
    shutdown: F,
) -> Result<(), AppError>
where
    S: TableStore + 'static,
    F: Future<Output = ()>,
{
    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    pin_mut!(shutdown);

    #[allow(clippy::redundant_pub_crate)]
    loop {
        select! {
            (socket, remote_addr) = accept_with_backoff(|| listener.accept()) => {

                let state = Arc::clone(&state);
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let closed_rx = closed_rx.clone();

                let fut = async move {
                    let socket = TokioIo::new(socket);

                    let hyper_service = service_fn(move |request: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle(request, state).await) }
                    });

                    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    let connection = builder.serve_connection(socket, hyper_service);
                    pin_mut!(connection);

                    select! {
                        connection_result = connection.as_mut() => {
                            if let Err(err) = connection_result {
                                error!("failed to serve connection: {err:#}");
                            }
                        }
                        () = shutdown_tx.closed() => {
                            connection.as_mut().graceful_shutdown();
                            if let Err(err) = connection.as_mut().await {
                                error!("failed to serve connection: {err:#}");
                            }
                        }
                    }

                    debug!("connection closed");
                    drop(closed_rx);
                };

                tokio::spawn(fut.instrument(debug_span!("connection", %remote_addr)));
            }
            () = &mut shutdown => {
                warn!("shutting down");
                break;
            }
        }
    }

    // stop accepting, then initiate shutdown of the open connections
    drop(listener);
    drop(shutdown_rx);
    drop(closed_rx);
    closed_tx.closed().await;
    info!("all connections closed");

    Ok(())
}

/// Retries `accept` until it succeeds, pausing after every failure so a
/// persistent error (e.g. out of file descriptors) does not spin.
async fn accept_with_backoff<T, E, Fut>(mut accept: impl FnMut() -> Fut) -> T
where
    E: core::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(err) => {
                error!("failed to accept connection: {err}");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

#[allow(clippy::redundant_pub_crate)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            core::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
