//! Webserver lifecycle.
//!
//! # Responsibilities
//! - Resolve TLS and pick the transport (HTTPS or plain HTTP)
//! - Own the position allocator, middleware registry and outlet set
//! - Install the built-in middleware
//! - `start`: weave, install the woven app behind every attached outlet,
//!   bind, report the bound address
//! - `stop`: graceful shutdown, then `Closed` for good
//!
//! `start` and `stop` are serialized; calling either repeatedly is safe.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::app::RouterApp;
use crate::http::middleware::{self, Builtins, SessionStore};
use crate::http::outlet::{dispatcher, OutletSet, SharedOutlet};
use crate::info::{ServiceHelp, ServiceInfo};
use crate::lifecycle::ServerState;
use crate::net::address::resolve_listen_addr;
use crate::net::tls::LenientClientVerifier;
use crate::net::{is_loopback_host, tls, ClientCertAcceptor, TlsMaterial};
use crate::observability::metrics;
use crate::pipeline::{Injection, MiddlewareRegistry, PositionAllocator};

/// Lifecycle messages go to info when `verbose`, debug otherwise.
macro_rules! announce {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

enum Transport {
    Plain,
    Tls(RustlsConfig, Option<Arc<LenientClientVerifier>>),
}

struct Lifecycle {
    state: ServerState,
    handle: Option<Handle>,
    task: Option<JoinHandle<io::Result<()>>>,
    local_addr: Option<SocketAddr>,
    /// Woven app kept across a failed bind so a retry does not lose it.
    woven: Option<SharedOutlet>,
}

/// An HTTP(S) server whose pipeline is assembled from prioritized
/// middleware and whose requests go to attached outlets.
pub struct WebServer {
    config: ServerConfig,
    tls: TlsMaterial,
    transport: Transport,
    positions: Arc<PositionAllocator>,
    registry: Arc<MiddlewareRegistry>,
    sessions: Arc<SessionStore>,
    outlets: Arc<OutletSet>,
    dispatcher: Router,
    lifecycle: Mutex<Lifecycle>,
}

impl WebServer {
    /// Create a server and register the built-in middleware.
    ///
    /// Nothing touches the network until [`start`](Self::start).
    pub fn new(config: ServerConfig) -> Self {
        let tls = tls::resolve(&config.ssl, is_loopback_host(config.bind_host()));
        let transport = if tls.available {
            match tls::build_server_config(&tls) {
                Ok(server_tls) => Transport::Tls(
                    RustlsConfig::from_config(server_tls.config),
                    server_tls.client_verifier,
                ),
                Err(error) => {
                    tracing::warn!(%error, "TLS material rejected; serving plain HTTP");
                    Transport::Plain
                }
            }
        } else {
            Transport::Plain
        };

        let positions = Arc::new(PositionAllocator::new());
        let registry = Arc::new(MiddlewareRegistry::new());
        let sessions = Arc::new(SessionStore::new());
        let outlets = Arc::new(OutletSet::new());
        let dispatcher = dispatcher(outlets.clone());

        let installed = middleware::install(
            Builtins {
                config: &config,
                tls: &tls,
                sessions: sessions.clone(),
            },
            &positions,
            &registry,
        );
        tracing::debug!(builtins = ?installed, "Built-in middleware registered");

        Self {
            config,
            tls,
            transport,
            positions,
            registry,
            sessions,
            outlets,
            dispatcher,
            lifecycle: Mutex::new(Lifecycle {
                state: ServerState::Created,
                handle: None,
                task: None,
                local_addr: None,
                woven: None,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tls(&self) -> &TlsMaterial {
        &self.tls
    }

    /// `https` when TLS material produced a usable rustls config.
    pub fn protocol(&self) -> &'static str {
        match self.transport {
            Transport::Tls(..) => "https",
            Transport::Plain => "http",
        }
    }

    /// Allocator collaborators use to pick priorities.
    pub fn positions(&self) -> Arc<PositionAllocator> {
        self.positions.clone()
    }

    pub fn registry(&self) -> Arc<MiddlewareRegistry> {
        self.registry.clone()
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    /// Contribute middleware to be woven on [`start`](Self::start).
    pub fn inject(&self, injection: impl Into<Injection>) {
        self.registry.inject(injection);
    }

    /// Add an outlet. Returns false if it was already attached.
    ///
    /// Attached outlets take precedence over the woven application, whether
    /// they are attached before or after [`start`](Self::start).
    pub fn attach(&self, outlet: &SharedOutlet) -> bool {
        let attached = self.outlets.attach(outlet.clone());
        if attached {
            tracing::debug!(outlets = self.outlets.len(), "Outlet attached");
        } else {
            tracing::debug!("Outlet already attached, skipped");
        }
        attached
    }

    /// Remove an outlet. Returns false if it was not attached.
    pub fn detach(&self, outlet: &SharedOutlet) -> bool {
        let detached = self.outlets.detach(outlet);
        if detached {
            tracing::debug!(outlets = self.outlets.len(), "Outlet detached");
        } else {
            tracing::debug!("Outlet not attached, skipped");
        }
        detached
    }

    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    pub async fn state(&self) -> ServerState {
        self.lifecycle.lock().await.state
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.lock().await.local_addr
    }

    /// Start listening.
    ///
    /// Resolves to `None` when the server is disabled, otherwise to the
    /// bound address. Starting a listening server returns its address again.
    pub async fn start(&self) -> Result<Option<SocketAddr>, ServerError> {
        if !self.config.enabled {
            announce!(self.config.verbose, "webserver is disabled");
            return Ok(None);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            ServerState::Listening => return Ok(lifecycle.local_addr),
            ServerState::Closed => return Err(ServerError::Closed),
            ServerState::Created => {}
        }

        let addr = resolve_listen_addr(&self.config).await?;

        if self.config.weave && lifecycle.woven.is_none() {
            let mut app = RouterApp::new();
            let mounted = self.registry.weave(&mut app)?;
            metrics::record_woven(mounted);
            tracing::debug!(mounted, middlewares = ?app.mounted(), "Middleware woven");
            lifecycle.woven = Some(app.into_outlet());
        }
        if let Some(woven) = &lifecycle.woven {
            self.outlets.set_fallback(Some(woven.clone()));
        }

        announce!(
            self.config.verbose,
            "webserver is trying to listen on {}://{}",
            self.protocol(),
            addr
        );

        let handle = Handle::new();
        let mut task = self.spawn_server(addr, handle.clone());

        let bound = tokio::select! {
            bound = handle.listening() => bound,
            joined = &mut task => {
                return Err(self.abandon_start(addr, joined));
            }
        };
        let Some(local_addr) = bound else {
            let joined = task.await;
            return Err(self.abandon_start(addr, joined));
        };

        lifecycle.state = ServerState::Listening;
        lifecycle.handle = Some(handle);
        lifecycle.task = Some(task);
        lifecycle.local_addr = Some(local_addr);
        metrics::record_lifecycle("start");
        announce!(
            self.config.verbose,
            "webserver is listening on {}://{}",
            self.protocol(),
            local_addr
        );
        Ok(Some(local_addr))
    }

    fn spawn_server(&self, addr: SocketAddr, handle: Handle) -> JoinHandle<io::Result<()>> {
        let service = self.dispatcher.clone().into_make_service();
        match &self.transport {
            Transport::Plain => {
                tokio::spawn(axum_server::bind(addr).handle(handle).serve(service))
            }
            Transport::Tls(config, verifier) => tokio::spawn(
                axum_server::bind(addr)
                    .acceptor(ClientCertAcceptor::new(config.clone(), verifier.clone()))
                    .handle(handle)
                    .serve(service),
            ),
        }
    }

    /// Withdraw the woven app of a failed start and describe the failure.
    ///
    /// The woven app stays in the lifecycle so a retry serves it again.
    fn abandon_start(
        &self,
        addr: SocketAddr,
        joined: Result<io::Result<()>, JoinError>,
    ) -> ServerError {
        self.outlets.set_fallback(None);
        let error = match joined {
            Ok(Err(source)) => ServerError::Bind {
                address: addr.to_string(),
                source,
            },
            Err(join) => ServerError::Task(join.to_string()),
            Ok(Ok(())) => ServerError::Bind {
                address: addr.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "server exited before listening"),
            },
        };
        tracing::error!(%error, "webserver failed to start");
        error
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// A disabled server has nothing to stop and always succeeds. A stopped
    /// server cannot be started again.
    pub async fn stop(&self) -> Result<(), ServerError> {
        if !self.config.enabled {
            announce!(self.config.verbose, "webserver is disabled, nothing to stop");
            return Ok(());
        }

        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            ServerState::Closed => return Ok(()),
            ServerState::Created => {
                lifecycle.state = ServerState::Closed;
                metrics::record_lifecycle("stop");
                announce!(self.config.verbose, "webserver closed before it was started");
                return Ok(());
            }
            ServerState::Listening => {}
        }

        if let Some(handle) = lifecycle.handle.take() {
            handle.graceful_shutdown(None);
        }
        let outcome = match lifecycle.task.take() {
            Some(task) => match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) => Err(ServerError::Serve(source)),
                Err(join) => Err(ServerError::Task(join.to_string())),
            },
            None => Ok(()),
        };

        lifecycle.state = ServerState::Closed;
        lifecycle.local_addr = None;
        metrics::record_lifecycle("stop");
        announce!(self.config.verbose, "webserver has been closed");
        outcome
    }

    /// Bound address while listening, configured values otherwise.
    pub async fn service_info(&self) -> ServiceInfo {
        match self.local_addr().await {
            Some(addr) => ServiceInfo {
                webserver_host: addr.ip().to_string(),
                webserver_port: Some(addr.port()),
            },
            None => ServiceInfo {
                webserver_host: self.config.bind_host().to_string(),
                webserver_port: self.config.port.as_ref().and_then(|p| p.resolve().ok()),
            },
        }
    }

    pub async fn service_help(&self) -> ServiceHelp {
        ServiceHelp::new(self.service_info().await)
    }
}
