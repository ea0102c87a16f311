//! TCP connection listener.
//!
//! Accepts clients on the configured endpoint and runs one [`Session`] per
//! connection on its own task. The only state shared between connections is
//! the [`ConnectionRegistry`] counter.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span};

use crate::capability::Services;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::rpc::MessageTransport;
use crate::session::{Session, SessionEnd};

/// Process-wide count of live sessions.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    live: Arc<AtomicUsize>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently running.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Count a new connection. The count drops again when the guard does.
    #[must_use]
    pub fn register(&self) -> ConnectionGuard {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(live, "connection registered");
        ConnectionGuard {
            live: Arc::clone(&self.live),
        }
    }
}

/// Holds one slot in a [`ConnectionRegistry`].
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let live = self.live.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(live, "connection released");
    }
}

/// Accepts connections and spawns a session for each.
#[derive(Debug)]
pub struct Listener {
    socket: TcpListener,
    services: Services,
    settings_namespace: String,
    registry: ConnectionRegistry,
    next_id: AtomicU64,
}

impl Listener {
    /// Bind to the endpoint in `config`. Port 0 picks an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: &ServerConfig, services: Services) -> Result<Self> {
        let address = config.listener.address();
        let socket = TcpListener::bind(&address)
            .await
            .map_err(|source| Error::Bind {
                address: address.clone(),
                source,
            })?;

        info!("listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            services,
            settings_namespace: config.settings_namespace.clone(),
            registry: ConnectionRegistry::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound; useful with port 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Handle to the live-connection counter.
    #[must_use]
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("listener stopping, {} session(s) still live", self.registry.live());
                    return Ok(());
                }
                accepted = self.socket.accept() => {
                    let (stream, peer) = accepted?;
                    self.spawn_session(stream, peer);
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = self.registry.register();
        let services = self.services.clone();
        let namespace = self.settings_namespace.clone();
        let span = info_span!("connection", id, %peer);

        tokio::spawn(
            async move {
                info!("client connected");
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("could not set TCP_NODELAY: {e}");
                }

                let (read, write) = stream.into_split();
                let transport = MessageTransport::new(BufReader::new(read), write);
                let mut session = Session::new(transport, services, namespace);

                match session.run().await {
                    Ok(SessionEnd::Exited { code: 0 }) => info!("session ended cleanly"),
                    Ok(SessionEnd::Exited { code }) => {
                        info!(code, "session ended without shutdown");
                    }
                    Ok(SessionEnd::Disconnected) => info!("client disconnected"),
                    Err(e) => error!("session failed: {e}"),
                }

                drop(session);
                drop(guard);
            }
            .instrument(span),
        );
    }
}
