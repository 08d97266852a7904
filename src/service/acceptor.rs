use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{self, Handle, Runtime};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::network::ServiceStream;
use crate::{AppError, AppResult};

/// Hand-off contract between the acceptor and the per-connection service.
///
/// The factory takes ownership of an established (optionally TLS-secured)
/// connection and returns a shared handle. The implementation is expected to
/// register itself for whatever I/O keeps it alive, typically by spawning a
/// task that holds a clone of the returned `Arc`. The acceptor keeps no
/// record of the services it creates: once dispatched, a service is kept
/// alive only by its own pending work and releases itself when that work
/// ends.
pub trait EntrypointService: Send + Sync + 'static {
    fn create(stream: ServiceStream, peer: SocketAddr) -> Arc<Self>;
}

/// Observer invoked once per successfully established connection. The shared
/// handle lets the observer take its own reference without affecting the
/// service's primary lifetime.
pub type ServiceCreatedCallback<S> = Box<dyn Fn(&Arc<S>) + Send + Sync>;

/// Requested size of the worker pool. `Auto` resolves to the host's hardware
/// concurrency once, at [`Acceptor::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadCount {
    #[default]
    Auto,
    Fixed(usize),
}

/// Connection-acceptance front-end: binds a listening endpoint, runs the
/// accept loop on a per-instance worker pool, optionally terminates TLS, and
/// hands each established connection to a freshly created
/// [`EntrypointService`].
///
/// The endpoint is bound synchronously at construction, so bind failures
/// (address in use, permission denied) surface as a construction error. The
/// worker pool and the accept loop come up in [`Acceptor::start`].
///
/// Dropping the acceptor stops its execution context and joins the worker
/// threads before the drop returns. Already-dispatched services are not
/// closed proactively; their pending operations are severed by the context
/// shutdown or run to completion on their own. Because the drop joins
/// threads, the acceptor must not be dropped from inside its own runtime.
pub struct Acceptor<S: EntrypointService> {
    listener: Option<std::net::TcpListener>,
    local_addr: SocketAddr,
    tls: Option<Arc<rustls::ServerConfig>>,
    thread_count: ThreadCount,
    worker_threads: Option<usize>,
    runtime: Option<Runtime>,
    callback: Arc<RwLock<Option<ServiceCreatedCallback<S>>>>,
}

impl<S: EntrypointService> Acceptor<S> {
    /// Binds a plain-TCP acceptor to `addr`.
    pub fn bind(addr: SocketAddr, thread_count: ThreadCount) -> AppResult<Self> {
        Self::bind_inner(addr, None, thread_count)
    }

    /// Binds a TLS-terminating acceptor to `addr`.
    ///
    /// The TLS configuration stays shared with the caller; the acceptor only
    /// clones the handle, never the configuration itself.
    pub fn bind_tls(
        addr: SocketAddr,
        tls_config: Arc<rustls::ServerConfig>,
        thread_count: ThreadCount,
    ) -> AppResult<Self> {
        Self::bind_inner(addr, Some(tls_config), thread_count)
    }

    fn bind_inner(
        addr: SocketAddr,
        tls: Option<Arc<rustls::ServerConfig>>,
        thread_count: ThreadCount,
    ) -> AppResult<Self> {
        let listener =
            std::net::TcpListener::bind(addr).map_err(|source| AppError::Bind { addr, source })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        Ok(Acceptor {
            listener: Some(listener),
            local_addr,
            tls,
            thread_count,
            worker_threads: None,
            runtime: None,
            callback: Arc::new(RwLock::new(None)),
        })
    }

    /// Starts serving: resolves the worker count, brings up the worker pool,
    /// and arms the accept loop. Returns as soon as the loop is armed; the
    /// caller keeps the instance alive and blocks by other means (for
    /// example [`Acceptor::handle`] plus a signal future).
    pub fn start(&mut self) -> AppResult<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| AppError::IllegalState("acceptor already started".to_string()))?;
        let workers = match self.thread_count {
            ThreadCount::Auto => num_cpus::get().max(1),
            ThreadCount::Fixed(n) => n.max(1),
        };
        let rt = runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("portico-worker")
            .enable_all()
            .build()?;
        let listener = {
            let _guard = rt.enter();
            TcpListener::from_std(listener)?
        };
        info!(
            "listening on {} with {} worker thread(s)",
            self.local_addr, workers
        );
        let tls = self.tls.clone().map(TlsAcceptor::from);
        rt.spawn(accept_loop::<S>(listener, tls, self.callback.clone()));
        self.worker_threads = Some(workers);
        self.runtime = Some(rt);
        Ok(())
    }

    /// Replaces the observer callback; effective for subsequently accepted
    /// connections. Intended to be called before [`Acceptor::start`].
    pub fn set_service_created_callback<F>(&self, callback: F)
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Box::new(callback));
    }

    /// The bound endpoint, useful when binding to an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Execution context driving this acceptor's asynchronous work. `None`
    /// before [`Acceptor::start`].
    pub fn handle(&self) -> Option<&Handle> {
        self.runtime.as_ref().map(Runtime::handle)
    }

    /// Shared TLS configuration of an encrypted acceptor; `None` on plain
    /// instances.
    pub fn tls_config(&self) -> Option<&Arc<rustls::ServerConfig>> {
        self.tls.as_ref()
    }

    /// Resolved worker count. `None` before [`Acceptor::start`].
    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }
}

impl<S: EntrypointService> Drop for Acceptor<S> {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.take() {
            // stops the event loops and joins the workers
            drop(rt);
            debug!("acceptor on {} shut down", self.local_addr);
        }
    }
}

/// Perpetual accept protocol. After a successful accept the loop continues
/// straight to the next `accept().await`; all per-connection work runs on a
/// separately spawned task. The next accept is therefore always armed before
/// any handshake starts, so accept availability is never gated on
/// per-connection setup cost.
async fn accept_loop<S: EntrypointService>(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    callback: Arc<RwLock<Option<ServiceCreatedCallback<S>>>>,
) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let tls = tls.clone();
                let callback = callback.clone();
                tokio::spawn(establish::<S>(socket, peer, tls, callback));
            }
            Err(e) if is_transient_accept_error(&e) => {
                // the peer vanished between arriving in the backlog and the
                // accept; the listening socket itself is fine
                warn!("transient accept error: {}", e);
            }
            Err(e) => {
                error!("accept loop terminated: {}", e);
                break;
            }
        }
    }
}

async fn establish<S: EntrypointService>(
    socket: TcpStream,
    peer: SocketAddr,
    tls: Option<TlsAcceptor>,
    callback: Arc<RwLock<Option<ServiceCreatedCallback<S>>>>,
) {
    let stream = match tls {
        None => ServiceStream::Plain(socket),
        Some(handshaker) => match handshaker.accept(socket).await {
            Ok(secured) => ServiceStream::Tls(Box::new(secured)),
            Err(e) => {
                // routine: a bad hello costs one dropped connection
                debug!("tls handshake with {} failed: {}", peer, e);
                return;
            }
        },
    };
    let service = S::create(stream, peer);
    if let Some(callback) = callback.read().as_ref() {
        callback(&service);
    }
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}
