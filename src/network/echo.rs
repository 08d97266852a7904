use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

use crate::network::ServiceStream;
use crate::service::EntrypointService;

/// Reference entrypoint service: writes every byte it reads back to the
/// peer.
///
/// `create` spawns the read loop with a clone of the shared handle, so the
/// service stays alive exactly as long as its connection has pending work
/// and releases itself on EOF or error. Nothing else holds it.
pub struct EchoService {
    peer: SocketAddr,
    tls: bool,
}

impl EchoService {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the connection was handed over TLS-secured.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    async fn run(self: Arc<Self>, mut stream: ServiceStream) {
        let mut buffer = BytesMut::with_capacity(4 * 1024);
        loop {
            buffer.clear();
            match stream.read_buf(&mut buffer).await {
                Ok(0) => {
                    debug!("client {} closed the connection", self.peer);
                    break;
                }
                Ok(n) => {
                    if let Err(e) = stream.write_all(&buffer).await {
                        debug!("write to {} failed: {}", self.peer, e);
                        break;
                    }
                    if let Err(e) = stream.flush().await {
                        debug!("flush to {} failed: {}", self.peer, e);
                        break;
                    }
                    trace!("echoed {} bytes to {}", n, self.peer);
                }
                Err(e) => {
                    debug!("read from {} failed: {}", self.peer, e);
                    break;
                }
            }
        }
    }
}

impl EntrypointService for EchoService {
    fn create(stream: ServiceStream, peer: SocketAddr) -> Arc<Self> {
        let service = Arc::new(EchoService {
            // the stream knows its peer too; the accept-time address is the
            // fallback if the socket has gone away already
            peer: stream.peer_addr().unwrap_or(peer),
            tls: stream.is_tls(),
        });
        tokio::spawn(service.clone().run(stream));
        service
    }
}
