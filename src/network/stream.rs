use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

/// An established connection handed to an entrypoint service, either raw TCP
/// or a server-side TLS session over TCP. Both variants read and write
/// through the same interface, so services are written once for plain and
/// encrypted acceptors alike.
#[derive(Debug)]
pub enum ServiceStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ServiceStream {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            ServiceStream::Plain(stream) => stream.peer_addr(),
            ServiceStream::Tls(stream) => stream.get_ref().0.peer_addr(),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, ServiceStream::Tls(_))
    }
}

impl AsyncRead for ServiceStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServiceStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            ServiceStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ServiceStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ServiceStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            ServiceStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServiceStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            ServiceStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServiceStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            ServiceStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
