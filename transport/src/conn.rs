//! Peer-to-peer stream exposed as a byte-stream connection.

use crate::addr::PeerAddr;
use crate::host::PeerStream;
use crate::runtime::Connection;
use async_trait::async_trait;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

/// Wraps a single [`PeerStream`] so it satisfies the [`Connection`] contract.
///
/// Reads and writes go straight to the stream with no buffering or framing,
/// and any I/O failure is returned unchanged.
///
/// Endpoint identities are captured when the connection is created. The
/// identities of the underlying connection never change, and capturing them
/// keeps [`local_addr`](StreamConn::local_addr) and
/// [`remote_addr`](StreamConn::remote_addr) answering after the stream is closed.
#[derive(Debug)]
pub struct StreamConn<S: PeerStream> {
    stream: S,
    local: PeerAddr<S::PeerId>,
    remote: PeerAddr<S::PeerId>,
}

impl<S: PeerStream> StreamConn<S> {
    /// Take exclusive ownership of `stream`.
    pub fn new(stream: S) -> Self {
        let local = PeerAddr::new(stream.local_peer());
        let remote = PeerAddr::new(stream.remote_peer());
        Self {
            stream,
            local,
            remote,
        }
    }

    /// Address of this end, the local peer identity.
    pub fn local_addr(&self) -> PeerAddr<S::PeerId> {
        self.local.clone()
    }

    /// Address of the remote end, the remote peer identity.
    pub fn remote_addr(&self) -> PeerAddr<S::PeerId> {
        self.remote.clone()
    }

    /// Shut down the write side of the stream.
    ///
    /// Calling this more than once is harmless for the connection itself, but
    /// the stream may report an error on the second call.
    pub async fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    /// Borrow the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap into the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: PeerStream> fmt::Display for StreamConn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stream {} -> {}",
            self.local.network(),
            self.local,
            self.remote
        )
    }
}

impl<S: PeerStream> AsyncRead for StreamConn<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl<S: PeerStream> AsyncWrite for StreamConn<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[async_trait]
impl<S: PeerStream> Connection for StreamConn<S> {
    type Addr = PeerAddr<S::PeerId>;

    fn local_addr(&self) -> Self::Addr {
        StreamConn::local_addr(self)
    }

    fn remote_addr(&self) -> Self::Addr {
        StreamConn::remote_addr(self)
    }

    async fn close(&mut self) -> io::Result<()> {
        StreamConn::close(self).await
    }
}
