//! In-process peer-to-peer host.
//!
//! Hosts created from the same [`MemoryNetwork`] can open streams to each
//! other. Each stream is a tokio duplex pipe, and the receiving host dispatches
//! its end to the registered [`StreamHandler`] on a task of its own, the way a
//! real host dispatches inbound streams. Useful for tests and demos where a
//! full networking stack is overkill.

use crate::host::{Host, PeerStream, StreamHandler};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// Bytes buffered in each direction of a [`MemoryStream`].
pub const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Identity of a host on a [`MemoryNetwork`].
///
/// The canonical text form is 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        PeerId(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PeerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(PeerId)
    }
}

type Handlers = HashMap<String, Arc<dyn StreamHandler<MemoryStream>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One end of an in-memory protocol stream.
#[derive(Debug)]
pub struct MemoryStream {
    io: DuplexStream,
    local: PeerId,
    remote: PeerId,
}

impl MemoryStream {
    /// Create both ends of a stream between `local` and `remote`.
    ///
    /// The first end belongs to `local`, the second to `remote`.
    pub fn pair(local: PeerId, remote: PeerId) -> (MemoryStream, MemoryStream) {
        let (a, b) = tokio::io::duplex(STREAM_BUFFER_SIZE);
        (
            MemoryStream {
                io: a,
                local,
                remote,
            },
            MemoryStream {
                io: b,
                local: remote,
                remote: local,
            },
        )
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

impl PeerStream for MemoryStream {
    type PeerId = PeerId;

    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn remote_peer(&self) -> PeerId {
        self.remote
    }
}

#[derive(Default)]
struct NetworkInner {
    next_id: AtomicU64,
    hosts: Mutex<HashMap<PeerId, Arc<Mutex<Handlers>>>>,
}

/// Address book shared by a set of in-memory hosts.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host with a fresh identity, reachable by every other host.
    pub fn add_host(&self) -> MemoryHost {
        let id = PeerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let handlers = Arc::new(Mutex::new(Handlers::new()));
        lock(&self.inner.hosts).insert(id, handlers.clone());
        debug!("Added memory host {id}");

        MemoryHost {
            id,
            network: self.clone(),
            handlers,
        }
    }

    /// Forget a host's address. Later streams to it fail as if it were unknown.
    ///
    /// Returns `false` if the host was not known.
    pub fn remove_host(&self, id: &PeerId) -> bool {
        lock(&self.inner.hosts).remove(id).is_some()
    }

    fn handlers(&self, id: &PeerId) -> Option<Arc<Mutex<Handlers>>> {
        lock(&self.inner.hosts).get(id).cloned()
    }
}

impl fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("hosts", &lock(&self.inner.hosts).len())
            .finish()
    }
}

/// A host on a [`MemoryNetwork`].
///
/// Clones share the same identity and handler registrations.
#[derive(Clone)]
pub struct MemoryHost {
    id: PeerId,
    network: MemoryNetwork,
    handlers: Arc<Mutex<Handlers>>,
}

impl MemoryHost {
    /// This host's identity.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Whether a handler is registered for `protocol`.
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        lock(&self.handlers).contains_key(protocol)
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocols: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        f.debug_struct("MemoryHost")
            .field("id", &self.id)
            .field("protocols", &protocols)
            .finish()
    }
}

#[async_trait]
impl Host for MemoryHost {
    type PeerId = PeerId;
    type Stream = MemoryStream;

    fn id(&self) -> PeerId {
        self.id
    }

    fn set_stream_handler(&self, protocol: &str, handler: Arc<dyn StreamHandler<MemoryStream>>) {
        lock(&self.handlers).insert(protocol.to_string(), handler);
    }

    async fn new_stream(&self, peer: &PeerId, protocol: &str) -> io::Result<MemoryStream> {
        let handlers = self.network.handlers(peer).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for peer {peer}"),
            )
        })?;
        let handler = lock(&handlers).get(protocol).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("peer {peer} does not support protocol {protocol}"),
            )
        })?;

        let (local, remote) = MemoryStream::pair(self.id, *peer);
        debug!("Opened {protocol} stream {} -> {peer}", self.id);
        tokio::spawn(async move { handler.handle_stream(remote).await });
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<MemoryStream>);

    #[async_trait]
    impl StreamHandler<MemoryStream> for Forward {
        async fn handle_stream(&self, stream: MemoryStream) {
            let _ = self.0.send(stream);
        }
    }

    #[test]
    fn test_peer_id_text_round_trip() {
        let id = PeerId::from(0xdead_beef);
        assert_eq!(id.to_string(), "00000000deadbeef");
        assert_eq!("00000000deadbeef".parse::<PeerId>().unwrap(), id);
        assert!("not hex".parse::<PeerId>().is_err());
    }

    #[test]
    fn test_hosts_get_distinct_ids() {
        let network = MemoryNetwork::new();
        let a = network.add_host();
        let b = network.add_host();
        assert_ne!(a.id(), b.id());
        assert!(network.remove_host(&a.id()));
        assert!(!network.remove_host(&a.id()));
    }

    #[tokio::test]
    async fn test_new_stream_dispatches_to_handler() {
        let network = MemoryNetwork::new();
        let server = network.add_host();
        let client = network.add_host();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.set_stream_handler("/test/1", Arc::new(Forward(tx)));

        let mut outbound = client.new_stream(&server.id(), "/test/1").await.unwrap();
        let mut inbound = rx.recv().await.unwrap();

        assert_eq!(outbound.local_peer(), client.id());
        assert_eq!(outbound.remote_peer(), server.id());
        assert_eq!(inbound.local_peer(), server.id());
        assert_eq!(inbound.remote_peer(), client.id());

        outbound.write_all(b"abc").await.unwrap();
        let mut buf = [0u8; 3];
        inbound.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[tokio::test]
    async fn test_new_stream_failures() {
        let network = MemoryNetwork::new();
        let server = network.add_host();
        let client = network.add_host();

        let err = client
            .new_stream(&server.id(), "/missing/1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);

        let err = client
            .new_stream(&PeerId::from(0xffff), "/missing/1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
