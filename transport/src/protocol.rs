//! Protocol attachment: inbound stream handler and outbound dial path.

use crate::configuration::ProtocolConfiguration;
use crate::conn::StreamConn;
use crate::dial::StreamDialer;
use crate::error::Error;
use crate::handoff::Handoff;
use crate::host::{Host, StreamHandler};
use crate::listener::StreamListener;
use async_trait::async_trait;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Receives inbound streams from the host and parks them for `accept`.
///
/// Kept apart from [`GrpcProtocol`] so the host's reference to the handler does
/// not keep the host itself alive.
pub(crate) struct InboundHandler<S> {
    pub(crate) handoff: Arc<Handoff<S>>,
    pub(crate) cancel: CancellationToken,
}

impl<S> InboundHandler<S> {
    /// Wait for a listener to take `stream`, or drop it once cancelled.
    pub(crate) async fn forward(&self, stream: S) -> bool {
        self.handoff.offer(stream, &self.cancel).await
    }
}

#[async_trait]
impl<S: Send + 'static> StreamHandler<S> for InboundHandler<S> {
    async fn handle_stream(&self, stream: S) {
        if self.forward(stream).await {
            debug!("Inbound stream handed to listener");
        }
    }
}

struct Inner<H: Host> {
    host: H,
    configuration: ProtocolConfiguration,
    handler: Arc<InboundHandler<H::Stream>>,
}

/// The RPC-over-p2p protocol attached to one host.
///
/// Construction registers a stream handler for the configured protocol
/// identifier. Inbound streams wait in a single-slot rendezvous until a
/// [`StreamListener`] accepts them. A host dispatch therefore blocks while no
/// `accept` is pending, unless the governing [`CancellationToken`] is cancelled,
/// in which case the waiting stream is dropped without being delivered. The
/// remote peer then sees a stream that was opened but never served.
///
/// There is no teardown method, cancel the token instead. Cloning is cheap and
/// every clone refers to the same attachment.
///
/// # Example
///
/// ```
/// use p2p_grpc_transport::memory::MemoryNetwork;
/// use p2p_grpc_transport::GrpcProtocol;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let network = MemoryNetwork::new();
/// let server = GrpcProtocol::new(CancellationToken::new(), network.add_host());
/// let client = GrpcProtocol::new(CancellationToken::new(), network.add_host());
///
/// let listener = server.new_listener();
/// let server_id = server.host().id();
/// tokio::spawn(async move {
///     let mut conn = client.dial(&CancellationToken::new(), &server_id).await?;
///     conn.write_all(b"ping").await?;
///     Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
/// });
///
/// let mut conn = listener.accept().await?;
/// let mut buf = [0u8; 4];
/// conn.read_exact(&mut buf).await?;
/// assert_eq!(&buf, b"ping");
/// # Ok(())
/// # }
/// ```
pub struct GrpcProtocol<H: Host> {
    inner: Arc<Inner<H>>,
}

impl<H: Host> Clone for GrpcProtocol<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host> GrpcProtocol<H> {
    /// Attach the protocol to `host` with the default configuration.
    pub fn new(cancel: CancellationToken, host: H) -> Self {
        Self::with_configuration(cancel, host, ProtocolConfiguration::default())
    }

    /// Attach the protocol to `host`.
    ///
    /// # Arguments
    ///
    /// * `cancel` - Governs the handler and every listener created from it.
    /// * `host` - The host to register the stream handler on.
    /// * `configuration` - Protocol identifier and dial settings.
    pub fn with_configuration(
        cancel: CancellationToken,
        host: H,
        configuration: ProtocolConfiguration,
    ) -> Self {
        let handler = Arc::new(InboundHandler {
            handoff: Arc::new(Handoff::new()),
            cancel,
        });
        host.set_stream_handler(&configuration.protocol_id, handler.clone());
        debug!(
            "Registered {} handler on host {}",
            configuration.protocol_id,
            host.id()
        );

        Self {
            inner: Arc::new(Inner {
                host,
                configuration,
                handler,
            }),
        }
    }

    /// The host this protocol is attached to.
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// The attachment's configuration.
    pub fn configuration(&self) -> &ProtocolConfiguration {
        &self.inner.configuration
    }

    /// The token governing the handler and its listeners.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.handler.cancel
    }

    /// Hand an inbound stream to a waiting listener.
    ///
    /// This is what the host invokes through the registered [`StreamHandler`].
    /// Returns `true` once a listener has taken the stream and `false` if the
    /// token was cancelled first, in which case the stream was dropped.
    pub async fn handle_stream(&self, stream: H::Stream) -> bool {
        self.inner.handler.forward(stream).await
    }

    /// Create a listener fed by this attachment.
    ///
    /// Every listener shares the same single-consumer channel and token, so
    /// one logical listener per attachment is the intended use.
    pub fn new_listener(&self) -> StreamListener<H::Stream> {
        StreamListener::new(
            self.inner.handler.handoff.clone(),
            self.inner.handler.cancel.clone(),
            self.inner.host.id(),
        )
    }

    /// Open a stream to `peer` under the protocol and wrap it as a connection.
    ///
    /// No retries are attempted.
    ///
    /// # Errors
    ///
    /// * [`Error::Dial`] - The host failed to open the stream, error carried verbatim.
    /// * [`Error::DialCancelled`] - `cancel` fired first.
    /// * [`Error::DialTimedOut`] - The configured dial timeout elapsed.
    pub async fn dial(
        &self,
        cancel: &CancellationToken,
        peer: &H::PeerId,
    ) -> Result<StreamConn<H::Stream>, Error> {
        let configuration = &self.inner.configuration;
        if cancel.is_cancelled() {
            return Err(Error::DialCancelled);
        }

        let open = tokio::time::timeout(
            configuration.dial_timeout,
            self.inner.host.new_stream(peer, &configuration.protocol_id),
        );
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::DialCancelled),
            opened = open => match opened {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    debug!("Failed to open {} stream to {}: {}", configuration.protocol_id, peer, e);
                    return Err(Error::Dial(e));
                }
                Err(_) => {
                    debug!("Timed out opening {} stream to {}", configuration.protocol_id, peer);
                    return Err(Error::DialTimedOut);
                }
            },
        };

        let conn = StreamConn::new(stream);
        info!("Dialed {conn}");
        Ok(conn)
    }

    /// A [`Dialer`](crate::Dialer) for this attachment, parsing targets as peer identities.
    pub fn dialer(&self) -> StreamDialer<H> {
        StreamDialer::new(self.clone())
    }
}

impl<H: Host> fmt::Debug for GrpcProtocol<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcProtocol")
            .field("host", &self.inner.host.id())
            .field("configuration", &self.inner.configuration)
            .field("cancelled", &self.inner.handler.cancel.is_cancelled())
            .finish()
    }
}

impl<H: Host> fmt::Display for GrpcProtocol<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}",
            self.inner.configuration.protocol_id,
            self.inner.host.id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryNetwork, MemoryStream, PeerId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    fn stream_pair(network: &MemoryNetwork) -> (PeerId, PeerId, MemoryStream) {
        let local = network.add_host().id();
        let remote = PeerId::from(0xfeed);
        let (stream, _peer_end) = MemoryStream::pair(local, remote);
        (local, remote, stream)
    }

    #[tokio::test]
    async fn test_registers_handler_under_protocol_id() {
        let network = MemoryNetwork::new();
        let host = network.add_host();
        let protocol = GrpcProtocol::new(CancellationToken::new(), host.clone());

        assert!(host.supports_protocol("/grpc/0.0.1"));
        assert_eq!(protocol.configuration().protocol_id, "/grpc/0.0.1");
        assert_eq!(protocol.to_string(), format!("/grpc/0.0.1 on {}", host.id()));
    }

    #[tokio::test]
    async fn test_handle_stream_drops_when_cancelled() {
        let network = MemoryNetwork::new();
        let cancel = CancellationToken::new();
        let protocol = GrpcProtocol::new(cancel.clone(), network.add_host());
        let (_, _, stream) = stream_pair(&network);

        cancel.cancel();
        let delivered = timeout(Duration::from_secs(1), protocol.handle_stream(stream))
            .await
            .expect("cancelled handoff returns immediately");
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_concurrent_streams_serialize_through_accept() {
        let network = MemoryNetwork::new();
        let cancel = CancellationToken::new();
        let protocol = GrpcProtocol::new(cancel.clone(), network.add_host());
        let listener = protocol.new_listener();
        let delivered = Arc::new(AtomicUsize::new(0));

        let mut handlers = Vec::new();
        for _ in 0..5 {
            let protocol = protocol.clone();
            let delivered = delivered.clone();
            let (_, _, stream) = stream_pair(&network);
            handlers.push(tokio::spawn(async move {
                if protocol.handle_stream(stream).await {
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        let conn = timeout(Duration::from_secs(1), listener.accept())
            .await
            .expect("accept should not hang")
            .expect("accept yields a stream");
        assert_eq!(conn.remote_addr().to_string(), PeerId::from(0xfeed).to_string());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);

        cancel.cancel();
        for handler in handlers {
            timeout(Duration::from_secs(1), handler)
                .await
                .expect("blocked handlers return after cancel")
                .unwrap();
        }
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dial_respects_cancelled_token() {
        let network = MemoryNetwork::new();
        let server = GrpcProtocol::new(CancellationToken::new(), network.add_host());
        let client = GrpcProtocol::new(CancellationToken::new(), network.add_host());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .dial(&cancel, &server.host().id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DialCancelled));
    }
}
