//! Connection-oriented RPC over peer-to-peer protocol streams.
//!
//! A peer-to-peer host multiplexes named protocols over its peer connections
//! and opens streams on demand, addressed by peer identity. An RPC runtime
//! wants a listener that accepts connections and a dialer that opens them.
//! This crate adapts the first to the second:
//!
//! * [`GrpcProtocol`] registers a handler for [`PROTOCOL_ID`] on a [`Host`] and
//!   exposes the outbound [`dial`](GrpcProtocol::dial) path.
//! * [`StreamListener`] turns handler-delivered streams into an `accept` call.
//! * [`StreamConn`] makes a single stream look like a connection whose
//!   addresses are [`PeerAddr`] values.
//! * [`StreamDialer`] dials by the text form of a peer identity.
//!
//! # Example
//!
//! ```
//! use p2p_grpc_transport::memory::MemoryNetwork;
//! use p2p_grpc_transport::{CancellationToken, GrpcProtocol};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let cancel = CancellationToken::new();
//! let server = GrpcProtocol::new(cancel.clone(), network.add_host());
//! let client = GrpcProtocol::new(cancel.clone(), network.add_host());
//!
//! let listener = server.new_listener();
//! let mut outbound = client.dial(&cancel, &server.host().id()).await?;
//! let mut inbound = listener.accept().await?;
//! assert_eq!(inbound.remote_addr().to_string(), client.host().id().to_string());
//!
//! outbound.write_all(b"hello").await?;
//! let mut buf = [0u8; 5];
//! inbound.read_exact(&mut buf).await?;
//!
//! // Stops the handler and closes the listener.
//! cancel.cancel();
//! # Ok(())
//! # }
//! ```

mod addr;
mod configuration;
mod conn;
mod dial;
mod error;
mod handoff;
mod host;
mod listener;
pub mod memory;
mod protocol;
pub mod runtime;

pub use addr::{PeerAddr, NETWORK};
pub use configuration::{ProtocolConfiguration, DEFAULT_DIAL_TIMEOUT, PROTOCOL_ID};
pub use conn::StreamConn;
pub use dial::StreamDialer;
pub use error::Error;
pub use host::{Host, PeerIdentity, PeerStream, StreamHandler};
pub use listener::StreamListener;
pub use protocol::GrpcProtocol;
pub use runtime::{Address, Connection, Dialer, Listener};

// Re-exports.
pub use tokio_util::sync::CancellationToken;
