//! Protocol attachment configuration types and constants.

use std::fmt;
use std::time::Duration;

/// The RPC-over-p2p protocol identifier.
///
/// Used as the multiplexing key on the peer-to-peer host. Both ends must agree
/// on this exact string, so treat it as a wire-level version: changing it breaks
/// compatibility with unchanged peers.
pub const PROTOCOL_ID: &str = "/grpc/0.0.1";

/// Default timeout for opening an outbound protocol stream.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration used to attach the protocol to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfiguration {
    /// Protocol identifier the handler is registered under and streams are opened with.
    pub protocol_id: String,
    /// Upper bound on opening an outbound stream.
    pub dial_timeout: Duration,
}

impl Default for ProtocolConfiguration {
    fn default() -> Self {
        Self {
            protocol_id: PROTOCOL_ID.to_string(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

impl ProtocolConfiguration {
    /// Override the protocol identifier.
    ///
    /// Only useful for running several independent attachments on one host, or
    /// for talking to peers pinned to another protocol version.
    pub fn with_protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = protocol_id.into();
        self
    }

    /// Set the timeout for opening an outbound stream.
    ///
    /// The default is 10 seconds.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use p2p_grpc_transport::ProtocolConfiguration;
    ///
    /// let config = ProtocolConfiguration::default().with_dial_timeout(Duration::from_secs(30));
    /// assert_eq!(config.dial_timeout, Duration::from_secs(30));
    /// ```
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }
}

impl fmt::Display for ProtocolConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProtocolConfiguration {{ protocol: \"{}\", dial_timeout: {:?} }}",
            self.protocol_id, self.dial_timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_configuration_default() {
        let config = ProtocolConfiguration::default();
        assert_eq!(config.protocol_id, "/grpc/0.0.1");
        assert_eq!(config.dial_timeout, DEFAULT_DIAL_TIMEOUT);
        assert_eq!(config.dial_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_protocol_configuration_overrides() {
        let config = ProtocolConfiguration::default()
            .with_protocol_id("/grpc/0.0.2")
            .with_dial_timeout(Duration::from_millis(250));
        assert_eq!(config.protocol_id, "/grpc/0.0.2");
        assert_eq!(config.dial_timeout, Duration::from_millis(250));
        assert_eq!(
            config.to_string(),
            "ProtocolConfiguration { protocol: \"/grpc/0.0.2\", dial_timeout: 250ms }"
        );
    }
}
