//! Error types for the protocol attachment, listener, and dialer.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Errors that can occur while accepting or dialing protocol streams.
///
/// I/O failures on an established [`StreamConn`](crate::StreamConn) are not
/// represented here, they surface as plain [`io::Error`] values straight from
/// the underlying stream.
#[derive(Debug)]
pub enum Error {
    /// The host failed to open an outbound stream.
    ///
    /// Possible causes:
    ///
    /// * The peer has no known address.
    /// * The peer is unreachable.
    /// * Security or protocol negotiation failed.
    ///
    /// The host's error is carried verbatim.
    Dial(io::Error),
    /// The dial was cancelled before a stream could be opened.
    DialCancelled,
    /// Opening the outbound stream took longer than the configured dial timeout.
    DialTimedOut,
    /// A dial target could not be parsed into a peer identity.
    InvalidTarget(String),
    /// The listener was closed, or the protocol attachment's token was cancelled.
    ListenerClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dial(err) => write!(f, "Failed to open protocol stream: {err}"),
            Error::DialCancelled => write!(f, "Dial cancelled before a stream was opened"),
            Error::DialTimedOut => write!(f, "Dial timed out opening protocol stream"),
            Error::InvalidTarget(target) => write!(f, "Invalid dial target: {target}"),
            Error::ListenerClosed => write!(f, "Listener closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Dial(err) => Some(err),
            Error::DialCancelled => None,
            Error::DialTimedOut => None,
            Error::InvalidTarget(_) => None,
            Error::ListenerClosed => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Dial(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_error_keeps_source() {
        let err = Error::Dial(io::Error::new(io::ErrorKind::NotFound, "no addresses"));
        let source = err.source().expect("dial error has a source");
        assert_eq!(source.to_string(), "no addresses");
        assert!(err.to_string().contains("no addresses"));
    }

    #[test]
    fn test_listener_closed_has_no_source() {
        assert!(Error::ListenerClosed.source().is_none());
        assert_eq!(Error::ListenerClosed.to_string(), "Listener closed");
    }
}
