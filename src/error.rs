use std::{error::Error, fmt, io};

use crate::client::Capability;

/// The client module's result type.
pub type Result<T> = std::result::Result<T, ClientErr>;

/// The error type a `Client` capability implementation may fail with.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Protocol adapter failures.
#[derive(Debug)]
pub enum ClientErr {
    /// The stream failed to connect, send or receive.
    Io(io::Error),
    /// The received bytes are not a well formed envelope.
    MalformedEnvelope(String),
    /// A metrics value outside of the supported scalar set.
    UnsupportedMetricType { key: String },
    /// An envelope reached the dispatcher with no tag, or more than one, set.
    UnknownServerMessage { tags: usize },
    /// The learning client failed while running a capability.
    Capability {
        capability: Capability,
        source: BoxError,
    },
    /// Invalid configuration, caught before connecting.
    InvalidConfig(String),
}

impl fmt::Display for ClientErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::MalformedEnvelope(detail) => write!(f, "malformed envelope: {detail}"),
            Self::UnsupportedMetricType { key } => {
                write!(f, "unsupported metric type for key {key:?}")
            }
            Self::UnknownServerMessage { tags } => {
                write!(f, "unknown server message: expected exactly one tag, got {tags}")
            }
            Self::Capability { capability, source } => {
                write!(f, "client failed to {capability}: {source}")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl Error for ClientErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Capability { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<ClientErr> for io::Error {
    fn from(value: ClientErr) -> Self {
        match value {
            ClientErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
