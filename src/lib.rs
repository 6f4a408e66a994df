pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod message_handler;
pub mod proto;
pub mod session;
pub mod transport;
pub mod typing;

pub use client::{Capability, Client};
pub use config::ClientConfig;
pub use error::{BoxError, ClientErr, Result};
pub use session::{SessionEnd, run_session, start_client};
pub use transport::{FramedStream, Stream, TcpTransport, Transport};
