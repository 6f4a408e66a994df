use std::env;

use crate::error::{ClientErr, Result};

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:50051";

/// The largest envelope accepted from the server by default, 512 MiB.
///
/// Tensor bytes travel as JSON number arrays, up to four encoded bytes per
/// tensor byte, so the parameters an envelope can carry are roughly a quarter
/// of this.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = comms::DEFAULT_MAX_FRAME_LEN;

const SERVER_ADDR_VAR: &str = "SERVER_ADDR";
const MAX_MESSAGE_LENGTH_VAR: &str = "MAX_MESSAGE_LENGTH";

/// Immutable settings for a client process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    server_address: String,
    max_message_length: usize,
}

impl ClientConfig {
    /// Creates a new client configuration with the default maximum message length.
    ///
    /// # Args
    /// * `server_address` - The `host:port` of the coordinating server.
    ///
    /// # Returns
    /// A `ClientConfig` instance.
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    /// Replaces the largest envelope accepted from the server.
    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self
    }

    /// Reads the configuration from `SERVER_ADDR` and `MAX_MESSAGE_LENGTH`,
    /// falling back to the defaults for the unset ones.
    ///
    /// # Errors
    /// `InvalidConfig` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_address =
            lookup(SERVER_ADDR_VAR).unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        let max_message_length = match lookup(MAX_MESSAGE_LENGTH_VAR) {
            Some(value) => value.trim().parse().map_err(|e| {
                ClientErr::InvalidConfig(format!("{MAX_MESSAGE_LENGTH_VAR}={value:?}: {e}"))
            })?,
            None => DEFAULT_MAX_MESSAGE_LENGTH,
        };

        let config = Self::new(server_address).with_max_message_length(max_message_length);
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration before connecting.
    ///
    /// # Errors
    /// `InvalidConfig` if the address is empty or the maximum message length is zero.
    pub fn validate(&self) -> Result<()> {
        if self.server_address.trim().is_empty() {
            return Err(ClientErr::InvalidConfig(
                "the server address is empty".to_string(),
            ));
        }

        if self.max_message_length == 0 {
            return Err(ClientErr::InvalidConfig(
                "the maximum message length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }
}
