//! Value objects exchanged between the coordinating server and a learning client.

use std::collections::HashMap;

/// A single metrics, config or properties value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Bytes(Vec<u8>),
    Float(f64),
    Int(i64),
    Str(String),
}

pub type Metrics = HashMap<String, Scalar>;
pub type Config = HashMap<String, Scalar>;
pub type Properties = HashMap<String, Scalar>;

/// Model state as an ordered sequence of opaque blobs.
///
/// The order of `tensors` is significant and is preserved end to end, the
/// contents are never inspected. `tensor_type` names the scheme the blobs
/// were serialized with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub tensors: Vec<Vec<u8>>,
    pub tensor_type: String,
}

impl Parameters {
    /// Creates a new `Parameters` instance.
    ///
    /// # Arguments
    /// * `tensors` - The serialized blobs, in order.
    /// * `tensor_type` - The serialization scheme of the blobs.
    pub fn new(tensors: Vec<Vec<u8>>, tensor_type: impl Into<String>) -> Self {
        Self {
            tensors,
            tensor_type: tensor_type.into(),
        }
    }

    /// Whether there are no blobs at all, meaning "no model state".
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParametersRes {
    pub parameters: Parameters,
}

impl From<Parameters> for ParametersRes {
    fn from(parameters: Parameters) -> Self {
        Self { parameters }
    }
}

/// The instruction for one training round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitIns {
    pub parameters: Parameters,
    pub config: Config,
}

impl FitIns {
    /// The parameters to seed the local model with, `None` when the server sent
    /// an empty sequence and the local state must be kept.
    pub fn seed(&self) -> Option<&Parameters> {
        seed(&self.parameters)
    }
}

/// The result of one training round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitRes {
    pub parameters: Parameters,
    /// Should be greater than zero, passed through unchecked.
    pub num_examples: i64,
    /// Legacy upper bound of `num_examples`.
    pub num_examples_ceil: Option<i64>,
    /// Seconds spent fitting.
    pub fit_duration: Option<f64>,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluateIns {
    pub parameters: Parameters,
    pub config: Config,
}

impl EvaluateIns {
    /// Same seeding rule as `FitIns::seed`.
    pub fn seed(&self) -> Option<&Parameters> {
        seed(&self.parameters)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluateRes {
    pub loss: f64,
    pub num_examples: i64,
    /// Legacy, newer clients report it through `metrics`.
    pub accuracy: Option<f64>,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertiesIns {
    pub config: Config,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertiesRes {
    pub properties: Properties,
}

/// The server's request to close the stream and, optionally, come back later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconnect {
    pub seconds: Option<u64>,
}

/// Why the client is closing the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reason {
    #[default]
    Unknown,
    Reconnect,
    PowerDisconnected,
    WifiUnavailable,
    Ack,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: Reason,
}

fn seed(parameters: &Parameters) -> Option<&Parameters> {
    (!parameters.is_empty()).then_some(parameters)
}
