//! Conversion between wire envelopes and the in-process domain types.
//!
//! Domain to wire is infallible (`From`), wire to domain can fail when a
//! scalar value is outside of the supported set (`TryFrom`). The byte level
//! functions enforce the exactly-one-tag rule of the envelopes.

use crate::{
    error::{ClientErr, Result},
    proto,
    typing::{
        Disconnect, EvaluateIns, EvaluateRes, FitIns, FitRes, Metrics, Parameters, ParametersRes,
        PropertiesIns, PropertiesRes, Reason, Reconnect, Scalar,
    },
};

/// Parses an instruction envelope received from the server.
///
/// # Errors
/// `MalformedEnvelope` if the bytes don't parse or if not exactly one tag is set.
pub fn decode_server_message(buf: &[u8]) -> Result<proto::ServerMessage> {
    let msg: proto::ServerMessage = serde_json::from_slice(buf).map_err(malformed)?;
    check_tags("server", msg.tag_count())?;
    Ok(msg)
}

/// Serializes a result envelope to be sent to the server.
///
/// # Errors
/// `MalformedEnvelope` if not exactly one tag is set or a float isn't finite,
/// neither can be carried by the wire format.
pub fn encode_client_message(msg: &proto::ClientMessage) -> Result<Vec<u8>> {
    check_tags("client", msg.tag_count())?;

    if let Some(res) = &msg.get_properties_res {
        check_map(&res.properties)?;
    }

    if let Some(res) = &msg.fit_res {
        check_finite("fit_duration", res.fit_duration)?;
        check_map(&res.metrics)?;
    }

    if let Some(res) = &msg.evaluate_res {
        check_finite("loss", Some(res.loss))?;
        check_finite("accuracy", res.accuracy)?;
        check_map(&res.metrics)?;
    }

    serde_json::to_vec(msg).map_err(malformed)
}

/// Serializes an instruction envelope, the coordinator's side of the exchange.
///
/// # Errors
/// Same as `encode_client_message`.
pub fn encode_server_message(msg: &proto::ServerMessage) -> Result<Vec<u8>> {
    check_tags("server", msg.tag_count())?;

    let configs = [
        msg.get_properties_ins.as_ref().map(|ins| &ins.config),
        msg.get_parameters_ins.as_ref().map(|ins| &ins.config),
        msg.fit_ins.as_ref().map(|ins| &ins.config),
        msg.evaluate_ins.as_ref().map(|ins| &ins.config),
    ];

    for config in configs.into_iter().flatten() {
        check_map(config)?;
    }

    serde_json::to_vec(msg).map_err(malformed)
}

/// Parses a result envelope, the coordinator's side of the exchange.
///
/// # Errors
/// Same as `decode_server_message`.
pub fn decode_client_message(buf: &[u8]) -> Result<proto::ClientMessage> {
    let msg: proto::ClientMessage = serde_json::from_slice(buf).map_err(malformed)?;
    check_tags("client", msg.tag_count())?;
    Ok(msg)
}

fn malformed(e: serde_json::Error) -> ClientErr {
    ClientErr::MalformedEnvelope(e.to_string())
}

fn check_tags(kind: &str, tags: usize) -> Result<()> {
    if tags == 1 {
        return Ok(());
    }

    Err(ClientErr::MalformedEnvelope(format!(
        "{kind} message must have exactly one tag set, got {tags}"
    )))
}

fn check_finite(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() => Err(ClientErr::MalformedEnvelope(format!(
            "{field} is {v}, only finite numbers can be encoded"
        ))),
        _ => Ok(()),
    }
}

fn check_map(map: &proto::ScalarMap) -> Result<()> {
    for (key, scalar) in map {
        check_finite(key, scalar.double)?;
    }

    Ok(())
}

/// Converts a single wire scalar, `key` is only used for error reporting.
pub fn scalar_from_proto(key: &str, scalar: proto::Scalar) -> Result<Scalar> {
    let proto::Scalar {
        double,
        sint64,
        boolean,
        string,
        bytes,
    } = scalar;

    match (double, sint64, boolean, string, bytes) {
        (Some(v), None, None, None, None) => Ok(Scalar::Float(v)),
        (None, Some(v), None, None, None) => Ok(Scalar::Int(v)),
        (None, None, Some(v), None, None) => Ok(Scalar::Bool(v)),
        (None, None, None, Some(v), None) => Ok(Scalar::Str(v)),
        (None, None, None, None, Some(v)) => Ok(Scalar::Bytes(v)),
        _ => Err(ClientErr::UnsupportedMetricType {
            key: key.to_owned(),
        }),
    }
}

impl From<Scalar> for proto::Scalar {
    fn from(scalar: Scalar) -> Self {
        let mut proto = Self::default();
        match scalar {
            Scalar::Bool(v) => proto.boolean = Some(v),
            Scalar::Bytes(v) => proto.bytes = Some(v),
            Scalar::Float(v) => proto.double = Some(v),
            Scalar::Int(v) => proto.sint64 = Some(v),
            Scalar::Str(v) => proto.string = Some(v),
        }

        proto
    }
}

/// Converts a metrics, config or properties map into its wire form.
pub fn metrics_to_proto(metrics: Metrics) -> proto::ScalarMap {
    metrics
        .into_iter()
        .map(|(key, value)| (key, value.into()))
        .collect()
}

/// Converts a wire scalar map, failing on the first unsupported value.
pub fn metrics_from_proto(map: proto::ScalarMap) -> Result<Metrics> {
    map.into_iter()
        .map(|(key, value)| {
            let value = scalar_from_proto(&key, value)?;
            Ok((key, value))
        })
        .collect()
}

impl From<Parameters> for proto::Parameters {
    fn from(parameters: Parameters) -> Self {
        Self {
            tensors: parameters.tensors,
            tensor_type: parameters.tensor_type,
        }
    }
}

impl From<proto::Parameters> for Parameters {
    fn from(parameters: proto::Parameters) -> Self {
        Self {
            tensors: parameters.tensors,
            tensor_type: parameters.tensor_type,
        }
    }
}

impl From<ParametersRes> for proto::GetParametersRes {
    fn from(res: ParametersRes) -> Self {
        Self {
            parameters: res.parameters.into(),
        }
    }
}

impl From<proto::GetParametersRes> for ParametersRes {
    fn from(res: proto::GetParametersRes) -> Self {
        Self {
            parameters: res.parameters.into(),
        }
    }
}

impl From<FitIns> for proto::FitIns {
    fn from(ins: FitIns) -> Self {
        Self {
            parameters: ins.parameters.into(),
            config: metrics_to_proto(ins.config),
        }
    }
}

impl TryFrom<proto::FitIns> for FitIns {
    type Error = ClientErr;

    fn try_from(ins: proto::FitIns) -> Result<Self> {
        Ok(Self {
            parameters: ins.parameters.into(),
            config: metrics_from_proto(ins.config)?,
        })
    }
}

impl From<FitRes> for proto::FitRes {
    fn from(res: FitRes) -> Self {
        Self {
            parameters: res.parameters.into(),
            num_examples: res.num_examples,
            num_examples_ceil: res.num_examples_ceil,
            fit_duration: res.fit_duration,
            metrics: metrics_to_proto(res.metrics),
        }
    }
}

impl TryFrom<proto::FitRes> for FitRes {
    type Error = ClientErr;

    fn try_from(res: proto::FitRes) -> Result<Self> {
        Ok(Self {
            parameters: res.parameters.into(),
            num_examples: res.num_examples,
            num_examples_ceil: res.num_examples_ceil,
            fit_duration: res.fit_duration,
            metrics: metrics_from_proto(res.metrics)?,
        })
    }
}

impl From<EvaluateIns> for proto::EvaluateIns {
    fn from(ins: EvaluateIns) -> Self {
        Self {
            parameters: ins.parameters.into(),
            config: metrics_to_proto(ins.config),
        }
    }
}

impl TryFrom<proto::EvaluateIns> for EvaluateIns {
    type Error = ClientErr;

    fn try_from(ins: proto::EvaluateIns) -> Result<Self> {
        Ok(Self {
            parameters: ins.parameters.into(),
            config: metrics_from_proto(ins.config)?,
        })
    }
}

impl From<EvaluateRes> for proto::EvaluateRes {
    fn from(res: EvaluateRes) -> Self {
        Self {
            loss: res.loss,
            num_examples: res.num_examples,
            accuracy: res.accuracy,
            metrics: metrics_to_proto(res.metrics),
        }
    }
}

impl TryFrom<proto::EvaluateRes> for EvaluateRes {
    type Error = ClientErr;

    fn try_from(res: proto::EvaluateRes) -> Result<Self> {
        Ok(Self {
            loss: res.loss,
            num_examples: res.num_examples,
            accuracy: res.accuracy,
            metrics: metrics_from_proto(res.metrics)?,
        })
    }
}

impl From<PropertiesIns> for proto::GetPropertiesIns {
    fn from(ins: PropertiesIns) -> Self {
        Self {
            config: metrics_to_proto(ins.config),
        }
    }
}

impl TryFrom<proto::GetPropertiesIns> for PropertiesIns {
    type Error = ClientErr;

    fn try_from(ins: proto::GetPropertiesIns) -> Result<Self> {
        Ok(Self {
            config: metrics_from_proto(ins.config)?,
        })
    }
}

impl From<PropertiesRes> for proto::GetPropertiesRes {
    fn from(res: PropertiesRes) -> Self {
        Self {
            properties: metrics_to_proto(res.properties),
        }
    }
}

impl TryFrom<proto::GetPropertiesRes> for PropertiesRes {
    type Error = ClientErr;

    fn try_from(res: proto::GetPropertiesRes) -> Result<Self> {
        Ok(Self {
            properties: metrics_from_proto(res.properties)?,
        })
    }
}

impl From<Reconnect> for proto::ReconnectIns {
    fn from(reconnect: Reconnect) -> Self {
        Self {
            seconds: reconnect.seconds,
        }
    }
}

impl From<proto::ReconnectIns> for Reconnect {
    fn from(ins: proto::ReconnectIns) -> Self {
        Self {
            seconds: ins.seconds,
        }
    }
}

impl From<Reason> for proto::Reason {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Unknown => Self::Unknown,
            Reason::Reconnect => Self::Reconnect,
            Reason::PowerDisconnected => Self::PowerDisconnected,
            Reason::WifiUnavailable => Self::WifiUnavailable,
            Reason::Ack => Self::Ack,
        }
    }
}

impl From<proto::Reason> for Reason {
    fn from(reason: proto::Reason) -> Self {
        match reason {
            proto::Reason::Unknown => Self::Unknown,
            proto::Reason::Reconnect => Self::Reconnect,
            proto::Reason::PowerDisconnected => Self::PowerDisconnected,
            proto::Reason::WifiUnavailable => Self::WifiUnavailable,
            proto::Reason::Ack => Self::Ack,
        }
    }
}

impl From<Disconnect> for proto::DisconnectRes {
    fn from(disconnect: Disconnect) -> Self {
        Self {
            reason: disconnect.reason.into(),
        }
    }
}

impl From<proto::DisconnectRes> for Disconnect {
    fn from(res: proto::DisconnectRes) -> Self {
        Self {
            reason: res.reason.into(),
        }
    }
}
