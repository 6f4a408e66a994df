//! The wire schema shared with the coordinating server.
//!
//! Every envelope is a record of optional fields of which exactly one must be
//! set. Unknown field names are rejected so that the adapter fails closed on
//! anything the schema does not define. Missing plain fields take their
//! default value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A scalar value, exactly one of its fields must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scalar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sint64: Option<i64>,
    #[serde(rename = "bool", skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
}

pub type ScalarMap = HashMap<String, Scalar>;

/// Each tensor is written as an array of numbers, one per byte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub tensors: Vec<Vec<u8>>,
    pub tensor_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    #[default]
    Unknown,
    Reconnect,
    PowerDisconnected,
    WifiUnavailable,
    Ack,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectIns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetPropertiesIns {
    pub config: ScalarMap,
}

/// Carries no payload the client acts upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetParametersIns {
    pub config: ScalarMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitIns {
    pub parameters: Parameters,
    pub config: ScalarMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluateIns {
    pub parameters: Parameters,
    pub config: ScalarMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisconnectRes {
    pub reason: Reason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetPropertiesRes {
    pub properties: ScalarMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetParametersRes {
    pub parameters: Parameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitRes {
    pub parameters: Parameters,
    pub num_examples: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_examples_ceil: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_duration: Option<f64>,
    pub metrics: ScalarMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluateRes {
    pub loss: f64,
    pub num_examples: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub metrics: ScalarMap,
}

/// The instruction envelope received from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_ins: Option<ReconnectIns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_properties_ins: Option<GetPropertiesIns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_parameters_ins: Option<GetParametersIns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_ins: Option<FitIns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate_ins: Option<EvaluateIns>,
}

pub mod server_message {
    /// The active variant of a `ServerMessage`.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Msg {
        ReconnectIns(super::ReconnectIns),
        GetPropertiesIns(super::GetPropertiesIns),
        GetParametersIns(super::GetParametersIns),
        FitIns(super::FitIns),
        EvaluateIns(super::EvaluateIns),
    }
}

impl ServerMessage {
    /// The number of fields set, exactly one for a well formed envelope.
    pub fn tag_count(&self) -> usize {
        [
            self.reconnect_ins.is_some(),
            self.get_properties_ins.is_some(),
            self.get_parameters_ins.is_some(),
            self.fit_ins.is_some(),
            self.evaluate_ins.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Takes the single active variant, `None` if zero or several are set.
    pub fn into_msg(self) -> Option<server_message::Msg> {
        use server_message::Msg;

        if self.tag_count() != 1 {
            return None;
        }

        let Self {
            reconnect_ins,
            get_properties_ins,
            get_parameters_ins,
            fit_ins,
            evaluate_ins,
        } = self;

        reconnect_ins
            .map(Msg::ReconnectIns)
            .or(get_properties_ins.map(Msg::GetPropertiesIns))
            .or(get_parameters_ins.map(Msg::GetParametersIns))
            .or(fit_ins.map(Msg::FitIns))
            .or(evaluate_ins.map(Msg::EvaluateIns))
    }
}

impl From<server_message::Msg> for ServerMessage {
    fn from(msg: server_message::Msg) -> Self {
        use server_message::Msg;

        let mut envelope = Self::default();
        match msg {
            Msg::ReconnectIns(ins) => envelope.reconnect_ins = Some(ins),
            Msg::GetPropertiesIns(ins) => envelope.get_properties_ins = Some(ins),
            Msg::GetParametersIns(ins) => envelope.get_parameters_ins = Some(ins),
            Msg::FitIns(ins) => envelope.fit_ins = Some(ins),
            Msg::EvaluateIns(ins) => envelope.evaluate_ins = Some(ins),
        }

        envelope
    }
}

/// The result envelope sent back to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnect_res: Option<DisconnectRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_properties_res: Option<GetPropertiesRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_parameters_res: Option<GetParametersRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_res: Option<FitRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate_res: Option<EvaluateRes>,
}

pub mod client_message {
    /// The active variant of a `ClientMessage`.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Msg {
        DisconnectRes(super::DisconnectRes),
        GetPropertiesRes(super::GetPropertiesRes),
        GetParametersRes(super::GetParametersRes),
        FitRes(super::FitRes),
        EvaluateRes(super::EvaluateRes),
    }
}

impl ClientMessage {
    /// The number of fields set, exactly one for a well formed envelope.
    pub fn tag_count(&self) -> usize {
        [
            self.disconnect_res.is_some(),
            self.get_properties_res.is_some(),
            self.get_parameters_res.is_some(),
            self.fit_res.is_some(),
            self.evaluate_res.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Takes the single active variant, `None` if zero or several are set.
    pub fn into_msg(self) -> Option<client_message::Msg> {
        use client_message::Msg;

        if self.tag_count() != 1 {
            return None;
        }

        let Self {
            disconnect_res,
            get_properties_res,
            get_parameters_res,
            fit_res,
            evaluate_res,
        } = self;

        disconnect_res
            .map(Msg::DisconnectRes)
            .or(get_properties_res.map(Msg::GetPropertiesRes))
            .or(get_parameters_res.map(Msg::GetParametersRes))
            .or(fit_res.map(Msg::FitRes))
            .or(evaluate_res.map(Msg::EvaluateRes))
    }
}

impl From<client_message::Msg> for ClientMessage {
    fn from(msg: client_message::Msg) -> Self {
        use client_message::Msg;

        let mut envelope = Self::default();
        match msg {
            Msg::DisconnectRes(res) => envelope.disconnect_res = Some(res),
            Msg::GetPropertiesRes(res) => envelope.get_properties_res = Some(res),
            Msg::GetParametersRes(res) => envelope.get_parameters_res = Some(res),
            Msg::FitRes(res) => envelope.fit_res = Some(res),
            Msg::EvaluateRes(res) => envelope.evaluate_res = Some(res),
        }

        envelope
    }
}
