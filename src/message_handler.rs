//! Handles server messages by calling the appropriate client capability.

use log::{debug, warn};

use crate::{
    client::{Capability, Client},
    error::{BoxError, ClientErr, Result},
    proto::{self, client_message, server_message},
    typing::{Disconnect, EvaluateIns, FitIns, PropertiesIns, Reason, Reconnect},
};

/// What the session loop must do after a message was handled.
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    /// The response to send back to the server.
    pub msg: proto::ClientMessage,
    /// How long to wait before opening a new stream, only meaningful when
    /// `keep_open` is false. Zero means not to reconnect at all.
    pub sleep_seconds: u64,
    /// Whether the stream stays open for the next instruction.
    pub keep_open: bool,
}

impl Handled {
    fn keep_open(msg: client_message::Msg) -> Self {
        Self {
            msg: msg.into(),
            sleep_seconds: 0,
            keep_open: true,
        }
    }
}

/// Dispatches `msg` to `client` and wraps the result into a response envelope.
///
/// # Arguments
/// * `client` - The learning client implementation.
/// * `msg` - The decoded instruction envelope.
///
/// # Errors
/// * `UnknownServerMessage` if not exactly one tag is set.
/// * `UnsupportedMetricType` if the instruction carries an unsupported scalar.
/// * `Capability` if the client fails, the error is not retried.
pub fn handle<C>(client: &mut C, msg: proto::ServerMessage) -> Result<Handled>
where
    C: Client + ?Sized,
{
    let tags = msg.tag_count();
    let Some(msg) = msg.into_msg() else {
        warn!(tags = tags; "server message doesn't have a single tag set");
        return Err(ClientErr::UnknownServerMessage { tags });
    };

    match msg {
        server_message::Msg::ReconnectIns(ins) => {
            debug!("handling reconnect");

            let (disconnect, sleep_seconds) = reconnect(ins.into());
            let msg = client_message::Msg::DisconnectRes(disconnect.into());

            Ok(Handled {
                msg: msg.into(),
                sleep_seconds,
                keep_open: false,
            })
        }
        server_message::Msg::GetPropertiesIns(ins) => {
            debug!("handling get properties");

            let ins = PropertiesIns::try_from(ins)?;
            let res = client
                .get_properties(ins)
                .map_err(failed(Capability::GetProperties))?;

            let msg = client_message::Msg::GetPropertiesRes(res.into());
            Ok(Handled::keep_open(msg))
        }
        server_message::Msg::GetParametersIns(_) => {
            debug!("handling get parameters");

            let res = client
                .get_parameters()
                .map_err(failed(Capability::GetParameters))?;

            let msg = client_message::Msg::GetParametersRes(res.into());
            Ok(Handled::keep_open(msg))
        }
        server_message::Msg::FitIns(ins) => {
            let ins = FitIns::try_from(ins)?;
            debug!(tensors = ins.parameters.tensors.len(); "handling fit");

            let res = client.fit(ins).map_err(failed(Capability::Fit))?;
            debug!(num_examples = res.num_examples; "fit done");

            let msg = client_message::Msg::FitRes(res.into());
            Ok(Handled::keep_open(msg))
        }
        server_message::Msg::EvaluateIns(ins) => {
            let ins = EvaluateIns::try_from(ins)?;
            debug!(tensors = ins.parameters.tensors.len(); "handling evaluate");

            let res = client.evaluate(ins).map_err(failed(Capability::Evaluate))?;
            debug!(num_examples = res.num_examples, loss = res.loss; "evaluate done");

            let msg = client_message::Msg::EvaluateRes(res.into());
            Ok(Handled::keep_open(msg))
        }
    }
}

/// Answers a reconnect request, returning the disconnect reason and how many
/// seconds to sleep before reconnecting.
fn reconnect(reconnect: Reconnect) -> (Disconnect, u64) {
    match reconnect.seconds {
        None | Some(0) => (Disconnect { reason: Reason::Ack }, 0),
        Some(seconds) => (
            Disconnect {
                reason: Reason::Reconnect,
            },
            seconds,
        ),
    }
}

fn failed(capability: Capability) -> impl FnOnce(BoxError) -> ClientErr {
    move |source| {
        warn!("client failed to {capability}: {source}");
        ClientErr::Capability { capability, source }
    }
}
