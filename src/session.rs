//! Drives the stream: receive, dispatch, respond, and reconnect on request.

use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Client,
    codec,
    config::ClientConfig,
    error::Result,
    message_handler,
    transport::{Stream, Transport},
};

/// How a session over a single stream came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The shutdown token was cancelled while waiting for the server.
    Shutdown,
    /// The server asked to close the stream, reconnecting after
    /// `sleep_seconds` unless zero.
    Closed { sleep_seconds: u64 },
}

/// Runs turns over `stream` until the server closes the session.
///
/// Each turn receives one envelope, dispatches it to `client` and sends the
/// response back before receiving the next one. The stream is not closed here.
///
/// # Arguments
/// * `stream` - An open stream to the server.
/// * `client` - The learning client implementation.
/// * `shutdown` - Interrupts the wait for the next envelope.
///
/// # Errors
/// Transport, decode and capability failures end the session immediately,
/// no response is sent for the failing turn.
pub async fn run_session<S, C>(
    stream: &mut S,
    client: &mut C,
    shutdown: &CancellationToken,
) -> Result<SessionEnd>
where
    S: Stream,
    C: Client + ?Sized,
{
    let mut turn: u64 = 0;

    loop {
        debug!(turn = turn; "waiting for message");

        let frame = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown requested while waiting for the server");
                return Ok(SessionEnd::Shutdown);
            }

            frame = stream.receive() => frame?,
        };

        let msg = codec::decode_server_message(&frame)?;
        let handled = message_handler::handle(client, msg)?;

        let buf = codec::encode_client_message(&handled.msg)?;
        stream.send(&buf).await?;
        turn += 1;

        if !handled.keep_open {
            let sleep_seconds = handled.sleep_seconds;
            debug!(turn = turn, sleep_seconds = sleep_seconds; "server closed the session");
            return Ok(SessionEnd::Closed { sleep_seconds });
        }
    }
}

/// Connects to the server and serves `client` until the server sends it away
/// for good, the shutdown token is cancelled, or an error occurs.
///
/// A reconnect request with a delay closes the current stream, waits and
/// opens a brand new one. The stream is closed on every exit path.
///
/// # Arguments
/// * `transport` - Opens the streams.
/// * `config` - Where to connect to.
/// * `client` - The learning client implementation, used for every session.
/// * `shutdown` - Interrupts waiting for the server and the reconnect delay.
///
/// # Errors
/// `InvalidConfig` before connecting if `config` doesn't validate. Otherwise
/// the first connect, transport, protocol or capability error, these are
/// never retried.
pub async fn start_client<T, C>(
    transport: &T,
    config: &ClientConfig,
    client: &mut C,
    shutdown: CancellationToken,
) -> Result<()>
where
    T: Transport,
    C: Client + ?Sized,
{
    config.validate()?;
    let addr = config.server_address();

    loop {
        let mut stream = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            stream = transport.connect(addr) => stream?,
        };

        info!("opened stream to {addr}");
        let ended = run_session(&mut stream, client, &shutdown).await;

        if let Err(e) = stream.close().await {
            warn!("failed to close the stream to {addr}: {e}");
        }

        let sleep_seconds = match ended {
            Ok(SessionEnd::Shutdown) => return Ok(()),
            Ok(SessionEnd::Closed { sleep_seconds: 0 }) => {
                info!("disconnected from {addr}");
                return Ok(());
            }
            Ok(SessionEnd::Closed { sleep_seconds }) => sleep_seconds,
            Err(e) => {
                error!("session with {addr} aborted: {e}");
                return Err(e);
            }
        };

        info!(seconds = sleep_seconds; "reconnecting to {addr} after a delay");

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown requested while waiting to reconnect");
                return Ok(());
            }

            _ = time::sleep(Duration::from_secs(sleep_seconds)) => {}
        }
    }
}
