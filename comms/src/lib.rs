mod receiver;
mod sender;

use tokio::io::{AsyncRead, AsyncWrite};

pub use receiver::FrameReceiver;
pub use sender::FrameSender;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The largest frame accepted by default, 512 MiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 536_870_912;

/// Creates both `FrameReceiver` and `FrameSender` network channel parts.
///
/// Given a reader and a writer creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
/// * `max_frame_len` - The largest payload the receiver accepts.
///
/// # Returns
/// A communication stream in the form of a frame receiver and sender.
pub fn channel<R, W>(rx: R, tx: W, max_frame_len: usize) -> (FrameReceiver<R>, FrameSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (FrameReceiver::new(rx, max_frame_len), FrameSender::new(tx))
}
