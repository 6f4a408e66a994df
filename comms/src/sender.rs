//! The sending end of the framing protocol.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType};

/// The sending end handle of the communication.
pub struct FrameSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    header: [u8; LEN_TYPE_SIZE],
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    /// Creates a new `FrameSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            header: [0; LEN_TYPE_SIZE],
        }
    }

    /// Sends `frame` through the inner writer, prefixed by its length.
    ///
    /// # Arguments
    /// * `frame` - The payload bytes.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let Self { tx, header } = self;

        *header = (frame.len() as LenType).to_be_bytes();
        tx.write_all(header).await?;

        if !frame.is_empty() {
            tx.write_all(frame).await?;
        }

        tx.flush().await
    }

    /// Shuts down the writing half, the peer will observe an end of stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
