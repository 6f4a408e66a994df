use std::io;

use log::warn;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{LEN_TYPE_SIZE, LenType};

/// The receiving end handle of the communication.
pub struct FrameReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    /// Creates a new `FrameReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    /// * `max_frame_len` - Frames announcing a bigger length are rejected.
    pub(super) fn new(rx: R, max_frame_len: usize) -> Self {
        Self { rx, max_frame_len }
    }

    /// Waits to receive a new frame from the inner reader.
    ///
    /// # Returns
    /// The frame's payload, or `io::Error` on failure. A frame longer than the
    /// configured maximum fails with `InvalidData` before anything is allocated.
    pub async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf);

        if len > self.max_frame_len as LenType {
            let max = self.max_frame_len;
            warn!(len = len, max = max; "rejecting oversized frame");

            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds the maximum of {max} bytes"),
            ));
        }

        let mut buf = vec![0; len as usize];
        self.rx.read_exact(&mut buf).await?;
        Ok(buf)
    }
}
