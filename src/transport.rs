//! The stream collaborator the session loop is driven over.

use std::io;

use comms::{FrameReceiver, FrameSender};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// A bidirectional, message oriented stream to the server.
#[trait_variant::make(Stream: Send)]
pub trait LocalStream {
    /// Sends one whole envelope.
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Waits for the next whole envelope.
    async fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Closes the sending side, the server observes the end of the stream.
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens new streams to the server.
pub trait Transport {
    type Conn: Stream;

    /// Connects to `addr`, every call opens a brand new stream.
    fn connect(&self, addr: &str) -> impl Future<Output = io::Result<Self::Conn>> + Send;
}

/// A `Stream` framing envelopes over any reader and writer pair.
pub struct FramedStream<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: FrameReceiver<R>,
    tx: FrameSender<W>,
}

impl<R, W> FramedStream<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `FramedStream`.
    ///
    /// # Arguments
    /// * `rx` - The reading half.
    /// * `tx` - The writing half.
    /// * `max_message_length` - Incoming envelopes bigger than this are rejected.
    pub fn new(rx: R, tx: W, max_message_length: usize) -> Self {
        let (rx, tx) = comms::channel(rx, tx, max_message_length);
        Self { rx, tx }
    }
}

impl<R, W> Stream for FramedStream<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.tx.send(frame).await
    }

    async fn receive(&mut self) -> io::Result<Vec<u8>> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}

pub type TcpFramedStream = FramedStream<OwnedReadHalf, OwnedWriteHalf>;

/// Connects to the server over plain TCP.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    max_message_length: usize,
}

impl TcpTransport {
    /// Creates a new `TcpTransport`.
    ///
    /// # Arguments
    /// * `max_message_length` - The largest envelope accepted from the server.
    pub fn new(max_message_length: usize) -> Self {
        Self { max_message_length }
    }
}

impl Transport for TcpTransport {
    type Conn = TcpFramedStream;

    async fn connect(&self, addr: &str) -> io::Result<Self::Conn> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let (rx, tx) = stream.into_split();
        Ok(FramedStream::new(rx, tx, self.max_message_length))
    }
}
