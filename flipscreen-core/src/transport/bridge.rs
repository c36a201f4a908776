//! Framed TCP link to a device bridge.
//!
//! The bridge relays the device's screen stream as [`BridgeCodec`]
//! frames. The connection is split into a read half ([`BridgeSource`])
//! for the receiver task and a write half ([`BridgeControl`]) for the
//! session.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::info;

use crate::error::ScreenError;
use crate::transport::codec::BridgeCodec;
use crate::transport::{Message, MessageKind, MessageSource, StreamControl};

// ── Construction ─────────────────────────────────────────────────

/// Connect to a bridge at `addr` (`host:port`).
pub async fn connect(
    addr: &str,
    timeout: Duration,
) -> Result<(BridgeControl<OwnedWriteHalf>, BridgeSource<OwnedReadHalf>), ScreenError> {
    info!("connecting to bridge at {addr}");
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ScreenError::Timeout(timeout))??;
    stream.set_nodelay(true)?;
    info!("bridge connected: {}", stream.peer_addr()?);

    let (reader, writer) = stream.into_split();
    Ok(from_io(reader, writer))
}

/// Build a control/source pair over arbitrary async I/O halves.
pub fn from_io<R, W>(reader: R, writer: W) -> (BridgeControl<W>, BridgeSource<R>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (
        BridgeControl {
            frames: FramedWrite::new(writer, BridgeCodec),
        },
        BridgeSource {
            frames: FramedRead::new(reader, BridgeCodec),
        },
    )
}

// ── BridgeSource ─────────────────────────────────────────────────

/// Read half of a bridge link.
pub struct BridgeSource<R> {
    frames: FramedRead<R, BridgeCodec>,
}

#[async_trait]
impl<R> MessageSource for BridgeSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_next_message(&mut self) -> Result<Message, ScreenError> {
        // `FramedRead::next` is cancel-safe: a timed-out read keeps any
        // partial frame buffered for the next call.
        match self.frames.next().await {
            Some(result) => result,
            None => Err(ScreenError::ConnectionClosed),
        }
    }
}

// ── BridgeControl ────────────────────────────────────────────────

/// Write half of a bridge link.
pub struct BridgeControl<W> {
    frames: FramedWrite<W, BridgeCodec>,
}

impl<W> BridgeControl<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_command(&mut self, kind: MessageKind) -> Result<(), ScreenError> {
        self.frames.send(Message::command(kind)).await
    }
}

#[async_trait]
impl<W> StreamControl for BridgeControl<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn start_stream(&mut self) -> Result<(), ScreenError> {
        self.send_command(MessageKind::StartScreenStream).await
    }

    async fn stop_stream(&mut self) -> Result<(), ScreenError> {
        self.send_command(MessageKind::StopScreenStream).await
    }
}

// ── Tests ────────────────────────────────────────────────────────
