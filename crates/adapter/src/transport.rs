//! Frame transport over a byte stream
//!
//! TetriNET frames are latin-1 text. Outgoing frames end in `0xFF`; incoming
//! frames are split on `0xFF` or `\n` (some servers use either). Empty frames
//! are skipped.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use tetrinet_core::FrameSink;

pub const FRAME_TERMINATOR: u8 = 0xFF;

const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no reply from server within {0} ms")]
    HandshakeTimeout(u64),
    #[error("server refused connection: {0}")]
    Refused(String),
}

/// Bytes to text, one char per byte
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Text to bytes; chars outside latin-1 become `?`
pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// A frame as it goes on the wire
pub fn encode_frame(frame: &str) -> Vec<u8> {
    let mut bytes = latin1_encode(frame);
    bytes.push(FRAME_TERMINATOR);
    bytes
}

fn is_separator(b: u8) -> bool {
    b == FRAME_TERMINATOR || b == b'\n'
}

/// Splits an incoming byte stream into frames.
///
/// [`FrameReader::next_frame`] is cancel safe: bytes already read stay
/// buffered, so it can sit in a `select!` arm.
pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Next non-empty frame, or None once the peer closes
    pub async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if let Some(frame) = self.take_buffered() {
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                // A trailing unterminated frame still counts.
                let rest = std::mem::take(&mut self.buf);
                let text = latin1_decode(&rest);
                let text = text.trim_end_matches('\r');
                return Ok((!text.is_empty()).then(|| text.to_string()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_buffered(&mut self) -> Option<String> {
        while let Some(end) = self.buf.iter().position(|&b| is_separator(b)) {
            let frame: Vec<u8> = self.buf.drain(..=end).take(end).collect();
            let text = latin1_decode(&frame);
            let text = text.trim_end_matches('\r');
            if !text.is_empty() {
                trace!(frame = text, "recv");
                return Some(text.to_string());
            }
        }
        None
    }
}

/// Session-side sink that hands frames to a writer task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl FrameSink for ChannelSink {
    fn send_frame(&mut self, frame: &str) {
        if self.tx.send(frame.to_string()).is_err() {
            debug!(frame, "writer gone, frame dropped");
        }
    }
}

/// Write one frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &str,
) -> Result<(), TransportError> {
    writer.write_all(&encode_frame(frame)).await?;
    writer.flush().await?;
    Ok(())
}

/// Drain `rx` into `writer` until the channel closes or a write fails
pub fn spawn_writer<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = write_frame(&mut writer, &frame).await {
                debug!(%err, "write failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_roundtrip() {
        let bytes = [b'a', 0xE9, b' ', 0x7F];
        let text = latin1_decode(&bytes);
        assert_eq!(text.chars().nth(1), Some('é'));
        assert_eq!(latin1_encode(&text), bytes);
        assert_eq!(latin1_encode("a€"), b"a?");
    }

    #[test]
    fn test_encode_frame_appends_terminator() {
        assert_eq!(encode_frame("pause 1 2"), b"pause 1 2\xff");
    }

    #[tokio::test]
    async fn test_reader_splits_on_both_separators() {
        let input: &[u8] = b"playernum 1\xffwinlist\n\n\xffendgame\xffpartial";
        let mut reader = FrameReader::new(input);
        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("playernum 1"));
        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("winlist"));
        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("endgame"));
        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("partial"));
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writer_task_frames_output() {
        let (client, mut server) = tokio::io::duplex(256);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_writer(client, rx);
        let mut sink = ChannelSink::new(tx);
        sink.send_frame("f 1 #3A");
        sink.send_frame("playerlost 1");
        drop(sink);
        handle.await.unwrap();

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"f 1 #3A\xffplayerlost 1\xff");
    }
}
