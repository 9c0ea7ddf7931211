//! Length-prefixed framing with optional zlib compression.

use crate::codec::{read_varint, varint_len, write_varint, CodecError};
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Largest frame, compressed or not, a client may send.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// The peer sent bytes that cannot be split into frames.
#[derive(Debug, Error)]
#[error("malformed frame: {0}")]
pub struct MalformedFrame(pub String);

/// Reads frames from the client half of a connection.
pub struct FrameReader<R> {
    stream: R,
    read_buf: BytesMut,
    compression_threshold: Option<i32>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            compression_threshold: None,
        }
    }

    pub fn enable_compression(&mut self, threshold: i32) {
        self.compression_threshold = Some(threshold);
    }

    /// Read one frame: packet id followed by the body, already decompressed.
    ///
    /// Framing violations surface as [`MalformedFrame`]; anything else is the connection going away.
    pub async fn read_frame(&mut self) -> anyhow::Result<BytesMut> {
        loop {
            let parsed = try_parse_frame(&mut self.read_buf, self.compression_threshold)
                .map_err(|e| MalformedFrame(e.to_string()))?;
            if let Some(frame) = parsed {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("Connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

/// Buffers frames for the server half of a connection until flushed.
pub struct FrameWriter<W> {
    stream: W,
    pending: BytesMut,
    compression_threshold: Option<i32>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            pending: BytesMut::new(),
            compression_threshold: None,
        }
    }

    /// Frames after this call are compressed; frames already queued are not.
    pub fn enable_compression(&mut self, threshold: i32) {
        self.compression_threshold = Some(threshold);
    }

    /// Queue one packet (`id` + body).
    pub fn queue(&mut self, packet: &[u8]) {
        let frame = build_frame(packet, self.compression_threshold);
        self.pending.extend_from_slice(&frame);
    }

    pub async fn flush(&mut self) -> anyhow::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let out = self.pending.split();
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

// === Shared helpers ===

pub fn try_parse_frame(
    read_buf: &mut BytesMut,
    compression_threshold: Option<i32>,
) -> anyhow::Result<Option<BytesMut>> {
    if read_buf.is_empty() {
        return Ok(None);
    }

    let mut peek = read_buf.clone();
    let length = match read_varint(&mut peek) {
        Ok(len) => len,
        Err(CodecError::NotEnoughData) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if length < 0 || length as usize > MAX_FRAME_LEN {
        return Err(anyhow::anyhow!("Bad frame length: {}", length));
    }
    let length = length as usize;

    let varint_bytes = read_buf.len() - peek.len();

    if peek.remaining() < length {
        return Ok(None);
    }

    read_buf.advance(varint_bytes);
    let mut frame = read_buf.split_to(length);

    if compression_threshold.is_some() && !frame.is_empty() {
        let data_length = read_varint(&mut frame)?;
        if data_length < 0 || data_length as usize > MAX_FRAME_LEN {
            return Err(anyhow::anyhow!("Bad uncompressed length: {}", data_length));
        }
        if data_length > 0 {
            let mut decompressed = vec![0u8; data_length as usize];
            let mut decoder = ZlibDecoder::new(&frame[..]);
            decoder.read_exact(&mut decompressed)?;
            frame = BytesMut::from(&decompressed[..]);
        }
    }

    trace!("Read frame len={}", frame.len());

    Ok(Some(frame))
}

pub fn build_frame(packet: &[u8], compression_threshold: Option<i32>) -> BytesMut {
    let mut frame = BytesMut::new();

    if let Some(threshold) = compression_threshold {
        let uncompressed_len = packet.len() as i32;
        if uncompressed_len >= threshold {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            let _ = encoder.write_all(packet);
            let compressed = encoder.finish().unwrap_or_default();

            let data_length_size = varint_len(uncompressed_len);
            let total_length = data_length_size + compressed.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, uncompressed_len);
            frame.extend_from_slice(&compressed);
        } else {
            let total_length = 1 + packet.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, 0);
            frame.extend_from_slice(packet);
        }
    } else {
        write_varint(&mut frame, packet.len() as i32);
        frame.extend_from_slice(packet);
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_frame() {
        let mut buf = build_frame(&[0x00, 1, 2, 3], None);
        assert_eq!(&buf[..], &[4, 0x00, 1, 2, 3]);
        let frame = try_parse_frame(&mut buf, None).unwrap().unwrap();
        assert_eq!(&frame[..], &[0x00, 1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits() {
        let full = build_frame(&[0x01, 9, 9, 9], None);
        let mut buf = BytesMut::from(&full[..3]);
        assert!(try_parse_frame(&mut buf, None).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_compressed_frame() {
        let packet = vec![0x22; 600];
        let mut buf = build_frame(&packet, Some(256));
        assert!(buf.len() < packet.len());
        let frame = try_parse_frame(&mut buf, Some(256)).unwrap().unwrap();
        assert_eq!(&frame[..], &packet[..]);
    }

    #[test]
    fn test_below_threshold_is_stored() {
        let mut buf = build_frame(&[0x05, 1], Some(256));
        assert_eq!(&buf[..], &[3, 0, 0x05, 1]);
        let frame = try_parse_frame(&mut buf, Some(256)).unwrap().unwrap();
        assert_eq!(&frame[..], &[0x05, 1]);
    }

    #[test]
    fn test_empty_frame_passes_through() {
        let mut buf = BytesMut::from(&[0u8][..]);
        let frame = try_parse_frame(&mut buf, None).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, (MAX_FRAME_LEN + 1) as i32);
        assert!(try_parse_frame(&mut buf, None).is_err());
    }

    #[tokio::test]
    async fn test_reader_writer_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.queue(&[0x00, 7]);
        writer.queue(&[0x01, 8, 9]);
        writer.flush().await.unwrap();

        assert_eq!(&reader.read_frame().await.unwrap()[..], &[0x00, 7]);
        assert_eq!(&reader.read_frame().await.unwrap()[..], &[0x01, 8, 9]);
    }

    #[tokio::test]
    async fn test_reader_separates_malformed_from_closed() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);
        let mut bad = BytesMut::new();
        write_varint(&mut bad, -1);
        client.write_all(&bad).await.unwrap();
        let err = reader.read_frame().await.unwrap_err();
        assert!(err.downcast_ref::<MalformedFrame>().is_some());

        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let err = FrameReader::new(server).read_frame().await.unwrap_err();
        assert!(err.downcast_ref::<MalformedFrame>().is_none());
    }
}
