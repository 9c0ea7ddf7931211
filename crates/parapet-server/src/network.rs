use crate::config::ServerConfig;
use anyhow::{anyhow, Result};
use bytes::BytesMut;
use parapet_fallback::{Admission, Fallback, Outbound};
use parapet_protocol::{ConnectionState, FrameReader, FrameWriter, MalformedFrame, ProtocolVersion};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Handle one client from handshake until its verification ends.
pub async fn handle_connection(stream: TcpStream, fallback: Arc<Fallback>, config: Arc<ServerConfig>) {
    let peer = match stream.peer_addr() {
        Ok(peer) => peer,
        Err(e) => {
            debug!("Dropping connection without peer address: {}", e);
            return;
        }
    };
    if let Err(e) = serve(stream, peer, &fallback, &config).await {
        debug!("Connection {} ended: {}", peer, e);
    }
}

async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    fallback: &Fallback,
    config: &ServerConfig,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);
    let read_limit = config.read_timeout();
    let write_limit = config.write_timeout();

    // === Handshake ===
    let handshake = fallback.handshake(read(&mut reader, read_limit).await?)?;
    let version = ProtocolVersion::from_id(handshake.protocol_version);
    debug!(
        "Handshake from {}: protocol={}, intent={}",
        peer, handshake.protocol_version, handshake.intent
    );
    if ConnectionState::from_handshake_intent(handshake.intent).is_none() {
        // Status pings are answered by the real server, not here.
        return Ok(());
    }

    // === Login ===
    let frame = read(&mut reader, read_limit).await?;
    let mut pipeline = match fallback.login(peer.ip(), version, frame, config.compression())? {
        Admission::Reject(out) => {
            apply(&mut reader, &mut writer, out, write_limit).await?;
            return Ok(());
        }
        Admission::Bypass(profile, out) => {
            debug!("{} ({}) is already verified", profile.name, peer);
            apply(&mut reader, &mut writer, out, write_limit).await?;
            return Ok(());
        }
        Admission::Verify(pipeline) => pipeline,
    };

    // === Verification ===
    let out = pipeline.start();
    if !apply(&mut reader, &mut writer, out, write_limit).await? {
        return Ok(());
    }
    loop {
        let out = match read(&mut reader, read_limit).await {
            Ok(frame) => pipeline.handle_frame(frame),
            Err(e) => match e.downcast::<MalformedFrame>() {
                Ok(malformed) => pipeline.abort(malformed.into()),
                // Timeouts and disconnects are abandonment, not a failed check
                Err(e) => return Err(e),
            },
        };
        if !apply(&mut reader, &mut writer, out, write_limit).await? {
            debug!("{} finished with {:?}", peer, pipeline.status());
            return Ok(());
        }
    }
}

async fn read<R: AsyncRead + Unpin>(reader: &mut FrameReader<R>, limit: Duration) -> Result<BytesMut> {
    timeout(limit, reader.read_frame())
        .await
        .map_err(|_| anyhow!("Read timed out"))?
}

async fn flush<W: AsyncWrite + Unpin>(writer: &mut FrameWriter<W>, limit: Duration) -> Result<()> {
    timeout(limit, writer.flush())
        .await
        .map_err(|_| anyhow!("Write timed out"))?
}

/// Write what the pipeline produced. Returns `false` once the connection should close.
async fn apply<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    out: Vec<Outbound>,
    limit: Duration,
) -> Result<bool>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for item in out {
        match item {
            Outbound::Frame(frame) => writer.queue(&frame),
            Outbound::EnableCompression(threshold) => {
                writer.enable_compression(threshold);
                reader.enable_compression(threshold);
            }
            Outbound::Flush => flush(writer, limit).await?,
            Outbound::Close => {
                flush(writer, limit).await?;
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::BitmapRenderer;
    use parapet_protocol::frame::{build_frame, try_parse_frame};
    use parapet_protocol::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn server(config: ServerConfig) -> SocketAddr {
        let fallback = Arc::new(
            Fallback::new(config.fallback.clone(), Arc::new(BitmapRenderer::new())).unwrap(),
        );
        let config = Arc::new(config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle_connection(socket, fallback.clone(), config.clone()));
            }
        });
        addr
    }

    fn encode(state: ConnectionState, version: ProtocolVersion, packet: impl Into<Packet>) -> BytesMut {
        let table = PacketRegistry::build()
            .unwrap()
            .table(state, Direction::Serverbound, version)
            .unwrap();
        let mut body = BytesMut::new();
        PacketEncoder::new(table)
            .encode(&Outgoing::packet(packet), &mut body)
            .unwrap();
        build_frame(&body, None)
    }

    fn handshake(version: i32, intent: i32) -> BytesMut {
        encode(
            ConnectionState::Handshake,
            ProtocolVersion::LATEST,
            Handshake {
                protocol_version: version,
                server_address: "localhost".into(),
                server_port: 25565,
                intent,
            },
        )
    }

    async fn read_to_end(stream: &mut TcpStream) -> BytesMut {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        BytesMut::from(&buf[..])
    }

    #[tokio::test]
    async fn test_status_intent_is_closed() {
        let addr = server(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&handshake(767, 1)).await.unwrap();
        assert!(read_to_end(&mut stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_version_is_kicked() {
        let addr = server(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&handshake(12345, 2)).await.unwrap();
        let mut login = encode(
            ConnectionState::Login,
            ProtocolVersion::LATEST,
            LoginStart::new("Steve"),
        );
        stream.write_all(&login.split()).await.unwrap();

        let mut received = read_to_end(&mut stream).await;
        let mut frame = try_parse_frame(&mut received, None).unwrap().unwrap();
        let disconnect = PacketRegistry::build()
            .unwrap()
            .table(ConnectionState::Login, Direction::Clientbound, ProtocolVersion::LATEST)
            .unwrap()
            .packet_id(PacketKind::Disconnect)
            .unwrap();
        assert_eq!(read_varint(&mut frame).unwrap(), disconnect);
    }

    #[tokio::test]
    async fn test_login_starts_verification() {
        let mut config = ServerConfig::default();
        config.compression_threshold = -1;
        let addr = server(config).await;
        let version = ProtocolVersion::V1_12_2;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&handshake(version.protocol(), 2))
            .await
            .unwrap();
        stream
            .write_all(&encode(ConnectionState::Login, version, LoginStart::new("Alex")))
            .await
            .unwrap();

        let mut received = BytesMut::new();
        let mut frames = Vec::new();
        while frames.len() < 2 {
            let mut chunk = [0u8; 1024];
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "closed early");
            received.extend_from_slice(&chunk[..n]);
            while let Some(frame) = try_parse_frame(&mut received, None).unwrap() {
                frames.push(frame);
            }
        }
        let login_success = PacketRegistry::build()
            .unwrap()
            .table(ConnectionState::Login, Direction::Clientbound, version)
            .unwrap()
            .packet_id(PacketKind::LoginSuccess)
            .unwrap();
        assert_eq!(read_varint(&mut frames[0]).unwrap(), login_success);
    }

    #[tokio::test]
    async fn test_malformed_frame_fails_verification() {
        let mut config = ServerConfig::default();
        config.compression_threshold = -1;
        let addr = server(config).await;
        let version = ProtocolVersion::V1_12_2;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&handshake(version.protocol(), 2))
            .await
            .unwrap();
        stream
            .write_all(&encode(ConnectionState::Login, version, LoginStart::new("Mangled")))
            .await
            .unwrap();
        let mut bad = BytesMut::new();
        write_varint(&mut bad, -1);
        stream.write_all(&bad).await.unwrap();

        let mut received = read_to_end(&mut stream).await;
        let mut last = None;
        while let Some(frame) = try_parse_frame(&mut received, None).unwrap() {
            last = Some(frame);
        }
        let disconnect = PacketRegistry::build()
            .unwrap()
            .table(ConnectionState::Play, Direction::Clientbound, version)
            .unwrap()
            .packet_id(PacketKind::Disconnect)
            .unwrap();
        assert_eq!(read_varint(&mut last.unwrap()).unwrap(), disconnect);
    }
}
