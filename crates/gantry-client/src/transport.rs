// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA TCP transport (UACP).
//!
//! The transport exchanges the Hello/Acknowledge handshake and then moves
//! framed records: a 4-byte message type ("HEL", "ACK", "OPN", "MSG",
//! "CLO", "ERR", three letters plus the chunk type), a little-endian u32
//! total size, and the record body. The transport works over any async
//! byte stream so tests can drive it through an in-process duplex pipe;
//! production connections dial TCP.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use gantry_codec::{Decoder, Encoder, StatusCode};

use crate::error::{ClientResult, ProtocolError, TransportError};

/// The UACP protocol version sent in Hello.
const PROTOCOL_VERSION: u32 = 0;

/// Byte length of the record header: type (3), chunk (1), size (4).
pub const RECORD_HEADER_SIZE: usize = 8;

// =============================================================================
// EndpointUrl
// =============================================================================

/// A parsed `opc.tcp://host:port/path` endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    raw: String,
    host: String,
    port: u16,
}

impl EndpointUrl {
    /// Default OPC UA TCP port.
    pub const DEFAULT_PORT: u16 = 4840;

    /// Parses an endpoint URL. The path component is kept in the raw URL
    /// but plays no role in dialing.
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let rest = url
            .strip_prefix("opc.tcp://")
            .ok_or_else(|| TransportError::invalid_endpoint(url, "scheme must be opc.tcp"))?;
        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(TransportError::invalid_endpoint(url, "missing host"));
        }
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    TransportError::invalid_endpoint(url, format!("invalid port '{port}'"))
                })?;
                (host, port)
            }
            None => (authority, Self::DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(TransportError::invalid_endpoint(url, "missing host"));
        }
        Ok(Self { raw: url.to_owned(), host: host.to_owned(), port })
    }

    /// Returns the full URL as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the host component.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, defaulted to 4840.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port` for dialing.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// =============================================================================
// Record framing
// =============================================================================

/// Record message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Client hello.
    Hello,
    /// Server acknowledge.
    Acknowledge,
    /// Server error report.
    Error,
    /// OpenSecureChannel exchange (asymmetric security header).
    OpenChannel,
    /// Regular service message (symmetric security header).
    Message,
    /// CloseSecureChannel (symmetric security header).
    CloseChannel,
}

impl MessageType {
    /// Returns the 3-byte wire tag.
    pub fn as_bytes(self) -> [u8; 3] {
        match self {
            Self::Hello => *b"HEL",
            Self::Acknowledge => *b"ACK",
            Self::Error => *b"ERR",
            Self::OpenChannel => *b"OPN",
            Self::Message => *b"MSG",
            Self::CloseChannel => *b"CLO",
        }
    }

    /// Parses the 3-byte wire tag.
    pub fn from_bytes(bytes: [u8; 3]) -> Result<Self, ProtocolError> {
        match &bytes {
            b"HEL" => Ok(Self::Hello),
            b"ACK" => Ok(Self::Acknowledge),
            b"ERR" => Ok(Self::Error),
            b"OPN" => Ok(Self::OpenChannel),
            b"MSG" => Ok(Self::Message),
            b"CLO" => Ok(Self::CloseChannel),
            _ => Err(ProtocolError::UnknownMessageType(bytes)),
        }
    }
}

/// Chunk type of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Final chunk of a message.
    Final,
    /// Intermediate chunk; more follow.
    Intermediate,
    /// The sender aborted the message.
    Abort,
}

impl ChunkType {
    /// Returns the wire byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Final => b'F',
            Self::Intermediate => b'C',
            Self::Abort => b'A',
        }
    }

    /// Parses the wire byte.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            b'F' => Ok(Self::Final),
            b'C' => Ok(Self::Intermediate),
            b'A' => Ok(Self::Abort),
            other => Err(ProtocolError::UnknownChunkType(other)),
        }
    }
}

/// A record header as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Message type.
    pub message_type: MessageType,
    /// Chunk type.
    pub chunk_type: ChunkType,
    /// Total record size including this header.
    pub size: u32,
}

// =============================================================================
// TransportLimits
// =============================================================================

/// Flow-control parameters exchanged in Hello/Acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLimits {
    /// Largest chunk this side accepts.
    pub receive_buffer_size: u32,
    /// Largest chunk this side sends.
    pub send_buffer_size: u32,
    /// Largest assembled message this side accepts; 0 means no limit.
    pub max_message_size: u32,
    /// Most chunks per message this side accepts; 0 means no limit.
    pub max_chunk_count: u32,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            receive_buffer_size: 0xFFFF,
            send_buffer_size: 0xFFFF,
            max_message_size: 0,
            max_chunk_count: 0,
        }
    }
}

// =============================================================================
// Stream abstraction
// =============================================================================

/// Any async byte stream the transport can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type BoxedStream = Box<dyn AsyncStream>;

// =============================================================================
// UacpTransport
// =============================================================================

/// A connected transport that has completed Hello/Acknowledge.
pub struct UacpTransport {
    stream: BoxedStream,
    limits: TransportLimits,
    endpoint_url: String,
}

impl std::fmt::Debug for UacpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UacpTransport")
            .field("limits", &self.limits)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl UacpTransport {
    /// Dials `endpoint` over TCP and performs the handshake.
    pub async fn dial(
        endpoint: &EndpointUrl,
        limits: TransportLimits,
        connect_timeout: Duration,
    ) -> ClientResult<Self> {
        let addr = endpoint.socket_addr();
        debug!(endpoint = %endpoint, "dialing OPC UA server");
        let stream = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimedOut { endpoint: endpoint.raw.clone() })?
            .map_err(|e| TransportError::ConnectFailed { endpoint: endpoint.raw.clone(), source: e })?;
        stream.set_nodelay(true).ok();
        Self::handshake(Box::new(stream), endpoint.as_str(), limits).await
    }

    /// Performs the handshake over an already established stream. Tests
    /// use this with an in-process duplex pipe.
    pub async fn handshake(
        mut stream: BoxedStream,
        endpoint_url: &str,
        limits: TransportLimits,
    ) -> ClientResult<Self> {
        // Hello carries our limits and the endpoint URL.
        let mut body = Encoder::with_capacity(64);
        body.write_u32(PROTOCOL_VERSION);
        body.write_u32(limits.receive_buffer_size);
        body.write_u32(limits.send_buffer_size);
        body.write_u32(limits.max_message_size);
        body.write_u32(limits.max_chunk_count);
        body.write_str(Some(endpoint_url));
        write_record(&mut stream, MessageType::Hello, ChunkType::Final, &body.into_bytes())
            .await?;

        let (header, body) = read_record_raw(&mut stream, limits.receive_buffer_size).await?;
        match header.message_type {
            MessageType::Acknowledge => {}
            MessageType::Error => return Err(decode_error_record(&body).into()),
            other => {
                return Err(ProtocolError::UnknownMessageType(other.as_bytes()).into());
            }
        }

        let mut r = Decoder::new(&body);
        let _server_version = r.read_u32().map_err(ProtocolError::Decoding)?;
        let server_receive = r.read_u32().map_err(ProtocolError::Decoding)?;
        let server_send = r.read_u32().map_err(ProtocolError::Decoding)?;
        let server_max_message = r.read_u32().map_err(ProtocolError::Decoding)?;
        let server_max_chunks = r.read_u32().map_err(ProtocolError::Decoding)?;

        // The server's receive buffer bounds what we send and vice versa;
        // neither side may exceed what it declared in its own Hello.
        let negotiated = TransportLimits {
            receive_buffer_size: server_send.min(limits.receive_buffer_size),
            send_buffer_size: server_receive.min(limits.send_buffer_size),
            max_message_size: server_max_message,
            max_chunk_count: server_max_chunks,
        };
        debug!(
            send_buffer = negotiated.send_buffer_size,
            receive_buffer = negotiated.receive_buffer_size,
            max_message = negotiated.max_message_size,
            max_chunks = negotiated.max_chunk_count,
            "transport limits negotiated"
        );

        Ok(Self { stream, limits: negotiated, endpoint_url: endpoint_url.to_owned() })
    }

    /// Returns the negotiated limits.
    pub fn limits(&self) -> TransportLimits {
        self.limits
    }

    /// Returns the endpoint URL used in the handshake.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Splits the transport into its record reader and writer halves.
    pub fn into_split(self) -> (RecordReader, RecordWriter) {
        let (read, write) = tokio::io::split(self.stream);
        (
            RecordReader { read, receive_buffer_size: self.limits.receive_buffer_size },
            RecordWriter { write },
        )
    }
}

/// Reading half of a split transport.
pub struct RecordReader {
    read: ReadHalf<BoxedStream>,
    receive_buffer_size: u32,
}

impl RecordReader {
    /// Reads one record, enforcing the negotiated chunk size.
    pub async fn read_record(&mut self) -> ClientResult<(RecordHeader, Vec<u8>)> {
        read_record_raw(&mut self.read, self.receive_buffer_size).await
    }
}

/// Writing half of a split transport.
pub struct RecordWriter {
    write: WriteHalf<BoxedStream>,
}

impl RecordWriter {
    /// Writes one record and flushes it.
    pub async fn write_record(
        &mut self,
        message_type: MessageType,
        chunk_type: ChunkType,
        body: &[u8],
    ) -> ClientResult<()> {
        write_record(&mut self.write, message_type, chunk_type, body).await
    }

    /// Shuts the stream down, signalling EOF to the peer.
    pub async fn shutdown(&mut self) -> ClientResult<()> {
        self.write.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}

async fn write_record<W: AsyncWrite + Unpin>(
    write: &mut W,
    message_type: MessageType,
    chunk_type: ChunkType,
    body: &[u8],
) -> ClientResult<()> {
    let size = (RECORD_HEADER_SIZE + body.len()) as u32;
    let mut record = Vec::with_capacity(size as usize);
    record.extend_from_slice(&message_type.as_bytes());
    record.push(chunk_type.as_byte());
    record.extend_from_slice(&size.to_le_bytes());
    record.extend_from_slice(body);
    write.write_all(&record).await.map_err(TransportError::Io)?;
    write.flush().await.map_err(TransportError::Io)?;
    trace!(message_type = ?message_type, size, "record written");
    Ok(())
}

async fn read_record_raw<R: AsyncRead + Unpin>(
    read: &mut R,
    receive_buffer_size: u32,
) -> ClientResult<(RecordHeader, Vec<u8>)> {
    let mut header = [0u8; RECORD_HEADER_SIZE];
    match read.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Closed.into());
        }
        Err(e) => return Err(TransportError::Io(e).into()),
    }

    let message_type = MessageType::from_bytes([header[0], header[1], header[2]])?;
    let chunk_type = ChunkType::from_byte(header[3])?;
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if (size as usize) < RECORD_HEADER_SIZE {
        return Err(ProtocolError::MessageTooLarge { size, limit: RECORD_HEADER_SIZE as u32 }.into());
    }
    if receive_buffer_size != 0 && size > receive_buffer_size {
        return Err(ProtocolError::MessageTooLarge { size, limit: receive_buffer_size }.into());
    }

    let mut body = vec![0u8; size as usize - RECORD_HEADER_SIZE];
    match read.read_exact(&mut body).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Closed.into());
        }
        Err(e) => return Err(TransportError::Io(e).into()),
    }
    trace!(message_type = ?message_type, size, "record read");
    Ok((RecordHeader { message_type, chunk_type, size }, body))
}

/// Decodes the body of an ERR record.
pub fn decode_error_record(body: &[u8]) -> TransportError {
    let mut r = Decoder::new(body);
    let code = r.read_u32().map(StatusCode).unwrap_or(StatusCode::BAD_TCP_INTERNAL_ERROR);
    let reason = r.read_str().ok().flatten().unwrap_or_default();
    TransportError::ServerError { code, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_parsing() {
        let url = EndpointUrl::parse("opc.tcp://wow.its.easy:11111/UA/Server").unwrap();
        assert_eq!(url.host(), "wow.its.easy");
        assert_eq!(url.port(), 11111);
        assert_eq!(url.socket_addr(), "wow.its.easy:11111");
        assert_eq!(url.as_str(), "opc.tcp://wow.its.easy:11111/UA/Server");

        let url = EndpointUrl::parse("opc.tcp://plc.local").unwrap();
        assert_eq!(url.port(), EndpointUrl::DEFAULT_PORT);

        assert!(EndpointUrl::parse("http://plc.local").is_err());
        assert!(EndpointUrl::parse("opc.tcp://").is_err());
        assert!(EndpointUrl::parse("opc.tcp://host:notaport").is_err());
    }

    #[test]
    fn message_and_chunk_type_tags() {
        assert_eq!(MessageType::Hello.as_bytes(), *b"HEL");
        assert_eq!(MessageType::from_bytes(*b"OPN").unwrap(), MessageType::OpenChannel);
        assert!(MessageType::from_bytes(*b"XXX").is_err());
        assert_eq!(ChunkType::Final.as_byte(), b'F');
        assert_eq!(ChunkType::from_byte(b'C').unwrap(), ChunkType::Intermediate);
        assert!(ChunkType::from_byte(b'Z').is_err());
    }

    async fn serve_ack(server: tokio::io::DuplexStream, limits: [u32; 5]) {
        let mut server = server;
        // Consume the client hello.
        let (header, body) = read_record_raw(&mut server, 0).await.unwrap();
        assert_eq!(header.message_type, MessageType::Hello);
        let mut r = Decoder::new(&body);
        assert_eq!(r.read_u32().unwrap(), PROTOCOL_VERSION);

        let mut ack = Encoder::new();
        for v in limits {
            ack.write_u32(v);
        }
        write_record(&mut server, MessageType::Acknowledge, ChunkType::Final, &ack.into_bytes())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn handshake_negotiates_limits() {
        let (client, server) = tokio::io::duplex(1 << 16);
        let server_task = tokio::spawn(serve_ack(server, [0, 8192, 16384, 1 << 20, 64]));

        let transport = UacpTransport::handshake(
            Box::new(client),
            "opc.tcp://localhost:4840",
            TransportLimits::default(),
        )
        .await
        .unwrap();

        let limits = transport.limits();
        // We send at most what the server receives, and accept at most the
        // smaller of its send buffer and our own receive buffer.
        assert_eq!(limits.send_buffer_size, 8192);
        assert_eq!(limits.receive_buffer_size, 16384);
        assert_eq!(limits.max_message_size, 1 << 20);
        assert_eq!(limits.max_chunk_count, 64);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_caps_send_buffer_at_own_hello() {
        let (client, server) = tokio::io::duplex(1 << 16);
        // The server acknowledges a receive buffer larger than the
        // client declared it would send.
        let server_task = tokio::spawn(serve_ack(server, [0, 65536, 65536, 0, 0]));

        let transport = UacpTransport::handshake(
            Box::new(client),
            "opc.tcp://localhost:4840",
            TransportLimits { send_buffer_size: 4096, ..Default::default() },
        )
        .await
        .unwrap();

        assert_eq!(transport.limits().send_buffer_size, 4096);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_surfaces_server_error() {
        let (client, server) = tokio::io::duplex(1 << 16);
        let server_task = tokio::spawn(async move {
            let mut server = server;
            let _ = read_record_raw(&mut server, 0).await.unwrap();
            let mut body = Encoder::new();
            body.write_u32(StatusCode::BAD_TCP_ENDPOINT_URL_INVALID.0);
            body.write_str(Some("no such endpoint"));
            write_record(&mut server, MessageType::Error, ChunkType::Final, &body.into_bytes())
                .await
                .unwrap();
        });

        let err = UacpTransport::handshake(
            Box::new(client),
            "opc.tcp://localhost:4840",
            TransportLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no such endpoint"));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_record_is_rejected() {
        let (client, server) = tokio::io::duplex(1 << 16);
        let server_task = tokio::spawn(async move {
            let mut server = server;
            let _ = read_record_raw(&mut server, 0).await.unwrap();
            // Claim a record far beyond the client's receive buffer.
            let mut record = Vec::new();
            record.extend_from_slice(b"ACKF");
            record.extend_from_slice(&(10 * 1024 * 1024u32).to_le_bytes());
            server.write_all(&record).await.unwrap();
        });

        let err = UacpTransport::handshake(
            Box::new(client),
            "opc.tcp://localhost:4840",
            TransportLimits { receive_buffer_size: 8192, ..Default::default() },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ClientError::Protocol(ProtocolError::MessageTooLarge { .. })
        ));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn peer_close_maps_to_closed() {
        let (client, server) = tokio::io::duplex(1 << 16);
        drop(server);
        let err = UacpTransport::handshake(
            Box::new(client),
            "opc.tcp://localhost:4840",
            TransportLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ClientError::Transport(TransportError::Closed)
        ));
    }
}
