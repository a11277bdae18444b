// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process mock OPC UA server.
//!
//! The mock speaks UACP over one half of a `tokio::io::duplex` pipe: it
//! accepts the Hello, answers OpenSecureChannel, and then serves whatever
//! script the test drives. Requests are decoded into the codec's
//! [`Request`] sum type so tests assert on typed fields rather than raw
//! bytes.

// Each test binary uses its own subset of this module.
#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use gantry_codec::services::{
    ActivateSessionResponse, ChannelSecurityToken, CloseSessionResponse, CreateSessionResponse,
    CreateSubscriptionResponse, DeleteSubscriptionsResponse, EndpointDescription,
    OpenSecureChannelResponse, Request, Response, ResponseHeader, SecurityTokenRequestType,
    UserTokenPolicy, UserTokenType,
};
use gantry_codec::{Decoder, Encoder, NodeId, StatusCode, UaDateTime};

/// Endpoint URL used by every test.
pub const TEST_ENDPOINT: &str = "opc.tcp://mock.gantry.test:4840";

/// The authentication token the mock hands out on CreateSession.
pub const AUTH_TOKEN: [u8; 16] = [
    0x08, 0x22, 0x87, 0x62, 0xba, 0x81, 0xe1, 0x11, 0xa6, 0x43, 0xf8, 0x77, 0x7b, 0xc6, 0x2f,
    0xc8,
];

/// One request as observed by the mock.
#[derive(Debug)]
pub struct Observed {
    /// Record message type tag ("OPN", "MSG", "CLO").
    pub message_type: [u8; 3],
    /// Sequence number of the (final) chunk.
    pub sequence_number: u32,
    /// Request id from the sequence header.
    pub request_id: u32,
    /// The decoded request.
    pub request: Request,
}

pub struct MockServer {
    stream: DuplexStream,
    sequence: u32,
    pub channel_id: u32,
    pub token_id: u32,
}

#[allow(dead_code)]
impl MockServer {
    /// Accepts the client's Hello and acknowledges it with generous
    /// limits.
    pub async fn accept(stream: DuplexStream) -> Self {
        let mut server = Self { stream, sequence: 1, channel_id: 1, token_id: 2 };
        let (message_type, _chunk, body) = server.read_raw().await.expect("hello record");
        assert_eq!(&message_type, b"HEL", "first record must be Hello");
        let mut r = Decoder::new(&body);
        assert_eq!(r.read_u32().unwrap(), 0, "protocol version");

        let mut ack = Encoder::new();
        ack.write_u32(0); // protocol version
        ack.write_u32(0xFFFF); // receive buffer
        ack.write_u32(0xFFFF); // send buffer
        ack.write_u32(0); // max message size
        ack.write_u32(0); // max chunk count
        server.write_raw(*b"ACK", b'F', &ack.into_bytes()).await;
        server
    }

    /// Accepts the handshake and serves the OpenSecureChannel(Issue)
    /// exchange with the default token.
    pub async fn accept_and_open(stream: DuplexStream) -> Self {
        let mut server = Self::accept(stream).await;
        server.serve_open(6_000_000).await;
        server
    }

    /// Serves one OpenSecureChannel request with the mock's current
    /// channel and token ids.
    pub async fn serve_open(&mut self, revised_lifetime: u32) {
        let observed = self.recv().await.expect("open secure channel request");
        assert_eq!(&observed.message_type, b"OPN");
        let Request::OpenSecureChannel(req) = &observed.request else {
            panic!("expected OpenSecureChannelRequest, got {}", observed.request.service_name());
        };
        if req.request_type == SecurityTokenRequestType::Renew {
            self.token_id += 1;
        }
        let response = Response::OpenSecureChannel(OpenSecureChannelResponse {
            response_header: good_header(),
            server_protocol_version: 0,
            security_token: ChannelSecurityToken {
                channel_id: self.channel_id,
                token_id: self.token_id,
                created_at: UaDateTime::now(),
                revised_lifetime,
            },
            server_nonce: Some(vec![0xFF]),
        });
        self.respond(*b"OPN", observed.request_id, &response).await;
    }

    /// Reads one request, reassembling chunk series.
    ///
    /// Returns `None` when the client has closed the connection.
    pub async fn recv(&mut self) -> Option<Observed> {
        let mut assembled: Option<(u32, Vec<u8>)> = None;
        loop {
            let (message_type, chunk_type, body) = self.read_raw().await?;
            let mut r = Decoder::new(&body);
            let _channel_id = r.read_u32().unwrap();
            match &message_type {
                b"OPN" => {
                    let _policy = r.read_str().unwrap();
                    let _sender_cert = r.read_byte_string().unwrap();
                    let _thumbprint = r.read_byte_string().unwrap();
                }
                _ => {
                    let _token_id = r.read_u32().unwrap();
                }
            }
            let sequence_number = r.read_u32().unwrap();
            let request_id = r.read_u32().unwrap();
            let payload = &body[r.position()..];

            match chunk_type {
                b'C' => {
                    let (_, buffer) =
                        assembled.get_or_insert_with(|| (sequence_number, Vec::new()));
                    buffer.extend_from_slice(payload);
                }
                b'F' => {
                    let (first_sequence, mut buffer) =
                        assembled.take().unwrap_or((sequence_number, Vec::new()));
                    buffer.extend_from_slice(payload);
                    let request = Request::decode(&buffer).expect("decodable request");
                    return Some(Observed {
                        message_type,
                        sequence_number: first_sequence,
                        request_id,
                        request,
                    });
                }
                other => panic!("unexpected chunk type {other:#04x}"),
            }
        }
    }

    /// Reads the next request, skipping any CloseSecureChannel records.
    pub async fn recv_service(&mut self) -> Option<Observed> {
        loop {
            let observed = self.recv().await?;
            if &observed.message_type == b"CLO" {
                continue;
            }
            return Some(observed);
        }
    }

    /// Sends a response correlated to `request_id`.
    pub async fn respond(&mut self, message_type: [u8; 3], request_id: u32, response: &Response) {
        let payload = response.encode();
        let mut body = Encoder::with_capacity(payload.len() + 24);
        body.write_u32(self.channel_id);
        match &message_type {
            b"OPN" => {
                body.write_str(Some("http://opcfoundation.org/UA/SecurityPolicy#None"));
                body.write_byte_string(None);
                body.write_byte_string(None);
            }
            _ => body.write_u32(self.token_id),
        }
        body.write_u32(self.sequence);
        self.sequence += 1;
        body.write_u32(request_id);
        body.write_bytes(&payload);
        self.write_raw(message_type, b'F', &body.into_bytes()).await;
    }

    /// Sends raw payload bytes as a final MSG record for `request_id`.
    /// Used to feed the client an undecodable body.
    pub async fn respond_raw_payload(&mut self, request_id: u32, payload: &[u8]) {
        let mut body = Encoder::with_capacity(payload.len() + 24);
        body.write_u32(self.channel_id);
        body.write_u32(self.token_id);
        body.write_u32(self.sequence);
        self.sequence += 1;
        body.write_u32(request_id);
        body.write_bytes(payload);
        self.write_raw(*b"MSG", b'F', &body.into_bytes()).await;
    }

    async fn read_raw(&mut self) -> Option<([u8; 3], u8, Vec<u8>)> {
        let mut header = [0u8; 8];
        if self.stream.read_exact(&mut header).await.is_err() {
            return None;
        }
        let message_type = [header[0], header[1], header[2]];
        let chunk_type = header[3];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let mut body = vec![0u8; size - 8];
        self.stream.read_exact(&mut body).await.ok()?;
        Some((message_type, chunk_type, body))
    }

    async fn write_raw(&mut self, message_type: [u8; 3], chunk_type: u8, body: &[u8]) {
        let size = (8 + body.len()) as u32;
        let mut record = Vec::with_capacity(size as usize);
        record.extend_from_slice(&message_type);
        record.push(chunk_type);
        record.extend_from_slice(&size.to_le_bytes());
        record.extend_from_slice(body);
        self.stream.write_all(&record).await.expect("mock write");
        self.stream.flush().await.expect("mock flush");
    }
}

/// A response header with a good service result and the current time.
pub fn good_header() -> ResponseHeader {
    ResponseHeader {
        timestamp: UaDateTime::now(),
        request_handle: 0,
        service_result: StatusCode::GOOD,
        ..Default::default()
    }
}

/// A response header carrying a specific service result.
#[allow(dead_code)]
pub fn status_header(status: StatusCode) -> ResponseHeader {
    ResponseHeader { service_result: status, ..good_header() }
}

/// An endpoint with security None and an anonymous token policy.
#[allow(dead_code)]
pub fn anonymous_endpoint(policy_id: &str) -> EndpointDescription {
    EndpointDescription {
        endpoint_url: Some(TEST_ENDPOINT.to_owned()),
        security_mode: 1,
        security_policy_uri: Some("http://opcfoundation.org/UA/SecurityPolicy#None".to_owned()),
        user_identity_tokens: vec![UserTokenPolicy {
            policy_id: Some(policy_id.to_owned()),
            token_type: UserTokenType::Anonymous,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// The mock's CreateSession response.
#[allow(dead_code)]
pub fn create_session_response(anonymous_policy: &str) -> Response {
    Response::CreateSession(CreateSessionResponse {
        response_header: good_header(),
        session_id: NodeId::numeric(1, 1),
        authentication_token: NodeId::opaque(0, AUTH_TOKEN.to_vec()),
        revised_session_timeout: 6_000_000.0,
        server_nonce: Some(vec![0x11; 32]),
        server_certificate: None,
        server_endpoints: vec![anonymous_endpoint(anonymous_policy)],
        server_software_certificates: Vec::new(),
        server_signature: Default::default(),
        max_request_message_size: 0,
    })
}

/// The mock's ActivateSession response.
#[allow(dead_code)]
pub fn activate_session_response() -> Response {
    Response::ActivateSession(ActivateSessionResponse {
        response_header: good_header(),
        server_nonce: Some(vec![0x22; 32]),
        results: Vec::new(),
        diagnostic_infos: Vec::new(),
    })
}

/// The mock's CloseSession response.
#[allow(dead_code)]
pub fn close_session_response() -> Response {
    Response::CloseSession(CloseSessionResponse { response_header: good_header() })
}

/// The mock's CreateSubscription response.
#[allow(dead_code)]
pub fn create_subscription_response(subscription_id: u32) -> Response {
    Response::CreateSubscription(CreateSubscriptionResponse {
        response_header: good_header(),
        subscription_id,
        revised_publishing_interval: 100.0,
        revised_lifetime_count: 10_000,
        revised_max_keep_alive_count: 3_000,
    })
}

/// The mock's DeleteSubscriptions response for one subscription.
#[allow(dead_code)]
pub fn delete_subscriptions_response() -> Response {
    Response::DeleteSubscriptions(DeleteSubscriptionsResponse {
        response_header: good_header(),
        results: vec![StatusCode::GOOD],
        diagnostic_infos: Vec::new(),
    })
}

/// Serves the create/activate exchange of `Client::connect` after the
/// channel is open. Returns the policy id observed on the activation's
/// identity token.
#[allow(dead_code)]
pub async fn serve_session_setup(server: &mut MockServer, anonymous_policy: &str) -> String {
    let observed = server.recv_service().await.expect("create session request");
    let Request::CreateSession(req) = &observed.request else {
        panic!("expected CreateSessionRequest, got {}", observed.request.service_name());
    };
    assert!(req.request_header.authentication_token.is_null());
    server.respond(*b"MSG", observed.request_id, &create_session_response(anonymous_policy)).await;

    let observed = server.recv_service().await.expect("activate session request");
    let Request::ActivateSession(req) = &observed.request else {
        panic!("expected ActivateSessionRequest, got {}", observed.request.service_name());
    };
    let token = gantry_codec::services::IdentityTokenObject::from_extension_object(
        &req.user_identity_token,
    )
    .expect("identity token");
    let policy_id = token.policy_id().unwrap_or_default().to_owned();
    server.respond(*b"MSG", observed.request_id, &activate_session_response()).await;
    policy_id
}
