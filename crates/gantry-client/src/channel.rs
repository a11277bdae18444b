// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The secure channel: framing, correlation and token lifecycle.
//!
//! A channel owns its transport. Outbound requests are encoded, chunked at
//! the negotiated size and written with fresh per-chunk sequence numbers;
//! a background reader task reassembles inbound chunks and completes the
//! pending request matching the record's request id. Token renewal runs on
//! a timer at 75 % of the revised lifetime and swaps the token only after
//! the server accepts the renewal; requests already in flight finish under
//! the old token.
//!
//! Failure semantics: a response for an unknown request id is logged and
//! dropped; a body that fails to decode fails only its own request; any
//! transport error is terminal and completes every pending request with
//! `BadSecureChannelClosed`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use gantry_codec::services::{
    ChannelSecurityToken, CloseSecureChannelRequest, OpenSecureChannelRequest, Request, Response,
    SecurityTokenRequestType,
};
use gantry_codec::{Decoder, Encoder, NodeId, StatusCode, UaDateTime};

use crate::config::{ChannelConfig, SignatureVerification};
use crate::error::{
    ClientError, ClientResult, ContractError, ProtocolError, SecurityError, ServiceError,
};
use crate::security::{self, ChannelSecurity, SecurityPolicy};
use crate::transport::{
    decode_error_record, ChunkType, MessageType, RecordHeader, RecordReader, RecordWriter,
    TransportLimits, UacpTransport, RECORD_HEADER_SIZE,
};

/// Sequence numbers and request ids wrap to 1 after this value.
const SEQUENCE_WRAP: u32 = u32::MAX - 1023;

// =============================================================================
// ChannelState
// =============================================================================

/// State of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChannelState {
    /// No channel; the terminal state.
    Closed = 0,
    /// Transport handshake and OpenSecureChannel in progress.
    Opening = 1,
    /// The channel is open for requests.
    Open = 2,
    /// A token renewal is in flight; requests continue under the old
    /// token.
    Renewing = 3,
    /// The channel is shutting down.
    Closing = 4,
}

impl ChannelState {
    /// Returns `true` when requests may be sent.
    #[inline]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Open | Self::Renewing)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Opening,
            2 => Self::Open,
            3 => Self::Renewing,
            4 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "Closed",
            Self::Opening => "Opening",
            Self::Open => "Open",
            Self::Renewing => "Renewing",
            Self::Closing => "Closing",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ChannelStats
// =============================================================================

/// Counters for channel activity.
#[derive(Debug, Default)]
pub struct ChannelStats {
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    timeouts: AtomicU64,
    renewals: AtomicU64,
}

impl ChannelStats {
    /// Requests written to the wire.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Responses routed to a handler.
    pub fn responses_received(&self) -> u64 {
        self.responses_received.load(Ordering::Relaxed)
    }

    /// Requests that hit their local deadline.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Completed token renewals.
    pub fn renewals(&self) -> u64 {
        self.renewals.load(Ordering::Relaxed)
    }
}

// =============================================================================
// SecureChannel
// =============================================================================

struct PendingRequest {
    tx: oneshot::Sender<ClientResult<Response>>,
    service: &'static str,
}

struct WriterState {
    writer: RecordWriter,
    sequence: u32,
}

impl WriterState {
    fn next_sequence(&mut self) -> u32 {
        let seq = self.sequence;
        self.sequence = if seq >= SEQUENCE_WRAP { 1 } else { seq + 1 };
        seq
    }
}

struct ChannelInner {
    config: ChannelConfig,
    security: ChannelSecurity,
    endpoint_url: String,
    limits: TransportLimits,
    state: AtomicU8,
    writer: AsyncMutex<WriterState>,
    pending: Mutex<HashMap<u32, PendingRequest>>,
    token: RwLock<Option<ChannelSecurityToken>>,
    request_id: AtomicU32,
    request_handle: AtomicU32,
    shutdown: watch::Sender<bool>,
    stats: ChannelStats,
}

/// A secure channel over a connected transport.
///
/// Cloning shares the channel; all clones speak over the same transport
/// and pending-request table.
#[derive(Clone)]
pub struct SecureChannel {
    inner: Arc<ChannelInner>,
}

impl SecureChannel {
    /// Opens a channel over the given transport: spawns the reader task,
    /// performs OpenSecureChannel(Issue) and arms the renewal timer.
    pub async fn open(transport: UacpTransport, config: ChannelConfig) -> ClientResult<Self> {
        let security = ChannelSecurity::from_config(&config)?;
        let limits = transport.limits();
        let endpoint_url = transport.endpoint_url().to_owned();
        let (reader, writer) = transport.into_split();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(ChannelInner {
            config,
            security,
            endpoint_url,
            limits,
            state: AtomicU8::new(ChannelState::Opening as u8),
            writer: AsyncMutex::new(WriterState { writer, sequence: 1 }),
            pending: Mutex::new(HashMap::new()),
            token: RwLock::new(None),
            request_id: AtomicU32::new(1),
            request_handle: AtomicU32::new(1),
            shutdown,
            stats: ChannelStats::default(),
        });

        tokio::spawn(reader_task(Arc::clone(&inner), reader, shutdown_rx.clone()));

        let channel = Self { inner };
        match channel.open_secure_channel(SecurityTokenRequestType::Issue).await {
            Ok(token) => {
                channel.inner.set_state(ChannelState::Open);
                info!(
                    endpoint = %channel.inner.endpoint_url,
                    channel_id = token.channel_id,
                    token_id = token.token_id,
                    lifetime_ms = token.revised_lifetime,
                    "secure channel open"
                );
            }
            Err(e) => {
                channel.inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
                return Err(e);
            }
        }

        tokio::spawn(renewal_task(Arc::clone(&channel.inner), shutdown_rx));
        Ok(channel)
    }

    /// Returns the current channel state.
    pub fn state(&self) -> ChannelState {
        self.inner.state()
    }

    /// Returns the current security token.
    pub fn security_token(&self) -> Option<ChannelSecurityToken> {
        *self.inner.token.read()
    }

    /// Returns the channel statistics.
    pub fn stats(&self) -> &ChannelStats {
        &self.inner.stats
    }

    /// Returns the endpoint URL the channel was opened against.
    pub fn endpoint_url(&self) -> &str {
        &self.inner.endpoint_url
    }

    /// Returns the configured per-request timeout.
    pub fn request_timeout(&self) -> std::time::Duration {
        self.inner.config.request_timeout
    }

    /// Returns the configured application URI.
    pub fn application_uri(&self) -> &str {
        &self.inner.config.application_uri
    }

    /// Returns the local DER certificate, if configured.
    pub fn local_certificate(&self) -> Option<&[u8]> {
        self.inner.security.certificate()
    }

    /// Returns the channel's security policy.
    pub fn security_policy(&self) -> SecurityPolicy {
        self.inner.security.policy()
    }

    /// Returns the configured server signature verification policy.
    pub fn verification_policy(&self) -> SignatureVerification {
        self.inner.config.signature_verification
    }

    /// Sends a request and waits for its correlated response.
    ///
    /// `auth_token` is injected into the request header; `None` sends the
    /// null node id. Fails with `BadSecureChannelClosed` when the channel
    /// is not open, and with `BadTimeout` when the local deadline expires
    /// before the response arrives.
    pub async fn send(&self, request: Request, auth_token: Option<NodeId>) -> ClientResult<Response> {
        if !self.inner.state().is_usable() {
            return Err(ClientError::status(StatusCode::BAD_SECURE_CHANNEL_CLOSED));
        }
        self.dispatch(MessageType::Message, request, auth_token).await
    }

    /// Renews the security token. Outstanding requests complete under the
    /// old token; the new token takes effect for sends after the renewal
    /// response is accepted.
    pub async fn renew(&self) -> ClientResult<()> {
        if self.inner.state() != ChannelState::Open {
            return Err(ClientError::status(StatusCode::BAD_SECURE_CHANNEL_CLOSED));
        }
        self.inner.set_state(ChannelState::Renewing);
        let result = self.open_secure_channel(SecurityTokenRequestType::Renew).await;
        match &result {
            Ok(token) => {
                self.inner.stats.renewals.fetch_add(1, Ordering::Relaxed);
                self.inner.set_state(ChannelState::Open);
                debug!(
                    token_id = token.token_id,
                    lifetime_ms = token.revised_lifetime,
                    "security token renewed"
                );
            }
            Err(e) if e.is_fatal() => {}
            Err(_) => self.inner.set_state(ChannelState::Open),
        }
        result.map(|_| ())
    }

    /// Closes the channel. The CloseSecureChannel request is best-effort;
    /// any error in it is ignored. Every pending request completes with
    /// `BadSecureChannelClosed`.
    pub async fn close(&self) -> ClientResult<()> {
        let state = self.inner.state();
        if matches!(state, ChannelState::Closed | ChannelState::Closing) {
            return Ok(());
        }
        self.inner.set_state(ChannelState::Closing);

        let channel_id = self.inner.token.read().map_or(0, |t| t.channel_id);
        let mut request = Request::CloseSecureChannel(CloseSecureChannelRequest {
            request_header: Default::default(),
            secure_channel_id: channel_id,
        });
        self.inner.stamp_header(&mut request, None);
        let body = request.encode();
        let request_id = self.inner.next_request_id();
        if let Err(e) = self.write_chunks(MessageType::CloseChannel, request_id, &body).await {
            debug!(error = %e, "close secure channel request not delivered");
        }

        {
            let mut writer = self.inner.writer.lock().await;
            let _ = writer.writer.shutdown().await;
        }
        self.inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
        info!(endpoint = %self.inner.endpoint_url, "secure channel closed");
        Ok(())
    }

    // =========================================================================
    // Session security operations
    // =========================================================================

    /// Verifies the server's session signature over
    /// `client_certificate || client_nonce`.
    pub fn verify_session_signature(
        &self,
        server_certificate: &[u8],
        client_nonce: &[u8],
        signature: &[u8],
    ) -> Result<(), SecurityError> {
        self.inner.security.verify_session_signature(server_certificate, client_nonce, signature)
    }

    /// Signs `server_certificate || server_nonce` with the channel's
    /// private key.
    pub fn new_session_signature(
        &self,
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        self.inner.security.new_session_signature(server_certificate, server_nonce)
    }

    /// Encrypts a user password per the token policy.
    pub fn encrypt_user_password(
        &self,
        policy_uri: &str,
        password: &[u8],
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        self.inner.security.encrypt_user_password(
            policy_uri,
            password,
            server_certificate,
            server_nonce,
        )
    }

    /// Signs `server_certificate || server_nonce` with an X.509 user
    /// identity's key.
    pub fn new_user_token_signature(
        &self,
        policy_uri: &str,
        user_key_der: &[u8],
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        self.inner.security.new_user_token_signature(
            policy_uri,
            user_key_der,
            server_certificate,
            server_nonce,
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn open_secure_channel(
        &self,
        request_type: SecurityTokenRequestType,
    ) -> ClientResult<ChannelSecurityToken> {
        let client_nonce = if self.inner.security.policy() == SecurityPolicy::None {
            None
        } else {
            Some(security::generate_nonce())
        };
        let request = Request::OpenSecureChannel(OpenSecureChannelRequest {
            request_header: Default::default(),
            client_protocol_version: 0,
            request_type,
            security_mode: self.inner.config.security_mode.to_message_security_mode(),
            client_nonce,
            requested_lifetime: self.inner.config.requested_lifetime.as_millis() as u32,
        });

        let response = self.dispatch(MessageType::OpenChannel, request, None).await?;
        let res = match response {
            Response::OpenSecureChannel(res) => res,
            other => {
                return Err(ServiceError::UnexpectedResponse {
                    got: other.service_name(),
                    want: "OpenSecureChannelResponse",
                }
                .into())
            }
        };
        let service_result = res.response_header.service_result;
        if service_result.is_bad() {
            return Err(ClientError::status(service_result));
        }
        // The new token becomes visible only after the response has been
        // accepted; in-flight requests keep the old token id on the wire.
        *self.inner.token.write() = Some(res.security_token);
        Ok(res.security_token)
    }

    async fn dispatch(
        &self,
        message_type: MessageType,
        mut request: Request,
        auth_token: Option<NodeId>,
    ) -> ClientResult<Response> {
        self.inner.stamp_header(&mut request, auth_token);
        let service = request.service_name();
        let body = request.encode();

        let limit = self.inner.limits.max_message_size;
        if limit != 0 && body.len() > limit as usize {
            return Err(ContractError::RequestTooLarge { size: body.len(), limit }.into());
        }

        let request_id = self.inner.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(request_id, PendingRequest { tx, service });
        trace!(request_id, service, "request registered");

        if let Err(e) = self.write_chunks(message_type, request_id, &body).await {
            self.inner.pending.lock().remove(&request_id);
            if e.is_fatal() {
                self.inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
            }
            return Err(e);
        }
        self.inner.stats.requests_sent.fetch_add(1, Ordering::Relaxed);

        match timeout(self.inner.config.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::status(StatusCode::BAD_SECURE_CHANNEL_CLOSED)),
            Err(_) => {
                // Reclaim the slot; a late response will be dropped as
                // unknown.
                self.inner.pending.lock().remove(&request_id);
                self.inner.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                Err(ClientError::status(StatusCode::BAD_TIMEOUT))
            }
        }
    }

    async fn write_chunks(
        &self,
        message_type: MessageType,
        request_id: u32,
        body: &[u8],
    ) -> ClientResult<()> {
        let (channel_id, token_id) =
            self.inner.token.read().map_or((0, 0), |t| (t.channel_id, t.token_id));

        let security_header = match message_type {
            MessageType::OpenChannel => {
                let mut h = Encoder::with_capacity(64);
                h.write_str(Some(self.inner.security.policy().uri()));
                let sender_certificate =
                    if self.inner.security.policy() == SecurityPolicy::None {
                        None
                    } else {
                        self.inner.security.certificate()
                    };
                h.write_byte_string(sender_certificate);
                // The receiver thumbprint requires the server certificate,
                // which is unknown before endpoint discovery; it stays
                // null on the Issue exchange.
                h.write_byte_string(None);
                h.into_bytes()
            }
            _ => token_id.to_le_bytes().to_vec(),
        };

        let overhead = RECORD_HEADER_SIZE + 4 + security_header.len() + 8;
        let max_chunk_body = if self.inner.limits.send_buffer_size == 0 {
            usize::MAX
        } else {
            (self.inner.limits.send_buffer_size as usize).saturating_sub(overhead).max(1)
        };
        let chunk_count = body.len().div_ceil(max_chunk_body).max(1);
        let chunk_limit = self.inner.limits.max_chunk_count;
        if chunk_limit != 0 && chunk_count > chunk_limit as usize {
            return Err(ProtocolError::TooManyChunks { limit: chunk_limit }.into());
        }

        // Sequence numbers are assigned inside the writer lock so that
        // wire order matches numbering and chunks never interleave.
        let mut writer = self.inner.writer.lock().await;
        for (index, chunk) in body.chunks(max_chunk_body).enumerate() {
            let chunk_type =
                if index + 1 == chunk_count { ChunkType::Final } else { ChunkType::Intermediate };
            let sequence = writer.next_sequence();
            let mut record = Encoder::with_capacity(chunk.len() + overhead);
            record.write_u32(channel_id);
            record.write_bytes(&security_header);
            record.write_u32(sequence);
            record.write_u32(request_id);
            record.write_bytes(chunk);
            writer.writer.write_record(message_type, chunk_type, &record.into_bytes()).await?;
            trace!(request_id, sequence, chunk = index, "chunk written");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("endpoint", &self.inner.endpoint_url)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl ChannelInner {
    fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ChannelState) {
        let old = ChannelState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if old != state {
            trace!(old_state = %old, new_state = %state, "channel state changed");
        }
    }

    fn next_request_id(&self) -> u32 {
        self.request_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id >= SEQUENCE_WRAP { 1 } else { id + 1 })
            })
            .unwrap_or(1)
    }

    fn stamp_header(&self, request: &mut Request, auth_token: Option<NodeId>) {
        let header = request.request_header_mut();
        header.authentication_token = auth_token.unwrap_or_else(NodeId::null);
        header.timestamp = UaDateTime::now();
        header.request_handle = self.request_handle.fetch_add(1, Ordering::Relaxed);
        header.timeout_hint = self.config.request_timeout.as_millis() as u32;
    }

    fn complete(&self, request_id: u32, result: ClientResult<Response>) {
        let pending = self.pending.lock().remove(&request_id);
        match pending {
            Some(p) => {
                self.stats.responses_received.fetch_add(1, Ordering::Relaxed);
                trace!(request_id, service = p.service, "response delivered");
                let _ = p.tx.send(result);
            }
            None => {
                warn!(request_id, "response for unknown request id, dropping");
            }
        }
    }

    /// Fails every pending request and moves the channel to Closed.
    fn terminate(&self, status: StatusCode) {
        let _ = self.shutdown.send(true);
        let drained: Vec<PendingRequest> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, p)| p).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), status = %status, "failing pending requests");
        }
        for p in drained {
            let _ = p.tx.send(Err(ClientError::status(status)));
        }
        self.set_state(ChannelState::Closed);
    }
}

// =============================================================================
// Background tasks
// =============================================================================

async fn reader_task(
    inner: Arc<ChannelInner>,
    mut reader: RecordReader,
    mut shutdown: watch::Receiver<bool>,
) {
    // Chunk series under reassembly, keyed by request id. Chunks of one
    // message arrive in order on the underlying stream.
    let mut partial: HashMap<u32, Vec<u8>> = HashMap::new();

    loop {
        let record = tokio::select! {
            _ = shutdown.changed() => break,
            record = reader.read_record() => record,
        };
        match record {
            Ok((header, body)) => {
                if let Err(e) = handle_record(&inner, header, body, &mut partial) {
                    warn!(error = %e, "terminal protocol failure on inbound stream");
                    inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
                    break;
                }
            }
            Err(e) => {
                if inner.state() != ChannelState::Closing {
                    warn!(error = %e, "transport failed, closing channel");
                }
                inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
                break;
            }
        }
    }
    trace!("reader task exited");
}

/// Processes one inbound record. Returns `Err` only for failures that
/// desynchronize the frame stream; per-request failures are routed to the
/// owning handler.
fn handle_record(
    inner: &ChannelInner,
    header: RecordHeader,
    body: Vec<u8>,
    partial: &mut HashMap<u32, Vec<u8>>,
) -> Result<(), ProtocolError> {
    match header.message_type {
        MessageType::Error => {
            let err = decode_error_record(&body);
            warn!(error = %err, "server error record");
            inner.terminate(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
            Ok(())
        }
        MessageType::OpenChannel | MessageType::Message | MessageType::CloseChannel => {
            let mut r = Decoder::new(&body);
            let channel_id = r.read_u32()?;
            if let Some(token) = *inner.token.read() {
                if channel_id != token.channel_id {
                    warn!(channel_id, "record for unknown secure channel, dropping");
                    return Ok(());
                }
            }
            match header.message_type {
                MessageType::OpenChannel => {
                    // Asymmetric security header.
                    let _policy_uri = r.read_str()?;
                    let _sender_certificate = r.read_byte_string()?;
                    let _receiver_thumbprint = r.read_byte_string()?;
                }
                _ => {
                    // Symmetric security header.
                    let _token_id = r.read_u32()?;
                }
            }
            let _sequence = r.read_u32()?;
            let request_id = r.read_u32()?;
            let payload = body[r.position()..].to_vec();

            match header.chunk_type {
                ChunkType::Intermediate => {
                    partial.entry(request_id).or_default().extend_from_slice(&payload);
                    Ok(())
                }
                ChunkType::Abort => {
                    partial.remove(&request_id);
                    let mut a = Decoder::new(&payload);
                    let code = a.read_u32().map(StatusCode).unwrap_or(StatusCode::BAD);
                    let reason = a.read_str().ok().flatten().unwrap_or_default();
                    inner.complete(
                        request_id,
                        Err(ProtocolError::Aborted { code, reason }.into()),
                    );
                    Ok(())
                }
                ChunkType::Final => {
                    let full = match partial.remove(&request_id) {
                        Some(mut assembled) => {
                            assembled.extend_from_slice(&payload);
                            assembled
                        }
                        None => payload,
                    };
                    match Response::decode(&full) {
                        Ok(response) => inner.complete(request_id, Ok(response)),
                        Err(e) => {
                            // A broken body fails its own request; the
                            // frame stream itself is still intact.
                            inner.complete(request_id, Err(e.into()));
                        }
                    }
                    Ok(())
                }
            }
        }
        MessageType::Hello | MessageType::Acknowledge => {
            warn!(message_type = ?header.message_type, "unexpected handshake record, dropping");
            Ok(())
        }
    }
}

async fn renewal_task(inner: Arc<ChannelInner>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let lifetime_ms = match *inner.token.read() {
            Some(token) => u64::from(token.revised_lifetime),
            None => return,
        };
        // Renew at 75 % of the revised lifetime.
        let delay = std::time::Duration::from_millis(lifetime_ms * 3 / 4);
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        if !inner.state().is_usable() {
            return;
        }
        let channel = SecureChannel { inner: Arc::clone(&inner) };
        if let Err(e) = channel.renew().await {
            // The channel stays on the old token; the server will drop it
            // at expiry if renewal keeps failing.
            warn!(error = %e, "security token renewal failed");
            if e.is_fatal() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(ChannelState::Open.is_usable());
        assert!(ChannelState::Renewing.is_usable());
        assert!(!ChannelState::Closed.is_usable());
        assert!(!ChannelState::Opening.is_usable());
        assert!(!ChannelState::Closing.is_usable());
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ChannelState::Closed,
            ChannelState::Opening,
            ChannelState::Open,
            ChannelState::Renewing,
            ChannelState::Closing,
        ] {
            assert_eq!(ChannelState::from_u8(state as u8), state);
        }
    }

    fn advance(seq: u32) -> u32 {
        if seq >= SEQUENCE_WRAP {
            1
        } else {
            seq + 1
        }
    }

    #[test]
    fn sequence_wraps_to_one() {
        assert_eq!(SEQUENCE_WRAP, u32::MAX - 1023);
        assert_eq!(advance(SEQUENCE_WRAP - 1), SEQUENCE_WRAP);
        assert_eq!(advance(SEQUENCE_WRAP), 1);
        assert_eq!(advance(1), 2);
    }
}
