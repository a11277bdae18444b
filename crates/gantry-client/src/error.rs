// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client error types.
//!
//! Errors are grouped by where they originate:
//!
//! ```text
//! ClientError
//! ├── Transport  - socket and handshake failures; terminal for the channel
//! ├── Protocol   - malformed frames, chunk assembly, codec failures
//! ├── Service    - OPC UA status codes returned by the server
//! ├── Contract   - local misuse, failed without a network round-trip
//! └── Security   - policy, key and signature failures
//! ```
//!
//! Transport errors take the whole channel down and are delivered to every
//! pending request. Protocol errors are terminal for a single request.
//! Service errors are surfaced to the one owning caller, carrying the
//! status code unmodified.

use std::io;

use thiserror::Error;

use gantry_codec::{DecodingError, EncodingError, StatusCode};

/// Convenience result alias used throughout the client.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// ClientError
// =============================================================================

/// The top-level error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket or handshake failure; the channel is gone.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Malformed or unexpected bytes on an otherwise healthy channel.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// A bad status code returned by the server.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Local API misuse; no bytes were sent.
    #[error("{0}")]
    Contract(#[from] ContractError),

    /// Security policy, key material or signature failure.
    #[error("{0}")]
    Security(#[from] SecurityError),
}

impl ClientError {
    /// Creates a service error from a raw status code.
    pub fn status(code: StatusCode) -> Self {
        Self::Service(ServiceError::Status(code))
    }

    /// Returns the status code for service errors.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Service(e) => Some(e.status_code()),
            _ => None,
        }
    }

    /// Returns `true` when the error ends the secure channel.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Service(e) => e.status_code() == StatusCode::BAD_SECURE_CHANNEL_CLOSED,
            _ => false,
        }
    }

    /// Returns the error category for log fields and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Service(_) => "service",
            Self::Contract(_) => "contract",
            Self::Security(_) => "security",
        }
    }
}

impl From<DecodingError> for ClientError {
    fn from(error: DecodingError) -> Self {
        Self::Protocol(ProtocolError::Decoding(error))
    }
}

impl From<EncodingError> for ClientError {
    fn from(error: EncodingError) -> Self {
        Self::Protocol(ProtocolError::Encoding(error))
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Socket-level and handshake errors. All of them are terminal for the
/// channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// TCP connect failed.
    #[error("failed to connect to '{endpoint}'")]
    ConnectFailed {
        /// The endpoint dialed.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("connection to '{endpoint}' timed out")]
    ConnectTimedOut {
        /// The endpoint dialed.
        endpoint: String,
    },

    /// The server rejected the Hello with an ERR record.
    #[error("server rejected connection: {code} - {reason}")]
    ServerError {
        /// Error status from the ERR record.
        code: StatusCode,
        /// Reason string from the ERR record.
        reason: String,
    },

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// I/O failure on an established connection.
    #[error("transport I/O error")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint { url: url.into(), reason: reason.into() }
    }
}

// =============================================================================
// ProtocolError
// =============================================================================

/// Framing and codec errors. Terminal for one request; the channel keeps
/// running unless the frame stream itself is corrupt.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A record carried an unknown message type.
    #[error("unknown message type {0:?}")]
    UnknownMessageType([u8; 3]),

    /// A record carried an unknown chunk type.
    #[error("unknown chunk type {0:#04x}")]
    UnknownChunkType(u8),

    /// A record exceeded the negotiated size limit.
    #[error("message of {size} bytes exceeds the negotiated limit of {limit}")]
    MessageTooLarge {
        /// Declared record size.
        size: u32,
        /// Negotiated limit.
        limit: u32,
    },

    /// A chunk series exceeded the negotiated chunk count.
    #[error("chunk count exceeds the negotiated limit of {limit}")]
    TooManyChunks {
        /// Negotiated limit.
        limit: u32,
    },

    /// The peer aborted a chunk series.
    #[error("request aborted by peer: {code} - {reason}")]
    Aborted {
        /// Error status from the abort chunk.
        code: StatusCode,
        /// Reason string from the abort chunk.
        reason: String,
    },

    /// A record arrived for a secure channel id we do not own.
    #[error("record for unknown secure channel {0}")]
    UnknownSecureChannel(u32),

    /// Failed to encode an outbound structure.
    #[error("encoding failed")]
    Encoding(#[from] EncodingError),

    /// Failed to decode an inbound structure.
    #[error("decoding failed")]
    Decoding(#[from] DecodingError),
}

// =============================================================================
// ServiceError
// =============================================================================

/// Errors carried in or derived from service responses.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The server returned a bad status code.
    #[error("service failed: {0}")]
    Status(StatusCode),

    /// The correlated response decoded to a different service than the
    /// caller expected.
    #[error("invalid response: got {got}, want {want}")]
    UnexpectedResponse {
        /// Service name actually received.
        got: &'static str,
        /// Service name the caller wanted.
        want: &'static str,
    },
}

impl ServiceError {
    /// Returns the status code; response-type mismatches map to
    /// `BadUnknownResponse`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status(code) => *code,
            Self::UnexpectedResponse { .. } => StatusCode::BAD_UNKNOWN_RESPONSE,
        }
    }
}

// =============================================================================
// ContractError
// =============================================================================

/// Local API misuse detected before any bytes hit the wire.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The channel is already connected.
    #[error("secure channel already connected")]
    AlreadyConnected,

    /// The channel is not open.
    #[error("secure channel not connected")]
    NotConnected,

    /// A monitored item call carried subscription id zero.
    #[error("subscription id invalid: must not be zero")]
    SubscriptionIdZero,

    /// An outbound message exceeds what the server accepts.
    #[error("request of {size} bytes exceeds the server limit of {limit}")]
    RequestTooLarge {
        /// Encoded request size.
        size: usize,
        /// Server limit.
        limit: u32,
    },

    /// Configuration rejected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// SecurityError
// =============================================================================

/// Security policy, key material and signature errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The policy URI is not one of the recognized policies.
    #[error("unsupported security policy '{0}'")]
    UnsupportedPolicy(String),

    /// The configured certificate or key could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The operation needs a private key but none is configured.
    #[error("no private key configured")]
    MissingPrivateKey,

    /// The operation needs a certificate but none is available.
    #[error("no certificate available")]
    MissingCertificate,

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Signing failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_fatal() {
        let err = ClientError::Transport(TransportError::Closed);
        assert!(err.is_fatal());
        assert_eq!(err.category(), "transport");
    }

    #[test]
    fn channel_closed_status_is_fatal() {
        let err = ClientError::status(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
        assert!(err.is_fatal());
        assert_eq!(err.status_code(), Some(StatusCode::BAD_SECURE_CHANNEL_CLOSED));
    }

    #[test]
    fn status_errors_surface_the_code() {
        let err = ClientError::status(StatusCode::BAD_SESSION_ID_INVALID);
        assert!(!err.is_fatal());
        assert_eq!(err.status_code(), Some(StatusCode::BAD_SESSION_ID_INVALID));
        assert!(err.to_string().contains("BadSessionIdInvalid"));
    }

    #[test]
    fn unexpected_response_names_both_types() {
        let err = ServiceError::UnexpectedResponse { got: "ReadResponse", want: "WriteResponse" };
        let text = err.to_string();
        assert!(text.contains("ReadResponse"));
        assert!(text.contains("WriteResponse"));
        assert_eq!(err.status_code(), StatusCode::BAD_UNKNOWN_RESPONSE);
    }

    #[test]
    fn contract_errors_are_local() {
        let err = ClientError::Contract(ContractError::SubscriptionIdZero);
        assert!(!err.is_fatal());
        assert_eq!(err.category(), "contract");
    }
}
