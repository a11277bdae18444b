// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OpenSecureChannel and CloseSecureChannel services.

use serde::{Deserialize, Serialize};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::error::DecodingError;
use crate::services::common::ChannelSecurityToken;
use crate::services::header::{RequestHeader, ResponseHeader};

/// Whether an OpenSecureChannel request issues a new token or renews the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityTokenRequestType {
    /// Issue the first token of a channel.
    #[default]
    Issue,
    /// Renew the token of an open channel.
    Renew,
}

impl SecurityTokenRequestType {
    fn from_u32(v: u32) -> Self {
        if v == 1 {
            Self::Renew
        } else {
            Self::Issue
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Self::Issue => 0,
            Self::Renew => 1,
        }
    }
}

/// Message security mode of a channel or endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSecurityMode {
    /// Invalid or unknown mode.
    Invalid,
    /// No signing or encryption.
    #[default]
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl MessageSecurityMode {
    /// Converts from the wire enumeration.
    pub fn from_u32(v: u32) -> Self {
        match v {
            1 => Self::None,
            2 => Self::Sign,
            3 => Self::SignAndEncrypt,
            _ => Self::Invalid,
        }
    }

    /// Converts to the wire enumeration.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::None => 1,
            Self::Sign => 2,
            Self::SignAndEncrypt => 3,
        }
    }
}

/// Opens a secure channel or renews its token.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSecureChannelRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// Client protocol version, 0 today.
    pub client_protocol_version: u32,
    /// Issue or renew.
    pub request_type: SecurityTokenRequestType,
    /// Requested message security mode.
    pub security_mode: MessageSecurityMode,
    /// Client nonce for symmetric key derivation; null under policy None.
    pub client_nonce: Option<Vec<u8>>,
    /// Requested token lifetime in milliseconds.
    pub requested_lifetime: u32,
}

impl BinaryEncode for OpenSecureChannelRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_u32(self.client_protocol_version);
        w.write_u32(self.request_type.as_u32());
        w.write_u32(self.security_mode.as_u32());
        w.write_byte_string(self.client_nonce.as_deref());
        w.write_u32(self.requested_lifetime);
    }
}

impl BinaryDecode for OpenSecureChannelRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            client_protocol_version: r.read_u32()?,
            request_type: SecurityTokenRequestType::from_u32(r.read_u32()?),
            security_mode: MessageSecurityMode::from_u32(r.read_u32()?),
            client_nonce: r.read_byte_string()?,
            requested_lifetime: r.read_u32()?,
        })
    }
}

/// Response carrying the issued or renewed security token.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenSecureChannelResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// Server protocol version.
    pub server_protocol_version: u32,
    /// The issued token.
    pub security_token: ChannelSecurityToken,
    /// Server nonce for symmetric key derivation.
    pub server_nonce: Option<Vec<u8>>,
}

impl BinaryEncode for OpenSecureChannelResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_u32(self.server_protocol_version);
        self.security_token.encode(w);
        w.write_byte_string(self.server_nonce.as_deref());
    }
}

impl BinaryDecode for OpenSecureChannelResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            server_protocol_version: r.read_u32()?,
            security_token: ChannelSecurityToken::decode(r)?,
            server_nonce: r.read_byte_string()?,
        })
    }
}

/// Closes the secure channel. Sent best-effort; no response is awaited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The channel being closed.
    pub secure_channel_id: u32,
}

impl BinaryEncode for CloseSecureChannelRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_u32(self.secure_channel_id);
    }
}

impl BinaryDecode for CloseSecureChannelRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            secure_channel_id: r.read_u32()?,
        })
    }
}

/// Acknowledgement of a channel close.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
}

impl BinaryEncode for CloseSecureChannelResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
    }
}

impl BinaryDecode for CloseSecureChannelResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { response_header: ResponseHeader::decode(r)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::UaDateTime;
    use crate::services::{Request, Response};
    use crate::status::StatusCode;

    /// Reference capture: OpenSecureChannelRequest at 2018-08-10T23:00:00Z,
    /// handle 1, Issue, mode None, null nonce, lifetime 6,000,000 ms.
    const OPEN_REQUEST: &[u8] = &[
        0x01, 0x00, 0xbe, 0x01, // type id
        0x00, 0x00, 0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01, 0x01, 0x00, 0x00, 0x00, 0xff,
        0x03, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, // client protocol version
        0x00, 0x00, 0x00, 0x00, // request type: issue
        0x01, 0x00, 0x00, 0x00, // security mode: none
        0xff, 0xff, 0xff, 0xff, // client nonce: null
        0x80, 0x8d, 0x5b, 0x00, // requested lifetime
    ];

    const OPEN_RESPONSE: &[u8] = &[
        0x01, 0x00, 0xc1, 0x01, // type id
        0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x66, 0x6f, 0x6f, 0x03, 0x00,
        0x00, 0x00, 0x62, 0x61, 0x72, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, // server protocol version
        0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4,
        0x01, 0x80, 0x8d, 0x5b, 0x00, // security token
        0x01, 0x00, 0x00, 0x00, 0xff, // server nonce [0xff]
    ];

    fn open_request() -> Request {
        Request::OpenSecureChannel(OpenSecureChannelRequest {
            request_header: RequestHeader {
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 1,
                return_diagnostics: 0x3ff,
                ..Default::default()
            },
            client_protocol_version: 0,
            request_type: SecurityTokenRequestType::Issue,
            security_mode: MessageSecurityMode::None,
            client_nonce: None,
            requested_lifetime: 6_000_000,
        })
    }

    #[test]
    fn open_request_reference_bytes() {
        let wire = open_request().encode();
        assert_eq!(wire, OPEN_REQUEST);
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xbe, 0x01]);
        assert_eq!(&wire[wire.len() - 4..], &[0x80, 0x8d, 0x5b, 0x00]);
    }

    #[test]
    fn open_request_round_trip() {
        let decoded = Request::decode(OPEN_REQUEST).unwrap();
        assert_eq!(decoded, open_request());
    }

    #[test]
    fn open_response_reference_round_trip() {
        let decoded = Response::decode(OPEN_RESPONSE).unwrap();
        let Response::OpenSecureChannel(res) = &decoded else {
            panic!("wrong response variant: {}", decoded.service_name());
        };
        assert_eq!(res.response_header.service_result, StatusCode::GOOD);
        assert_eq!(res.security_token.channel_id, 1);
        assert_eq!(res.security_token.token_id, 2);
        assert_eq!(res.security_token.revised_lifetime, 6_000_000);
        assert_eq!(res.server_nonce.as_deref(), Some(&[0xff][..]));

        assert_eq!(decoded.encode(), OPEN_RESPONSE);
    }

    #[test]
    fn close_request_reference_bytes() {
        let req = Request::CloseSecureChannel(CloseSecureChannelRequest {
            request_header: RequestHeader {
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 1,
                return_diagnostics: 0x3ff,
                ..Default::default()
            },
            secure_channel_id: 1,
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xc4, 0x01]);
        assert_eq!(&wire[wire.len() - 4..], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }
}
