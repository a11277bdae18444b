// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request and response headers shared by every service.

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{DiagnosticInfo, ExtensionObject, NodeId, UaDateTime};
use crate::error::DecodingError;
use crate::status::StatusCode;

/// Common request header. The secure channel stamps the authentication
/// token, timestamp, handle and timeout hint immediately before sending.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader {
    /// Session authentication token; null outside a session.
    pub authentication_token: NodeId,
    /// Time the request was sent.
    pub timestamp: UaDateTime,
    /// Client-assigned handle echoed in the response header.
    pub request_handle: u32,
    /// Diagnostics requested from the server, as a bit mask.
    pub return_diagnostics: u32,
    /// Audit log correlation id.
    pub audit_entry_id: Option<String>,
    /// Processing timeout hint in milliseconds; 0 means no hint.
    pub timeout_hint: u32,
    /// Reserved extension point, always null today.
    pub additional_header: ExtensionObject,
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self {
            authentication_token: NodeId::null(),
            timestamp: UaDateTime::NULL,
            request_handle: 0,
            return_diagnostics: 0,
            audit_entry_id: None,
            timeout_hint: 0,
            additional_header: ExtensionObject::null(),
        }
    }
}

impl BinaryEncode for RequestHeader {
    fn encode(&self, w: &mut Encoder) {
        self.authentication_token.encode(w);
        self.timestamp.encode(w);
        w.write_u32(self.request_handle);
        w.write_u32(self.return_diagnostics);
        w.write_str(self.audit_entry_id.as_deref());
        w.write_u32(self.timeout_hint);
        self.additional_header.encode(w);
    }
}

impl BinaryDecode for RequestHeader {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            authentication_token: NodeId::decode(r)?,
            timestamp: UaDateTime::decode(r)?,
            request_handle: r.read_u32()?,
            return_diagnostics: r.read_u32()?,
            audit_entry_id: r.read_str()?,
            timeout_hint: r.read_u32()?,
            additional_header: ExtensionObject::decode(r)?,
        })
    }
}

/// Common response header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseHeader {
    /// Time the response was sent.
    pub timestamp: UaDateTime,
    /// Echo of the request handle.
    pub request_handle: u32,
    /// Overall service result.
    pub service_result: StatusCode,
    /// Diagnostics for the service result.
    pub service_diagnostics: DiagnosticInfo,
    /// String table referenced by diagnostic indices.
    pub string_table: Vec<String>,
    /// Reserved extension point.
    pub additional_header: ExtensionObject,
}

impl BinaryEncode for ResponseHeader {
    fn encode(&self, w: &mut Encoder) {
        self.timestamp.encode(w);
        w.write_u32(self.request_handle);
        w.write_u32(self.service_result.0);
        self.service_diagnostics.encode(w);
        w.write_str_array(&self.string_table);
        self.additional_header.encode(w);
    }
}

impl BinaryDecode for ResponseHeader {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            timestamp: UaDateTime::decode(r)?,
            request_handle: r.read_u32()?,
            service_result: StatusCode(r.read_u32()?),
            service_diagnostics: DiagnosticInfo::decode(r)?,
            string_table: r.read_str_array()?,
            additional_header: ExtensionObject::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header bytes as captured for the reference OpenSecureChannelRequest:
    /// null token, 2018-08-10T23:00:00Z, handle 1, all diagnostics, null
    /// audit id, no timeout hint, null additional header.
    const REFERENCE_REQUEST_HEADER: [u8; 29] = [
        0x00, 0x00, 0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01, 0x01, 0x00, 0x00, 0x00, 0xff,
        0x03, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    fn reference_header() -> RequestHeader {
        RequestHeader {
            timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
            request_handle: 1,
            return_diagnostics: 0x3ff,
            ..Default::default()
        }
    }

    #[test]
    fn request_header_reference_bytes() {
        let mut w = Encoder::new();
        reference_header().encode(&mut w);
        assert_eq!(w.into_bytes(), REFERENCE_REQUEST_HEADER);
    }

    #[test]
    fn request_header_round_trip() {
        let mut w = Encoder::new();
        reference_header().encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Decoder::new(&bytes);
        assert_eq!(RequestHeader::decode(&mut r).unwrap(), reference_header());
        assert!(r.is_exhausted());
    }

    #[test]
    fn response_header_with_string_table() {
        let header = ResponseHeader {
            timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
            request_handle: 1,
            service_result: StatusCode::GOOD,
            string_table: vec!["foo".into(), "bar".into()],
            ..Default::default()
        };
        let mut w = Encoder::new();
        header.encode(&mut w);
        let bytes = w.into_bytes();
        // Captured for the reference OpenSecureChannelResponse.
        let expected: &[u8] = &[
            0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x66, 0x6f, 0x6f,
            0x03, 0x00, 0x00, 0x00, 0x62, 0x61, 0x72, 0x00, 0x00, 0x00,
        ];
        assert_eq!(bytes, expected);

        let mut r = Decoder::new(&bytes);
        assert_eq!(ResponseHeader::decode(&mut r).unwrap(), header);
    }
}
