// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CreateSession, ActivateSession and CloseSession services.

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{DiagnosticInfo, ExtensionObject, NodeId};
use crate::error::DecodingError;
use crate::services::common::{
    ApplicationDescription, EndpointDescription, SignatureData, SignedSoftwareCertificate,
};
use crate::services::header::{RequestHeader, ResponseHeader};
use crate::status::StatusCode;

/// Creates a session. The session exists but is unusable until activated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSessionRequest {
    /// Common request header; the authentication token is always null here.
    pub request_header: RequestHeader,
    /// Description of this client.
    pub client_description: ApplicationDescription,
    /// URI of the server the client intends to reach.
    pub server_uri: Option<String>,
    /// Endpoint URL the client connected to.
    pub endpoint_url: Option<String>,
    /// Human-readable session name.
    pub session_name: Option<String>,
    /// 32-byte random client nonce.
    pub client_nonce: Option<Vec<u8>>,
    /// DER certificate of the client.
    pub client_certificate: Option<Vec<u8>>,
    /// Requested session timeout in milliseconds.
    pub requested_session_timeout: f64,
    /// Largest response the client accepts; 0 means no limit.
    pub max_response_message_size: u32,
}

impl BinaryEncode for CreateSessionRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        self.client_description.encode(w);
        w.write_str(self.server_uri.as_deref());
        w.write_str(self.endpoint_url.as_deref());
        w.write_str(self.session_name.as_deref());
        w.write_byte_string(self.client_nonce.as_deref());
        w.write_byte_string(self.client_certificate.as_deref());
        w.write_f64(self.requested_session_timeout);
        w.write_u32(self.max_response_message_size);
    }
}

impl BinaryDecode for CreateSessionRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            client_description: ApplicationDescription::decode(r)?,
            server_uri: r.read_str()?,
            endpoint_url: r.read_str()?,
            session_name: r.read_str()?,
            client_nonce: r.read_byte_string()?,
            client_certificate: r.read_byte_string()?,
            requested_session_timeout: r.read_f64()?,
            max_response_message_size: r.read_u32()?,
        })
    }
}

/// The created session's identifiers and activation material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSessionResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// Server-assigned session id.
    pub session_id: NodeId,
    /// Opaque token identifying the session on later requests.
    pub authentication_token: NodeId,
    /// Revised session timeout in milliseconds.
    pub revised_session_timeout: f64,
    /// Server nonce; input to the client signature on activation.
    pub server_nonce: Option<Vec<u8>>,
    /// DER certificate of the server.
    pub server_certificate: Option<Vec<u8>>,
    /// Endpoints, mirroring GetEndpoints for policy discovery.
    pub server_endpoints: Vec<EndpointDescription>,
    /// Software certificates; obsolete and unused.
    pub server_software_certificates: Vec<SignedSoftwareCertificate>,
    /// Server signature over client certificate and nonce.
    pub server_signature: SignatureData,
    /// Largest request the server accepts; 0 means no limit.
    pub max_request_message_size: u32,
}

impl BinaryEncode for CreateSessionResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        self.session_id.encode(w);
        self.authentication_token.encode(w);
        w.write_f64(self.revised_session_timeout);
        w.write_byte_string(self.server_nonce.as_deref());
        w.write_byte_string(self.server_certificate.as_deref());
        w.write_array(&self.server_endpoints);
        w.write_array(&self.server_software_certificates);
        self.server_signature.encode(w);
        w.write_u32(self.max_request_message_size);
    }
}

impl BinaryDecode for CreateSessionResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            session_id: NodeId::decode(r)?,
            authentication_token: NodeId::decode(r)?,
            revised_session_timeout: r.read_f64()?,
            server_nonce: r.read_byte_string()?,
            server_certificate: r.read_byte_string()?,
            server_endpoints: r.read_array()?,
            server_software_certificates: r.read_array()?,
            server_signature: SignatureData::decode(r)?,
            max_request_message_size: r.read_u32()?,
        })
    }
}

/// Activates a created session with the caller's identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivateSessionRequest {
    /// Common request header carrying the session's authentication token.
    pub request_header: RequestHeader,
    /// Client signature over server certificate and nonce.
    pub client_signature: SignatureData,
    /// Software certificates; obsolete and unused.
    pub client_software_certificates: Vec<SignedSoftwareCertificate>,
    /// Preferred locales in priority order.
    pub locale_ids: Vec<String>,
    /// The user identity token, wrapped in its extension object.
    pub user_identity_token: ExtensionObject,
    /// Signature produced with the user token's key, when applicable.
    pub user_token_signature: SignatureData,
}

impl BinaryEncode for ActivateSessionRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        self.client_signature.encode(w);
        w.write_array(&self.client_software_certificates);
        w.write_str_array(&self.locale_ids);
        self.user_identity_token.encode(w);
        self.user_token_signature.encode(w);
    }
}

impl BinaryDecode for ActivateSessionRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            client_signature: SignatureData::decode(r)?,
            client_software_certificates: r.read_array()?,
            locale_ids: r.read_str_array()?,
            user_identity_token: ExtensionObject::decode(r)?,
            user_token_signature: SignatureData::decode(r)?,
        })
    }
}

/// Result of session activation, carrying the next server nonce.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivateSessionResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// Fresh server nonce for the next activation signature.
    pub server_nonce: Option<Vec<u8>>,
    /// Per-software-certificate results.
    pub results: Vec<StatusCode>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for ActivateSessionResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_byte_string(self.server_nonce.as_deref());
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for ActivateSessionResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            server_nonce: r.read_byte_string()?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

/// Closes a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSessionRequest {
    /// Common request header carrying the session's authentication token.
    pub request_header: RequestHeader,
    /// Whether the server should delete the session's subscriptions.
    pub delete_subscriptions: bool,
}

impl BinaryEncode for CloseSessionRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_bool(self.delete_subscriptions);
    }
}

impl BinaryDecode for CloseSessionRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            delete_subscriptions: r.read_bool()?,
        })
    }
}

/// Acknowledgement of a session close.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSessionResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
}

impl BinaryEncode for CloseSessionResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
    }
}

impl BinaryDecode for CloseSessionResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { response_header: ResponseHeader::decode(r)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{LocalizedText, UaDateTime};
    use crate::services::common::ApplicationType;
    use crate::services::{IdentityTokenObject, Request, Response};

    const AUTH_TOKEN: [u8; 16] = [
        0x08, 0x22, 0x87, 0x62, 0xba, 0x81, 0xe1, 0x11, 0xa6, 0x43, 0xf8, 0x77, 0x7b, 0xc6, 0x2f,
        0xc8,
    ];

    #[test]
    fn create_session_request_reference_bytes() {
        let req = Request::CreateSession(CreateSessionRequest {
            request_header: RequestHeader {
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 1,
                return_diagnostics: 0x3ff,
                ..Default::default()
            },
            client_description: ApplicationDescription {
                application_uri: Some("app-uri".into()),
                product_uri: Some("prod-uri".into()),
                application_name: LocalizedText::text("app-name"),
                application_type: ApplicationType::Client,
                gateway_server_uri: None,
                discovery_profile_uri: None,
                discovery_urls: Vec::new(),
            },
            server_uri: Some("server-uri".into()),
            endpoint_url: Some("endpoint-url".into()),
            session_name: Some("session-name".into()),
            client_nonce: None,
            client_certificate: None,
            requested_session_timeout: 6_000_000.0,
            max_response_message_size: 65534,
        });

        // Reference capture, with the session timeout spliced in as the
        // IEEE-754 double encoding of 6,000,000 ms.
        let mut expected: Vec<u8> = vec![0x01, 0x00, 0xcd, 0x01];
        expected.extend_from_slice(&[
            0x00, 0x00, 0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01, 0x01, 0x00, 0x00, 0x00,
            0xff, 0x03, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00,
        ]);
        expected.extend_from_slice(&[
            0x07, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x2d, 0x75, 0x72, 0x69, // app-uri
            0x08, 0x00, 0x00, 0x00, 0x70, 0x72, 0x6f, 0x64, 0x2d, 0x75, 0x72, 0x69, // prod-uri
            0x02, 0x08, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x2d, 0x6e, 0x61, 0x6d, 0x65,
            0x01, 0x00, 0x00, 0x00, // application type: client
            0xff, 0xff, 0xff, 0xff, // gateway server uri: null
            0xff, 0xff, 0xff, 0xff, // discovery profile uri: null
            0x00, 0x00, 0x00, 0x00, // discovery urls: 0
        ]);
        expected.extend_from_slice(&[
            0x0a, 0x00, 0x00, 0x00, 0x73, 0x65, 0x72, 0x76, 0x65, 0x72, 0x2d, 0x75, 0x72, 0x69,
        ]);
        expected.extend_from_slice(&[
            0x0c, 0x00, 0x00, 0x00, 0x65, 0x6e, 0x64, 0x70, 0x6f, 0x69, 0x6e, 0x74, 0x2d, 0x75,
            0x72, 0x6c,
        ]);
        expected.extend_from_slice(&[
            0x0c, 0x00, 0x00, 0x00, 0x73, 0x65, 0x73, 0x73, 0x69, 0x6f, 0x6e, 0x2d, 0x6e, 0x61,
            0x6d, 0x65,
        ]);
        expected.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]); // client nonce
        expected.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]); // client certificate
        expected.extend_from_slice(&6_000_000f64.to_le_bytes());
        expected.extend_from_slice(&[0xfe, 0xff, 0x00, 0x00]); // max response size

        assert_eq!(req.encode(), expected);
        assert_eq!(Request::decode(&expected).unwrap(), req);
    }

    #[test]
    fn create_session_response_decodes_reference_values() {
        let res = Response::CreateSession(CreateSessionResponse {
            response_header: ResponseHeader {
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 1,
                ..Default::default()
            },
            session_id: NodeId::numeric(1, 1),
            authentication_token: NodeId::opaque(0, AUTH_TOKEN.to_vec()),
            revised_session_timeout: 6_000_000.0,
            server_nonce: None,
            server_certificate: None,
            server_endpoints: Vec::new(),
            server_software_certificates: Vec::new(),
            server_signature: SignatureData::default(),
            max_request_message_size: 65534,
        });

        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xd0, 0x01]);
        let Response::CreateSession(back) = Response::decode(&wire).unwrap() else {
            panic!("wrong response variant");
        };
        assert_eq!(back.session_id, NodeId::numeric(1, 1));
        assert_eq!(back.session_id.numeric_value(), Some(1));
        assert!(matches!(back.authentication_token, NodeId::Opaque { .. }));
        assert_eq!(back.revised_session_timeout, 6_000_000.0);
        assert_eq!(back.max_request_message_size, 65534);
    }

    #[test]
    fn activate_session_round_trip() {
        let token = IdentityTokenObject::Anonymous { policy_id: Some("Anonymous".into()) };
        let req = Request::ActivateSession(ActivateSessionRequest {
            request_header: RequestHeader {
                authentication_token: NodeId::opaque(0, AUTH_TOKEN.to_vec()),
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 2,
                ..Default::default()
            },
            client_signature: SignatureData {
                algorithm: Some("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256".into()),
                signature: Some(vec![0xaa; 32]),
            },
            client_software_certificates: Vec::new(),
            locale_ids: vec!["en-US".into()],
            user_identity_token: token.to_extension_object(),
            user_token_signature: SignatureData::default(),
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xd3, 0x01]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }

    #[test]
    fn activate_session_response_round_trip() {
        let res = Response::ActivateSession(ActivateSessionResponse {
            response_header: ResponseHeader::default(),
            server_nonce: Some(vec![0x11; 32]),
            results: vec![StatusCode::GOOD],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xd6, 0x01]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }

    #[test]
    fn close_session_delete_subscriptions_is_final_byte() {
        let req = Request::CloseSession(CloseSessionRequest {
            request_header: RequestHeader {
                authentication_token: NodeId::opaque(0, AUTH_TOKEN.to_vec()),
                timestamp: UaDateTime(0x01D4_30FD_DD67_9800),
                request_handle: 1,
                return_diagnostics: 0x3ff,
                ..Default::default()
            },
            delete_subscriptions: true,
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xd9, 0x01]);
        assert_eq!(*wire.last().unwrap(), 0x01);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }
}
