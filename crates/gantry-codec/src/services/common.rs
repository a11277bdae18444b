// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Structures shared between several services: application and endpoint
//! descriptions, user token policies, signatures, security tokens and the
//! user identity tokens.

use serde::{Deserialize, Serialize};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{ExtensionObject, LocalizedText, UaDateTime};
use crate::error::DecodingError;
use crate::services::ids;

// =============================================================================
// ApplicationDescription
// =============================================================================

/// The kind of application an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    /// A server.
    #[default]
    Server,
    /// A client.
    Client,
    /// Both client and server.
    ClientAndServer,
    /// A discovery server.
    DiscoveryServer,
}

impl ApplicationType {
    fn from_u32(v: u32) -> Self {
        match v {
            1 => Self::Client,
            2 => Self::ClientAndServer,
            3 => Self::DiscoveryServer,
            _ => Self::Server,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Self::Server => 0,
            Self::Client => 1,
            Self::ClientAndServer => 2,
            Self::DiscoveryServer => 3,
        }
    }
}

/// Description of a client or server application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationDescription {
    /// Globally unique application URI.
    pub application_uri: Option<String>,
    /// Product URI.
    pub product_uri: Option<String>,
    /// Human-readable name.
    pub application_name: LocalizedText,
    /// Application kind.
    pub application_type: ApplicationType,
    /// Gateway URI when reached through a gateway server.
    pub gateway_server_uri: Option<String>,
    /// Discovery profile URI.
    pub discovery_profile_uri: Option<String>,
    /// Discovery endpoints of the application.
    pub discovery_urls: Vec<String>,
}

impl BinaryEncode for ApplicationDescription {
    fn encode(&self, w: &mut Encoder) {
        w.write_str(self.application_uri.as_deref());
        w.write_str(self.product_uri.as_deref());
        self.application_name.encode(w);
        w.write_u32(self.application_type.as_u32());
        w.write_str(self.gateway_server_uri.as_deref());
        w.write_str(self.discovery_profile_uri.as_deref());
        w.write_str_array(&self.discovery_urls);
    }
}

impl BinaryDecode for ApplicationDescription {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            application_uri: r.read_str()?,
            product_uri: r.read_str()?,
            application_name: LocalizedText::decode(r)?,
            application_type: ApplicationType::from_u32(r.read_u32()?),
            gateway_server_uri: r.read_str()?,
            discovery_profile_uri: r.read_str()?,
            discovery_urls: r.read_str_array()?,
        })
    }
}

// =============================================================================
// UserTokenPolicy
// =============================================================================

/// The kind of user identity a token policy accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTokenType {
    /// No credentials.
    #[default]
    Anonymous,
    /// User name and password.
    UserName,
    /// X.509 certificate.
    Certificate,
    /// Token issued by an external authority.
    IssuedToken,
}

impl UserTokenType {
    fn from_u32(v: u32) -> Self {
        match v {
            1 => Self::UserName,
            2 => Self::Certificate,
            3 => Self::IssuedToken,
            _ => Self::Anonymous,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Self::Anonymous => 0,
            Self::UserName => 1,
            Self::Certificate => 2,
            Self::IssuedToken => 3,
        }
    }
}

/// A user identity token policy advertised by an endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserTokenPolicy {
    /// Server-assigned policy id, echoed in identity tokens.
    pub policy_id: Option<String>,
    /// Accepted token type.
    pub token_type: UserTokenType,
    /// Token type URI for issued tokens.
    pub issued_token_type: Option<String>,
    /// Issuer endpoint for issued tokens.
    pub issuer_endpoint_url: Option<String>,
    /// Security policy for securing the token; empty means the endpoint's.
    pub security_policy_uri: Option<String>,
}

impl BinaryEncode for UserTokenPolicy {
    fn encode(&self, w: &mut Encoder) {
        w.write_str(self.policy_id.as_deref());
        w.write_u32(self.token_type.as_u32());
        w.write_str(self.issued_token_type.as_deref());
        w.write_str(self.issuer_endpoint_url.as_deref());
        w.write_str(self.security_policy_uri.as_deref());
    }
}

impl BinaryDecode for UserTokenPolicy {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            policy_id: r.read_str()?,
            token_type: UserTokenType::from_u32(r.read_u32()?),
            issued_token_type: r.read_str()?,
            issuer_endpoint_url: r.read_str()?,
            security_policy_uri: r.read_str()?,
        })
    }
}

// =============================================================================
// EndpointDescription
// =============================================================================

/// Description of a server endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndpointDescription {
    /// The endpoint URL.
    pub endpoint_url: Option<String>,
    /// The server behind the endpoint.
    pub server: ApplicationDescription,
    /// DER certificate of the server instance.
    pub server_certificate: Option<Vec<u8>>,
    /// Security mode, encoded as the MessageSecurityMode enumeration.
    pub security_mode: u32,
    /// Security policy URI.
    pub security_policy_uri: Option<String>,
    /// Accepted user identity token policies.
    pub user_identity_tokens: Vec<UserTokenPolicy>,
    /// Transport profile URI.
    pub transport_profile_uri: Option<String>,
    /// Relative security level assigned by the server.
    pub security_level: u8,
}

impl BinaryEncode for EndpointDescription {
    fn encode(&self, w: &mut Encoder) {
        w.write_str(self.endpoint_url.as_deref());
        self.server.encode(w);
        w.write_byte_string(self.server_certificate.as_deref());
        w.write_u32(self.security_mode);
        w.write_str(self.security_policy_uri.as_deref());
        w.write_array(&self.user_identity_tokens);
        w.write_str(self.transport_profile_uri.as_deref());
        w.write_u8(self.security_level);
    }
}

impl BinaryDecode for EndpointDescription {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            endpoint_url: r.read_str()?,
            server: ApplicationDescription::decode(r)?,
            server_certificate: r.read_byte_string()?,
            security_mode: r.read_u32()?,
            security_policy_uri: r.read_str()?,
            user_identity_tokens: r.read_array()?,
            transport_profile_uri: r.read_str()?,
            security_level: r.read_u8()?,
        })
    }
}

// =============================================================================
// SignatureData / ChannelSecurityToken
// =============================================================================

/// A signature plus the URI of the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureData {
    /// Algorithm URI.
    pub algorithm: Option<String>,
    /// Signature bytes.
    pub signature: Option<Vec<u8>>,
}

impl SignatureData {
    /// Returns `true` when both fields are absent.
    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none() && self.signature.is_none()
    }
}

impl BinaryEncode for SignatureData {
    fn encode(&self, w: &mut Encoder) {
        w.write_str(self.algorithm.as_deref());
        w.write_byte_string(self.signature.as_deref());
    }
}

impl BinaryDecode for SignatureData {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { algorithm: r.read_str()?, signature: r.read_byte_string()? })
    }
}

/// A software certificate with its signature. Obsolete in practice; the
/// arrays carrying it are always empty on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignedSoftwareCertificate {
    /// Encoded certificate.
    pub certificate_data: Option<Vec<u8>>,
    /// Signature over the certificate.
    pub signature: Option<Vec<u8>>,
}

impl BinaryEncode for SignedSoftwareCertificate {
    fn encode(&self, w: &mut Encoder) {
        w.write_byte_string(self.certificate_data.as_deref());
        w.write_byte_string(self.signature.as_deref());
    }
}

impl BinaryDecode for SignedSoftwareCertificate {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            certificate_data: r.read_byte_string()?,
            signature: r.read_byte_string()?,
        })
    }
}

/// The security token issued by OpenSecureChannel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSecurityToken {
    /// Server-assigned secure channel id.
    pub channel_id: u32,
    /// Token id used in the symmetric security header.
    pub token_id: u32,
    /// Server-side creation time.
    pub created_at: UaDateTime,
    /// Revised lifetime in milliseconds.
    pub revised_lifetime: u32,
}

impl BinaryEncode for ChannelSecurityToken {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.channel_id);
        w.write_u32(self.token_id);
        self.created_at.encode(w);
        w.write_u32(self.revised_lifetime);
    }
}

impl BinaryDecode for ChannelSecurityToken {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            channel_id: r.read_u32()?,
            token_id: r.read_u32()?,
            created_at: UaDateTime::decode(r)?,
            revised_lifetime: r.read_u32()?,
        })
    }
}

// =============================================================================
// Identity tokens
// =============================================================================

/// A user identity token in its wire form, carried inside an extension
/// object on ActivateSession.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityTokenObject {
    /// Anonymous token.
    Anonymous {
        /// Policy id from the endpoint's token policies.
        policy_id: Option<String>,
    },
    /// User name and password token. The password is encrypted per the
    /// endpoint's security policy before sending.
    UserName {
        /// Policy id.
        policy_id: Option<String>,
        /// The user name.
        user_name: Option<String>,
        /// The (possibly encrypted) password block.
        password: Option<Vec<u8>>,
        /// Encryption algorithm URI; empty for plaintext.
        encryption_algorithm: Option<String>,
    },
    /// X.509 certificate token.
    X509 {
        /// Policy id.
        policy_id: Option<String>,
        /// DER certificate.
        certificate_data: Option<Vec<u8>>,
    },
    /// Token issued by an external authority.
    Issued {
        /// Policy id.
        policy_id: Option<String>,
        /// Opaque token bytes.
        token_data: Option<Vec<u8>>,
        /// Encryption algorithm URI.
        encryption_algorithm: Option<String>,
    },
}

impl IdentityTokenObject {
    /// Returns the policy id.
    pub fn policy_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous { policy_id }
            | Self::UserName { policy_id, .. }
            | Self::X509 { policy_id, .. }
            | Self::Issued { policy_id, .. } => policy_id.as_deref(),
        }
    }

    /// Wraps the token in its binary extension object.
    pub fn to_extension_object(&self) -> ExtensionObject {
        let mut body = Encoder::new();
        let type_id = match self {
            Self::Anonymous { policy_id } => {
                body.write_str(policy_id.as_deref());
                ids::ANONYMOUS_IDENTITY_TOKEN
            }
            Self::UserName { policy_id, user_name, password, encryption_algorithm } => {
                body.write_str(policy_id.as_deref());
                body.write_str(user_name.as_deref());
                body.write_byte_string(password.as_deref());
                body.write_str(encryption_algorithm.as_deref());
                ids::USER_NAME_IDENTITY_TOKEN
            }
            Self::X509 { policy_id, certificate_data } => {
                body.write_str(policy_id.as_deref());
                body.write_byte_string(certificate_data.as_deref());
                ids::X509_IDENTITY_TOKEN
            }
            Self::Issued { policy_id, token_data, encryption_algorithm } => {
                body.write_str(policy_id.as_deref());
                body.write_byte_string(token_data.as_deref());
                body.write_str(encryption_algorithm.as_deref());
                ids::ISSUED_IDENTITY_TOKEN
            }
        };
        ExtensionObject::binary(type_id, body.into_bytes())
    }

    /// Extracts a token from its extension object form.
    pub fn from_extension_object(obj: &ExtensionObject) -> Result<Self, DecodingError> {
        let identifier = obj.type_id.numeric_value().ok_or(DecodingError::NonNumericServiceId)?;
        let body = obj.binary_body().unwrap_or_default();
        let mut r = Decoder::new(body);
        let out = match identifier {
            id if id == u32::from(ids::ANONYMOUS_IDENTITY_TOKEN) => {
                Self::Anonymous { policy_id: r.read_str()? }
            }
            id if id == u32::from(ids::USER_NAME_IDENTITY_TOKEN) => Self::UserName {
                policy_id: r.read_str()?,
                user_name: r.read_str()?,
                password: r.read_byte_string()?,
                encryption_algorithm: r.read_str()?,
            },
            id if id == u32::from(ids::X509_IDENTITY_TOKEN) => {
                Self::X509 { policy_id: r.read_str()?, certificate_data: r.read_byte_string()? }
            }
            id if id == u32::from(ids::ISSUED_IDENTITY_TOKEN) => Self::Issued {
                policy_id: r.read_str()?,
                token_data: r.read_byte_string()?,
                encryption_algorithm: r.read_str()?,
            },
            identifier => {
                return Err(DecodingError::UnknownServiceId {
                    namespace: obj.type_id.node_id.namespace(),
                    identifier,
                })
            }
        };
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_security_token_reference_bytes() {
        let token = ChannelSecurityToken {
            channel_id: 1,
            token_id: 2,
            created_at: UaDateTime(0x01D4_30FD_DD67_9800),
            revised_lifetime: 6_000_000,
        };
        let mut w = Encoder::new();
        token.encode(&mut w);
        let expected: &[u8] = &[
            0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30,
            0xd4, 0x01, 0x80, 0x8d, 0x5b, 0x00,
        ];
        assert_eq!(w.into_bytes(), expected);
    }

    #[test]
    fn user_token_policy_round_trip() {
        let policy = UserTokenPolicy {
            policy_id: Some("1".into()),
            token_type: UserTokenType::Anonymous,
            issued_token_type: Some("issued-token".into()),
            issuer_endpoint_url: Some("issuer-uri".into()),
            security_policy_uri: Some("sec-uri".into()),
        };
        let mut w = Encoder::new();
        policy.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Decoder::new(&bytes);
        assert_eq!(UserTokenPolicy::decode(&mut r).unwrap(), policy);
    }

    #[test]
    fn identity_token_extension_round_trip() {
        let tokens = [
            IdentityTokenObject::Anonymous { policy_id: Some("Anonymous".into()) },
            IdentityTokenObject::UserName {
                policy_id: Some("username".into()),
                user_name: Some("operator".into()),
                password: Some(b"secret".to_vec()),
                encryption_algorithm: None,
            },
            IdentityTokenObject::X509 {
                policy_id: Some("certificate".into()),
                certificate_data: Some(vec![0x30, 0x82]),
            },
            IdentityTokenObject::Issued {
                policy_id: Some("issued".into()),
                token_data: Some(vec![1, 2, 3]),
                encryption_algorithm: None,
            },
        ];
        for token in tokens {
            let obj = token.to_extension_object();
            let back = IdentityTokenObject::from_extension_object(&obj).unwrap();
            assert_eq!(token, back);
        }
    }

    #[test]
    fn anonymous_token_type_id() {
        let obj =
            IdentityTokenObject::Anonymous { policy_id: Some("0".into()) }.to_extension_object();
        assert_eq!(obj.type_id.numeric_value(), Some(321));
    }
}
