// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Security policies and the asymmetric operations the channel needs.
//!
//! Only the algorithmic contracts live here: which digest and padding a
//! policy uses for signatures, how the user password block is assembled
//! and encrypted, and how nonces and thumbprints are produced. Symmetric
//! message protection under Sign/SignAndEncrypt derives from the same
//! policies but is negotiated per token by the channel.

use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use gantry_codec::services::MessageSecurityMode;

use crate::config::ChannelConfig;
use crate::error::{ClientResult, SecurityError};

// =============================================================================
// Policy and mode
// =============================================================================

/// URI prefix shared by all security policies.
const POLICY_URI_PREFIX: &str = "http://opcfoundation.org/UA/SecurityPolicy#";

/// Signature algorithm URIs.
const ALG_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
const ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Encryption algorithm URIs.
const ALG_RSA_15: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
const ALG_RSA_OAEP: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep";

/// The security policies the client recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No signing or encryption.
    #[default]
    None,
    /// RSA PKCS#1 v1.5 with SHA-1.
    Basic128Rsa15,
    /// RSA OAEP with SHA-1 signatures.
    Basic256,
    /// RSA OAEP with SHA-256 signatures.
    Basic256Sha256,
}

impl SecurityPolicy {
    /// Returns the policy URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
        }
    }

    /// Parses a policy URI. An empty URI means the channel's policy and
    /// returns `None` here.
    pub fn from_uri(uri: &str) -> Result<Self, SecurityError> {
        match uri.strip_prefix(POLICY_URI_PREFIX) {
            Some("None") => Ok(Self::None),
            Some("Basic128Rsa15") => Ok(Self::Basic128Rsa15),
            Some("Basic256") => Ok(Self::Basic256),
            Some("Basic256Sha256") => Ok(Self::Basic256Sha256),
            _ => Err(SecurityError::UnsupportedPolicy(uri.to_owned())),
        }
    }

    /// Returns the signature algorithm URI, or `None` for the null policy.
    pub fn signature_algorithm(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Basic128Rsa15 | Self::Basic256 => Some(ALG_RSA_SHA1),
            Self::Basic256Sha256 => Some(ALG_RSA_SHA256),
        }
    }

    /// Returns the asymmetric encryption algorithm URI, or `None` for the
    /// null policy.
    pub fn encryption_algorithm(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Basic128Rsa15 => Some(ALG_RSA_15),
            Self::Basic256 | Self::Basic256Sha256 => Some(ALG_RSA_OAEP),
        }
    }
}

impl std::fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// Message security mode of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No message protection.
    #[default]
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Converts to the wire enumeration.
    pub fn to_message_security_mode(self) -> MessageSecurityMode {
        match self {
            Self::None => MessageSecurityMode::None,
            Self::Sign => MessageSecurityMode::Sign,
            Self::SignAndEncrypt => MessageSecurityMode::SignAndEncrypt,
        }
    }
}

// =============================================================================
// Primitives
// =============================================================================

/// Generates a 32-byte nonce from the operating system's entropy source.
pub fn generate_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Returns the SHA-1 thumbprint of a DER certificate.
pub fn certificate_thumbprint(der: &[u8]) -> Vec<u8> {
    Sha1::digest(der).to_vec()
}

fn public_key_of(certificate_der: &[u8]) -> Result<RsaPublicKey, SecurityError> {
    let cert = Certificate::from_der(certificate_der)
        .map_err(|e| SecurityError::InvalidKeyMaterial(format!("certificate: {e}")))?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| SecurityError::InvalidKeyMaterial(format!("public key info: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| SecurityError::InvalidKeyMaterial(format!("public key: {e}")))
}

fn private_key_of(der: &[u8]) -> Result<RsaPrivateKey, SecurityError> {
    RsaPrivateKey::from_pkcs8_der(der)
        .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
        .map_err(|e| SecurityError::InvalidKeyMaterial(format!("private key: {e}")))
}

fn sign_with(
    policy: SecurityPolicy,
    key: &RsaPrivateKey,
    data: &[u8],
) -> Result<Vec<u8>, SecurityError> {
    let result = match policy {
        SecurityPolicy::None => return Ok(Vec::new()),
        SecurityPolicy::Basic128Rsa15 | SecurityPolicy::Basic256 => {
            key.sign(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data))
        }
        SecurityPolicy::Basic256Sha256 => {
            key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data))
        }
    };
    result.map_err(|e| SecurityError::SigningFailed(e.to_string()))
}

fn verify_with(
    policy: SecurityPolicy,
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<(), SecurityError> {
    let result = match policy {
        SecurityPolicy::None => return Ok(()),
        SecurityPolicy::Basic128Rsa15 | SecurityPolicy::Basic256 => {
            key.verify(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data), signature)
        }
        SecurityPolicy::Basic256Sha256 => {
            key.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data), signature)
        }
    };
    result.map_err(|_| SecurityError::SignatureInvalid)
}

fn encrypt_blocks(
    policy: SecurityPolicy,
    key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, SecurityError> {
    // The padding overhead bounds the plaintext per RSA block.
    let overhead = match policy {
        SecurityPolicy::None => return Ok(plaintext.to_vec()),
        SecurityPolicy::Basic128Rsa15 => 11,
        SecurityPolicy::Basic256 | SecurityPolicy::Basic256Sha256 => 2 * Sha1::output_size() + 2,
    };
    let block_size = key.size().saturating_sub(overhead);
    if block_size == 0 {
        return Err(SecurityError::EncryptionFailed("key too small".to_owned()));
    }

    let mut out = Vec::with_capacity(plaintext.len() + key.size());
    for chunk in plaintext.chunks(block_size) {
        let encrypted = match policy {
            SecurityPolicy::Basic128Rsa15 => key.encrypt(&mut OsRng, Pkcs1v15Encrypt, chunk),
            _ => key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), chunk),
        }
        .map_err(|e| SecurityError::EncryptionFailed(e.to_string()))?;
        out.extend_from_slice(&encrypted);
    }
    Ok(out)
}

// =============================================================================
// ChannelSecurity
// =============================================================================

/// The channel's view of its security configuration: the policy plus the
/// parsed local key material.
#[derive(Debug)]
pub(crate) struct ChannelSecurity {
    policy: SecurityPolicy,
    certificate: Option<Vec<u8>>,
    private_key: Option<RsaPrivateKey>,
}

impl ChannelSecurity {
    /// Parses the configured key material once at channel creation.
    pub(crate) fn from_config(config: &ChannelConfig) -> ClientResult<Self> {
        let private_key = match &config.private_key {
            Some(der) => Some(private_key_of(der)?),
            None => None,
        };
        Ok(Self {
            policy: config.security_policy,
            certificate: config.certificate.clone(),
            private_key,
        })
    }

    /// Returns the channel's security policy.
    pub(crate) fn policy(&self) -> SecurityPolicy {
        self.policy
    }

    /// Returns the local DER certificate, if configured.
    pub(crate) fn certificate(&self) -> Option<&[u8]> {
        self.certificate.as_deref()
    }

    /// Verifies the server's session signature over
    /// `client_certificate || client_nonce` with the server certificate's
    /// public key.
    pub(crate) fn verify_session_signature(
        &self,
        server_certificate: &[u8],
        client_nonce: &[u8],
        signature: &[u8],
    ) -> Result<(), SecurityError> {
        if self.policy == SecurityPolicy::None {
            return Ok(());
        }
        let key = public_key_of(server_certificate)?;
        let mut data = self.certificate.clone().unwrap_or_default();
        data.extend_from_slice(client_nonce);
        verify_with(self.policy, &key, &data, signature)
    }

    /// Signs `server_certificate || server_nonce` with the channel's
    /// private key. Returns the signature and its algorithm URI; both are
    /// empty under the null policy.
    pub(crate) fn new_session_signature(
        &self,
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        if self.policy == SecurityPolicy::None {
            return Ok((Vec::new(), None));
        }
        let key = self.private_key.as_ref().ok_or(SecurityError::MissingPrivateKey)?;
        let mut data = server_certificate.to_vec();
        data.extend_from_slice(server_nonce);
        let signature = sign_with(self.policy, key, &data)?;
        Ok((signature, self.policy.signature_algorithm()))
    }

    /// Encrypts a user password per the token policy. The plaintext block
    /// is the length-prefixed concatenation of password and server nonce;
    /// under the null policy the password passes through unchanged.
    pub(crate) fn encrypt_user_password(
        &self,
        policy_uri: &str,
        password: &[u8],
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        let policy = self.token_policy(policy_uri)?;
        if policy == SecurityPolicy::None {
            return Ok((password.to_vec(), None));
        }
        let key = public_key_of(server_certificate)?;

        let secret_len = password.len() + server_nonce.len();
        let mut plaintext = Vec::with_capacity(4 + secret_len);
        plaintext.extend_from_slice(&(secret_len as u32).to_le_bytes());
        plaintext.extend_from_slice(password);
        plaintext.extend_from_slice(server_nonce);

        let ciphertext = encrypt_blocks(policy, &key, &plaintext)?;
        Ok((ciphertext, policy.encryption_algorithm()))
    }

    /// Signs `server_certificate || server_nonce` with the user identity's
    /// private key for an X.509 token.
    pub(crate) fn new_user_token_signature(
        &self,
        policy_uri: &str,
        user_key_der: &[u8],
        server_certificate: &[u8],
        server_nonce: &[u8],
    ) -> Result<(Vec<u8>, Option<&'static str>), SecurityError> {
        let policy = self.token_policy(policy_uri)?;
        if policy == SecurityPolicy::None {
            return Ok((Vec::new(), None));
        }
        let key = private_key_of(user_key_der)?;
        let mut data = server_certificate.to_vec();
        data.extend_from_slice(server_nonce);
        let signature = sign_with(policy, &key, &data)?;
        Ok((signature, policy.signature_algorithm()))
    }

    /// Resolves a token policy URI; empty falls back to the channel's
    /// policy.
    fn token_policy(&self, policy_uri: &str) -> Result<SecurityPolicy, SecurityError> {
        if policy_uri.is_empty() {
            Ok(self.policy)
        } else {
            SecurityPolicy::from_uri(policy_uri)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_uri_round_trip() {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic128Rsa15,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
        ] {
            assert_eq!(SecurityPolicy::from_uri(policy.uri()).unwrap(), policy);
        }
        assert!(SecurityPolicy::from_uri("http://example.com/NotAPolicy").is_err());
    }

    #[test]
    fn null_policy_has_no_algorithms() {
        assert_eq!(SecurityPolicy::None.signature_algorithm(), None);
        assert_eq!(SecurityPolicy::None.encryption_algorithm(), None);
        assert_eq!(
            SecurityPolicy::Basic256Sha256.signature_algorithm(),
            Some("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256")
        );
    }

    #[test]
    fn nonce_is_32_random_bytes() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn thumbprint_is_sha1() {
        // SHA-1 of the empty input.
        let expected = [
            0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60,
            0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09,
        ];
        assert_eq!(certificate_thumbprint(&[]), expected);
    }

    #[test]
    fn null_policy_passes_password_through() {
        let security = ChannelSecurity::from_config(&ChannelConfig::default()).unwrap();
        let (block, algorithm) =
            security.encrypt_user_password("", b"secret", &[], &[0x01, 0x02]).unwrap();
        assert_eq!(block, b"secret");
        assert_eq!(algorithm, None);
    }

    #[test]
    fn null_policy_session_signature_is_empty() {
        let security = ChannelSecurity::from_config(&ChannelConfig::default()).unwrap();
        let (signature, algorithm) = security.new_session_signature(&[], &[]).unwrap();
        assert!(signature.is_empty());
        assert_eq!(algorithm, None);
        security.verify_session_signature(&[], &[], &[]).unwrap();
    }

    #[test]
    fn password_block_encrypts_and_decrypts() {
        let key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public = RsaPublicKey::from(&key);

        let password = b"correct horse";
        let nonce = [0xAB; 32];
        let secret_len = password.len() + nonce.len();
        let mut plaintext = Vec::new();
        plaintext.extend_from_slice(&(secret_len as u32).to_le_bytes());
        plaintext.extend_from_slice(password);
        plaintext.extend_from_slice(&nonce);

        let ciphertext =
            encrypt_blocks(SecurityPolicy::Basic256Sha256, &public, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), 256);

        let decrypted = key.decrypt(Oaep::new::<Sha1>(), &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn sign_verify_round_trip() {
        let key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public = RsaPublicKey::from(&key);
        let data = b"server-cert-and-nonce";

        for policy in [SecurityPolicy::Basic128Rsa15, SecurityPolicy::Basic256Sha256] {
            let signature = sign_with(policy, &key, data).unwrap();
            verify_with(policy, &public, data, &signature).unwrap();
            assert!(verify_with(policy, &public, b"tampered", &signature).is_err());
        }
    }
}
