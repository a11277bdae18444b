// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Channel and session configuration.
//!
//! Both configurations are built through builders that validate at
//! `build()` time, so an invalid combination never reaches the wire.

use std::time::Duration;

use gantry_codec::services::{ApplicationDescription, ApplicationType};
use gantry_codec::LocalizedText;

use crate::error::{ClientError, ContractError};
use crate::security::{SecurityMode, SecurityPolicy};

// =============================================================================
// SignatureVerification
// =============================================================================

/// Policy for handling a failed server signature check during session
/// creation.
///
/// Some field servers produce signatures that fail verification and still
/// activate sessions correctly afterwards. `Lenient` accommodates them by
/// logging and continuing; `Strict` fails session creation and is the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureVerification {
    /// Fail session creation on a bad server signature.
    #[default]
    Strict,
    /// Log a warning and continue.
    Lenient,
}

// =============================================================================
// ChannelConfig
// =============================================================================

/// Immutable per-channel parameters.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// DER certificate presented to the server.
    pub certificate: Option<Vec<u8>>,
    /// DER private key matching the certificate.
    pub private_key: Option<Vec<u8>>,
    /// Security policy of the channel.
    pub security_policy: SecurityPolicy,
    /// Message security mode.
    pub security_mode: SecurityMode,
    /// Requested token lifetime.
    pub requested_lifetime: Duration,
    /// Application URI sent in session requests.
    pub application_uri: String,
    /// Per-request timeout, also sent as the timeout hint.
    pub request_timeout: Duration,
    /// Server signature verification policy.
    pub signature_verification: SignatureVerification,
}

impl ChannelConfig {
    /// Returns a builder with the defaults: policy `None`, one hour token
    /// lifetime, ten second request timeout, strict verification.
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            certificate: None,
            private_key: None,
            security_policy: SecurityPolicy::None,
            security_mode: SecurityMode::None,
            requested_lifetime: Duration::from_secs(3600),
            application_uri: "urn:gantry:client".to_owned(),
            request_timeout: Duration::from_secs(10),
            signature_verification: SignatureVerification::Strict,
        }
    }
}

/// Builder for [`ChannelConfig`].
#[derive(Debug, Clone)]
pub struct ChannelConfigBuilder {
    certificate: Option<Vec<u8>>,
    private_key: Option<Vec<u8>>,
    security_policy: SecurityPolicy,
    security_mode: SecurityMode,
    requested_lifetime: Duration,
    application_uri: String,
    request_timeout: Duration,
    signature_verification: SignatureVerification,
}

impl Default for ChannelConfigBuilder {
    fn default() -> Self {
        Self {
            certificate: None,
            private_key: None,
            security_policy: SecurityPolicy::None,
            security_mode: SecurityMode::None,
            requested_lifetime: Duration::from_secs(3600),
            application_uri: "urn:gantry:client".to_owned(),
            request_timeout: Duration::from_secs(10),
            signature_verification: SignatureVerification::Strict,
        }
    }
}

impl ChannelConfigBuilder {
    /// Sets the DER client certificate.
    pub fn certificate(mut self, der: Vec<u8>) -> Self {
        self.certificate = Some(der);
        self
    }

    /// Sets the DER private key.
    pub fn private_key(mut self, der: Vec<u8>) -> Self {
        self.private_key = Some(der);
        self
    }

    /// Sets the security policy.
    pub fn security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy = policy;
        self
    }

    /// Sets the security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Sets the requested token lifetime.
    pub fn requested_lifetime(mut self, lifetime: Duration) -> Self {
        self.requested_lifetime = lifetime;
        self
    }

    /// Sets the application URI.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.application_uri = uri.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the server signature verification policy.
    pub fn signature_verification(mut self, policy: SignatureVerification) -> Self {
        self.signature_verification = policy;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ChannelConfig, ClientError> {
        if self.security_policy != SecurityPolicy::None {
            if self.certificate.is_none() {
                return Err(ContractError::InvalidConfig(format!(
                    "security policy {} requires a client certificate",
                    self.security_policy.uri()
                ))
                .into());
            }
            if self.private_key.is_none() {
                return Err(ContractError::InvalidConfig(format!(
                    "security policy {} requires a private key",
                    self.security_policy.uri()
                ))
                .into());
            }
        }
        if self.security_mode != SecurityMode::None && self.security_policy == SecurityPolicy::None
        {
            return Err(ContractError::InvalidConfig(
                "security mode requires a security policy other than None".to_owned(),
            )
            .into());
        }
        if self.requested_lifetime < Duration::from_secs(1) {
            return Err(ContractError::InvalidConfig(
                "requested channel lifetime must be at least one second".to_owned(),
            )
            .into());
        }
        Ok(ChannelConfig {
            certificate: self.certificate,
            private_key: self.private_key,
            security_policy: self.security_policy,
            security_mode: self.security_mode,
            requested_lifetime: self.requested_lifetime,
            application_uri: self.application_uri,
            request_timeout: self.request_timeout,
            signature_verification: self.signature_verification,
        })
    }
}

// =============================================================================
// IdentityToken
// =============================================================================

/// The user identity presented on session activation.
///
/// The policy id is discovered from the server's endpoints when left
/// empty; see `SessionManager::create_session`.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityToken {
    /// No credentials.
    Anonymous {
        /// Token policy id; filled from the endpoints when empty.
        policy_id: Option<String>,
    },
    /// User name and password. The password is encrypted per the auth
    /// policy before it leaves the client.
    UserName {
        /// The user name.
        user: String,
        /// The plaintext password.
        password: Vec<u8>,
        /// Token policy id.
        policy_id: String,
    },
    /// X.509 certificate identity.
    X509 {
        /// DER user certificate.
        certificate: Vec<u8>,
        /// DER user private key.
        private_key: Vec<u8>,
        /// Token policy id.
        policy_id: String,
    },
    /// Externally issued token.
    Issued {
        /// Opaque token bytes.
        token: Vec<u8>,
        /// Token policy id.
        policy_id: String,
    },
}

impl Default for IdentityToken {
    fn default() -> Self {
        Self::Anonymous { policy_id: None }
    }
}

// =============================================================================
// SessionConfig
// =============================================================================

/// Parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Requested session timeout.
    pub session_timeout: Duration,
    /// Description of this client application.
    pub client_description: ApplicationDescription,
    /// Preferred locales in priority order.
    pub locale_ids: Vec<String>,
    /// The user identity.
    pub identity: IdentityToken,
    /// Security policy URI governing user token encryption; empty uses
    /// the channel's policy.
    pub auth_policy_uri: String,
    /// Session name; generated from the application URI when empty.
    pub session_name: Option<String>,
}

impl SessionConfig {
    /// Returns a builder with the defaults: twenty minute timeout,
    /// anonymous identity.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfigBuilder::default().build()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    session_timeout: Duration,
    application_uri: String,
    product_uri: String,
    application_name: String,
    locale_ids: Vec<String>,
    identity: IdentityToken,
    auth_policy_uri: String,
    session_name: Option<String>,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(20 * 60),
            application_uri: "urn:gantry:client".to_owned(),
            product_uri: "urn:gantry".to_owned(),
            application_name: "gantry client".to_owned(),
            locale_ids: Vec::new(),
            identity: IdentityToken::default(),
            auth_policy_uri: String::new(),
            session_name: None,
        }
    }
}

impl SessionConfigBuilder {
    /// Sets the requested session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets the application URI of the client description.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.application_uri = uri.into();
        self
    }

    /// Sets the product URI of the client description.
    pub fn product_uri(mut self, uri: impl Into<String>) -> Self {
        self.product_uri = uri.into();
        self
    }

    /// Sets the display name of the client description.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Adds a preferred locale.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale_ids.push(locale.into());
        self
    }

    /// Sets the user identity.
    pub fn identity(mut self, identity: IdentityToken) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the security policy URI for user token encryption.
    pub fn auth_policy_uri(mut self, uri: impl Into<String>) -> Self {
        self.auth_policy_uri = uri.into();
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            session_timeout: self.session_timeout,
            client_description: ApplicationDescription {
                application_uri: Some(self.application_uri),
                product_uri: Some(self.product_uri),
                application_name: LocalizedText::text(self.application_name),
                application_type: ApplicationType::Client,
                gateway_server_uri: None,
                discovery_profile_uri: None,
                discovery_urls: Vec::new(),
            },
            locale_ids: self.locale_ids,
            identity: self.identity,
            auth_policy_uri: self.auth_policy_uri,
            session_name: self.session_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channel_config() {
        let config = ChannelConfig::default();
        assert_eq!(config.security_policy, SecurityPolicy::None);
        assert_eq!(config.security_mode, SecurityMode::None);
        assert_eq!(config.signature_verification, SignatureVerification::Strict);
    }

    #[test]
    fn secure_policy_requires_key_material() {
        let err = ChannelConfig::builder()
            .security_policy(SecurityPolicy::Basic256Sha256)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("certificate"));

        let err = ChannelConfig::builder()
            .security_policy(SecurityPolicy::Basic256Sha256)
            .certificate(vec![0x30])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("private key"));
    }

    #[test]
    fn mode_without_policy_is_rejected() {
        let err = ChannelConfig::builder().security_mode(SecurityMode::Sign).build().unwrap_err();
        assert!(err.to_string().contains("security policy"));
    }

    #[test]
    fn session_config_defaults_to_anonymous() {
        let config = SessionConfig::default();
        assert_eq!(config.identity, IdentityToken::Anonymous { policy_id: None });
        assert_eq!(config.session_timeout, Duration::from_secs(1200));
        assert_eq!(
            config.client_description.application_type,
            ApplicationType::Client
        );
    }

    #[test]
    fn session_builder_collects_locales() {
        let config = SessionConfig::builder().locale("en-US").locale("de-DE").build();
        assert_eq!(config.locale_ids, vec!["en-US".to_owned(), "de-DE".to_owned()]);
    }
}
