// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle: CreateSession, ActivateSession, CloseSession.
//!
//! The manager holds at most one active session. The active slot is
//! published only after a successful activation, so readers always see
//! either the previous session or the new one, never a partial state.
//! Outbound requests read the authentication token from the slot at send
//! time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use gantry_codec::services::{
    ActivateSessionRequest, CloseSessionRequest, CreateSessionRequest, EndpointDescription,
    IdentityTokenObject, Request, Response, SignatureData, UserTokenType,
};
use gantry_codec::NodeId;

use crate::channel::SecureChannel;
use crate::config::{IdentityToken, SessionConfig, SignatureVerification};
use crate::error::{ClientError, ClientResult, SecurityError, ServiceError};
use crate::security::{self, SecurityPolicy};

/// Policy id used when the server's endpoints advertise no anonymous
/// token policy.
const DEFAULT_ANONYMOUS_POLICY_ID: &str = "Anonymous";

// =============================================================================
// Session
// =============================================================================

/// An established session. Created by `create_session`, usable after
/// `activate_session`.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    session_id: NodeId,
    authentication_token: NodeId,
    server_nonce: Mutex<Vec<u8>>,
    server_certificate: Vec<u8>,
    server_endpoints: Vec<EndpointDescription>,
    revised_timeout_ms: f64,
}

impl Session {
    /// Returns the server-assigned session id.
    pub fn session_id(&self) -> &NodeId {
        &self.session_id
    }

    /// Returns the authentication token injected on session requests.
    pub fn authentication_token(&self) -> &NodeId {
        &self.authentication_token
    }

    /// Returns the current server nonce. Every activation response
    /// refreshes it; the next activation signature must use the fresh
    /// value.
    pub fn server_nonce(&self) -> Vec<u8> {
        self.server_nonce.lock().clone()
    }

    /// Returns the server's DER certificate, empty when none was sent.
    pub fn server_certificate(&self) -> &[u8] {
        &self.server_certificate
    }

    /// Returns the endpoints the server reported at session creation.
    pub fn server_endpoints(&self) -> &[EndpointDescription] {
        &self.server_endpoints
    }

    /// Returns the revised session timeout in milliseconds.
    pub fn revised_timeout_ms(&self) -> f64 {
        self.revised_timeout_ms
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn set_server_nonce(&self, nonce: Vec<u8>) {
        *self.server_nonce.lock() = nonce;
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Counters for session operations.
#[derive(Debug, Default)]
pub struct SessionStats {
    creations: AtomicU64,
    activations: AtomicU64,
    closures: AtomicU64,
}

impl SessionStats {
    /// Sessions created.
    pub fn creations(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    /// Sessions activated.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Sessions closed.
    pub fn closures(&self) -> u64 {
        self.closures.load(Ordering::Relaxed)
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Manages the client's single active session over a secure channel.
///
/// The manager never owns the channel; every operation borrows it for the
/// duration of the call.
#[derive(Debug, Default)]
pub struct SessionManager {
    active: RwLock<Option<Arc<Session>>>,
    stats: SessionStats,
}

impl SessionManager {
    /// Creates an empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active session, if any.
    pub fn active_session(&self) -> Option<Arc<Session>> {
        self.active.read().clone()
    }

    /// Returns the authentication token of the active session. Read at
    /// send time by the request helpers.
    pub fn auth_token(&self) -> Option<NodeId> {
        self.active.read().as_ref().map(|s| s.authentication_token.clone())
    }

    /// Returns the session statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Creates a session. The session is not yet activated and not yet
    /// associated with the manager; call [`activate_session`] next.
    ///
    /// A 32-byte random nonce is generated for the request, and the
    /// server's session signature over `client_certificate || nonce` is
    /// verified according to the channel's verification policy. When the
    /// configured identity is anonymous without a policy id, the id is
    /// discovered from the server's endpoints.
    ///
    /// [`activate_session`]: Self::activate_session
    pub async fn create_session(
        &self,
        channel: &SecureChannel,
        config: SessionConfig,
    ) -> ClientResult<Session> {
        let mut config = config;
        let client_nonce = security::generate_nonce();
        let session_name = config.session_name.clone().unwrap_or_else(|| {
            let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            format!("gantry-{stamp}")
        });

        let request = Request::CreateSession(CreateSessionRequest {
            request_header: Default::default(),
            client_description: config.client_description.clone(),
            server_uri: None,
            endpoint_url: Some(channel.endpoint_url().to_owned()),
            session_name: Some(session_name),
            client_nonce: Some(client_nonce.clone()),
            client_certificate: channel.local_certificate().map(<[u8]>::to_vec),
            requested_session_timeout: config.session_timeout.as_millis() as f64,
            max_response_message_size: 0,
        });

        // The authentication token is always null on CreateSession.
        let response = channel.send(request, None).await?;
        let res = match response {
            Response::CreateSession(res) => res,
            other => {
                return Err(ServiceError::UnexpectedResponse {
                    got: other.service_name(),
                    want: "CreateSessionResponse",
                }
                .into())
            }
        };
        let service_result = res.response_header.service_result;
        if service_result.is_bad() {
            return Err(ClientError::status(service_result));
        }

        let server_certificate = res.server_certificate.clone().unwrap_or_default();
        let signature = res.server_signature.signature.clone().unwrap_or_default();
        if let Err(e) =
            channel.verify_session_signature(&server_certificate, &client_nonce, &signature)
        {
            match channel.verification_policy() {
                SignatureVerification::Strict => {
                    return Err(SecurityError::SignatureInvalid.into());
                }
                SignatureVerification::Lenient => {
                    // Some field servers sign incorrectly and still
                    // activate fine; the server gets to reject activation
                    // itself.
                    warn!(error = %e, "server session signature did not verify, continuing");
                }
            }
        }

        if let IdentityToken::Anonymous { policy_id } = &mut config.identity {
            if policy_id.is_none() {
                *policy_id = Some(anonymous_policy_id(&res.server_endpoints));
            }
        }

        self.stats.creations.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = %res.session_id, "session created");

        Ok(Session {
            config,
            session_id: res.session_id,
            authentication_token: res.authentication_token,
            server_nonce: Mutex::new(res.server_nonce.unwrap_or_default()),
            server_certificate,
            server_endpoints: res.server_endpoints,
            revised_timeout_ms: res.revised_session_timeout,
        })
    }

    /// Activates a session and publishes it as the active session. Any
    /// previously active session is closed best-effort first.
    pub async fn activate_session(
        &self,
        channel: &SecureChannel,
        session: Arc<Session>,
    ) -> ClientResult<()> {
        let server_nonce = session.server_nonce();
        let (signature, algorithm) =
            channel.new_session_signature(&session.server_certificate, &server_nonce)?;
        let client_signature = SignatureData {
            algorithm: algorithm.map(str::to_owned),
            signature: if signature.is_empty() { None } else { Some(signature) },
        };

        let (identity_token, user_token_signature) =
            build_identity_token(channel, &session, &server_nonce)?;

        let request = Request::ActivateSession(ActivateSessionRequest {
            request_header: Default::default(),
            client_signature,
            client_software_certificates: Vec::new(),
            locale_ids: session.config.locale_ids.clone(),
            user_identity_token: identity_token.to_extension_object(),
            user_token_signature,
        });

        let response = channel.send(request, Some(session.authentication_token.clone())).await?;
        let res = match response {
            Response::ActivateSession(res) => res,
            other => {
                return Err(ServiceError::UnexpectedResponse {
                    got: other.service_name(),
                    want: "ActivateSessionResponse",
                }
                .into())
            }
        };
        let service_result = res.response_header.service_result;
        if service_result.is_bad() {
            return Err(ClientError::status(service_result));
        }

        // The fresh nonce feeds the next activation's signature.
        session.set_server_nonce(res.server_nonce.unwrap_or_default());

        let previous = self.active.read().clone();
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, &session) {
                if let Err(e) = self.close_session(channel).await {
                    warn!(error = %e, "failed to close previous session");
                }
            }
        }
        *self.active.write() = Some(Arc::clone(&session));

        self.stats.activations.fetch_add(1, Ordering::Relaxed);
        info!(session_id = %session.session_id, "session activated");
        Ok(())
    }

    /// Closes the active session with `delete_subscriptions = true` and
    /// clears it. Does nothing when no session is active.
    pub async fn close_session(&self, channel: &SecureChannel) -> ClientResult<()> {
        let Some(session) = self.active.read().clone() else {
            return Ok(());
        };

        let request = Request::CloseSession(CloseSessionRequest {
            request_header: Default::default(),
            delete_subscriptions: true,
        });
        let response = channel.send(request, Some(session.authentication_token.clone())).await?;
        let res = match response {
            Response::CloseSession(res) => res,
            other => {
                return Err(ServiceError::UnexpectedResponse {
                    got: other.service_name(),
                    want: "CloseSessionResponse",
                }
                .into())
            }
        };
        let service_result = res.response_header.service_result;
        if service_result.is_bad() {
            return Err(ClientError::status(service_result));
        }

        *self.active.write() = None;
        self.stats.closures.fetch_add(1, Ordering::Relaxed);
        info!(session_id = %session.session_id, "session closed");
        Ok(())
    }

    /// Removes and returns the active session without a network
    /// round-trip. The caller takes over its lifecycle.
    pub fn detach_session(&self) -> Option<Arc<Session>> {
        self.active.write().take()
    }
}

/// Transforms the configured identity into its wire token, encrypting or
/// signing as the variant requires.
fn build_identity_token(
    channel: &SecureChannel,
    session: &Session,
    server_nonce: &[u8],
) -> ClientResult<(IdentityTokenObject, SignatureData)> {
    let auth_policy_uri = &session.config.auth_policy_uri;
    let token = match &session.config.identity {
        IdentityToken::Anonymous { policy_id } => IdentityTokenObject::Anonymous {
            policy_id: Some(
                policy_id.clone().unwrap_or_else(|| DEFAULT_ANONYMOUS_POLICY_ID.to_owned()),
            ),
        },
        IdentityToken::UserName { user, password, policy_id } => {
            let (ciphertext, algorithm) = channel.encrypt_user_password(
                auth_policy_uri,
                password,
                &session.server_certificate,
                server_nonce,
            )?;
            IdentityTokenObject::UserName {
                policy_id: Some(policy_id.clone()),
                user_name: Some(user.clone()),
                password: Some(ciphertext),
                encryption_algorithm: algorithm.map(str::to_owned),
            }
        }
        IdentityToken::X509 { certificate, private_key, policy_id } => {
            let (signature, algorithm) = channel.new_user_token_signature(
                auth_policy_uri,
                private_key,
                &session.server_certificate,
                server_nonce,
            )?;
            let token = IdentityTokenObject::X509 {
                policy_id: Some(policy_id.clone()),
                certificate_data: Some(certificate.clone()),
            };
            return Ok((
                token,
                SignatureData {
                    algorithm: algorithm.map(str::to_owned),
                    signature: if signature.is_empty() { None } else { Some(signature) },
                },
            ));
        }
        IdentityToken::Issued { token, policy_id } => IdentityTokenObject::Issued {
            policy_id: Some(policy_id.clone()),
            token_data: Some(token.clone()),
            // Issued tokens travel as delivered; any encryption happened
            // at the issuer.
            encryption_algorithm: None,
        },
    };
    Ok((token, SignatureData::default()))
}

/// Finds the anonymous token policy id: the first endpoint with security
/// mode None and the null security policy that advertises an anonymous
/// token policy wins; without one the literal `"Anonymous"` is used.
fn anonymous_policy_id(endpoints: &[EndpointDescription]) -> String {
    for endpoint in endpoints {
        if endpoint.security_mode != 1
            || endpoint.security_policy_uri.as_deref() != Some(SecurityPolicy::None.uri())
        {
            continue;
        }
        for policy in &endpoint.user_identity_tokens {
            if policy.token_type == UserTokenType::Anonymous {
                if let Some(policy_id) = &policy.policy_id {
                    return policy_id.clone();
                }
            }
        }
    }
    DEFAULT_ANONYMOUS_POLICY_ID.to_owned()
}
