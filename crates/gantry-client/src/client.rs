// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The high-level client.
//!
//! `Client` composes the secure channel, the session manager and the
//! subscription registry, and exposes one typed helper per service. Each
//! helper builds the request, sends it with the active session's
//! authentication token, and pattern-matches the response variant; a
//! mismatched variant surfaces as an invalid-response error naming both
//! types.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use gantry_codec::services::{
    BrowseRequest, BrowseResponse, CreateMonitoredItemsRequest, CreateMonitoredItemsResponse,
    CreateSubscriptionRequest, CreateSubscriptionResponse, DeleteMonitoredItemsRequest,
    DeleteMonitoredItemsResponse, DeleteSubscriptionsRequest, DeleteSubscriptionsResponse,
    EndpointDescription, GetEndpointsRequest, GetEndpointsResponse, HistoryReadRequest,
    HistoryReadResponse, HistoryReadValueId, MonitoredItemCreateRequest, MonitoringMode,
    MonitoringParameters, PublishRequest, PublishResponse, ReadRawModifiedDetails, ReadRequest,
    ReadResponse, ReadValueId, Request, Response, SubscriptionAcknowledgement,
    TimestampsToReturn, WriteRequest, WriteResponse, ATTRIBUTE_ID_VALUE,
};
use gantry_codec::{NodeId, QualifiedName};

use crate::channel::SecureChannel;
use crate::config::{ChannelConfig, SessionConfig};
use crate::error::{ClientError, ClientResult, ContractError, ServiceError};
use crate::session::{Session, SessionManager};
use crate::subscription::{
    publish_pump, Subscription, SubscriptionParameters, SubscriptionRegistry,
};
use crate::transport::{EndpointUrl, TransportLimits, UacpTransport};

/// Matches a response variant, failing on a bad service result or a
/// mismatched type.
macro_rules! expect_response {
    ($response:expr, $variant:ident, $want:literal) => {{
        match $response {
            Response::$variant(res) => {
                let result = res.response_header.service_result;
                if result.is_bad() {
                    return Err(ClientError::status(result));
                }
                res
            }
            other => {
                return Err(ServiceError::UnexpectedResponse {
                    got: other.service_name(),
                    want: $want,
                }
                .into())
            }
        }
    }};
}

/// A high-level OPC UA client: secure channel, session and subscriptions
/// behind typed request helpers.
///
/// # Example
///
/// ```rust,ignore
/// use gantry_client::{ChannelConfig, Client, SessionConfig};
///
/// let client = Client::new(
///     "opc.tcp://localhost:4840",
///     ChannelConfig::default(),
///     SessionConfig::default(),
/// )?;
/// client.connect().await?;
///
/// let endpoints = client.get_endpoints().await?;
/// println!("{} endpoints", endpoints.endpoints.len());
///
/// client.close().await?;
/// ```
pub struct Client {
    endpoint: EndpointUrl,
    channel_config: ChannelConfig,
    session_config: SessionConfig,
    channel: RwLock<Option<SecureChannel>>,
    sessions: Arc<SessionManager>,
    registry: Arc<SubscriptionRegistry>,
}

impl Client {
    /// Creates a client for `endpoint`. No connection is made until
    /// [`dial`] or [`connect`].
    ///
    /// [`dial`]: Self::dial
    /// [`connect`]: Self::connect
    pub fn new(
        endpoint: &str,
        channel_config: ChannelConfig,
        session_config: SessionConfig,
    ) -> ClientResult<Self> {
        let endpoint = EndpointUrl::parse(endpoint)?;
        Ok(Self {
            endpoint,
            channel_config,
            session_config,
            channel: RwLock::new(None),
            sessions: Arc::new(SessionManager::new()),
            registry: Arc::new(SubscriptionRegistry::new()),
        })
    }

    /// Fetches the endpoint descriptions of a server without keeping the
    /// connection: dial, GetEndpoints, close.
    pub async fn get_endpoints_of(endpoint: &str) -> ClientResult<Vec<EndpointDescription>> {
        let client =
            Self::new(endpoint, ChannelConfig::default(), SessionConfig::default())?;
        client.dial().await?;
        let result = client.get_endpoints().await;
        client.close().await.ok();
        result.map(|res| res.endpoints)
    }

    /// Establishes the secure channel and activates a session.
    pub async fn connect(&self) -> ClientResult<()> {
        self.dial().await?;
        let channel = self.channel()?;
        let session = match self.sessions.create_session(&channel, self.session_config.clone()).await
        {
            Ok(session) => session,
            Err(e) => {
                self.close().await.ok();
                return Err(e);
            }
        };
        if let Err(e) = self.sessions.activate_session(&channel, Arc::new(session)).await {
            self.close().await.ok();
            return Err(e);
        }
        info!(endpoint = %self.endpoint, "client connected");
        Ok(())
    }

    /// Establishes the secure channel only. Fails when already connected.
    pub async fn dial(&self) -> ClientResult<()> {
        if self.channel.read().is_some() {
            return Err(ContractError::AlreadyConnected.into());
        }
        let transport = UacpTransport::dial(
            &self.endpoint,
            TransportLimits::default(),
            self.channel_config.request_timeout,
        )
        .await?;
        let channel = SecureChannel::open(transport, self.channel_config.clone()).await?;
        *self.channel.write() = Some(channel);
        Ok(())
    }

    /// Opens the channel over an already connected stream. Used by hosts
    /// that manage their own sockets, and by tests driving an in-process
    /// pipe.
    pub async fn dial_transport(&self, transport: UacpTransport) -> ClientResult<()> {
        if self.channel.read().is_some() {
            return Err(ContractError::AlreadyConnected.into());
        }
        let channel = SecureChannel::open(transport, self.channel_config.clone()).await?;
        *self.channel.write() = Some(channel);
        Ok(())
    }

    /// Closes the session (best-effort) and the secure channel.
    pub async fn close(&self) -> ClientResult<()> {
        let Some(channel) = self.channel.write().take() else {
            return Ok(());
        };
        if let Err(e) = self.sessions.close_session(&channel).await {
            debug!(error = %e, "session close failed, closing channel anyway");
        }
        channel.close().await
    }

    /// Returns the active session, if any.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.sessions.active_session()
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> &SessionManager {
        self.sessions.as_ref()
    }

    /// Returns the secure channel. Fails when not connected.
    pub fn channel(&self) -> ClientResult<SecureChannel> {
        self.channel.read().clone().ok_or_else(|| ContractError::NotConnected.into())
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Sends a request, injecting the active session's authentication
    /// token when one exists.
    pub async fn send(&self, request: Request) -> ClientResult<Response> {
        let channel = self.channel()?;
        channel.send(request, self.sessions.auth_token()).await
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Creates a session with the client's session configuration. The
    /// session is not yet activated.
    pub async fn create_session(&self) -> ClientResult<Session> {
        let channel = self.channel()?;
        self.sessions.create_session(&channel, self.session_config.clone()).await
    }

    /// Activates a session and makes it the client's active session.
    pub async fn activate_session(&self, session: Arc<Session>) -> ClientResult<()> {
        let channel = self.channel()?;
        self.sessions.activate_session(&channel, session).await
    }

    /// Closes the active session.
    pub async fn close_session(&self) -> ClientResult<()> {
        let channel = self.channel()?;
        self.sessions.close_session(&channel).await
    }

    /// Detaches the active session without closing it; the caller takes
    /// over its lifecycle.
    pub fn detach_session(&self) -> Option<Arc<Session>> {
        self.sessions.detach_session()
    }

    // =========================================================================
    // Discovery and attribute services
    // =========================================================================

    /// Fetches the server's endpoint descriptions. Works on a freshly
    /// dialed channel without a session.
    pub async fn get_endpoints(&self) -> ClientResult<GetEndpointsResponse> {
        let request = Request::GetEndpoints(GetEndpointsRequest {
            request_header: Default::default(),
            endpoint_url: Some(self.endpoint.as_str().to_owned()),
            locale_ids: Vec::new(),
            profile_uris: Vec::new(),
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, GetEndpoints, "GetEndpointsResponse"))
    }

    /// Executes a read. The request's `ReadValueId` entries are copied
    /// with defaults applied (a zero attribute id becomes the Value
    /// attribute), so the caller's request is never mutated.
    pub async fn read(&self, request: &ReadRequest) -> ClientResult<ReadResponse> {
        let nodes_to_read = request
            .nodes_to_read
            .iter()
            .map(|rv| {
                let mut rv = rv.clone();
                if rv.attribute_id == 0 {
                    rv.attribute_id = ATTRIBUTE_ID_VALUE;
                }
                rv
            })
            .collect();
        let request = Request::Read(ReadRequest {
            request_header: Default::default(),
            max_age: request.max_age,
            timestamps_to_return: request.timestamps_to_return,
            nodes_to_read,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, Read, "ReadResponse"))
    }

    /// Executes a write.
    pub async fn write(&self, request: WriteRequest) -> ClientResult<WriteResponse> {
        let response = self.send(Request::Write(request)).await?;
        Ok(expect_response!(response, Write, "WriteResponse"))
    }

    /// Executes a browse.
    pub async fn browse(&self, request: BrowseRequest) -> ClientResult<BrowseResponse> {
        let response = self.send(Request::Browse(request)).await?;
        Ok(expect_response!(response, Browse, "BrowseResponse"))
    }

    /// Reads raw or modified history for a set of nodes. The details are
    /// wrapped in their binary extension object.
    pub async fn history_read_raw_modified(
        &self,
        nodes: Vec<HistoryReadValueId>,
        details: &ReadRawModifiedDetails,
    ) -> ClientResult<HistoryReadResponse> {
        let request = Request::HistoryRead(HistoryReadRequest {
            request_header: Default::default(),
            history_read_details: details.to_extension_object(),
            timestamps_to_return: TimestampsToReturn::Both,
            release_continuation_points: false,
            nodes_to_read: nodes,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, HistoryRead, "HistoryReadResponse"))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Sends a CreateSubscription request without registering anything
    /// locally. Most callers want [`subscribe`].
    ///
    /// [`subscribe`]: Self::subscribe
    pub async fn create_subscription(
        &self,
        params: &SubscriptionParameters,
    ) -> ClientResult<CreateSubscriptionResponse> {
        let request = Request::CreateSubscription(CreateSubscriptionRequest {
            request_header: Default::default(),
            requested_publishing_interval: params.publishing_interval.as_millis() as f64,
            requested_lifetime_count: params.lifetime_count,
            requested_max_keep_alive_count: params.max_keep_alive_count,
            max_notifications_per_publish: params.max_notifications_per_publish,
            publishing_enabled: true,
            priority: params.priority,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, CreateSubscription, "CreateSubscriptionResponse"))
    }

    /// Creates a subscription, registers it, and starts a publish pump
    /// for it. The returned handle receives the subscription's
    /// notifications; pass it to [`unsubscribe`] to tear everything down.
    ///
    /// [`unsubscribe`]: Self::unsubscribe
    pub async fn subscribe(&self, params: &SubscriptionParameters) -> ClientResult<Subscription> {
        let res = self.create_subscription(params).await?;

        let capacity = params.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        self.registry.register(res.subscription_id, tx);

        let channel = self.channel()?;
        tokio::spawn(publish_pump(
            channel,
            Arc::clone(&self.sessions),
            Arc::clone(&self.registry),
            stop_rx,
        ));

        info!(
            subscription_id = res.subscription_id,
            interval_ms = res.revised_publishing_interval,
            "subscription created"
        );
        Ok(Subscription::new(
            res.subscription_id,
            std::time::Duration::from_millis(res.revised_publishing_interval.max(0.0) as u64),
            res.revised_lifetime_count,
            res.revised_max_keep_alive_count,
            rx,
            stop_tx,
        ))
    }

    /// Stops the subscription's pump, removes it from the registry, and
    /// deletes it on the server. A failure in the delete is surfaced; the
    /// local removal is not rolled back.
    pub async fn unsubscribe(&self, subscription: Subscription) -> ClientResult<()> {
        subscription.trigger_stop();
        self.registry.remove(subscription.subscription_id);
        let res = self.delete_subscriptions(vec![subscription.subscription_id]).await?;
        if let Some(status) = res.results.iter().find(|s| s.is_bad()) {
            return Err(ClientError::status(*status));
        }
        info!(subscription_id = subscription.subscription_id, "subscription deleted");
        Ok(())
    }

    /// Deletes subscriptions by id.
    pub async fn delete_subscriptions(
        &self,
        subscription_ids: Vec<u32>,
    ) -> ClientResult<DeleteSubscriptionsResponse> {
        let request = Request::DeleteSubscriptions(DeleteSubscriptionsRequest {
            request_header: Default::default(),
            subscription_ids,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, DeleteSubscriptions, "DeleteSubscriptionsResponse"))
    }

    /// Sends a single Publish request with the given acknowledgements.
    /// Hosts can use this to run additional publish loops beside the ones
    /// started by [`subscribe`].
    ///
    /// [`subscribe`]: Self::subscribe
    pub async fn publish(
        &self,
        acks: Vec<SubscriptionAcknowledgement>,
    ) -> ClientResult<PublishResponse> {
        let request = Request::Publish(PublishRequest {
            request_header: Default::default(),
            subscription_acknowledgements: acks,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, Publish, "PublishResponse"))
    }

    // =========================================================================
    // Monitored items
    // =========================================================================

    /// Creates monitored items on a subscription. A zero subscription id
    /// is a contract violation and fails locally, without a round-trip.
    pub async fn create_monitored_items(
        &self,
        subscription_id: u32,
        timestamps_to_return: TimestampsToReturn,
        items: Vec<MonitoredItemCreateRequest>,
    ) -> ClientResult<CreateMonitoredItemsResponse> {
        if subscription_id == 0 {
            return Err(ContractError::SubscriptionIdZero.into());
        }
        let request = Request::CreateMonitoredItems(CreateMonitoredItemsRequest {
            request_header: Default::default(),
            subscription_id,
            timestamps_to_return,
            items_to_create: items,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, CreateMonitoredItems, "CreateMonitoredItemsResponse"))
    }

    /// Deletes monitored items from a subscription.
    pub async fn delete_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: Vec<u32>,
    ) -> ClientResult<DeleteMonitoredItemsResponse> {
        let request = Request::DeleteMonitoredItems(DeleteMonitoredItemsRequest {
            request_header: Default::default(),
            subscription_id,
            monitored_item_ids,
        });
        let response = self.send(request).await?;
        Ok(expect_response!(response, DeleteMonitoredItems, "DeleteMonitoredItemsResponse"))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.channel.read().is_some())
            .field("subscriptions", &self.registry.len())
            .finish()
    }
}

/// Builds a monitored item create request with the common defaults: the
/// Value attribute when `attribute_id` is zero, reporting mode, a queue
/// of ten with oldest-first discard, and server-chosen sampling.
pub fn monitored_item_with_defaults(
    node_id: NodeId,
    attribute_id: u32,
    client_handle: u32,
) -> MonitoredItemCreateRequest {
    let attribute_id = if attribute_id == 0 { ATTRIBUTE_ID_VALUE } else { attribute_id };
    MonitoredItemCreateRequest {
        item_to_monitor: ReadValueId {
            node_id,
            attribute_id,
            index_range: None,
            data_encoding: QualifiedName::default(),
        },
        monitoring_mode: MonitoringMode::Reporting,
        requested_parameters: MonitoringParameters {
            client_handle,
            sampling_interval: 0.0,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(
            "opc.tcp://localhost:4840",
            ChannelConfig::default(),
            SessionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_bad_endpoint() {
        assert!(Client::new(
            "tcp://localhost",
            ChannelConfig::default(),
            SessionConfig::default()
        )
        .is_err());
    }

    #[tokio::test]
    async fn send_without_channel_is_contract_error() {
        let client = client();
        let err = client.get_endpoints().await.unwrap_err();
        assert!(matches!(err, ClientError::Contract(ContractError::NotConnected)));
    }

    #[tokio::test]
    async fn zero_subscription_id_fails_locally() {
        let client = client();
        // Checked before the channel, so no connection is required.
        let err = client
            .create_monitored_items(0, TimestampsToReturn::Both, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Contract(ContractError::SubscriptionIdZero)));
        assert_eq!(err.category(), "contract");
    }

    #[test]
    fn monitored_item_defaults() {
        let item = monitored_item_with_defaults(NodeId::string(2, "Temperature"), 0, 7);
        assert_eq!(item.item_to_monitor.attribute_id, ATTRIBUTE_ID_VALUE);
        assert_eq!(item.requested_parameters.client_handle, 7);
        assert_eq!(item.requested_parameters.queue_size, 10);
        assert!(item.requested_parameters.discard_oldest);
        assert_eq!(item.monitoring_mode, MonitoringMode::Reporting);
    }
}
