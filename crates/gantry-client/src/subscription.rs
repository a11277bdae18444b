// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscriptions and the publish pump.
//!
//! Every subscription gets a bounded notification queue and one pump. The
//! pump keeps a Publish request in flight, rebuilds the acknowledgement
//! list from each response's available sequence numbers, and routes
//! notification data into the owning subscription's queue. Errors in the
//! publish exchange are delivered as notifications, never raised out of
//! the pump: transient statuses (`BadTimeout` keep-alives and the
//! delete/publish race behind `BadNoSubscription`) are swallowed, anything
//! else fans out one error notification per registered subscription.
//!
//! Backpressure is deliberate: a full queue blocks the pump rather than
//! dropping data, so a slow consumer slows delivery instead of silently
//! losing it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use gantry_codec::services::{
    DataChangeNotification, EventNotificationList, NotificationData, PublishRequest,
    PublishResponse, Request, Response, StatusChangeNotification, SubscriptionAcknowledgement,
};
use gantry_codec::StatusCode;

use crate::channel::SecureChannel;
use crate::error::ClientError;
use crate::session::SessionManager;

/// Pause after a non-transient publish failure, so a dead channel does
/// not spin the pump hot.
const PUBLISH_ERROR_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// Parameters
// =============================================================================

/// Requested subscription parameters. The server may revise the interval
/// and the counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionParameters {
    /// Requested publishing interval.
    pub publishing_interval: Duration,
    /// Publishing intervals the subscription survives without a publish.
    pub lifetime_count: u32,
    /// Intervals between keep-alives on an idle subscription.
    pub max_keep_alive_count: u32,
    /// Cap on notifications per publish response.
    pub max_notifications_per_publish: u32,
    /// Relative priority among the session's subscriptions.
    pub priority: u8,
    /// Capacity of the notification queue. 0 requests a synchronous
    /// handoff and is realized as the smallest queue: the pump blocks
    /// until the consumer takes each notification.
    pub queue_capacity: usize,
}

impl Default for SubscriptionParameters {
    fn default() -> Self {
        Self {
            publishing_interval: Duration::from_millis(100),
            lifetime_count: 10_000,
            max_keep_alive_count: 3_000,
            max_notifications_per_publish: 10_000,
            priority: 0,
            queue_capacity: 0,
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// An error delivered through a subscription's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishError {
    /// The status code, when the failure was a service status.
    pub status: Option<StatusCode>,
    /// Human-readable description.
    pub message: String,
}

impl PublishError {
    fn status(status: StatusCode) -> Self {
        Self { status: Some(status), message: status.to_string() }
    }

    fn message(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }
}

impl From<&ClientError> for PublishError {
    fn from(error: &ClientError) -> Self {
        Self { status: error.status_code(), message: error.to_string() }
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Payload of a delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    /// New values for monitored items.
    DataChange(DataChangeNotification),
    /// Events from monitored items.
    Events(EventNotificationList),
    /// Subscription status change on the server.
    StatusChange(StatusChangeNotification),
    /// A publish-pipeline error.
    Error(PublishError),
}

/// One notification delivered to a subscription's consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishNotification {
    /// The subscription the notification belongs to.
    pub subscription_id: u32,
    /// The payload.
    pub payload: NotificationPayload,
}

// =============================================================================
// Subscription
// =============================================================================

/// A live subscription handle.
///
/// Notifications for the subscription arrive on [`recv`]; dropping the
/// handle without unsubscribing leaves the server-side subscription alive
/// until the session closes it.
///
/// [`recv`]: Self::recv
#[derive(Debug)]
pub struct Subscription {
    /// Server-assigned subscription id.
    pub subscription_id: u32,
    /// Revised publishing interval.
    pub revised_publishing_interval: Duration,
    /// Revised lifetime count.
    pub revised_lifetime_count: u32,
    /// Revised keep-alive count.
    pub revised_max_keep_alive_count: u32,
    notifications: mpsc::Receiver<PublishNotification>,
    stop: watch::Sender<bool>,
}

impl Subscription {
    pub(crate) fn new(
        subscription_id: u32,
        revised_publishing_interval: Duration,
        revised_lifetime_count: u32,
        revised_max_keep_alive_count: u32,
        notifications: mpsc::Receiver<PublishNotification>,
        stop: watch::Sender<bool>,
    ) -> Self {
        Self {
            subscription_id,
            revised_publishing_interval,
            revised_lifetime_count,
            revised_max_keep_alive_count,
            notifications,
            stop,
        }
    }

    /// Receives the next notification. Returns `None` once the pump has
    /// stopped and the queue is drained.
    pub async fn recv(&mut self) -> Option<PublishNotification> {
        self.notifications.recv().await
    }

    /// Signals the pump driving this subscription to stop.
    pub(crate) fn trigger_stop(&self) {
        let _ = self.stop.send(true);
    }
}

// =============================================================================
// SubscriptionRegistry
// =============================================================================

/// Tracks live subscriptions and their notification senders.
///
/// Shared between the caller (subscribe/unsubscribe) and the pumps
/// (delivery); mutation and reads are serialized by the inner lock. The
/// registry holds only the sending half of each queue, so dropping a
/// [`Subscription`] handle cannot leak a cycle through the pump.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<u32, mpsc::Sender<PublishNotification>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the registered subscription ids.
    pub fn subscription_ids(&self) -> Vec<u32> {
        self.entries.read().keys().copied().collect()
    }

    pub(crate) fn register(&self, id: u32, sender: mpsc::Sender<PublishNotification>) {
        self.entries.write().insert(id, sender);
    }

    pub(crate) fn remove(&self, id: u32) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    fn sender_of(&self, id: u32) -> Option<mpsc::Sender<PublishNotification>> {
        self.entries.read().get(&id).cloned()
    }

    fn senders(&self) -> Vec<(u32, mpsc::Sender<PublishNotification>)> {
        self.entries.read().iter().map(|(id, tx)| (*id, tx.clone())).collect()
    }
}

// =============================================================================
// Publish pump
// =============================================================================

/// Drives Publish requests until the stop signal fires.
///
/// The acknowledgement list starts empty and is rebuilt from every good
/// response: one entry per available sequence number, all for the
/// response's subscription. The pump never sends a terminating Publish on
/// shutdown.
pub(crate) async fn publish_pump(
    channel: SecureChannel,
    sessions: Arc<SessionManager>,
    registry: Arc<SubscriptionRegistry>,
    mut stop: watch::Receiver<bool>,
) {
    let mut acks: Vec<SubscriptionAcknowledgement> = Vec::new();

    loop {
        if *stop.borrow() {
            break;
        }
        let request = Request::Publish(PublishRequest {
            request_header: Default::default(),
            subscription_acknowledgements: acks.clone(),
        });

        let result = tokio::select! {
            _ = stop.changed() => break,
            result = channel.send(request, sessions.auth_token()) => result,
        };

        let outcome = match result {
            Ok(Response::Publish(res)) => {
                let service_result = res.response_header.service_result;
                if service_result.is_bad() {
                    Err(PublishError::status(service_result))
                } else {
                    acks = rebuild_acks(&res);
                    deliver(&registry, res).await;
                    Ok(())
                }
            }
            Ok(other) => Err(PublishError::message(format!(
                "invalid response: got {}, want PublishResponse",
                other.service_name()
            ))),
            Err(e) => Err(PublishError::from(&e)),
        };

        if let Err(error) = outcome {
            match error.status {
                // Keep-alive; the server had nothing to push in time.
                Some(StatusCode::BAD_TIMEOUT) => continue,
                // Race between a delete and the publish already in
                // flight; the pump is about to be stopped anyway.
                Some(StatusCode::BAD_NO_SUBSCRIPTION) => continue,
                _ => {
                    warn!(error = %error, "publish failed, notifying subscriptions");
                    for (subscription_id, sender) in registry.senders() {
                        let notification = PublishNotification {
                            subscription_id,
                            payload: NotificationPayload::Error(error.clone()),
                        };
                        if sender.send(notification).await.is_err() {
                            debug!(subscription_id, "notification consumer gone");
                        }
                    }
                    tokio::select! {
                        _ = stop.changed() => break,
                        _ = tokio::time::sleep(PUBLISH_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
    }
    trace!("publish pump exited");
}

/// Builds the next request's acknowledgements from a good response.
fn rebuild_acks(res: &PublishResponse) -> Vec<SubscriptionAcknowledgement> {
    res.available_sequence_numbers
        .iter()
        .map(|&sequence_number| SubscriptionAcknowledgement {
            subscription_id: res.subscription_id,
            sequence_number,
        })
        .collect()
}

/// Demultiplexes one good publish response into the target subscription's
/// queue.
async fn deliver(registry: &SubscriptionRegistry, res: PublishResponse) {
    let subscription_id = res.subscription_id;
    let Some(sender) = registry.sender_of(subscription_id) else {
        debug!(subscription_id, "publish response for unknown subscription");
        return;
    };
    let push = |payload: NotificationPayload| PublishNotification { subscription_id, payload };

    // A bad acknowledgement result poisons the whole response for this
    // subscription; the data is not processed.
    if let Some(status) = res.results.iter().find(|s| s.is_bad()) {
        let _ = sender.send(push(NotificationPayload::Error(PublishError::status(*status)))).await;
        return;
    }

    let Some(message) = res.notification_message else {
        let _ = sender
            .send(push(NotificationPayload::Error(PublishError::message(
                "empty NotificationMessage",
            ))))
            .await;
        return;
    };

    for data in &message.notification_data {
        let payload = match NotificationData::from_extension_object(data) {
            Ok(Some(NotificationData::DataChange(n))) => NotificationPayload::DataChange(n),
            Ok(Some(NotificationData::Events(n))) => NotificationPayload::Events(n),
            Ok(Some(NotificationData::StatusChange(n))) => NotificationPayload::StatusChange(n),
            Ok(None) => {
                NotificationPayload::Error(PublishError::message("missing NotificationData parameter"))
            }
            Err(_) => {
                NotificationPayload::Error(PublishError::message("unknown NotificationData parameter"))
            }
        };
        if sender.send(push(payload)).await.is_err() {
            debug!(subscription_id, "notification consumer gone");
            return;
        }
    }
}
