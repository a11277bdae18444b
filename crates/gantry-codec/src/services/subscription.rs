// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription services: CreateSubscription, Publish, monitored items,
//! DeleteSubscriptions, and the notification payloads delivered through
//! Publish responses.

use serde::{Deserialize, Serialize};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{DataValue, DiagnosticInfo, ExtensionObject, UaDateTime, Variant};
use crate::error::DecodingError;
use crate::services::attribute::{ReadValueId, TimestampsToReturn};
use crate::services::header::{RequestHeader, ResponseHeader};
use crate::services::ids;
use crate::status::StatusCode;

// =============================================================================
// CreateSubscription
// =============================================================================

/// Creates a subscription. The server may revise every requested
/// parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSubscriptionRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// Requested publishing interval in milliseconds.
    pub requested_publishing_interval: f64,
    /// Publishing intervals the subscription survives without a publish.
    pub requested_lifetime_count: u32,
    /// Intervals between keep-alive messages on an idle subscription.
    pub requested_max_keep_alive_count: u32,
    /// Cap on notifications per publish response; 0 for no cap.
    pub max_notifications_per_publish: u32,
    /// Whether publishing starts enabled.
    pub publishing_enabled: bool,
    /// Relative priority among this session's subscriptions.
    pub priority: u8,
}

impl BinaryEncode for CreateSubscriptionRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_f64(self.requested_publishing_interval);
        w.write_u32(self.requested_lifetime_count);
        w.write_u32(self.requested_max_keep_alive_count);
        w.write_u32(self.max_notifications_per_publish);
        w.write_bool(self.publishing_enabled);
        w.write_u8(self.priority);
    }
}

impl BinaryDecode for CreateSubscriptionRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            requested_publishing_interval: r.read_f64()?,
            requested_lifetime_count: r.read_u32()?,
            requested_max_keep_alive_count: r.read_u32()?,
            max_notifications_per_publish: r.read_u32()?,
            publishing_enabled: r.read_bool()?,
            priority: r.read_u8()?,
        })
    }
}

/// The created subscription with the server's revised parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSubscriptionResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// Server-assigned subscription id.
    pub subscription_id: u32,
    /// Revised publishing interval in milliseconds.
    pub revised_publishing_interval: f64,
    /// Revised lifetime count.
    pub revised_lifetime_count: u32,
    /// Revised keep-alive count.
    pub revised_max_keep_alive_count: u32,
}

impl BinaryEncode for CreateSubscriptionResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_u32(self.subscription_id);
        w.write_f64(self.revised_publishing_interval);
        w.write_u32(self.revised_lifetime_count);
        w.write_u32(self.revised_max_keep_alive_count);
    }
}

impl BinaryDecode for CreateSubscriptionResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            subscription_id: r.read_u32()?,
            revised_publishing_interval: r.read_f64()?,
            revised_lifetime_count: r.read_u32()?,
            revised_max_keep_alive_count: r.read_u32()?,
        })
    }
}

// =============================================================================
// DeleteSubscriptions
// =============================================================================

/// Deletes subscriptions by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteSubscriptionsRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The subscriptions to delete.
    pub subscription_ids: Vec<u32>,
}

impl BinaryEncode for DeleteSubscriptionsRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_array(&self.subscription_ids);
    }
}

impl BinaryDecode for DeleteSubscriptionsRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            subscription_ids: r.read_array()?,
        })
    }
}

/// Per-subscription delete results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteSubscriptionsResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One status per deleted subscription.
    pub results: Vec<StatusCode>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for DeleteSubscriptionsResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for DeleteSubscriptionsResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

// =============================================================================
// Publish
// =============================================================================

/// Acknowledges one notification message of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SubscriptionAcknowledgement {
    /// The subscription.
    pub subscription_id: u32,
    /// The acknowledged sequence number.
    pub sequence_number: u32,
}

impl BinaryEncode for SubscriptionAcknowledgement {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.subscription_id);
        w.write_u32(self.sequence_number);
    }
}

impl BinaryDecode for SubscriptionAcknowledgement {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { subscription_id: r.read_u32()?, sequence_number: r.read_u32()? })
    }
}

/// Gives the server a vehicle to push notifications, carrying the
/// acknowledgements for previously delivered messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// Acknowledgements for received notification messages.
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

impl BinaryEncode for PublishRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_array(&self.subscription_acknowledgements);
    }
}

impl BinaryDecode for PublishRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            subscription_acknowledgements: r.read_array()?,
        })
    }
}

/// A pushed notification message for one subscription.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// The subscription this message belongs to.
    pub subscription_id: u32,
    /// Sequence numbers the client has not yet acknowledged.
    pub available_sequence_numbers: Vec<u32>,
    /// `true` when more notifications are queued on the server.
    pub more_notifications: bool,
    /// The notification message.
    pub notification_message: Option<NotificationMessage>,
    /// One status per acknowledgement in the request.
    pub results: Vec<StatusCode>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for PublishResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_u32(self.subscription_id);
        w.write_array(&self.available_sequence_numbers);
        w.write_bool(self.more_notifications);
        // The message is a structure, not a nullable field; an absent
        // message encodes as an empty one.
        self.notification_message.clone().unwrap_or_default().encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for PublishResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            subscription_id: r.read_u32()?,
            available_sequence_numbers: r.read_array()?,
            more_notifications: r.read_bool()?,
            notification_message: {
                let message = NotificationMessage::decode(r)?;
                if message.sequence_number == 0 && message.notification_data.is_empty() {
                    None
                } else {
                    Some(message)
                }
            },
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

/// The notification payload of a publish response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationMessage {
    /// Sequence number of this message within its subscription.
    pub sequence_number: u32,
    /// Server time the message was queued.
    pub publish_time: UaDateTime,
    /// Notification data entries, each an extension object.
    pub notification_data: Vec<ExtensionObject>,
}

impl BinaryEncode for NotificationMessage {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.sequence_number);
        self.publish_time.encode(w);
        w.write_array(&self.notification_data);
    }
}

impl BinaryDecode for NotificationMessage {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            sequence_number: r.read_u32()?,
            publish_time: UaDateTime::decode(r)?,
            notification_data: r.read_array()?,
        })
    }
}

// =============================================================================
// Notification data variants
// =============================================================================

/// One monitored item's new value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemNotification {
    /// The client handle assigned when the item was created.
    pub client_handle: u32,
    /// The new value.
    pub value: DataValue,
}

impl BinaryEncode for MonitoredItemNotification {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.client_handle);
        self.value.encode(w);
    }
}

impl BinaryDecode for MonitoredItemNotification {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { client_handle: r.read_u32()?, value: DataValue::decode(r)? })
    }
}

/// Data change notification: new values for monitored items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChangeNotification {
    /// The changed items.
    pub monitored_items: Vec<MonitoredItemNotification>,
    /// Diagnostics for the items.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for DataChangeNotification {
    fn encode(&self, w: &mut Encoder) {
        w.write_array(&self.monitored_items);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for DataChangeNotification {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { monitored_items: r.read_array()?, diagnostic_infos: r.read_array()? })
    }
}

/// One event's selected fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFieldList {
    /// The client handle of the monitored item that produced the event.
    pub client_handle: u32,
    /// The selected event fields.
    pub event_fields: Vec<Variant>,
}

impl BinaryEncode for EventFieldList {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.client_handle);
        w.write_array(&self.event_fields);
    }
}

impl BinaryDecode for EventFieldList {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { client_handle: r.read_u32()?, event_fields: r.read_array()? })
    }
}

/// Event notification list: events raised by monitored items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventNotificationList {
    /// The events.
    pub events: Vec<EventFieldList>,
}

impl BinaryEncode for EventNotificationList {
    fn encode(&self, w: &mut Encoder) {
        w.write_array(&self.events);
    }
}

impl BinaryDecode for EventNotificationList {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { events: r.read_array()? })
    }
}

/// Status change notification: the subscription changed state on the
/// server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusChangeNotification {
    /// The new status.
    pub status: StatusCode,
    /// Diagnostics for the change.
    pub diagnostic_info: DiagnosticInfo,
}

impl BinaryEncode for StatusChangeNotification {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.status.0);
        self.diagnostic_info.encode(w);
    }
}

impl BinaryDecode for StatusChangeNotification {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            status: StatusCode(r.read_u32()?),
            diagnostic_info: DiagnosticInfo::decode(r)?,
        })
    }
}

/// A notification data entry interpreted against its type id.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationData {
    /// Data change notification.
    DataChange(DataChangeNotification),
    /// Event notification list.
    Events(EventNotificationList),
    /// Status change notification.
    StatusChange(StatusChangeNotification),
}

impl NotificationData {
    /// Interprets an extension object as a notification data entry.
    /// Returns `None` for an object with no body, and an error for a body
    /// under an unknown type id.
    pub fn from_extension_object(obj: &ExtensionObject) -> Result<Option<Self>, DecodingError> {
        if obj.is_null() {
            return Ok(None);
        }
        let identifier = obj.type_id.numeric_value().ok_or(DecodingError::NonNumericServiceId)?;
        let body = obj.binary_body().unwrap_or_default();
        let mut r = Decoder::new(body);
        let out = match identifier {
            id if id == u32::from(ids::DATA_CHANGE_NOTIFICATION) => {
                Self::DataChange(DataChangeNotification::decode(&mut r)?)
            }
            id if id == u32::from(ids::EVENT_NOTIFICATION_LIST) => {
                Self::Events(EventNotificationList::decode(&mut r)?)
            }
            id if id == u32::from(ids::STATUS_CHANGE_NOTIFICATION) => {
                Self::StatusChange(StatusChangeNotification::decode(&mut r)?)
            }
            identifier => {
                return Err(DecodingError::UnknownServiceId {
                    namespace: obj.type_id.node_id.namespace(),
                    identifier,
                })
            }
        };
        Ok(Some(out))
    }

    /// Wraps the notification in its binary extension object.
    pub fn to_extension_object(&self) -> ExtensionObject {
        match self {
            Self::DataChange(n) => {
                ExtensionObject::from_encodable(ids::DATA_CHANGE_NOTIFICATION, n)
            }
            Self::Events(n) => ExtensionObject::from_encodable(ids::EVENT_NOTIFICATION_LIST, n),
            Self::StatusChange(n) => {
                ExtensionObject::from_encodable(ids::STATUS_CHANGE_NOTIFICATION, n)
            }
        }
    }
}

// =============================================================================
// Monitored items
// =============================================================================

/// Monitoring mode of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// The item is disabled.
    Disabled,
    /// The item samples but does not report.
    Sampling,
    /// The item samples and reports.
    #[default]
    Reporting,
}

impl MonitoringMode {
    fn from_u32(v: u32) -> Self {
        match v {
            0 => Self::Disabled,
            1 => Self::Sampling,
            _ => Self::Reporting,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Sampling => 1,
            Self::Reporting => 2,
        }
    }
}

/// Sampling and queueing parameters for a monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringParameters {
    /// Client-assigned handle echoed in notifications.
    pub client_handle: u32,
    /// Sampling interval in milliseconds; 0 uses the publishing interval,
    /// -1 the fastest the server supports.
    pub sampling_interval: f64,
    /// Data change or event filter; null for none.
    pub filter: ExtensionObject,
    /// Server-side queue depth for the item.
    pub queue_size: u32,
    /// Whether the oldest value is dropped on queue overflow.
    pub discard_oldest: bool,
}

impl Default for MonitoringParameters {
    fn default() -> Self {
        Self {
            client_handle: 0,
            sampling_interval: 0.0,
            filter: ExtensionObject::null(),
            queue_size: 10,
            discard_oldest: true,
        }
    }
}

impl BinaryEncode for MonitoringParameters {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.client_handle);
        w.write_f64(self.sampling_interval);
        self.filter.encode(w);
        w.write_u32(self.queue_size);
        w.write_bool(self.discard_oldest);
    }
}

impl BinaryDecode for MonitoringParameters {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            client_handle: r.read_u32()?,
            sampling_interval: r.read_f64()?,
            filter: ExtensionObject::decode(r)?,
            queue_size: r.read_u32()?,
            discard_oldest: r.read_bool()?,
        })
    }
}

/// One monitored item to create.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateRequest {
    /// The node attribute to monitor.
    pub item_to_monitor: ReadValueId,
    /// Initial monitoring mode.
    pub monitoring_mode: MonitoringMode,
    /// Requested parameters; the server may revise them.
    pub requested_parameters: MonitoringParameters,
}

impl BinaryEncode for MonitoredItemCreateRequest {
    fn encode(&self, w: &mut Encoder) {
        self.item_to_monitor.encode(w);
        w.write_u32(self.monitoring_mode.as_u32());
        self.requested_parameters.encode(w);
    }
}

impl BinaryDecode for MonitoredItemCreateRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            item_to_monitor: ReadValueId::decode(r)?,
            monitoring_mode: MonitoringMode::from_u32(r.read_u32()?),
            requested_parameters: MonitoringParameters::decode(r)?,
        })
    }
}

/// Result of creating one monitored item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemCreateResult {
    /// Status of the creation.
    pub status_code: StatusCode,
    /// Server-assigned monitored item id.
    pub monitored_item_id: u32,
    /// Revised sampling interval.
    pub revised_sampling_interval: f64,
    /// Revised queue size.
    pub revised_queue_size: u32,
    /// Revised filter; null when unchanged.
    pub filter_result: ExtensionObject,
}

impl BinaryEncode for MonitoredItemCreateResult {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.status_code.0);
        w.write_u32(self.monitored_item_id);
        w.write_f64(self.revised_sampling_interval);
        w.write_u32(self.revised_queue_size);
        self.filter_result.encode(w);
    }
}

impl BinaryDecode for MonitoredItemCreateResult {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            status_code: StatusCode(r.read_u32()?),
            monitored_item_id: r.read_u32()?,
            revised_sampling_interval: r.read_f64()?,
            revised_queue_size: r.read_u32()?,
            filter_result: ExtensionObject::decode(r)?,
        })
    }
}

/// Creates monitored items on a subscription.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateMonitoredItemsRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// Timestamps to attach to sampled values.
    pub timestamps_to_return: TimestampsToReturn,
    /// The items to create.
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

impl BinaryEncode for CreateMonitoredItemsRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_u32(self.subscription_id);
        w.write_u32(self.timestamps_to_return.as_u32());
        w.write_array(&self.items_to_create);
    }
}

impl BinaryDecode for CreateMonitoredItemsRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            subscription_id: r.read_u32()?,
            timestamps_to_return: TimestampsToReturn::from_u32(r.read_u32()?),
            items_to_create: r.read_array()?,
        })
    }
}

/// Per-item creation results, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateMonitoredItemsResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One result per requested item.
    pub results: Vec<MonitoredItemCreateResult>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for CreateMonitoredItemsResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for CreateMonitoredItemsResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

/// Deletes monitored items from a subscription.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteMonitoredItemsRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// The items to delete.
    pub monitored_item_ids: Vec<u32>,
}

impl BinaryEncode for DeleteMonitoredItemsRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_u32(self.subscription_id);
        w.write_array(&self.monitored_item_ids);
    }
}

impl BinaryDecode for DeleteMonitoredItemsRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            subscription_id: r.read_u32()?,
            monitored_item_ids: r.read_array()?,
        })
    }
}

/// Per-item delete results, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteMonitoredItemsResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One status per deleted item.
    pub results: Vec<StatusCode>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for DeleteMonitoredItemsResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for DeleteMonitoredItemsResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::NodeId;
    use crate::services::{Request, Response};

    #[test]
    fn create_subscription_round_trip() {
        let req = Request::CreateSubscription(CreateSubscriptionRequest {
            request_header: RequestHeader::default(),
            requested_publishing_interval: 100.0,
            requested_lifetime_count: 10_000,
            requested_max_keep_alive_count: 3_000,
            max_notifications_per_publish: 10_000,
            publishing_enabled: true,
            priority: 0,
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x13, 0x03]);
        assert_eq!(Request::decode(&wire).unwrap(), req);

        let res = Response::CreateSubscription(CreateSubscriptionResponse {
            response_header: ResponseHeader::default(),
            subscription_id: 17,
            revised_publishing_interval: 250.0,
            revised_lifetime_count: 12_000,
            revised_max_keep_alive_count: 4_000,
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x16, 0x03]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }

    #[test]
    fn publish_round_trip_with_acks() {
        let req = Request::Publish(PublishRequest {
            request_header: RequestHeader::default(),
            subscription_acknowledgements: vec![
                SubscriptionAcknowledgement { subscription_id: 17, sequence_number: 7 },
                SubscriptionAcknowledgement { subscription_id: 17, sequence_number: 8 },
            ],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x3a, 0x03]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }

    #[test]
    fn publish_response_with_data_change() {
        let notification = NotificationData::DataChange(DataChangeNotification {
            monitored_items: vec![MonitoredItemNotification {
                client_handle: 3,
                value: DataValue::of(Variant::Double(21.5)),
            }],
            diagnostic_infos: Vec::new(),
        });
        let res = Response::Publish(PublishResponse {
            response_header: ResponseHeader::default(),
            subscription_id: 17,
            available_sequence_numbers: vec![7],
            more_notifications: false,
            notification_message: Some(NotificationMessage {
                sequence_number: 7,
                publish_time: UaDateTime(0x01D4_30FD_DD67_9800),
                notification_data: vec![notification.to_extension_object()],
            }),
            results: vec![StatusCode::GOOD],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x3d, 0x03]);
        let Response::Publish(back) = Response::decode(&wire).unwrap() else {
            panic!("wrong response variant");
        };
        assert_eq!(back.available_sequence_numbers, vec![7]);
        let message = back.notification_message.expect("notification message");
        let decoded =
            NotificationData::from_extension_object(&message.notification_data[0]).unwrap();
        assert_eq!(decoded, Some(notification));
    }

    #[test]
    fn notification_data_unknown_type_is_error() {
        let obj = ExtensionObject::binary(9999, vec![0x00]);
        assert!(NotificationData::from_extension_object(&obj).is_err());
    }

    #[test]
    fn notification_data_null_object_is_none() {
        assert_eq!(
            NotificationData::from_extension_object(&ExtensionObject::null()).unwrap(),
            None
        );
    }

    #[test]
    fn create_monitored_items_round_trip() {
        let req = Request::CreateMonitoredItems(CreateMonitoredItemsRequest {
            request_header: RequestHeader::default(),
            subscription_id: 17,
            timestamps_to_return: TimestampsToReturn::Both,
            items_to_create: vec![MonitoredItemCreateRequest {
                item_to_monitor: ReadValueId::value_of(NodeId::string(2, "Pressure")),
                monitoring_mode: MonitoringMode::Reporting,
                requested_parameters: MonitoringParameters {
                    client_handle: 1,
                    ..Default::default()
                },
            }],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xef, 0x02]);
        assert_eq!(Request::decode(&wire).unwrap(), req);

        let res = Response::CreateMonitoredItems(CreateMonitoredItemsResponse {
            response_header: ResponseHeader::default(),
            results: vec![MonitoredItemCreateResult {
                status_code: StatusCode::GOOD,
                monitored_item_id: 42,
                revised_sampling_interval: 250.0,
                revised_queue_size: 10,
                filter_result: ExtensionObject::null(),
            }],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xf2, 0x02]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }

    #[test]
    fn delete_subscriptions_round_trip() {
        let req = Request::DeleteSubscriptions(DeleteSubscriptionsRequest {
            request_header: RequestHeader::default(),
            subscription_ids: vec![17],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x4f, 0x03]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }

    #[test]
    fn delete_monitored_items_round_trip() {
        let req = Request::DeleteMonitoredItems(DeleteMonitoredItemsRequest {
            request_header: RequestHeader::default(),
            subscription_id: 17,
            monitored_item_ids: vec![42, 43],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x0d, 0x03]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }
}
