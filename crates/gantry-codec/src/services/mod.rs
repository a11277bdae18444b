// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service request/response structures and type-id dispatch.
//!
//! Every service body begins with the `ExpandedNodeId` of its binary
//! encoding (four-byte form, namespace 0). [`Request::encode`] emits that
//! id followed by the body; [`Response::decode`] reads the id and
//! dispatches to the matching structure, failing with
//! [`DecodingError::UnknownServiceId`] for anything else. Callers that
//! expect a specific response pattern-match the [`Response`] enum; the
//! catch-all arm is the "invalid response type" error of the client layer.

mod attribute;
mod channel;
mod common;
mod discovery;
mod header;
mod history;
mod session;
mod subscription;
mod view;

pub use attribute::{
    ReadRequest, ReadResponse, ReadValueId, TimestampsToReturn, WriteRequest, WriteResponse,
    WriteValue, ATTRIBUTE_ID_VALUE,
};
pub use channel::{
    CloseSecureChannelRequest, CloseSecureChannelResponse, MessageSecurityMode,
    OpenSecureChannelRequest, OpenSecureChannelResponse, SecurityTokenRequestType,
};
pub use common::{
    ApplicationDescription, ApplicationType, ChannelSecurityToken, EndpointDescription,
    IdentityTokenObject, SignatureData, SignedSoftwareCertificate, UserTokenPolicy, UserTokenType,
};
pub use discovery::{GetEndpointsRequest, GetEndpointsResponse};
pub use header::{RequestHeader, ResponseHeader};
pub use history::{
    HistoryReadRequest, HistoryReadResponse, HistoryReadResult, HistoryReadValueId,
    ReadRawModifiedDetails,
};
pub use session::{
    ActivateSessionRequest, ActivateSessionResponse, CloseSessionRequest, CloseSessionResponse,
    CreateSessionRequest, CreateSessionResponse,
};
pub use subscription::{
    CreateMonitoredItemsRequest, CreateMonitoredItemsResponse, CreateSubscriptionRequest,
    CreateSubscriptionResponse, DataChangeNotification, DeleteMonitoredItemsRequest,
    DeleteMonitoredItemsResponse, DeleteSubscriptionsRequest, DeleteSubscriptionsResponse,
    EventFieldList, EventNotificationList, MonitoredItemCreateRequest, MonitoredItemCreateResult,
    MonitoredItemNotification, MonitoringMode, MonitoringParameters, NotificationData,
    NotificationMessage, PublishRequest, PublishResponse, StatusChangeNotification,
    SubscriptionAcknowledgement,
};
pub use view::{
    BrowseDescription, BrowseDirection, BrowseRequest, BrowseResponse, BrowseResult,
    ReferenceDescription, ViewDescription,
};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::ExpandedNodeId;
use crate::error::DecodingError;
use crate::status::StatusCode;

/// Binary encoding ids (`_Encoding_DefaultBinary`, namespace 0) for the
/// services and structures the client speaks.
pub mod ids {
    #![allow(missing_docs)]

    pub const GET_ENDPOINTS_REQUEST: u16 = 428;
    pub const GET_ENDPOINTS_RESPONSE: u16 = 431;
    pub const OPEN_SECURE_CHANNEL_REQUEST: u16 = 446;
    pub const OPEN_SECURE_CHANNEL_RESPONSE: u16 = 449;
    pub const CLOSE_SECURE_CHANNEL_REQUEST: u16 = 452;
    pub const CLOSE_SECURE_CHANNEL_RESPONSE: u16 = 455;
    pub const CREATE_SESSION_REQUEST: u16 = 461;
    pub const CREATE_SESSION_RESPONSE: u16 = 464;
    pub const ACTIVATE_SESSION_REQUEST: u16 = 467;
    pub const ACTIVATE_SESSION_RESPONSE: u16 = 470;
    pub const CLOSE_SESSION_REQUEST: u16 = 473;
    pub const CLOSE_SESSION_RESPONSE: u16 = 476;
    pub const BROWSE_REQUEST: u16 = 527;
    pub const BROWSE_RESPONSE: u16 = 530;
    pub const READ_REQUEST: u16 = 631;
    pub const READ_RESPONSE: u16 = 634;
    pub const HISTORY_READ_REQUEST: u16 = 664;
    pub const HISTORY_READ_RESPONSE: u16 = 667;
    pub const WRITE_REQUEST: u16 = 673;
    pub const WRITE_RESPONSE: u16 = 676;
    pub const CREATE_MONITORED_ITEMS_REQUEST: u16 = 751;
    pub const CREATE_MONITORED_ITEMS_RESPONSE: u16 = 754;
    pub const DELETE_MONITORED_ITEMS_REQUEST: u16 = 781;
    pub const DELETE_MONITORED_ITEMS_RESPONSE: u16 = 784;
    pub const CREATE_SUBSCRIPTION_REQUEST: u16 = 787;
    pub const CREATE_SUBSCRIPTION_RESPONSE: u16 = 790;
    pub const PUBLISH_REQUEST: u16 = 826;
    pub const PUBLISH_RESPONSE: u16 = 829;
    pub const DELETE_SUBSCRIPTIONS_REQUEST: u16 = 847;
    pub const DELETE_SUBSCRIPTIONS_RESPONSE: u16 = 850;

    pub const ANONYMOUS_IDENTITY_TOKEN: u16 = 321;
    pub const USER_NAME_IDENTITY_TOKEN: u16 = 324;
    pub const X509_IDENTITY_TOKEN: u16 = 327;
    pub const ISSUED_IDENTITY_TOKEN: u16 = 940;

    pub const READ_RAW_MODIFIED_DETAILS: u16 = 649;

    pub const DATA_CHANGE_NOTIFICATION: u16 = 811;
    pub const STATUS_CHANGE_NOTIFICATION: u16 = 820;
    pub const EVENT_NOTIFICATION_LIST: u16 = 916;
}

// =============================================================================
// Request
// =============================================================================

/// Every service request the client sends.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Request {
    OpenSecureChannel(OpenSecureChannelRequest),
    CloseSecureChannel(CloseSecureChannelRequest),
    GetEndpoints(GetEndpointsRequest),
    CreateSession(CreateSessionRequest),
    ActivateSession(ActivateSessionRequest),
    CloseSession(CloseSessionRequest),
    Read(ReadRequest),
    Write(WriteRequest),
    Browse(BrowseRequest),
    CreateSubscription(CreateSubscriptionRequest),
    DeleteSubscriptions(DeleteSubscriptionsRequest),
    Publish(PublishRequest),
    CreateMonitoredItems(CreateMonitoredItemsRequest),
    DeleteMonitoredItems(DeleteMonitoredItemsRequest),
    HistoryRead(HistoryReadRequest),
}

impl Request {
    /// Returns the binary encoding id of this request.
    pub fn type_id(&self) -> u16 {
        match self {
            Self::OpenSecureChannel(_) => ids::OPEN_SECURE_CHANNEL_REQUEST,
            Self::CloseSecureChannel(_) => ids::CLOSE_SECURE_CHANNEL_REQUEST,
            Self::GetEndpoints(_) => ids::GET_ENDPOINTS_REQUEST,
            Self::CreateSession(_) => ids::CREATE_SESSION_REQUEST,
            Self::ActivateSession(_) => ids::ACTIVATE_SESSION_REQUEST,
            Self::CloseSession(_) => ids::CLOSE_SESSION_REQUEST,
            Self::Read(_) => ids::READ_REQUEST,
            Self::Write(_) => ids::WRITE_REQUEST,
            Self::Browse(_) => ids::BROWSE_REQUEST,
            Self::CreateSubscription(_) => ids::CREATE_SUBSCRIPTION_REQUEST,
            Self::DeleteSubscriptions(_) => ids::DELETE_SUBSCRIPTIONS_REQUEST,
            Self::Publish(_) => ids::PUBLISH_REQUEST,
            Self::CreateMonitoredItems(_) => ids::CREATE_MONITORED_ITEMS_REQUEST,
            Self::DeleteMonitoredItems(_) => ids::DELETE_MONITORED_ITEMS_REQUEST,
            Self::HistoryRead(_) => ids::HISTORY_READ_REQUEST,
        }
    }

    /// Returns the service name for log fields.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::OpenSecureChannel(_) => "OpenSecureChannel",
            Self::CloseSecureChannel(_) => "CloseSecureChannel",
            Self::GetEndpoints(_) => "GetEndpoints",
            Self::CreateSession(_) => "CreateSession",
            Self::ActivateSession(_) => "ActivateSession",
            Self::CloseSession(_) => "CloseSession",
            Self::Read(_) => "Read",
            Self::Write(_) => "Write",
            Self::Browse(_) => "Browse",
            Self::CreateSubscription(_) => "CreateSubscription",
            Self::DeleteSubscriptions(_) => "DeleteSubscriptions",
            Self::Publish(_) => "Publish",
            Self::CreateMonitoredItems(_) => "CreateMonitoredItems",
            Self::DeleteMonitoredItems(_) => "DeleteMonitoredItems",
            Self::HistoryRead(_) => "HistoryRead",
        }
    }

    /// Returns the request header.
    pub fn request_header(&self) -> &RequestHeader {
        match self {
            Self::OpenSecureChannel(r) => &r.request_header,
            Self::CloseSecureChannel(r) => &r.request_header,
            Self::GetEndpoints(r) => &r.request_header,
            Self::CreateSession(r) => &r.request_header,
            Self::ActivateSession(r) => &r.request_header,
            Self::CloseSession(r) => &r.request_header,
            Self::Read(r) => &r.request_header,
            Self::Write(r) => &r.request_header,
            Self::Browse(r) => &r.request_header,
            Self::CreateSubscription(r) => &r.request_header,
            Self::DeleteSubscriptions(r) => &r.request_header,
            Self::Publish(r) => &r.request_header,
            Self::CreateMonitoredItems(r) => &r.request_header,
            Self::DeleteMonitoredItems(r) => &r.request_header,
            Self::HistoryRead(r) => &r.request_header,
        }
    }

    /// Returns the request header for mutation before sending.
    pub fn request_header_mut(&mut self) -> &mut RequestHeader {
        match self {
            Self::OpenSecureChannel(r) => &mut r.request_header,
            Self::CloseSecureChannel(r) => &mut r.request_header,
            Self::GetEndpoints(r) => &mut r.request_header,
            Self::CreateSession(r) => &mut r.request_header,
            Self::ActivateSession(r) => &mut r.request_header,
            Self::CloseSession(r) => &mut r.request_header,
            Self::Read(r) => &mut r.request_header,
            Self::Write(r) => &mut r.request_header,
            Self::Browse(r) => &mut r.request_header,
            Self::CreateSubscription(r) => &mut r.request_header,
            Self::DeleteSubscriptions(r) => &mut r.request_header,
            Self::Publish(r) => &mut r.request_header,
            Self::CreateMonitoredItems(r) => &mut r.request_header,
            Self::DeleteMonitoredItems(r) => &mut r.request_header,
            Self::HistoryRead(r) => &mut r.request_header,
        }
    }

    /// Encodes type id and body into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Encoder::with_capacity(128);
        ExpandedNodeId::four_byte(self.type_id()).encode(&mut w);
        match self {
            Self::OpenSecureChannel(r) => r.encode(&mut w),
            Self::CloseSecureChannel(r) => r.encode(&mut w),
            Self::GetEndpoints(r) => r.encode(&mut w),
            Self::CreateSession(r) => r.encode(&mut w),
            Self::ActivateSession(r) => r.encode(&mut w),
            Self::CloseSession(r) => r.encode(&mut w),
            Self::Read(r) => r.encode(&mut w),
            Self::Write(r) => r.encode(&mut w),
            Self::Browse(r) => r.encode(&mut w),
            Self::CreateSubscription(r) => r.encode(&mut w),
            Self::DeleteSubscriptions(r) => r.encode(&mut w),
            Self::Publish(r) => r.encode(&mut w),
            Self::CreateMonitoredItems(r) => r.encode(&mut w),
            Self::DeleteMonitoredItems(r) => r.encode(&mut w),
            Self::HistoryRead(r) => r.encode(&mut w),
        }
        w.into_bytes()
    }

    /// Decodes a request body from its leading type id. The client only
    /// needs this for tests and mock servers, but it keeps the codec
    /// symmetric.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodingError> {
        let mut r = Decoder::new(bytes);
        let type_id = ExpandedNodeId::decode(&mut r)?;
        let id = service_id(&type_id)?;
        let out = match id {
            ids::OPEN_SECURE_CHANNEL_REQUEST => {
                Self::OpenSecureChannel(OpenSecureChannelRequest::decode(&mut r)?)
            }
            ids::CLOSE_SECURE_CHANNEL_REQUEST => {
                Self::CloseSecureChannel(CloseSecureChannelRequest::decode(&mut r)?)
            }
            ids::GET_ENDPOINTS_REQUEST => Self::GetEndpoints(GetEndpointsRequest::decode(&mut r)?),
            ids::CREATE_SESSION_REQUEST => {
                Self::CreateSession(CreateSessionRequest::decode(&mut r)?)
            }
            ids::ACTIVATE_SESSION_REQUEST => {
                Self::ActivateSession(ActivateSessionRequest::decode(&mut r)?)
            }
            ids::CLOSE_SESSION_REQUEST => Self::CloseSession(CloseSessionRequest::decode(&mut r)?),
            ids::READ_REQUEST => Self::Read(ReadRequest::decode(&mut r)?),
            ids::WRITE_REQUEST => Self::Write(WriteRequest::decode(&mut r)?),
            ids::BROWSE_REQUEST => Self::Browse(BrowseRequest::decode(&mut r)?),
            ids::CREATE_SUBSCRIPTION_REQUEST => {
                Self::CreateSubscription(CreateSubscriptionRequest::decode(&mut r)?)
            }
            ids::DELETE_SUBSCRIPTIONS_REQUEST => {
                Self::DeleteSubscriptions(DeleteSubscriptionsRequest::decode(&mut r)?)
            }
            ids::PUBLISH_REQUEST => Self::Publish(PublishRequest::decode(&mut r)?),
            ids::CREATE_MONITORED_ITEMS_REQUEST => {
                Self::CreateMonitoredItems(CreateMonitoredItemsRequest::decode(&mut r)?)
            }
            ids::DELETE_MONITORED_ITEMS_REQUEST => {
                Self::DeleteMonitoredItems(DeleteMonitoredItemsRequest::decode(&mut r)?)
            }
            ids::HISTORY_READ_REQUEST => Self::HistoryRead(HistoryReadRequest::decode(&mut r)?),
            identifier => {
                return Err(DecodingError::UnknownServiceId {
                    namespace: type_id.node_id.namespace(),
                    identifier: identifier.into(),
                })
            }
        };
        if !r.is_exhausted() {
            return Err(DecodingError::TrailingBytes(r.remaining()));
        }
        Ok(out)
    }
}

// =============================================================================
// Response
// =============================================================================

/// Every service response the client understands.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Response {
    OpenSecureChannel(OpenSecureChannelResponse),
    CloseSecureChannel(CloseSecureChannelResponse),
    GetEndpoints(GetEndpointsResponse),
    CreateSession(CreateSessionResponse),
    ActivateSession(ActivateSessionResponse),
    CloseSession(CloseSessionResponse),
    Read(ReadResponse),
    Write(WriteResponse),
    Browse(BrowseResponse),
    CreateSubscription(CreateSubscriptionResponse),
    DeleteSubscriptions(DeleteSubscriptionsResponse),
    Publish(PublishResponse),
    CreateMonitoredItems(CreateMonitoredItemsResponse),
    DeleteMonitoredItems(DeleteMonitoredItemsResponse),
    HistoryRead(HistoryReadResponse),
}

impl Response {
    /// Returns the service name for log fields.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::OpenSecureChannel(_) => "OpenSecureChannelResponse",
            Self::CloseSecureChannel(_) => "CloseSecureChannelResponse",
            Self::GetEndpoints(_) => "GetEndpointsResponse",
            Self::CreateSession(_) => "CreateSessionResponse",
            Self::ActivateSession(_) => "ActivateSessionResponse",
            Self::CloseSession(_) => "CloseSessionResponse",
            Self::Read(_) => "ReadResponse",
            Self::Write(_) => "WriteResponse",
            Self::Browse(_) => "BrowseResponse",
            Self::CreateSubscription(_) => "CreateSubscriptionResponse",
            Self::DeleteSubscriptions(_) => "DeleteSubscriptionsResponse",
            Self::Publish(_) => "PublishResponse",
            Self::CreateMonitoredItems(_) => "CreateMonitoredItemsResponse",
            Self::DeleteMonitoredItems(_) => "DeleteMonitoredItemsResponse",
            Self::HistoryRead(_) => "HistoryReadResponse",
        }
    }

    /// Returns the response header.
    pub fn response_header(&self) -> &ResponseHeader {
        match self {
            Self::OpenSecureChannel(r) => &r.response_header,
            Self::CloseSecureChannel(r) => &r.response_header,
            Self::GetEndpoints(r) => &r.response_header,
            Self::CreateSession(r) => &r.response_header,
            Self::ActivateSession(r) => &r.response_header,
            Self::CloseSession(r) => &r.response_header,
            Self::Read(r) => &r.response_header,
            Self::Write(r) => &r.response_header,
            Self::Browse(r) => &r.response_header,
            Self::CreateSubscription(r) => &r.response_header,
            Self::DeleteSubscriptions(r) => &r.response_header,
            Self::Publish(r) => &r.response_header,
            Self::CreateMonitoredItems(r) => &r.response_header,
            Self::DeleteMonitoredItems(r) => &r.response_header,
            Self::HistoryRead(r) => &r.response_header,
        }
    }

    /// Returns the service result carried in the response header.
    pub fn service_result(&self) -> StatusCode {
        self.response_header().service_result
    }

    /// Encodes type id and body; used by tests and mock servers.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Encoder::with_capacity(128);
        let id = match self {
            Self::OpenSecureChannel(_) => ids::OPEN_SECURE_CHANNEL_RESPONSE,
            Self::CloseSecureChannel(_) => ids::CLOSE_SECURE_CHANNEL_RESPONSE,
            Self::GetEndpoints(_) => ids::GET_ENDPOINTS_RESPONSE,
            Self::CreateSession(_) => ids::CREATE_SESSION_RESPONSE,
            Self::ActivateSession(_) => ids::ACTIVATE_SESSION_RESPONSE,
            Self::CloseSession(_) => ids::CLOSE_SESSION_RESPONSE,
            Self::Read(_) => ids::READ_RESPONSE,
            Self::Write(_) => ids::WRITE_RESPONSE,
            Self::Browse(_) => ids::BROWSE_RESPONSE,
            Self::CreateSubscription(_) => ids::CREATE_SUBSCRIPTION_RESPONSE,
            Self::DeleteSubscriptions(_) => ids::DELETE_SUBSCRIPTIONS_RESPONSE,
            Self::Publish(_) => ids::PUBLISH_RESPONSE,
            Self::CreateMonitoredItems(_) => ids::CREATE_MONITORED_ITEMS_RESPONSE,
            Self::DeleteMonitoredItems(_) => ids::DELETE_MONITORED_ITEMS_RESPONSE,
            Self::HistoryRead(_) => ids::HISTORY_READ_RESPONSE,
        };
        ExpandedNodeId::four_byte(id).encode(&mut w);
        match self {
            Self::OpenSecureChannel(r) => r.encode(&mut w),
            Self::CloseSecureChannel(r) => r.encode(&mut w),
            Self::GetEndpoints(r) => r.encode(&mut w),
            Self::CreateSession(r) => r.encode(&mut w),
            Self::ActivateSession(r) => r.encode(&mut w),
            Self::CloseSession(r) => r.encode(&mut w),
            Self::Read(r) => r.encode(&mut w),
            Self::Write(r) => r.encode(&mut w),
            Self::Browse(r) => r.encode(&mut w),
            Self::CreateSubscription(r) => r.encode(&mut w),
            Self::DeleteSubscriptions(r) => r.encode(&mut w),
            Self::Publish(r) => r.encode(&mut w),
            Self::CreateMonitoredItems(r) => r.encode(&mut w),
            Self::DeleteMonitoredItems(r) => r.encode(&mut w),
            Self::HistoryRead(r) => r.encode(&mut w),
        }
        w.into_bytes()
    }

    /// Decodes a response body from its leading type id.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodingError> {
        let mut r = Decoder::new(bytes);
        let type_id = ExpandedNodeId::decode(&mut r)?;
        let id = service_id(&type_id)?;
        let out = match id {
            ids::OPEN_SECURE_CHANNEL_RESPONSE => {
                Self::OpenSecureChannel(OpenSecureChannelResponse::decode(&mut r)?)
            }
            ids::CLOSE_SECURE_CHANNEL_RESPONSE => {
                Self::CloseSecureChannel(CloseSecureChannelResponse::decode(&mut r)?)
            }
            ids::GET_ENDPOINTS_RESPONSE => {
                Self::GetEndpoints(GetEndpointsResponse::decode(&mut r)?)
            }
            ids::CREATE_SESSION_RESPONSE => {
                Self::CreateSession(CreateSessionResponse::decode(&mut r)?)
            }
            ids::ACTIVATE_SESSION_RESPONSE => {
                Self::ActivateSession(ActivateSessionResponse::decode(&mut r)?)
            }
            ids::CLOSE_SESSION_RESPONSE => {
                Self::CloseSession(CloseSessionResponse::decode(&mut r)?)
            }
            ids::READ_RESPONSE => Self::Read(ReadResponse::decode(&mut r)?),
            ids::WRITE_RESPONSE => Self::Write(WriteResponse::decode(&mut r)?),
            ids::BROWSE_RESPONSE => Self::Browse(BrowseResponse::decode(&mut r)?),
            ids::CREATE_SUBSCRIPTION_RESPONSE => {
                Self::CreateSubscription(CreateSubscriptionResponse::decode(&mut r)?)
            }
            ids::DELETE_SUBSCRIPTIONS_RESPONSE => {
                Self::DeleteSubscriptions(DeleteSubscriptionsResponse::decode(&mut r)?)
            }
            ids::PUBLISH_RESPONSE => Self::Publish(PublishResponse::decode(&mut r)?),
            ids::CREATE_MONITORED_ITEMS_RESPONSE => {
                Self::CreateMonitoredItems(CreateMonitoredItemsResponse::decode(&mut r)?)
            }
            ids::DELETE_MONITORED_ITEMS_RESPONSE => {
                Self::DeleteMonitoredItems(DeleteMonitoredItemsResponse::decode(&mut r)?)
            }
            ids::HISTORY_READ_RESPONSE => Self::HistoryRead(HistoryReadResponse::decode(&mut r)?),
            identifier => {
                return Err(DecodingError::UnknownServiceId {
                    namespace: type_id.node_id.namespace(),
                    identifier: identifier.into(),
                })
            }
        };
        if !r.is_exhausted() {
            return Err(DecodingError::TrailingBytes(r.remaining()));
        }
        Ok(out)
    }
}

fn service_id(type_id: &ExpandedNodeId) -> Result<u16, DecodingError> {
    let identifier = type_id.numeric_value().ok_or(DecodingError::NonNumericServiceId)?;
    u16::try_from(identifier).map_err(|_| DecodingError::UnknownServiceId {
        namespace: type_id.node_id.namespace(),
        identifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_service_id_is_reported() {
        // FourByte id 9999 with an empty body.
        let bytes = [0x01, 0x00, 0x0f, 0x27];
        let err = Response::decode(&bytes).unwrap_err();
        match err {
            DecodingError::UnknownServiceId { identifier, .. } => assert_eq!(identifier, 9999),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let response = Response::CloseSession(CloseSessionResponse {
            response_header: ResponseHeader::default(),
        });
        let mut wire = response.encode();
        assert_eq!(Response::decode(&wire).unwrap(), response);

        wire.extend_from_slice(&[0xde, 0xad, 0xbe]);
        let err = Response::decode(&wire).unwrap_err();
        match err {
            DecodingError::TrailingBytes(count) => assert_eq!(count, 3),
            other => panic!("unexpected error: {other}"),
        }

        let request = Request::CloseSession(CloseSessionRequest {
            request_header: RequestHeader::default(),
            delete_subscriptions: true,
        });
        let mut wire = request.encode();
        wire.push(0x00);
        assert!(matches!(
            Request::decode(&wire),
            Err(DecodingError::TrailingBytes(1))
        ));
    }

    #[test]
    fn request_header_accessors_share_one_header() {
        let mut req = Request::GetEndpoints(GetEndpointsRequest {
            request_header: RequestHeader::default(),
            endpoint_url: None,
            locale_ids: Vec::new(),
            profile_uris: Vec::new(),
        });
        req.request_header_mut().request_handle = 42;
        assert_eq!(req.request_header().request_handle, 42);
    }
}
