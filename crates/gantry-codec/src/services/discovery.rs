// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! GetEndpoints service.

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::error::DecodingError;
use crate::services::common::EndpointDescription;
use crate::services::header::{RequestHeader, ResponseHeader};

/// Asks a server for its endpoint descriptions. May be sent on a freshly
/// opened channel without a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetEndpointsRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The URL the client used to reach the server.
    pub endpoint_url: Option<String>,
    /// Locale filter; empty returns all locales.
    pub locale_ids: Vec<String>,
    /// Transport profile filter; empty returns all profiles.
    pub profile_uris: Vec<String>,
}

impl BinaryEncode for GetEndpointsRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_str(self.endpoint_url.as_deref());
        w.write_str_array(&self.locale_ids);
        w.write_str_array(&self.profile_uris);
    }
}

impl BinaryDecode for GetEndpointsRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            endpoint_url: r.read_str()?,
            locale_ids: r.read_str_array()?,
            profile_uris: r.read_str_array()?,
        })
    }
}

/// The server's endpoint descriptions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetEndpointsResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// Available endpoints.
    pub endpoints: Vec<EndpointDescription>,
}

impl BinaryEncode for GetEndpointsResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.endpoints);
    }
}

impl BinaryDecode for GetEndpointsResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            endpoints: r.read_array()?,
        })
    }
}
