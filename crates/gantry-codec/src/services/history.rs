// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HistoryRead service with the raw/modified read details.

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{
    DiagnosticInfo, ExtensionObject, NodeId, QualifiedName, UaDateTime,
};
use crate::error::DecodingError;
use crate::services::attribute::TimestampsToReturn;
use crate::services::header::{RequestHeader, ResponseHeader};
use crate::services::ids;
use crate::status::StatusCode;

/// Bounds and limits for a raw or modified history read. Wrapped in an
/// extension object inside [`HistoryReadRequest`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadRawModifiedDetails {
    /// `false` reads raw values, `true` reads modifications.
    pub is_read_modified: bool,
    /// Beginning of the period to read.
    pub start_time: UaDateTime,
    /// End of the period to read.
    pub end_time: UaDateTime,
    /// Per-node cap on returned values; 0 for no cap.
    pub num_values_per_node: u32,
    /// Whether bounding values are returned.
    pub return_bounds: bool,
}

impl ReadRawModifiedDetails {
    /// Wraps the details in their binary extension object.
    pub fn to_extension_object(&self) -> ExtensionObject {
        ExtensionObject::from_encodable(ids::READ_RAW_MODIFIED_DETAILS, self)
    }
}

impl BinaryEncode for ReadRawModifiedDetails {
    fn encode(&self, w: &mut Encoder) {
        w.write_bool(self.is_read_modified);
        self.start_time.encode(w);
        self.end_time.encode(w);
        w.write_u32(self.num_values_per_node);
        w.write_bool(self.return_bounds);
    }
}

impl BinaryDecode for ReadRawModifiedDetails {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            is_read_modified: r.read_bool()?,
            start_time: UaDateTime::decode(r)?,
            end_time: UaDateTime::decode(r)?,
            num_values_per_node: r.read_u32()?,
            return_bounds: r.read_bool()?,
        })
    }
}

/// Identifies one node whose history is read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryReadValueId {
    /// The node to read history from.
    pub node_id: NodeId,
    /// Index range for array slicing.
    pub index_range: Option<String>,
    /// Requested data encoding.
    pub data_encoding: QualifiedName,
    /// Continuation point from a previous read.
    pub continuation_point: Option<Vec<u8>>,
}

impl BinaryEncode for HistoryReadValueId {
    fn encode(&self, w: &mut Encoder) {
        self.node_id.encode(w);
        w.write_str(self.index_range.as_deref());
        self.data_encoding.encode(w);
        w.write_byte_string(self.continuation_point.as_deref());
    }
}

impl BinaryDecode for HistoryReadValueId {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            node_id: NodeId::decode(r)?,
            index_range: r.read_str()?,
            data_encoding: QualifiedName::decode(r)?,
            continuation_point: r.read_byte_string()?,
        })
    }
}

/// Reads historical values or modifications.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryReadRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The read details, wrapped in an extension object.
    pub history_read_details: ExtensionObject,
    /// Timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// Whether to release the continuation points without reading.
    pub release_continuation_points: bool,
    /// The nodes to read.
    pub nodes_to_read: Vec<HistoryReadValueId>,
}

impl BinaryEncode for HistoryReadRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        self.history_read_details.encode(w);
        w.write_u32(self.timestamps_to_return.as_u32());
        w.write_bool(self.release_continuation_points);
        w.write_array(&self.nodes_to_read);
    }
}

impl BinaryDecode for HistoryReadRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            history_read_details: ExtensionObject::decode(r)?,
            timestamps_to_return: TimestampsToReturn::from_u32(r.read_u32()?),
            release_continuation_points: r.read_bool()?,
            nodes_to_read: r.read_array()?,
        })
    }
}

/// Result of reading one node's history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryReadResult {
    /// Status of this read.
    pub status_code: StatusCode,
    /// Continuation point when more history is available.
    pub continuation_point: Option<Vec<u8>>,
    /// The history data, wrapped in an extension object.
    pub history_data: ExtensionObject,
}

impl BinaryEncode for HistoryReadResult {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.status_code.0);
        w.write_byte_string(self.continuation_point.as_deref());
        self.history_data.encode(w);
    }
}

impl BinaryDecode for HistoryReadResult {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            status_code: StatusCode(r.read_u32()?),
            continuation_point: r.read_byte_string()?,
            history_data: ExtensionObject::decode(r)?,
        })
    }
}

/// Per-node history results, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryReadResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One result per read node.
    pub results: Vec<HistoryReadResult>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for HistoryReadResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for HistoryReadResponse {
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
    use crate::services::{Request, Response};

    #[test]
    fn details_extension_object_uses_binary_encoding() {
        let details = ReadRawModifiedDetails {
            is_read_modified: false,
            start_time: UaDateTime(0x01D4_30FD_DD67_9800),
            end_time: UaDateTime(0x01D4_30FD_DD67_9900),
            num_values_per_node: 100,
            return_bounds: true,
        };
        let obj = details.to_extension_object();
        assert_eq!(obj.type_id.numeric_value(), Some(649));
        assert!(obj.binary_body().is_some());
    }

    #[test]
    fn history_read_round_trip() {
        let details = ReadRawModifiedDetails {
            start_time: UaDateTime(1),
            end_time: UaDateTime(2),
            num_values_per_node: 10,
            ..Default::default()
        };
        let req = Request::HistoryRead(HistoryReadRequest {
            request_header: RequestHeader::default(),
            history_read_details: details.to_extension_object(),
            timestamps_to_return: TimestampsToReturn::Both,
            release_continuation_points: false,
            nodes_to_read: vec![HistoryReadValueId {
                node_id: NodeId::string(2, "Flow"),
                ..Default::default()
            }],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x98, 0x02]);
        assert_eq!(Request::decode(&wire).unwrap(), req);

        let res = Response::HistoryRead(HistoryReadResponse {
            response_header: ResponseHeader::default(),
            results: vec![HistoryReadResult {
                status_code: StatusCode::GOOD,
                continuation_point: Some(vec![0x01]),
                history_data: ExtensionObject::null(),
            }],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x9b, 0x02]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }
}
