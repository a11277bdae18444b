// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Read and Write services.

use serde::{Deserialize, Serialize};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{DataValue, DiagnosticInfo, NodeId, QualifiedName};
use crate::error::DecodingError;
use crate::services::header::{RequestHeader, ResponseHeader};
use crate::status::StatusCode;

/// The Value attribute id; the default for reads and monitored items.
pub const ATTRIBUTE_ID_VALUE: u32 = 13;

/// Which timestamps the server should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamps only.
    Source,
    /// Server timestamps only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

impl TimestampsToReturn {
    /// Converts from the wire enumeration.
    pub fn from_u32(v: u32) -> Self {
        match v {
            0 => Self::Source,
            1 => Self::Server,
            3 => Self::Neither,
            _ => Self::Both,
        }
    }

    /// Converts to the wire enumeration.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Source => 0,
            Self::Server => 1,
            Self::Both => 2,
            Self::Neither => 3,
        }
    }
}

/// Identifies one attribute of one node to read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadValueId {
    /// The node to read.
    pub node_id: NodeId,
    /// Attribute id; [`ATTRIBUTE_ID_VALUE`] reads the value.
    pub attribute_id: u32,
    /// Index range for array slicing.
    pub index_range: Option<String>,
    /// Requested data encoding; the empty name selects the default.
    pub data_encoding: QualifiedName,
}

impl ReadValueId {
    /// Reads the Value attribute of `node_id` in the default encoding.
    pub fn value_of(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute_id: ATTRIBUTE_ID_VALUE,
            index_range: None,
            data_encoding: QualifiedName::default(),
        }
    }
}

impl BinaryEncode for ReadValueId {
    fn encode(&self, w: &mut Encoder) {
        self.node_id.encode(w);
        w.write_u32(self.attribute_id);
        w.write_str(self.index_range.as_deref());
        self.data_encoding.encode(w);
    }
}

impl BinaryDecode for ReadValueId {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            node_id: NodeId::decode(r)?,
            attribute_id: r.read_u32()?,
            index_range: r.read_str()?,
            data_encoding: QualifiedName::decode(r)?,
        })
    }
}

/// Reads attributes from a set of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// Oldest acceptable cached value age in milliseconds.
    pub max_age: f64,
    /// Timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// The reads to perform.
    pub nodes_to_read: Vec<ReadValueId>,
}

impl BinaryEncode for ReadRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_f64(self.max_age);
        w.write_u32(self.timestamps_to_return.as_u32());
        w.write_array(&self.nodes_to_read);
    }
}

impl BinaryDecode for ReadRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            max_age: r.read_f64()?,
            timestamps_to_return: TimestampsToReturn::from_u32(r.read_u32()?),
            nodes_to_read: r.read_array()?,
        })
    }
}

/// The values read, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One data value per requested read.
    pub results: Vec<DataValue>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for ReadResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for ReadResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}

/// One attribute write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    /// The node to write.
    pub node_id: NodeId,
    /// Attribute id.
    pub attribute_id: u32,
    /// Index range for array slicing.
    pub index_range: Option<String>,
    /// The value to write.
    pub value: DataValue,
}

impl BinaryEncode for WriteValue {
    fn encode(&self, w: &mut Encoder) {
        self.node_id.encode(w);
        w.write_u32(self.attribute_id);
        w.write_str(self.index_range.as_deref());
        self.value.encode(w);
    }
}

impl BinaryDecode for WriteValue {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            node_id: NodeId::decode(r)?,
            attribute_id: r.read_u32()?,
            index_range: r.read_str()?,
            value: DataValue::decode(r)?,
        })
    }
}

/// Writes attributes on a set of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The writes to perform.
    pub nodes_to_write: Vec<WriteValue>,
}

impl BinaryEncode for WriteRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        w.write_array(&self.nodes_to_write);
    }
}

impl BinaryDecode for WriteRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            nodes_to_write: r.read_array()?,
        })
    }
}

/// Per-write results, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One status per write.
    pub results: Vec<StatusCode>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for WriteResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for WriteResponse {
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
    use crate::builtin::Variant;
    use crate::services::{Request, Response};

    #[test]
    fn read_request_round_trip() {
        let req = Request::Read(ReadRequest {
            request_header: RequestHeader::default(),
            max_age: 0.0,
            timestamps_to_return: TimestampsToReturn::Both,
            nodes_to_read: vec![
                ReadValueId::value_of(NodeId::numeric(2, 1001)),
                ReadValueId {
                    node_id: NodeId::string(2, "Temperature"),
                    attribute_id: 1,
                    index_range: Some("0:3".into()),
                    data_encoding: QualifiedName::new(0, "Default Binary"),
                },
            ],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x77, 0x02]);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }

    #[test]
    fn read_response_round_trip() {
        let res = Response::Read(ReadResponse {
            response_header: ResponseHeader::default(),
            results: vec![
                DataValue::of(Variant::Double(25.5)),
                DataValue { status: Some(StatusCode::BAD_NODE_ID_UNKNOWN), ..Default::default() },
            ],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0x7a, 0x02]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }

    #[test]
    fn write_round_trip() {
        let req = Request::Write(WriteRequest {
            request_header: RequestHeader::default(),
            nodes_to_write: vec![WriteValue {
                node_id: NodeId::numeric(2, 1001),
                attribute_id: ATTRIBUTE_ID_VALUE,
                index_range: None,
                value: DataValue::of(Variant::Int32(42)),
            }],
        });
        let wire = req.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xa1, 0x02]);
        assert_eq!(Request::decode(&wire).unwrap(), req);

        let res = Response::Write(WriteResponse {
            response_header: ResponseHeader::default(),
            results: vec![StatusCode::GOOD],
            diagnostic_infos: Vec::new(),
        });
        let wire = res.encode();
        assert_eq!(&wire[..4], &[0x01, 0x00, 0xa4, 0x02]);
        assert_eq!(Response::decode(&wire).unwrap(), res);
    }

    #[test]
    fn timestamps_to_return_wire_values() {
        assert_eq!(TimestampsToReturn::Both.as_u32(), 2);
        assert_eq!(TimestampsToReturn::from_u32(0), TimestampsToReturn::Source);
        assert_eq!(TimestampsToReturn::from_u32(3), TimestampsToReturn::Neither);
    }
}
