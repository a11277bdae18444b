// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse service.

use serde::{Deserialize, Serialize};

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::builtin::{DiagnosticInfo, ExpandedNodeId, LocalizedText, NodeId, QualifiedName, UaDateTime};
use crate::error::DecodingError;
use crate::services::header::{RequestHeader, ResponseHeader};
use crate::status::StatusCode;

/// Direction of references to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Follow references from source to target.
    #[default]
    Forward,
    /// Follow references from target to source.
    Inverse,
    /// Follow both directions.
    Both,
}

impl BrowseDirection {
    fn from_u32(v: u32) -> Self {
        match v {
            1 => Self::Inverse,
            2 => Self::Both,
            _ => Self::Forward,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Inverse => 1,
            Self::Both => 2,
        }
    }
}

/// The view to browse in; the null view is the whole address space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewDescription {
    /// View node; null for no view.
    pub view_id: NodeId,
    /// Server timestamp of the view version.
    pub timestamp: UaDateTime,
    /// View version; 0 for the current version.
    pub view_version: u32,
}

impl BinaryEncode for ViewDescription {
    fn encode(&self, w: &mut Encoder) {
        self.view_id.encode(w);
        self.timestamp.encode(w);
        w.write_u32(self.view_version);
    }
}

impl BinaryDecode for ViewDescription {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            view_id: NodeId::decode(r)?,
            timestamp: UaDateTime::decode(r)?,
            view_version: r.read_u32()?,
        })
    }
}

/// What to browse from one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseDescription {
    /// The node to browse from.
    pub node_id: NodeId,
    /// Direction of references to follow.
    pub browse_direction: BrowseDirection,
    /// Reference type filter; null for all references.
    pub reference_type_id: NodeId,
    /// Whether subtypes of the reference type are included.
    pub include_subtypes: bool,
    /// Node class filter bit mask; 0 for all classes.
    pub node_class_mask: u32,
    /// Which reference fields to return, as a bit mask.
    pub result_mask: u32,
}

impl BinaryEncode for BrowseDescription {
    fn encode(&self, w: &mut Encoder) {
        self.node_id.encode(w);
        w.write_u32(self.browse_direction.as_u32());
        self.reference_type_id.encode(w);
        w.write_bool(self.include_subtypes);
        w.write_u32(self.node_class_mask);
        w.write_u32(self.result_mask);
    }
}

impl BinaryDecode for BrowseDescription {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            node_id: NodeId::decode(r)?,
            browse_direction: BrowseDirection::from_u32(r.read_u32()?),
            reference_type_id: NodeId::decode(r)?,
            include_subtypes: r.read_bool()?,
            node_class_mask: r.read_u32()?,
            result_mask: r.read_u32()?,
        })
    }
}

/// One reference returned by a browse.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceDescription {
    /// The reference type.
    pub reference_type_id: NodeId,
    /// `true` when the reference is a forward reference.
    pub is_forward: bool,
    /// The target node.
    pub node_id: ExpandedNodeId,
    /// Browse name of the target.
    pub browse_name: QualifiedName,
    /// Display name of the target.
    pub display_name: LocalizedText,
    /// Node class of the target.
    pub node_class: u32,
    /// Type definition of the target, for objects and variables.
    pub type_definition: ExpandedNodeId,
}

impl BinaryEncode for ReferenceDescription {
    fn encode(&self, w: &mut Encoder) {
        self.reference_type_id.encode(w);
        w.write_bool(self.is_forward);
        self.node_id.encode(w);
        self.browse_name.encode(w);
        self.display_name.encode(w);
        w.write_u32(self.node_class);
        self.type_definition.encode(w);
    }
}

impl BinaryDecode for ReferenceDescription {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            reference_type_id: NodeId::decode(r)?,
            is_forward: r.read_bool()?,
            node_id: ExpandedNodeId::decode(r)?,
            browse_name: QualifiedName::decode(r)?,
            display_name: LocalizedText::decode(r)?,
            node_class: r.read_u32()?,
            type_definition: ExpandedNodeId::decode(r)?,
        })
    }
}

/// Result of browsing one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResult {
    /// Status of this browse.
    pub status_code: StatusCode,
    /// Continuation point when more references are available.
    pub continuation_point: Option<Vec<u8>>,
    /// The references found.
    pub references: Vec<ReferenceDescription>,
}

impl BinaryEncode for BrowseResult {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.status_code.0);
        w.write_byte_string(self.continuation_point.as_deref());
        w.write_array(&self.references);
    }
}

impl BinaryDecode for BrowseResult {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            status_code: StatusCode(r.read_u32()?),
            continuation_point: r.read_byte_string()?,
            references: r.read_array()?,
        })
    }
}

/// Browses references from a set of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseRequest {
    /// Common request header.
    pub request_header: RequestHeader,
    /// The view to browse in.
    pub view: ViewDescription,
    /// Per-node cap on returned references; 0 for no cap.
    pub requested_max_references_per_node: u32,
    /// The nodes to browse.
    pub nodes_to_browse: Vec<BrowseDescription>,
}

impl BinaryEncode for BrowseRequest {
    fn encode(&self, w: &mut Encoder) {
        self.request_header.encode(w);
        self.view.encode(w);
        w.write_u32(self.requested_max_references_per_node);
        w.write_array(&self.nodes_to_browse);
    }
}

impl BinaryDecode for BrowseRequest {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            request_header: RequestHeader::decode(r)?,
            view: ViewDescription::decode(r)?,
            requested_max_references_per_node: r.read_u32()?,
            nodes_to_browse: r.read_array()?,
        })
    }
}

/// Per-node browse results, index-aligned with the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResponse {
    /// Common response header.
    pub response_header: ResponseHeader,
    /// One result per browsed node.
    pub results: Vec<BrowseResult>,
    /// Diagnostics for the results.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl BinaryEncode for BrowseResponse {
    fn encode(&self, w: &mut Encoder) {
        self.response_header.encode(w);
        w.write_array(&self.results);
        w.write_array(&self.diagnostic_infos);
    }
}

impl BinaryDecode for BrowseResponse {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self {
            response_header: ResponseHeader::decode(r)?,
            results: r.read_array()?,
            diagnostic_infos: r.read_array()?,
        })
    }
}
