// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! UA built-in types and their binary forms.
//!
//! Node identifiers keep their wire form (two-byte, four-byte, numeric,
//! string, GUID, opaque) so that decode → encode reproduces the original
//! bytes exactly; the compact forms are never synthesized behind the
//! caller's back.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
use crate::error::DecodingError;
use crate::status::StatusCode;

// =============================================================================
// UaDateTime
// =============================================================================

/// Offset between the UA epoch (1601-01-01) and the Unix epoch, in seconds.
const EPOCH_DELTA_SECONDS: i64 = 11_644_473_600;

/// UA DateTime: 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UaDateTime(pub i64);

impl UaDateTime {
    /// The null timestamp.
    pub const NULL: UaDateTime = UaDateTime(0);

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts from a `chrono` timestamp, truncating below 100 ns.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp().saturating_add(EPOCH_DELTA_SECONDS);
        let ticks = secs
            .saturating_mul(10_000_000)
            .saturating_add(i64::from(dt.timestamp_subsec_nanos()) / 100);
        Self(ticks.max(0))
    }

    /// Converts to a `chrono` timestamp; the null value maps to the epoch.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(10_000_000) - EPOCH_DELTA_SECONDS;
        let nanos = (self.0.rem_euclid(10_000_000) * 100) as u32;
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
    }

    /// Returns `true` for the null timestamp.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for UaDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_datetime().to_rfc3339())
    }
}

impl BinaryEncode for UaDateTime {
    fn encode(&self, w: &mut Encoder) {
        w.write_i64(self.0);
    }
}

impl BinaryDecode for UaDateTime {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self(r.read_i64()?))
    }
}

// =============================================================================
// Guid
// =============================================================================

/// UA Guid, stored as a [`uuid::Uuid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Guid(pub Uuid);

impl Guid {
    /// Creates a random GUID.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BinaryEncode for Guid {
    fn encode(&self, w: &mut Encoder) {
        let (d1, d2, d3, d4) = self.0.as_fields();
        w.write_u32(d1);
        w.write_u16(d2);
        w.write_u16(d3);
        w.write_bytes(d4);
    }
}

impl BinaryDecode for Guid {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let d1 = r.read_u32()?;
        let d2 = r.read_u16()?;
        let d3 = r.read_u16()?;
        let mut d4 = [0u8; 8];
        d4.copy_from_slice(r.read_bytes(8)?);
        Ok(Self(Uuid::from_fields(d1, d2, d3, &d4)))
    }
}

impl BinaryEncode for StatusCode {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(self.0);
    }
}

impl BinaryDecode for StatusCode {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self(r.read_u32()?))
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// Node identifier, preserving its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// Two-byte form: numeric id 0..=255 in namespace 0.
    TwoByte(u8),
    /// Four-byte form: numeric id 0..=65535, namespace 0..=255.
    FourByte {
        /// Namespace index.
        namespace: u8,
        /// Numeric identifier.
        identifier: u16,
    },
    /// Full numeric form.
    Numeric {
        /// Namespace index.
        namespace: u16,
        /// Numeric identifier.
        identifier: u32,
    },
    /// String identifier.
    String {
        /// Namespace index.
        namespace: u16,
        /// String identifier, nullable on the wire.
        identifier: Option<String>,
    },
    /// GUID identifier.
    Guid {
        /// Namespace index.
        namespace: u16,
        /// GUID identifier.
        identifier: Guid,
    },
    /// Opaque (byte string) identifier.
    Opaque {
        /// Namespace index.
        namespace: u16,
        /// Opaque identifier, nullable on the wire.
        identifier: Option<Vec<u8>>,
    },
}

impl NodeId {
    /// The null node id (two-byte form, identifier 0).
    pub const fn null() -> Self {
        Self::TwoByte(0)
    }

    /// Creates a full numeric node id.
    pub const fn numeric(namespace: u16, identifier: u32) -> Self {
        Self::Numeric { namespace, identifier }
    }

    /// Creates a string node id.
    pub fn string(namespace: u16, identifier: impl Into<String>) -> Self {
        Self::String { namespace, identifier: Some(identifier.into()) }
    }

    /// Creates an opaque node id.
    pub fn opaque(namespace: u16, identifier: Vec<u8>) -> Self {
        Self::Opaque { namespace, identifier: Some(identifier) }
    }

    /// Returns the namespace index.
    pub fn namespace(&self) -> u16 {
        match self {
            Self::TwoByte(_) => 0,
            Self::FourByte { namespace, .. } => u16::from(*namespace),
            Self::Numeric { namespace, .. }
            | Self::String { namespace, .. }
            | Self::Guid { namespace, .. }
            | Self::Opaque { namespace, .. } => *namespace,
        }
    }

    /// Returns the numeric identifier for any of the numeric forms.
    pub fn numeric_value(&self) -> Option<u32> {
        match self {
            Self::TwoByte(id) => Some(u32::from(*id)),
            Self::FourByte { identifier, .. } => Some(u32::from(*identifier)),
            Self::Numeric { identifier, .. } => Some(*identifier),
            _ => None,
        }
    }

    /// Returns `true` for the null node id in any numeric form.
    pub fn is_null(&self) -> bool {
        self.namespace() == 0 && self.numeric_value() == Some(0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.namespace();
        if ns != 0 {
            write!(f, "ns={ns};")?;
        }
        match self {
            Self::TwoByte(_) | Self::FourByte { .. } | Self::Numeric { .. } => {
                write!(f, "i={}", self.numeric_value().unwrap_or(0))
            }
            Self::String { identifier, .. } => {
                write!(f, "s={}", identifier.as_deref().unwrap_or(""))
            }
            Self::Guid { identifier, .. } => write!(f, "g={identifier}"),
            Self::Opaque { identifier, .. } => {
                write!(f, "b=<{} bytes>", identifier.as_ref().map_or(0, Vec::len))
            }
        }
    }
}

impl BinaryEncode for NodeId {
    fn encode(&self, w: &mut Encoder) {
        match self {
            Self::TwoByte(id) => {
                w.write_u8(0x00);
                w.write_u8(*id);
            }
            Self::FourByte { namespace, identifier } => {
                w.write_u8(0x01);
                w.write_u8(*namespace);
                w.write_u16(*identifier);
            }
            Self::Numeric { namespace, identifier } => {
                w.write_u8(0x02);
                w.write_u16(*namespace);
                w.write_u32(*identifier);
            }
            Self::String { namespace, identifier } => {
                w.write_u8(0x03);
                w.write_u16(*namespace);
                w.write_str(identifier.as_deref());
            }
            Self::Guid { namespace, identifier } => {
                w.write_u8(0x04);
                w.write_u16(*namespace);
                identifier.encode(w);
            }
            Self::Opaque { namespace, identifier } => {
                w.write_u8(0x05);
                w.write_u16(*namespace);
                w.write_byte_string(identifier.as_deref());
            }
        }
    }
}

impl NodeId {
    /// Decodes the identifier body for a given encoding byte. The expanded
    /// node id decoder shares this after masking its flag bits.
    pub(crate) fn decode_with_encoding(
        encoding: u8,
        r: &mut Decoder<'_>,
    ) -> Result<Self, DecodingError> {
        match encoding {
            0x00 => Ok(Self::TwoByte(r.read_u8()?)),
            0x01 => Ok(Self::FourByte { namespace: r.read_u8()?, identifier: r.read_u16()? }),
            0x02 => Ok(Self::Numeric { namespace: r.read_u16()?, identifier: r.read_u32()? }),
            0x03 => Ok(Self::String { namespace: r.read_u16()?, identifier: r.read_str()? }),
            0x04 => Ok(Self::Guid { namespace: r.read_u16()?, identifier: Guid::decode(r)? }),
            0x05 => {
                Ok(Self::Opaque { namespace: r.read_u16()?, identifier: r.read_byte_string()? })
            }
            other => Err(DecodingError::UnknownNodeIdEncoding(other)),
        }
    }
}

impl BinaryDecode for NodeId {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let encoding = r.read_u8()?;
        Self::decode_with_encoding(encoding & 0x0f, r)
    }
}

// =============================================================================
// ExpandedNodeId
// =============================================================================

/// Expanded node id: a [`NodeId`] plus optional namespace URI and server
/// index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandedNodeId {
    /// The embedded node id.
    pub node_id: NodeId,
    /// Namespace URI; replaces the namespace index when present.
    pub namespace_uri: Option<String>,
    /// Server index; 0 means the local server.
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Creates a four-byte expanded node id in namespace 0. This is the
    /// form every service encoding id uses.
    pub const fn four_byte(identifier: u16) -> Self {
        Self {
            node_id: NodeId::FourByte { namespace: 0, identifier },
            namespace_uri: None,
            server_index: 0,
        }
    }

    /// Returns the numeric identifier of the embedded node id.
    pub fn numeric_value(&self) -> Option<u32> {
        self.node_id.numeric_value()
    }
}

impl BinaryEncode for ExpandedNodeId {
    fn encode(&self, w: &mut Encoder) {
        let mut inner = Encoder::new();
        self.node_id.encode(&mut inner);
        let mut bytes = inner.into_bytes();
        if self.namespace_uri.is_some() {
            bytes[0] |= 0x80;
        }
        if self.server_index != 0 {
            bytes[0] |= 0x40;
        }
        w.write_bytes(&bytes);
        if let Some(uri) = &self.namespace_uri {
            w.write_str(Some(uri));
        }
        if self.server_index != 0 {
            w.write_u32(self.server_index);
        }
    }
}

impl BinaryDecode for ExpandedNodeId {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let encoding = r.read_u8()?;
        let node_id = NodeId::decode_with_encoding(encoding & 0x0f, r)?;
        let namespace_uri = if encoding & 0x80 != 0 { r.read_str()? } else { None };
        let server_index = if encoding & 0x40 != 0 { r.read_u32()? } else { 0 };
        Ok(Self { node_id, namespace_uri, server_index })
    }
}

// =============================================================================
// QualifiedName / LocalizedText
// =============================================================================

/// Qualified name: namespace index plus name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// The name, nullable on the wire.
    pub name: Option<String>,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self { namespace_index, name: Some(name.into()) }
    }
}

impl BinaryEncode for QualifiedName {
    fn encode(&self, w: &mut Encoder) {
        w.write_u16(self.namespace_index);
        w.write_str(self.name.as_deref());
    }
}

impl BinaryDecode for QualifiedName {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(Self { namespace_index: r.read_u16()?, name: r.read_str()? })
    }
}

/// Localized text with optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalizedText {
    /// Locale id, e.g. `en-US`.
    pub locale: Option<String>,
    /// The text.
    pub text: Option<String>,
}

impl LocalizedText {
    /// Creates text without a locale.
    pub fn text(text: impl Into<String>) -> Self {
        Self { locale: None, text: Some(text.into()) }
    }
}

impl BinaryEncode for LocalizedText {
    fn encode(&self, w: &mut Encoder) {
        let mut mask = 0u8;
        if self.locale.is_some() {
            mask |= 0x01;
        }
        if self.text.is_some() {
            mask |= 0x02;
        }
        w.write_u8(mask);
        if let Some(locale) = &self.locale {
            w.write_str(Some(locale));
        }
        if let Some(text) = &self.text {
            w.write_str(Some(text));
        }
    }
}

impl BinaryDecode for LocalizedText {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let mask = r.read_u8()?;
        let locale = if mask & 0x01 != 0 { r.read_str()? } else { None };
        let text = if mask & 0x02 != 0 { r.read_str()? } else { None };
        Ok(Self { locale, text })
    }
}

// =============================================================================
// DiagnosticInfo
// =============================================================================

/// Diagnostic info. The client only ever writes the null form; the decoder
/// handles the populated form servers may return.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosticInfo {
    /// Index into the string table.
    pub symbolic_id: Option<i32>,
    /// Index into the string table.
    pub namespace_uri: Option<i32>,
    /// Index into the string table.
    pub locale: Option<i32>,
    /// Index into the string table.
    pub localized_text: Option<i32>,
    /// Vendor-specific detail.
    pub additional_info: Option<String>,
    /// Status of an inner operation.
    pub inner_status_code: Option<StatusCode>,
    /// Nested diagnostic info.
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl BinaryEncode for DiagnosticInfo {
    fn encode(&self, w: &mut Encoder) {
        let mut mask = 0u8;
        if self.symbolic_id.is_some() {
            mask |= 0x01;
        }
        if self.namespace_uri.is_some() {
            mask |= 0x02;
        }
        if self.localized_text.is_some() {
            mask |= 0x04;
        }
        if self.locale.is_some() {
            mask |= 0x08;
        }
        if self.additional_info.is_some() {
            mask |= 0x10;
        }
        if self.inner_status_code.is_some() {
            mask |= 0x20;
        }
        if self.inner_diagnostic_info.is_some() {
            mask |= 0x40;
        }
        w.write_u8(mask);
        if let Some(v) = self.symbolic_id {
            w.write_i32(v);
        }
        if let Some(v) = self.namespace_uri {
            w.write_i32(v);
        }
        if let Some(v) = self.locale {
            w.write_i32(v);
        }
        if let Some(v) = self.localized_text {
            w.write_i32(v);
        }
        if let Some(v) = &self.additional_info {
            w.write_str(Some(v));
        }
        if let Some(v) = self.inner_status_code {
            w.write_u32(v.0);
        }
        if let Some(v) = &self.inner_diagnostic_info {
            v.encode(w);
        }
    }
}

impl BinaryDecode for DiagnosticInfo {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let mask = r.read_u8()?;
        let mut out = Self::default();
        if mask & 0x01 != 0 {
            out.symbolic_id = Some(r.read_i32()?);
        }
        if mask & 0x02 != 0 {
            out.namespace_uri = Some(r.read_i32()?);
        }
        if mask & 0x08 != 0 {
            out.locale = Some(r.read_i32()?);
        }
        if mask & 0x04 != 0 {
            out.localized_text = Some(r.read_i32()?);
        }
        if mask & 0x10 != 0 {
            out.additional_info = r.read_str()?;
        }
        if mask & 0x20 != 0 {
            out.inner_status_code = Some(StatusCode(r.read_u32()?));
        }
        if mask & 0x40 != 0 {
            out.inner_diagnostic_info = Some(Box::new(DiagnosticInfo::decode(r)?));
        }
        Ok(out)
    }
}

// =============================================================================
// ExtensionObject
// =============================================================================

/// Body of an [`ExtensionObject`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtensionObjectBody {
    /// No body (encoding byte 0).
    #[default]
    None,
    /// Binary body (encoding byte 1): opaque until interpreted against the
    /// type id.
    Binary(Vec<u8>),
    /// XML body (encoding byte 2).
    Xml(Option<String>),
}

/// Extension object: a type id plus an optionally encoded body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionObject {
    /// The binary encoding id of the payload type.
    pub type_id: ExpandedNodeId,
    /// The payload.
    pub body: ExtensionObjectBody,
}

impl ExtensionObject {
    /// The null extension object.
    pub fn null() -> Self {
        Self::default()
    }

    /// Wraps an already-encoded binary body under `type_id`.
    pub fn binary(type_id: u16, body: Vec<u8>) -> Self {
        Self { type_id: ExpandedNodeId::four_byte(type_id), body: ExtensionObjectBody::Binary(body) }
    }

    /// Encodes `value` and wraps it under `type_id`.
    pub fn from_encodable<T: BinaryEncode>(type_id: u16, value: &T) -> Self {
        let mut w = Encoder::new();
        value.encode(&mut w);
        Self::binary(type_id, w.into_bytes())
    }

    /// Returns the binary body, if present.
    pub fn binary_body(&self) -> Option<&[u8]> {
        match &self.body {
            ExtensionObjectBody::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns `true` if the object carries no body.
    pub fn is_null(&self) -> bool {
        matches!(self.body, ExtensionObjectBody::None)
    }
}

impl BinaryEncode for ExtensionObject {
    fn encode(&self, w: &mut Encoder) {
        self.type_id.encode(w);
        match &self.body {
            ExtensionObjectBody::None => w.write_u8(0x00),
            ExtensionObjectBody::Binary(body) => {
                w.write_u8(0x01);
                w.write_byte_string(Some(body));
            }
            ExtensionObjectBody::Xml(body) => {
                w.write_u8(0x02);
                w.write_str(body.as_deref());
            }
        }
    }
}

impl BinaryDecode for ExtensionObject {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let type_id = ExpandedNodeId::decode(r)?;
        let encoding = r.read_u8()?;
        let body = match encoding {
            0x00 => ExtensionObjectBody::None,
            0x01 => ExtensionObjectBody::Binary(r.read_byte_string()?.unwrap_or_default()),
            0x02 => ExtensionObjectBody::Xml(r.read_str()?),
            other => {
                return Err(DecodingError::InvalidEnumValue {
                    type_name: "ExtensionObject encoding",
                    value: other.into(),
                })
            }
        };
        Ok(Self { type_id, body })
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A value of any built-in type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Boolean.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String.
    String(Option<String>),
    /// Timestamp.
    DateTime(UaDateTime),
    /// GUID.
    Guid(Guid),
    /// Byte string.
    ByteString(Option<Vec<u8>>),
    /// XML element.
    XmlElement(Option<String>),
    /// Node id.
    NodeId(Box<NodeId>),
    /// Expanded node id.
    ExpandedNodeId(Box<ExpandedNodeId>),
    /// Status code.
    StatusCode(StatusCode),
    /// Qualified name.
    QualifiedName(Box<QualifiedName>),
    /// Localized text.
    LocalizedText(Box<LocalizedText>),
    /// Extension object.
    ExtensionObject(Box<ExtensionObject>),
    /// Data value.
    DataValue(Box<DataValue>),
    /// Boxed variant.
    Variant(Box<Variant>),
    /// Diagnostic info.
    DiagnosticInfo(Box<DiagnosticInfo>),
    /// One-dimensional array of homogeneous variants.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the wire type id of this variant.
    fn type_id(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Boolean(_) => 1,
            Self::SByte(_) => 2,
            Self::Byte(_) => 3,
            Self::Int16(_) => 4,
            Self::UInt16(_) => 5,
            Self::Int32(_) => 6,
            Self::UInt32(_) => 7,
            Self::Int64(_) => 8,
            Self::UInt64(_) => 9,
            Self::Float(_) => 10,
            Self::Double(_) => 11,
            Self::String(_) => 12,
            Self::DateTime(_) => 13,
            Self::Guid(_) => 14,
            Self::ByteString(_) => 15,
            Self::XmlElement(_) => 16,
            Self::NodeId(_) => 17,
            Self::ExpandedNodeId(_) => 18,
            Self::StatusCode(_) => 19,
            Self::QualifiedName(_) => 20,
            Self::LocalizedText(_) => 21,
            Self::ExtensionObject(_) => 22,
            Self::DataValue(_) => 23,
            Self::Variant(_) => 24,
            Self::DiagnosticInfo(_) => 25,
            Self::Array(items) => items.first().map_or(0, Variant::type_id),
        }
    }

    fn encode_scalar_body(&self, w: &mut Encoder) {
        match self {
            Self::Empty | Self::Array(_) => {}
            Self::Boolean(v) => w.write_bool(*v),
            Self::SByte(v) => w.write_i8(*v),
            Self::Byte(v) => w.write_u8(*v),
            Self::Int16(v) => w.write_i16(*v),
            Self::UInt16(v) => w.write_u16(*v),
            Self::Int32(v) => w.write_i32(*v),
            Self::UInt32(v) => w.write_u32(*v),
            Self::Int64(v) => w.write_i64(*v),
            Self::UInt64(v) => w.write_u64(*v),
            Self::Float(v) => w.write_f32(*v),
            Self::Double(v) => w.write_f64(*v),
            Self::String(v) | Self::XmlElement(v) => w.write_str(v.as_deref()),
            Self::DateTime(v) => v.encode(w),
            Self::Guid(v) => v.encode(w),
            Self::ByteString(v) => w.write_byte_string(v.as_deref()),
            Self::NodeId(v) => v.encode(w),
            Self::ExpandedNodeId(v) => v.encode(w),
            Self::StatusCode(v) => w.write_u32(v.0),
            Self::QualifiedName(v) => v.encode(w),
            Self::LocalizedText(v) => v.encode(w),
            Self::ExtensionObject(v) => v.encode(w),
            Self::DataValue(v) => v.encode(w),
            Self::Variant(v) => v.encode(w),
            Self::DiagnosticInfo(v) => v.encode(w),
        }
    }

    fn decode_scalar_body(type_id: u8, r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        Ok(match type_id {
            0 => Self::Empty,
            1 => Self::Boolean(r.read_bool()?),
            2 => Self::SByte(r.read_i8()?),
            3 => Self::Byte(r.read_u8()?),
            4 => Self::Int16(r.read_i16()?),
            5 => Self::UInt16(r.read_u16()?),
            6 => Self::Int32(r.read_i32()?),
            7 => Self::UInt32(r.read_u32()?),
            8 => Self::Int64(r.read_i64()?),
            9 => Self::UInt64(r.read_u64()?),
            10 => Self::Float(r.read_f32()?),
            11 => Self::Double(r.read_f64()?),
            12 => Self::String(r.read_str()?),
            13 => Self::DateTime(UaDateTime::decode(r)?),
            14 => Self::Guid(Guid::decode(r)?),
            15 => Self::ByteString(r.read_byte_string()?),
            16 => Self::XmlElement(r.read_str()?),
            17 => Self::NodeId(Box::new(NodeId::decode(r)?)),
            18 => Self::ExpandedNodeId(Box::new(ExpandedNodeId::decode(r)?)),
            19 => Self::StatusCode(StatusCode(r.read_u32()?)),
            20 => Self::QualifiedName(Box::new(QualifiedName::decode(r)?)),
            21 => Self::LocalizedText(Box::new(LocalizedText::decode(r)?)),
            22 => Self::ExtensionObject(Box::new(ExtensionObject::decode(r)?)),
            23 => Self::DataValue(Box::new(DataValue::decode(r)?)),
            24 => Self::Variant(Box::new(Variant::decode(r)?)),
            25 => Self::DiagnosticInfo(Box::new(DiagnosticInfo::decode(r)?)),
            other => return Err(DecodingError::UnknownVariantType(other)),
        })
    }
}

impl BinaryEncode for Variant {
    fn encode(&self, w: &mut Encoder) {
        match self {
            Self::Array(items) => {
                w.write_u8(self.type_id() | 0x80);
                w.write_i32(items.len() as i32);
                for item in items {
                    item.encode_scalar_body(w);
                }
            }
            scalar => {
                w.write_u8(scalar.type_id());
                scalar.encode_scalar_body(w);
            }
        }
    }
}

impl BinaryDecode for Variant {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let encoding = r.read_u8()?;
        let type_id = encoding & 0x3f;
        if encoding & 0x80 != 0 {
            let offset = r.position();
            let count = r.read_i32()?;
            let count = match count {
                -1 => 0,
                n if n < 0 => {
                    return Err(DecodingError::InvalidLength { len: n.into(), offset })
                }
                n => n as usize,
            };
            let mut items = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                items.push(Self::decode_scalar_body(type_id, r)?);
            }
            // Array dimensions are not produced by any service the client
            // speaks; consume and discard if a server sends them.
            if encoding & 0x40 != 0 {
                let _dims: Vec<u32> = r.read_array()?;
            }
            Ok(Self::Array(items))
        } else {
            Self::decode_scalar_body(type_id, r)
        }
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value with status and timestamps, encoded behind a presence mask.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// The value.
    pub value: Option<Variant>,
    /// Status of the value; absent means Good.
    pub status: Option<StatusCode>,
    /// Timestamp from the data source.
    pub source_timestamp: Option<UaDateTime>,
    /// Sub-10µs resolution for the source timestamp.
    pub source_picoseconds: Option<u16>,
    /// Timestamp assigned by the server.
    pub server_timestamp: Option<UaDateTime>,
    /// Sub-10µs resolution for the server timestamp.
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// Creates a data value carrying only a variant.
    pub fn of(value: Variant) -> Self {
        Self { value: Some(value), ..Default::default() }
    }

    /// Returns the effective status: explicit status or Good.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::GOOD)
    }
}

impl BinaryEncode for DataValue {
    fn encode(&self, w: &mut Encoder) {
        let mut mask = 0u8;
        if self.value.is_some() {
            mask |= 0x01;
        }
        if self.status.is_some() {
            mask |= 0x02;
        }
        if self.source_timestamp.is_some() {
            mask |= 0x04;
        }
        if self.server_timestamp.is_some() {
            mask |= 0x08;
        }
        if self.source_picoseconds.is_some() {
            mask |= 0x10;
        }
        if self.server_picoseconds.is_some() {
            mask |= 0x20;
        }
        w.write_u8(mask);
        if let Some(v) = &self.value {
            v.encode(w);
        }
        if let Some(v) = self.status {
            w.write_u32(v.0);
        }
        if let Some(v) = self.source_timestamp {
            v.encode(w);
        }
        if let Some(v) = self.source_picoseconds {
            w.write_u16(v);
        }
        if let Some(v) = self.server_timestamp {
            v.encode(w);
        }
        if let Some(v) = self.server_picoseconds {
            w.write_u16(v);
        }
    }
}

impl BinaryDecode for DataValue {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        let mask = r.read_u8()?;
        let mut out = Self::default();
        if mask & 0x01 != 0 {
            out.value = Some(Variant::decode(r)?);
        }
        if mask & 0x02 != 0 {
            out.status = Some(StatusCode(r.read_u32()?));
        }
        if mask & 0x04 != 0 {
            out.source_timestamp = Some(UaDateTime::decode(r)?);
        }
        if mask & 0x10 != 0 {
            out.source_picoseconds = Some(r.read_u16()?);
        }
        if mask & 0x08 != 0 {
            out.server_timestamp = Some(UaDateTime::decode(r)?);
        }
        if mask & 0x20 != 0 {
            out.server_picoseconds = Some(r.read_u16()?);
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: BinaryEncode + BinaryDecode + PartialEq + fmt::Debug>(value: T) {
        let mut w = Encoder::new();
        value.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Decoder::new(&bytes);
        let back = T::decode(&mut r).unwrap();
        assert_eq!(value, back);
        assert!(r.is_exhausted(), "{} trailing bytes", r.remaining());
    }

    #[test]
    fn datetime_matches_reference_ticks() {
        // 2018-08-10T23:00:00Z from the protocol reference captures.
        let dt = Utc.with_ymd_and_hms(2018, 8, 10, 23, 0, 0).unwrap();
        let ua = UaDateTime::from_datetime(dt);
        assert_eq!(ua.0, 0x01D4_30FD_DD67_9800);
        assert_eq!(ua.as_datetime(), dt);

        let mut w = Encoder::new();
        ua.encode(&mut w);
        assert_eq!(w.into_bytes(), [0x00, 0x98, 0x67, 0xdd, 0xfd, 0x30, 0xd4, 0x01]);
    }

    #[test]
    fn node_id_forms_round_trip() {
        round_trip(NodeId::TwoByte(84));
        round_trip(NodeId::FourByte { namespace: 0, identifier: 446 });
        round_trip(NodeId::numeric(2, 1001));
        round_trip(NodeId::string(2, "Temperature.Value"));
        round_trip(NodeId::Guid { namespace: 3, identifier: Guid::new_random() });
        round_trip(NodeId::opaque(1, vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn null_node_id_is_two_bytes() {
        let mut w = Encoder::new();
        NodeId::null().encode(&mut w);
        assert_eq!(w.into_bytes(), [0x00, 0x00]);
    }

    #[test]
    fn numeric_form_is_preserved() {
        // id=1 ns=0 fits the two-byte form but must keep its full form.
        let bytes = [0x02, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        let mut r = Decoder::new(&bytes);
        let id = NodeId::decode(&mut r).unwrap();
        assert_eq!(id, NodeId::numeric(0, 1));
        let mut w = Encoder::new();
        id.encode(&mut w);
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn service_type_id_encoding() {
        let mut w = Encoder::new();
        ExpandedNodeId::four_byte(446).encode(&mut w);
        assert_eq!(w.into_bytes(), [0x01, 0x00, 0xbe, 0x01]);
    }

    #[test]
    fn expanded_node_id_flags() {
        round_trip(ExpandedNodeId {
            node_id: NodeId::numeric(1, 7),
            namespace_uri: Some("urn:gantry:test".into()),
            server_index: 3,
        });
    }

    #[test]
    fn localized_text_text_only() {
        let lt = LocalizedText::text("app-name");
        let mut w = Encoder::new();
        lt.encode(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 0x02);
        round_trip(lt);
    }

    #[test]
    fn extension_object_null_is_three_bytes() {
        let mut w = Encoder::new();
        ExtensionObject::null().encode(&mut w);
        assert_eq!(w.into_bytes(), [0x00, 0x00, 0x00]);
    }

    #[test]
    fn variant_scalars_round_trip() {
        round_trip(Variant::Boolean(true));
        round_trip(Variant::Double(3.14159));
        round_trip(Variant::String(Some("hello".into())));
        round_trip(Variant::String(None));
        round_trip(Variant::StatusCode(StatusCode::GOOD));
        round_trip(Variant::NodeId(Box::new(NodeId::string(2, "x"))));
    }

    #[test]
    fn variant_array_round_trip() {
        round_trip(Variant::Array(vec![
            Variant::Int32(1),
            Variant::Int32(2),
            Variant::Int32(3),
        ]));
    }

    #[test]
    fn data_value_mask_round_trip() {
        round_trip(DataValue {
            value: Some(Variant::Double(25.5)),
            status: Some(StatusCode::GOOD),
            source_timestamp: Some(UaDateTime(0x01D4_30FD_DD67_9800)),
            server_timestamp: Some(UaDateTime(0x01D4_30FD_DD67_9801)),
            ..Default::default()
        });
        round_trip(DataValue::default());
    }

    #[test]
    fn diagnostic_info_null_and_populated() {
        let mut w = Encoder::new();
        DiagnosticInfo::default().encode(&mut w);
        assert_eq!(w.into_bytes(), [0x00]);

        round_trip(DiagnosticInfo {
            symbolic_id: Some(2),
            additional_info: Some("detail".into()),
            inner_status_code: Some(StatusCode::BAD_INTERNAL_ERROR),
            inner_diagnostic_info: Some(Box::new(DiagnosticInfo {
                symbolic_id: Some(1),
                ..Default::default()
            })),
            ..Default::default()
        });
    }
}
