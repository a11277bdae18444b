// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA binary codec for the GANTRY client stack.
//!
//! This crate implements the IEC 62541 Part 6 binary encoding for the
//! built-in types and the service structures the client core speaks:
//!
//! - **Built-in types**: integers, floats, strings, `DateTime` (1601-epoch
//!   ticks), `Guid`, `NodeId`/`ExpandedNodeId`, `QualifiedName`,
//!   `LocalizedText`, `ExtensionObject`, `Variant`, `DataValue`
//! - **Status codes**: `StatusCode` with severity predicates and the named
//!   constants the client relies on
//! - **Services**: secure channel, session, discovery, attribute, view,
//!   subscription and history services, plus the [`Request`]/[`Response`]
//!   sum types used for type-safe dispatch
//!
//! All encoding is little-endian. Strings and byte strings carry an `i32`
//! length prefix where `-1` denotes null; structures encode as field-order
//! concatenation; every service body leads with the `ExpandedNodeId` of its
//! binary encoding.
//!
//! # Example
//!
//! ```
//! use gantry_codec::services::{GetEndpointsRequest, Request};
//!
//! let req = Request::GetEndpoints(GetEndpointsRequest {
//!     request_header: Default::default(),
//!     endpoint_url: Some("opc.tcp://localhost:4840".into()),
//!     locale_ids: Vec::new(),
//!     profile_uris: Vec::new(),
//! });
//! let wire = req.encode();
//! assert_eq!(&wire[..4], &[0x01, 0x00, 0xac, 0x01]);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod builtin;
pub mod error;
pub mod services;
pub mod status;

pub use buffer::{BinaryDecode, BinaryEncode, Decoder, Encoder};
pub use builtin::{
    DataValue, DiagnosticInfo, ExpandedNodeId, ExtensionObject, Guid, LocalizedText, NodeId,
    QualifiedName, UaDateTime, Variant,
};
pub use error::{DecodingError, EncodingError};
pub use status::StatusCode;
