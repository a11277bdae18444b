// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Codec error types.
//!
//! Encoding into a growable buffer cannot fail for well-formed values, so
//! [`EncodingError`] only covers limit violations. [`DecodingError`] covers
//! everything a hostile or truncated byte stream can produce.

use thiserror::Error;

/// Errors raised while encoding a structure.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A string, byte string or array exceeds the `i32` length prefix.
    #[error("value of {len} bytes exceeds the i32 length prefix")]
    LengthOverflow {
        /// Actual byte length.
        len: usize,
    },
}

/// Errors raised while decoding a byte stream.
#[derive(Debug, Error)]
pub enum DecodingError {
    /// The buffer ended before the value was complete.
    #[error("unexpected end of buffer: needed {needed} more bytes at offset {offset}")]
    UnexpectedEof {
        /// Bytes still required.
        needed: usize,
        /// Offset at which the read was attempted.
        offset: usize,
    },

    /// A length prefix was negative (other than the null marker) or
    /// larger than the remaining buffer.
    #[error("invalid length prefix {len} at offset {offset}")]
    InvalidLength {
        /// The declared length.
        len: i64,
        /// Offset of the prefix.
        offset: usize,
    },

    /// A string field did not contain valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// An enumeration field carried a value outside its defined range.
    #[error("invalid value {value} for {type_name}")]
    InvalidEnumValue {
        /// Name of the enumeration.
        type_name: &'static str,
        /// The offending value.
        value: i64,
    },

    /// A node id carried an unknown encoding byte.
    #[error("unknown node id encoding {0:#04x}")]
    UnknownNodeIdEncoding(u8),

    /// A variant carried an unknown type id.
    #[error("unknown variant type id {0}")]
    UnknownVariantType(u8),

    /// A service body led with an encoding id the codec does not know.
    #[error("unknown service encoding id ns={namespace};i={identifier}")]
    UnknownServiceId {
        /// Namespace index of the encoding id.
        namespace: u16,
        /// Numeric identifier of the encoding id.
        identifier: u32,
    },

    /// The service body's type id was not a numeric node id.
    #[error("service type id is not numeric")]
    NonNumericServiceId,

    /// Trailing bytes remained after a complete decode.
    #[error("{0} trailing bytes after complete value")]
    TrailingBytes(usize),
}

impl DecodingError {
    /// Returns `true` if the error indicates a truncated stream rather
    /// than a malformed one.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_predicate() {
        let eof = DecodingError::UnexpectedEof { needed: 4, offset: 0 };
        assert!(eof.is_truncation());
        assert!(!DecodingError::InvalidUtf8.is_truncation());
    }

    #[test]
    fn display_includes_context() {
        let err = DecodingError::UnknownServiceId { namespace: 0, identifier: 9999 };
        assert!(err.to_string().contains("9999"));
    }
}
