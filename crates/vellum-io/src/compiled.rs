// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The precompiled binary asset container (`.uvc`).
//!
//! Layout, fixed by the format version tag:
//!
//! ```text
//! [0..4)   magic  b"UVC1"
//! [4..8)   u32 LE length of the processor-type name
//! [8..8+n) UTF-8 processor-type name
//! [8+n..)  processor-specific payload
//! ```
//!
//! The named processor's `read_precompiled` deserializes the payload,
//! letting a load bypass the import/process pipeline entirely.

use thiserror::Error;

/// The 4-byte magic identifying the container format version.
pub const MAGIC: [u8; 4] = *b"UVC1";

/// An error produced while parsing a precompiled container header.
///
/// All variants are hard parse errors; a corrupt container never degrades
/// to the raw-file pipeline.
#[derive(Debug, Error)]
pub enum CompiledError {
    /// The stream does not start with [`MAGIC`].
    #[error("Bad precompiled magic {found:?}, expected {MAGIC:?}")]
    BadMagic {
        /// The four bytes actually found.
        found: [u8; 4],
    },
    /// The stream ended before the header was complete.
    #[error("Precompiled container truncated at {len} bytes")]
    Truncated {
        /// Total length of the truncated stream.
        len: usize,
    },
    /// The processor-type name was not valid UTF-8.
    #[error("Precompiled processor name is not valid UTF-8")]
    BadName(#[from] std::str::Utf8Error),
}

/// The parsed fixed-size portion of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledHeader {
    /// Name of the processor able to deserialize the payload.
    pub processor: String,
    /// Byte offset at which the payload begins.
    pub payload_offset: usize,
}

/// Parses the container header from `bytes`.
///
/// # Errors
/// [`CompiledError`] on a wrong magic, a truncated stream, or a
/// non-UTF-8 processor name.
pub fn read_header(bytes: &[u8]) -> Result<CompiledHeader, CompiledError> {
    if bytes.len() < 8 {
        return Err(CompiledError::Truncated { len: bytes.len() });
    }
    let found: [u8; 4] = bytes[0..4].try_into().expect("slice length checked");
    if found != MAGIC {
        return Err(CompiledError::BadMagic { found });
    }
    let name_len = u32::from_le_bytes(bytes[4..8].try_into().expect("slice length checked")) as usize;
    let payload_offset = match 8usize.checked_add(name_len) {
        Some(offset) if offset <= bytes.len() => offset,
        _ => return Err(CompiledError::Truncated { len: bytes.len() }),
    };
    let processor = std::str::from_utf8(&bytes[8..payload_offset])?.to_string();
    Ok(CompiledHeader {
        processor,
        payload_offset,
    })
}

/// Splits `bytes` into the parsed header and the payload slice.
pub fn split(bytes: &[u8]) -> Result<(CompiledHeader, &[u8]), CompiledError> {
    let header = read_header(bytes)?;
    let payload = &bytes[header.payload_offset..];
    Ok((header, payload))
}

/// Frames `payload` into a container deserializable by `processor`.
pub fn write_container(processor: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + processor.len() + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(processor.len() as u32).to_le_bytes());
    out.extend_from_slice(processor.as_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bytes = write_container("blob", b"payload");
        let (header, payload) = split(&bytes).unwrap();
        assert_eq!(header.processor, "blob");
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn empty_payload() {
        let bytes = write_container("text", b"");
        let (header, payload) = split(&bytes).unwrap();
        assert_eq!(header.processor, "text");
        assert!(payload.is_empty());
    }

    #[test]
    fn wrong_magic_is_fatal() {
        let mut bytes = write_container("blob", b"x");
        bytes[0] = b'X';
        assert!(matches!(read_header(&bytes), Err(CompiledError::BadMagic { .. })));
    }

    #[test]
    fn truncated_header_is_fatal() {
        assert!(matches!(
            read_header(b"UVC"),
            Err(CompiledError::Truncated { len: 3 })
        ));
        // Name length pointing past the end of the stream.
        let mut bytes = Vec::from(MAGIC);
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"short");
        assert!(matches!(read_header(&bytes), Err(CompiledError::Truncated { .. })));
    }

    #[test]
    fn non_utf8_name_is_fatal() {
        let mut bytes = Vec::from(MAGIC);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(read_header(&bytes), Err(CompiledError::BadName(_))));
    }
}
