// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire encoder for outgoing ROS TCP frames.
//!
//! [`WireSerializer`] accumulates an ordered list of byte chunks. The wire
//! family ([`WireFormat`]) is chosen once at construction and consulted at
//! every decision point:
//!
//! | Item            | Legacy                  | CDR                                        |
//! |-----------------|-------------------------|--------------------------------------------|
//! | numeric field   | LE bytes                | zero padding to `size`, then LE bytes      |
//! | string          | `[u32 n][bytes]`        | align 4, `[u32 n+1][bytes][0x00]`          |
//! | sequence count  | `[u32 count]`           | align 4, `[u32 count]`                     |
//! | message body    | fields                  | `00 01 00 00`, fields, optional 4-byte pad |
//!
//! Alignment is relative to the start of the message body: the
//! encapsulation header (and anything written before it, such as the topic
//! name) is folded into a length correction and never shifts field padding.
//!
//! The length prefix of a frame is reserved as a placeholder chunk and
//! patched once the body is complete, so message fields are visited once.

mod primitive;

pub use primitive::Primitive;

use std::io::Write;
use std::sync::Arc;

use crate::config::WireFormat;
use crate::error::Result;

/// CDR encapsulation header: little-endian CDR, options 0.
pub const CDR_LE_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// Compatibility pad appended after CDR bodies when enabled.
pub const TRAILING_PAD: [u8; 4] = [0x00; 4];

/// Initial capacity of a freshly opened chunk.
const CHUNK_HINT: usize = 256;

/// Capability of a message type to encode itself.
///
/// Implementations write their fields in declaration order using the
/// `write*` methods. Sequence fields call
/// [`write_length`](WireSerializer::write_length) before their elements.
///
/// ```rust
/// use rostcp::{WireMessage, WireSerializer};
///
/// struct Point { x: f64, y: f64, z: f64 }
///
/// impl WireMessage for Point {
///     fn serialize_into(&self, ser: &mut WireSerializer) {
///         ser.write(self.x);
///         ser.write(self.y);
///         ser.write(self.z);
///     }
/// }
/// ```
pub trait WireMessage {
    fn serialize_into(&self, ser: &mut WireSerializer);
}

impl<M: WireMessage + ?Sized> WireMessage for &M {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        (**self).serialize_into(ser);
    }
}

impl<M: WireMessage + ?Sized> WireMessage for Box<M> {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        (**self).serialize_into(ser);
    }
}

impl<M: WireMessage + ?Sized> WireMessage for Arc<M> {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        (**self).serialize_into(ser);
    }
}

/// Reusable chunked encoder.
///
/// Call [`clear`](Self::clear) between messages. `None` chunks are length
/// placeholders that have not been patched yet.
///
/// Length and count fields are 32-bit on the wire, so a single string,
/// sequence or message body must stay below 4 GiB. Larger values trip a
/// debug assertion and are saturated to `u32::MAX` in release builds.
#[derive(Debug, Clone)]
pub struct WireSerializer {
    format: WireFormat,
    chunks: Vec<Option<Vec<u8>>>,
    alignment_offset: usize,
    length_correction: usize,
    trailing_pad: bool,
}

/// Convert a length or count to its 32-bit wire value.
fn wire_u32(value: usize) -> u32 {
    debug_assert!(
        u32::try_from(value).is_ok(),
        "wire length {} exceeds the 32-bit field",
        value
    );
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl Default for WireSerializer {
    fn default() -> Self {
        Self::new(WireFormat::default())
    }
}

impl WireSerializer {
    #[must_use]
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            chunks: Vec::new(),
            alignment_offset: 0,
            length_correction: 0,
            trailing_pad: false,
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Reset to the freshly constructed state (the wire format is kept).
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.alignment_offset = 0;
        self.length_correction = 0;
        self.trailing_pad = false;
    }

    /// Total encoded length, placeholders included.
    pub fn len(&self) -> usize {
        self.alignment_offset + self.length_correction
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset used for alignment (relative to the current message body).
    pub fn alignment_offset(&self) -> usize {
        self.alignment_offset
    }

    /// Enable the 4-byte CDR compatibility pad for the next message.
    pub fn set_trailing_pad(&mut self, enabled: bool) {
        self.trailing_pad = enabled;
    }

    pub fn trailing_pad(&self) -> bool {
        self.trailing_pad
    }

    /// Append `len` bytes produced by `fill` and advance the offset.
    fn append_with<F>(&mut self, len: usize, fill: F)
    where
        F: FnOnce(&mut Vec<u8>),
    {
        match self.chunks.last_mut() {
            Some(Some(buf)) => {
                buf.reserve(len);
                fill(buf);
            }
            _ => {
                let mut buf = Vec::with_capacity(len.max(CHUNK_HINT));
                fill(&mut buf);
                self.chunks.push(Some(buf));
            }
        }
        self.alignment_offset += len;
    }

    /// Insert zero padding so the next `data_size`-byte value is aligned.
    ///
    /// No-op for the legacy format and for one-byte values.
    pub fn align(&mut self, data_size: usize) {
        if !self.format.is_cdr() || data_size <= 1 {
            return;
        }
        let padding = (data_size - self.alignment_offset % data_size) % data_size;
        if padding > 0 {
            self.append_with(padding, |buf| buf.resize(buf.len() + padding, 0));
        }
    }

    /// Write one primitive value (aligned to its size in CDR).
    pub fn write<T: Primitive>(&mut self, value: T) {
        self.align(T::SIZE);
        self.append_with(T::SIZE, |buf| value.put_le(buf));
    }

    /// Write packed array elements without a count.
    ///
    /// Empty arrays emit nothing, not even alignment padding.
    pub fn write_slice<T: Primitive>(&mut self, values: &[T]) {
        if values.is_empty() {
            return;
        }
        self.align(T::SIZE);
        self.append_with(T::SIZE * values.len(), |buf| {
            for value in values {
                value.put_le(buf);
            }
        });
    }

    /// Write raw bytes (a `uint8[]` body) without a count.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.append_with(bytes.len(), |buf| buf.extend_from_slice(bytes));
    }

    /// Write each nested message in order, no array-level alignment.
    pub fn write_messages<M: WireMessage>(&mut self, messages: &[M]) {
        for message in messages {
            message.serialize_into(self);
        }
    }

    /// Write a sequence element count (always 4-byte aligned in CDR).
    pub fn write_length(&mut self, count: usize) {
        self.align(4);
        let count = wire_u32(count);
        self.append_with(4, |buf| buf.extend_from_slice(&count.to_le_bytes()));
    }

    /// Write a UTF-8 string (4-byte aligned in CDR).
    pub fn write_str(&mut self, value: &str) {
        self.align(4);
        self.write_str_unaligned(value);
    }

    /// Write a string whose alignment the caller already guarantees.
    pub fn write_str_unaligned(&mut self, value: &str) {
        let bytes = value.as_bytes();
        if self.format.is_cdr() {
            let wire_len = wire_u32(bytes.len() + 1);
            self.append_with(4 + bytes.len() + 1, |buf| {
                buf.extend_from_slice(&wire_len.to_le_bytes());
                buf.extend_from_slice(bytes);
                buf.push(0);
            });
        } else {
            let wire_len = wire_u32(bytes.len());
            self.append_with(4 + bytes.len(), |buf| {
                buf.extend_from_slice(&wire_len.to_le_bytes());
                buf.extend_from_slice(bytes);
            });
        }
    }

    /// Write each string in order; the count is written separately.
    pub fn write_strs<S: AsRef<str>>(&mut self, values: &[S]) {
        for value in values {
            self.write_str(value.as_ref());
        }
    }

    /// Encode a message body.
    ///
    /// CDR: encapsulation header first (not counted for alignment), then the
    /// fields, then the trailing pad if enabled.
    pub fn serialize_message<M: WireMessage + ?Sized>(&mut self, message: &M) {
        if self.format.is_cdr() {
            self.length_correction += self.alignment_offset;
            self.alignment_offset = 0;
            self.append_with(CDR_LE_HEADER.len(), |buf| buf.extend_from_slice(&CDR_LE_HEADER));
            self.length_correction += self.alignment_offset;
            self.alignment_offset = 0;
        }

        message.serialize_into(self);

        if self.format.is_cdr() && self.trailing_pad {
            self.append_with(TRAILING_PAD.len(), |buf| buf.extend_from_slice(&TRAILING_PAD));
        }
    }

    /// Encode a message body behind a 4-byte little-endian length prefix.
    ///
    /// The prefix is reserved first and patched with the exact number of
    /// bytes written after it.
    pub fn serialize_message_with_length<M: WireMessage + ?Sized>(&mut self, message: &M) {
        let slot = self.chunks.len();
        self.chunks.push(None);
        self.length_correction += 4;
        let preamble = self.len();

        self.serialize_message(message);

        let body = wire_u32(self.len() - preamble);
        if let Some(entry) = self.chunks.get_mut(slot) {
            *entry = Some(body.to_le_bytes().to_vec());
        }
    }

    /// Encode a full topic frame: `[topic][u32 length][message bytes]`.
    pub fn serialize_topic_message<M: WireMessage + ?Sized>(&mut self, topic: &str, message: &M) {
        self.write_str_unaligned(topic);
        self.serialize_message_with_length(message);
    }

    /// Concatenate all chunks into one buffer of `len()` bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in self.chunks.iter().flatten() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Independent copy of the chunk list (placeholders skipped).
    #[must_use]
    pub fn byte_sequence(&self) -> Vec<Vec<u8>> {
        self.chunks.iter().flatten().cloned().collect()
    }

    /// Write every non-empty chunk to `sink`, in order.
    pub fn send_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        for chunk in self.chunks.iter().flatten() {
            if !chunk.is_empty() {
                sink.write_all(chunk)?;
            }
        }
        Ok(())
    }
}
