// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame helpers for the endpoint byte stream.
//!
//! The sink is any `std::io::Write` (a `TcpStream`, a `BufWriter`, a
//! `Vec<u8>` in tests). Connection management stays with the caller.
//!
//! Frames:
//! - topic frame: `[topic string][u32 LE length][message bytes]`
//! - keepalive: 8 zero bytes (empty topic, empty payload)
//! - system command: `[command string][json string]` (see [`SysCommand`])

mod sys_command;

pub use sys_command::{write_sys_command, PublishRegistration, SysCommand};

use std::io::Write;

use crate::error::Result;
use crate::ser::{WireMessage, WireSerializer};

/// Empty topic name followed by an empty payload.
pub const KEEPALIVE_FRAME: [u8; 8] = [0u8; 8];

/// Write a keepalive frame (identical for every wire format).
pub fn write_keepalive<W: Write + ?Sized>(sink: &mut W) -> Result<()> {
    sink.write_all(&KEEPALIVE_FRAME)?;
    Ok(())
}

/// Encode one topic frame with `ser` and write it to `sink`.
///
/// Returns the number of bytes written.
pub fn write_topic_frame<M, W>(
    ser: &mut WireSerializer,
    sink: &mut W,
    topic: &str,
    message: &M,
) -> Result<usize>
where
    M: WireMessage + ?Sized,
    W: Write + ?Sized,
{
    ser.clear();
    ser.serialize_topic_message(topic, message);
    ser.send_to(sink)?;
    Ok(ser.len())
}
