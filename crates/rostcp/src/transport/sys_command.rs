// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! System commands understood by the endpoint.
//!
//! Command names start with `__` so they never collide with ROS topics.
//! Parameters travel as a JSON string.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::ser::WireSerializer;

/// Announces a topic the connector will publish on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishRegistration {
    pub topic: String,
    /// Fully qualified message type, e.g. `std_msgs/String`.
    pub message_name: String,
    pub queue_size: usize,
    pub latch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysCommand {
    Publish(PublishRegistration),
}

impl SysCommand {
    pub const PUBLISH: &'static str = "__publish";

    pub fn name(&self) -> &'static str {
        match self {
            SysCommand::Publish(_) => Self::PUBLISH,
        }
    }

    pub fn params_json(&self) -> Result<String> {
        let json = match self {
            SysCommand::Publish(registration) => serde_json::to_string(registration)?,
        };
        Ok(json)
    }

    /// Encode into `ser` (cleared first): `[name][json]`.
    pub fn encode(&self, ser: &mut WireSerializer) -> Result<()> {
        let json = self.params_json()?;
        ser.clear();
        ser.write_str_unaligned(self.name());
        ser.write_str_unaligned(&json);
        Ok(())
    }
}

/// Encode `command` with `ser` and write it to `sink`.
pub fn write_sys_command<W: Write + ?Sized>(
    ser: &mut WireSerializer,
    sink: &mut W,
    command: &SysCommand,
) -> Result<()> {
    command.encode(ser)?;
    log::debug!(
        "[write_sys_command] {} ({} bytes)",
        command.name(),
        ser.len()
    );
    ser.send_to(sink)
}
