// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rostcp - message transmission to a ROS bridge peer over a byte stream
//!
//! Encodes structured messages in either the legacy length-prefixed layout
//! (ROS 1 style) or CDR (ROS 2 style), and feeds them through bounded
//! per-topic queues that never block producers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::TcpStream;
//! use std::sync::Arc;
//! use rostcp::{ConnectorConfig, Result, TransmitLoop, WireMessage, WireSerializer};
//!
//! struct Temperature { celsius: f64 }
//!
//! impl WireMessage for Temperature {
//!     fn serialize_into(&self, ser: &mut WireSerializer) {
//!         ser.write(self.celsius);
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut tx = TransmitLoop::new(ConnectorConfig::from_env())?;
//!     let publisher = tx.advertise::<Temperature>("/temp", "std_msgs/Float64", false)?;
//!     publisher.publish(Arc::new(Temperature { celsius: 21.5 }));
//!
//!     let mut stream = TcpStream::connect("127.0.0.1:10000")?;
//!     tx.run(&mut stream)
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  producers:  TopicPublisher::publish (never blocks)          |
//! +-------------------------------------------------------------+
//! |  queue:      OutgoingQueue (bounded, latch, overflow count)  |
//! +-------------------------------------------------------------+
//! |  sender:     TransmitLoop (single consumer, keepalive)       |
//! +-------------------------------------------------------------+
//! |  ser:        WireSerializer (legacy / CDR, length patching)  |
//! +-------------------------------------------------------------+
//! |  transport:  topic frames, sys commands, any io::Write       |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`ser`] - Wire encoder
//! - [`queue`] - Per-topic flow control and message recycling
//! - [`sender`] - Transmit loop and publisher handles
//! - [`transport`] - Framing helpers
//! - [`config`] - Environment and YAML configuration

/// Connector configuration (wire format, queue size, keepalive).
pub mod config;
/// Error type shared by the whole crate.
pub mod error;
/// Bounded outgoing queues and the message pool interface.
pub mod queue;
/// Wire encoder for the legacy and CDR formats.
pub mod ser;
/// Single-consumer transmit loop.
pub mod sender;
/// Topic frames, keepalives and system commands.
pub mod transport;

pub use config::{ConnectorConfig, WireFormat};
pub use error::{Error, Result};
pub use queue::{Dequeued, MessagePool, OutgoingQueue, PoolStats, QueueState, RecyclePool};
pub use sender::{StopHandle, TopicPublisher, TransmitLoop, TransmitStats};
pub use ser::{Primitive, WireMessage, WireSerializer};
pub use transport::{PublishRegistration, SysCommand};
