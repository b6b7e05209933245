// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector configuration.
//!
//! Three layers, each overriding the previous one:
//!
//! - **Defaults**: [`ConnectorConfig::default()`] (CDR, queue of 10, trailing pad on,
//!   1 s keepalive)
//! - **Environment**: [`ConnectorConfig::from_env()`]
//! - **YAML file**: [`ConnectorConfig::from_yaml_file()`] (feature `yaml-config`)
//!
//! ## Environment Variables
//! - `ROSTCP_WIRE_FORMAT`: `legacy` / `ros1` or `cdr` / `ros2`
//! - `ROSTCP_QUEUE_SIZE`: per-topic queue capacity (>= 1)
//! - `ROSTCP_TRAILING_PAD`: `1`/`true` or `0`/`false`
//! - `ROSTCP_KEEPALIVE_MS`: idle time before a keepalive frame is sent
//!
//! # Example
//!
//! ```bash
//! export ROSTCP_WIRE_FORMAT=legacy
//! export ROSTCP_QUEUE_SIZE=32
//! ```

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable names
pub const ENV_WIRE_FORMAT: &str = "ROSTCP_WIRE_FORMAT";
pub const ENV_QUEUE_SIZE: &str = "ROSTCP_QUEUE_SIZE";
pub const ENV_TRAILING_PAD: &str = "ROSTCP_TRAILING_PAD";
pub const ENV_KEEPALIVE_MS: &str = "ROSTCP_KEEPALIVE_MS";

/// Default per-topic queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default idle period before a keepalive frame is written.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(1);

/// Wire family spoken by the peer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Length-prefixed encoding, no alignment, no encapsulation header.
    #[serde(alias = "ros1")]
    Legacy,
    /// CDR: size-aligned fields behind a 4-byte encapsulation header.
    #[default]
    #[serde(alias = "ros2")]
    Cdr,
}

impl WireFormat {
    /// Whether alignment, encapsulation header and string terminators apply.
    #[inline]
    pub fn is_cdr(self) -> bool {
        matches!(self, WireFormat::Cdr)
    }
}

impl std::str::FromStr for WireFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "ros1" => Ok(WireFormat::Legacy),
            "cdr" | "ros2" => Ok(WireFormat::Cdr),
            other => Err(Error::InvalidConfig(format!("unknown wire format '{}'", other))),
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::Legacy => write!(f, "legacy"),
            WireFormat::Cdr => write!(f, "cdr"),
        }
    }
}

/// Runtime configuration of a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Wire family (selected once, carried by every serializer).
    pub wire_format: WireFormat,
    /// Capacity of each topic queue created by the transmit loop.
    pub queue_capacity: usize,
    /// Append the 4-byte compatibility pad after CDR bodies by default.
    pub trailing_pad: bool,
    /// Idle period before a keepalive frame is sent.
    pub keepalive: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::Cdr,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            trailing_pad: true,
            keepalive: DEFAULT_KEEPALIVE,
        }
    }
}

/// YAML document layout (all keys optional).
#[cfg_attr(not(feature = "yaml-config"), allow(dead_code))]
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    wire_format: Option<WireFormat>,
    queue_capacity: Option<usize>,
    trailing_pad: Option<bool>,
    keepalive_ms: Option<u64>,
}

impl ConnectorConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// Unparsable values are logged and ignored; call [`validate`](Self::validate)
    /// to reject out-of-range values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_lookup(|name| env::var(name).ok())
    }

    /// Apply variables from an arbitrary lookup (e.g. a map in tests).
    #[must_use]
    pub fn merge_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        if let Some(raw) = get(ENV_WIRE_FORMAT) {
            match raw.parse::<WireFormat>() {
                Ok(format) => self.wire_format = format,
                Err(e) => {
                    log::warn!("[ConnectorConfig::from_env] {}={}: {}", ENV_WIRE_FORMAT, raw, e);
                }
            }
        }

        if let Some(raw) = get(ENV_QUEUE_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(size) => self.queue_capacity = size,
                Err(_) => {
                    log::warn!("[ConnectorConfig::from_env] ignoring {}={}", ENV_QUEUE_SIZE, raw);
                }
            }
        }

        if let Some(raw) = get(ENV_TRAILING_PAD) {
            match parse_bool(&raw) {
                Some(flag) => self.trailing_pad = flag,
                None => {
                    log::warn!("[ConnectorConfig::from_env] ignoring {}={}", ENV_TRAILING_PAD, raw);
                }
            }
        }

        if let Some(raw) = get(ENV_KEEPALIVE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.keepalive = Duration::from_millis(ms),
                Err(_) => {
                    log::warn!("[ConnectorConfig::from_env] ignoring {}={}", ENV_KEEPALIVE_MS, raw);
                }
            }
        }

        self
    }

    /// Parse a YAML document on top of the defaults.
    #[cfg(feature = "yaml-config")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML: {}", e)))?;
        let config = Self::default().apply_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file on top of the defaults.
    #[cfg(feature = "yaml-config")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigFileNotFound(path.display().to_string()),
            _ => Error::IoError(e),
        })?;
        log::debug!("[ConnectorConfig::from_yaml_file] loaded {}", path.display());
        Self::from_yaml_str(&content)
    }

    #[cfg_attr(not(feature = "yaml-config"), allow(dead_code))]
    fn apply_file(mut self, file: ConfigFile) -> Self {
        if let Some(format) = file.wire_format {
            self.wire_format = format;
        }
        if let Some(capacity) = file.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(pad) = file.trailing_pad {
            self.trailing_pad = pad;
        }
        if let Some(ms) = file.keepalive_ms {
            self.keepalive = Duration::from_millis(ms);
        }
        self
    }

    /// Reject values the connector cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::InvalidCapacity(0));
        }
        if self.keepalive.is_zero() {
            return Err(Error::InvalidConfig("keepalive must be > 0".into()));
        }
        Ok(())
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_trailing_pad(mut self, enabled: bool) -> Self {
        self.trailing_pad = enabled;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw == "1" || raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if raw == "0" || raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.wire_format, WireFormat::Cdr);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.trailing_pad);
        assert_eq!(config.keepalive, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wire_format_aliases() {
        assert_eq!("ros1".parse::<WireFormat>().unwrap(), WireFormat::Legacy);
        assert_eq!("LEGACY".parse::<WireFormat>().unwrap(), WireFormat::Legacy);
        assert_eq!(" ros2 ".parse::<WireFormat>().unwrap(), WireFormat::Cdr);
        assert!("xml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::Legacy.to_string(), "legacy");
    }

    #[test]
    fn test_merge_lookup_overrides() {
        let config = ConnectorConfig::default().merge_lookup(lookup(&[
            (ENV_WIRE_FORMAT, "legacy"),
            (ENV_QUEUE_SIZE, "64"),
            (ENV_TRAILING_PAD, "false"),
            (ENV_KEEPALIVE_MS, "250"),
        ]));
        assert_eq!(config.wire_format, WireFormat::Legacy);
        assert_eq!(config.queue_capacity, 64);
        assert!(!config.trailing_pad);
        assert_eq!(config.keepalive, Duration::from_millis(250));
    }

    #[test]
    fn test_merge_lookup_ignores_garbage() {
        let config = ConnectorConfig::default().merge_lookup(lookup(&[
            (ENV_WIRE_FORMAT, "json"),
            (ENV_QUEUE_SIZE, "-3"),
            (ENV_TRAILING_PAD, "maybe"),
            (ENV_KEEPALIVE_MS, ""),
        ]));
        assert_eq!(config, ConnectorConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_capacity_and_keepalive() {
        let config = ConnectorConfig::default().with_queue_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidCapacity(0))));

        let config = ConnectorConfig::default().with_keepalive(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_partial_document() {
        let yaml = r#"
wire_format: ros1
queue_capacity: 3
"#;
        let config = ConnectorConfig::from_yaml_str(yaml).expect("valid YAML should parse");
        assert_eq!(config.wire_format, WireFormat::Legacy);
        assert_eq!(config.queue_capacity, 3);
        assert!(config.trailing_pad);
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_rejects_unknown_keys_and_zero_capacity() {
        assert!(matches!(
            ConnectorConfig::from_yaml_str("queue_depth: 4\n"),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            ConnectorConfig::from_yaml_str("queue_capacity: 0\n"),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_file_roundtrip() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "wire_format: cdr\ntrailing_pad: false\nkeepalive_ms: 500").unwrap();
        let config = ConnectorConfig::from_yaml_file(file.path()).expect("file should load");
        assert!(!config.trailing_pad);
        assert_eq!(config.keepalive, Duration::from_millis(500));

        let missing = ConnectorConfig::from_yaml_file("/nonexistent/rostcp.yaml");
        assert!(matches!(missing, Err(Error::ConfigFileNotFound(_))));
    }
}
