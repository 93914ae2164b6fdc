//! Adapter configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::flags::{FunctionFlags, TextEncoding};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Encoding requested for registered functions and collations.
    pub encoding: TextEncoding,

    /// Mark functions deterministic unless the caller passes explicit flags.
    pub deterministic: bool,

    /// Restrict functions to top-level SQL (not triggers, views, schema).
    pub direct_only: bool,

    pub innocuous: bool,

    /// Busy handler timeout applied when a connection is opened. Zero disables it.
    pub busy_timeout_ms: u32,

    /// Create the database file when it does not exist.
    pub open_create: bool,

    pub open_read_only: bool,

    /// Report extended result codes from the connection.
    pub extended_result_codes: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::Utf8,
            deterministic: false,
            direct_only: false,
            innocuous: false,
            busy_timeout_ms: 5_000,
            open_create: true,
            open_read_only: false,
            extended_result_codes: false,
        }
    }
}

impl AdapterConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SQLFN_DETERMINISTIC`: `1`/`true` marks functions deterministic
    /// - `SQLFN_DIRECT_ONLY`: restrict functions to top-level SQL
    /// - `SQLFN_INNOCUOUS`: mark functions innocuous
    /// - `SQLFN_BUSY_TIMEOUT_MS`: busy timeout in milliseconds
    /// - `SQLFN_READ_ONLY`: open connections read-only
    /// - `SQLFN_EXTENDED_RESULT_CODES`: enable extended result codes
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_flag("SQLFN_DETERMINISTIC") {
            cfg.deterministic = v;
        }

        if let Some(v) = env_flag("SQLFN_DIRECT_ONLY") {
            cfg.direct_only = v;
        }

        if let Some(v) = env_flag("SQLFN_INNOCUOUS") {
            cfg.innocuous = v;
        }

        if let Ok(s) = std::env::var("SQLFN_BUSY_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.busy_timeout_ms = v;
            }
        }

        if let Some(v) = env_flag("SQLFN_READ_ONLY") {
            cfg.open_read_only = v;
            if v {
                cfg.open_create = false;
            }
        }

        if let Some(v) = env_flag("SQLFN_EXTENDED_RESULT_CODES") {
            cfg.extended_result_codes = v;
        }

        cfg
    }

    /// Parse a (possibly partial) JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Default flags for registrations made under this config.
    pub fn function_flags(&self) -> FunctionFlags {
        let mut flags = FunctionFlags::NONE.with_encoding(self.encoding);
        if self.deterministic {
            flags |= FunctionFlags::DETERMINISTIC;
        }
        if self.direct_only {
            flags |= FunctionFlags::DIRECT_ONLY;
        }
        if self.innocuous {
            flags |= FunctionFlags::INNOCUOUS;
        }
        flags
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_are_plain_utf8() {
        let cfg = AdapterConfig::default();
        assert_eq!(cfg.function_flags(), FunctionFlags::UTF8);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = AdapterConfig::from_json(r#"{ "deterministic": true, "busy_timeout_ms": 250 }"#)
            .expect("parse config");
        assert!(cfg.deterministic);
        assert_eq!(cfg.busy_timeout_ms, 250);
        assert!(cfg.open_create);
        assert!(cfg
            .function_flags()
            .contains(FunctionFlags::DETERMINISTIC | FunctionFlags::UTF8));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(AdapterConfig::from_json("{ deterministic: ").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("SQLFN_INNOCUOUS", "yes");
        let cfg = AdapterConfig::from_env();
        std::env::remove_var("SQLFN_INNOCUOUS");
        assert!(cfg.innocuous);
        assert!(cfg.function_flags().contains(FunctionFlags::INNOCUOUS));
    }
}
