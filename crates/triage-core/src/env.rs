//! Typed environment variable lookup shared by every config layer.
//!
//! Unset variables fall back to the caller's default; set-but-invalid values
//! are reported as [`Error::Config`] rather than silently ignored.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Read a string variable. Empty values count as unset.
pub fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable, `Ok(None)` when unset.
pub fn parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// Read a boolean flag. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn flag(key: &str) -> Result<Option<bool>> {
    match var(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::Config(format!("{}={:?}: expected a boolean", key, raw))),
        },
    }
}
