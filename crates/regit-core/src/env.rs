//! `REGIT_*` environment overrides
//!
//! Values are trimmed before parsing. A variable that is unset or fails to
//! parse counts as absent, so a typo falls back to the library default
//! rather than failing construction.

use std::str::FromStr;

/// Parsed value of `key`, if set and well-formed
pub fn env_get_opt<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Parsed value of `key`, or `default`
pub fn env_get<T: FromStr>(key: &str, default: T) -> T {
    env_get_opt(key).unwrap_or(default)
}

/// Raw value of `key`, or `default` when unset or blank
pub fn env_get_str(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_owned(),
    }
}
