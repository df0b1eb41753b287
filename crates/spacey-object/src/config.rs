// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime options.
//!
//! Options come from defaults, then an optional TOML file, then
//! `SPACEY_*` environment variables:
//!
//! ```toml
//! scope_hash_threshold = 8
//! strict = true
//!
//! [slot_growth]
//! min_dynamic_words = 4
//! linear_growth_step = 65536
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The options file is not valid TOML for [`RuntimeOptions`].
    #[error("invalid options: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override had an unparsable value.
    #[error("invalid value {value:?} for {key}")]
    Env {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

/// Amortized growth policy for dynamic slot arrays.
///
/// A dynamic array of `n` words (the slots past the inline ones plus the
/// hidden capacity word) is rounded up to `min_dynamic_words` while small,
/// to the next power of two while below `linear_growth_step`, and to a
/// multiple of `linear_growth_step` beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotGrowth {
    /// Smallest dynamic allocation, in words.
    pub min_dynamic_words: usize,
    /// Threshold and block size for linear growth, in words.
    pub linear_growth_step: usize,
}

impl Default for SlotGrowth {
    fn default() -> Self {
        Self {
            min_dynamic_words: 4,
            linear_growth_step: 65536,
        }
    }
}

impl SlotGrowth {
    /// Round a requested word count up per the growth policy.
    pub fn round_words(&self, nwords: usize) -> usize {
        let min = self.min_dynamic_words.max(1);
        let step = self.linear_growth_step.max(min);
        if nwords <= min {
            min
        } else if nwords < step {
            nwords.next_power_of_two()
        } else {
            nwords.div_ceil(step) * step
        }
    }
}

/// Options shared by every context of a runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Slot array growth policy.
    pub slot_growth: SlotGrowth,

    /// Number of properties at which a scope builds a hash table.
    pub scope_hash_threshold: usize,

    /// Maximum nesting of hooks and native calls.
    pub max_native_depth: u32,

    /// Shrink oversized slot arrays during GC.
    pub shrink_slots_on_gc: bool,

    /// Report read-only and getter-only writes as TypeErrors.
    pub strict: bool,

    /// Entries kept in each context's property cache before it is flushed.
    pub property_cache_capacity: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            slot_growth: SlotGrowth::default(),
            scope_hash_threshold: 6,
            max_native_depth: 512,
            shrink_slots_on_gc: true,
            strict: false,
            property_cache_capacity: 4096,
        }
    }
}

impl RuntimeOptions {
    /// Load options from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut options = Self::from_toml_str(&content)?;
        options.apply_env()?;
        Ok(options)
    }

    /// Parse options from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Apply `SPACEY_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix("SPACEY_") {
                self.set(&name.to_lowercase(), &value)?;
            }
        }
        Ok(())
    }

    /// Set one option by name. Unknown names are ignored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let bad = || ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "min_dynamic_words" => {
                self.slot_growth.min_dynamic_words = value.parse().map_err(|_| bad())?
            }
            "linear_growth_step" => {
                self.slot_growth.linear_growth_step = value.parse().map_err(|_| bad())?
            }
            "scope_hash_threshold" => {
                self.scope_hash_threshold = value.parse().map_err(|_| bad())?
            }
            "max_native_depth" => self.max_native_depth = value.parse().map_err(|_| bad())?,
            "shrink_slots_on_gc" => self.shrink_slots_on_gc = parse_bool(value).ok_or_else(bad)?,
            "strict" => self.strict = parse_bool(value).ok_or_else(bad)?,
            "property_cache_capacity" => {
                self.property_cache_capacity = value.parse().map_err(|_| bad())?
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_round_words() {
        let g = SlotGrowth::default();
        assert_eq!(g.round_words(1), 4);
        assert_eq!(g.round_words(4), 4);
        assert_eq!(g.round_words(5), 8);
        assert_eq!(g.round_words(1000), 1024);
        assert_eq!(g.round_words(65536), 65536);
        assert_eq!(g.round_words(65537), 131072);
        assert_eq!(g.round_words(200_000), 262_144);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = RuntimeOptions::from_toml_str(
            "strict = true\n[slot_growth]\nlinear_growth_step = 1024\n",
        )
        .unwrap();
        assert!(options.strict);
        assert_eq!(options.slot_growth.linear_growth_step, 1024);
        assert_eq!(options.slot_growth.min_dynamic_words, 4);
        assert_eq!(options.scope_hash_threshold, 6);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scope_hash_threshold = 12").unwrap();
        let options = RuntimeOptions::load(file.path()).unwrap();
        assert_eq!(options.scope_hash_threshold, 12);
    }

    #[test]
    fn test_set_rejects_garbage() {
        let mut options = RuntimeOptions::default();
        assert!(options.set("strict", "maybe").is_err());
        assert!(options.set("max_native_depth", "64").is_ok());
        assert_eq!(options.max_native_depth, 64);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RuntimeOptions::from_toml_str("strict = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
