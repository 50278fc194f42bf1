//! Loader limits and interpreter tunables.
//!
//! Every ceiling named here has a hard upper bound compiled into the crate;
//! a configuration may tighten a limit but never relax it past the bound.

use crate::error::ConfigError;

/// Hard ceiling on a single glyph definition file (1 MiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Hard ceiling on inheritance / entangle depth.
pub const MAX_INHERITANCE_DEPTH: u32 = 32;

/// Hard ceiling on recorded trace entries.
pub const MAX_TRACE_ENTRIES: usize = 1024;

/// Default definition file extension.
pub const DEFAULT_EXTENSION: &str = "gdf";

// ─── VaultConfig ─────────────────────────────────────────────────────────────

/// Configuration for vault scans.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VaultConfig {
    /// Files above this size are rejected before they are read.
    /// Default and maximum: [`MAX_FILE_SIZE`].
    pub max_file_size: u64,
    /// Extension (without the dot) of files considered glyph definitions
    /// during a directory scan. Default: `gdf`.
    pub extension: String,
}

impl VaultConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(ConfigError::new(
                "max_file_size",
                format!("must be in 1..={MAX_FILE_SIZE}"),
            ));
        }
        if self.extension.is_empty() || self.extension.contains(['/', '\\', '.']) {
            return Err(ConfigError::new(
                "extension",
                "must be a bare, non-empty extension",
            ));
        }
        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

// ─── InterpreterConfig ───────────────────────────────────────────────────────

/// Tunables for inheritance resolution and script execution.
///
/// Defaults:
/// - depth limit 32, trace capacity 1024, tracing on;
/// - `stabilize()` adds 10 coherence points;
/// - `entangle` damps the target contribution by 0.95 against a 440 Hz reference.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpreterConfig {
    /// Maximum inheritance / entangle depth. At most [`MAX_INHERITANCE_DEPTH`].
    pub max_depth: u32,
    /// Trace ring-buffer capacity, in `1..=MAX_TRACE_ENTRIES`.
    pub trace_capacity: usize,
    /// Record trace entries at all.
    pub trace_enabled: bool,
    /// Coherence points added by `stabilize()`.
    pub stabilize_increment: f64,
    /// Damping applied to an entangled target's contribution.
    pub entangle_damping: f64,
    /// Resonance (Hz) that normalizes an entangled target's contribution to 1.0.
    pub reference_resonance: f64,
}

impl InterpreterConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_INHERITANCE_DEPTH {
            return Err(ConfigError::new(
                "max_depth",
                format!("must be in 1..={MAX_INHERITANCE_DEPTH}"),
            ));
        }
        if self.trace_capacity == 0 || self.trace_capacity > MAX_TRACE_ENTRIES {
            return Err(ConfigError::new(
                "trace_capacity",
                format!("must be in 1..={MAX_TRACE_ENTRIES}"),
            ));
        }
        if !self.stabilize_increment.is_finite() || self.stabilize_increment < 0.0 {
            return Err(ConfigError::new(
                "stabilize_increment",
                "must be finite and non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.entangle_damping) {
            return Err(ConfigError::new("entangle_damping", "must be in [0, 1]"));
        }
        if !self.reference_resonance.is_finite() || self.reference_resonance <= 0.0 {
            return Err(ConfigError::new(
                "reference_resonance",
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_INHERITANCE_DEPTH,
            trace_capacity: MAX_TRACE_ENTRIES,
            trace_enabled: true,
            stabilize_increment: 10.0,
            entangle_damping: 0.95,
            reference_resonance: 440.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(VaultConfig::default().validate().is_ok());
        assert!(InterpreterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_limits_cannot_be_relaxed() {
        let vault = VaultConfig {
            max_file_size: MAX_FILE_SIZE + 1,
            ..VaultConfig::default()
        };
        assert_eq!(vault.validate().unwrap_err().field, "max_file_size");

        let interp = InterpreterConfig {
            max_depth: MAX_INHERITANCE_DEPTH + 1,
            ..InterpreterConfig::default()
        };
        assert_eq!(interp.validate().unwrap_err().field, "max_depth");

        let interp = InterpreterConfig {
            trace_capacity: MAX_TRACE_ENTRIES + 1,
            ..InterpreterConfig::default()
        };
        assert_eq!(interp.validate().unwrap_err().field, "trace_capacity");
    }

    #[test]
    fn test_extension_must_be_bare() {
        let vault = VaultConfig {
            extension: "../gdf".into(),
            ..VaultConfig::default()
        };
        assert!(vault.validate().is_err());
    }

    #[test]
    fn test_tighter_limits_accepted() {
        let interp = InterpreterConfig {
            max_depth: 4,
            trace_capacity: 8,
            ..InterpreterConfig::default()
        };
        assert!(interp.validate().is_ok());
    }
}
