//! Portable substrate snapshot for persistence and external monitoring.
//!
//! A [`SubstrateSnapshot`] captures every cell, the counters, global time, the
//! stored checksum and the quantum pouch. [`SubstrateSnapshot::restore`]
//! rebuilds a substrate *without* renormalizing anything, so an edited or
//! corrupted snapshot surfaces as a [`SubstrateError::ParityError`] on the
//! next [`Substrate::sync`] instead of being silently repaired.
//!
//! This module requires the `serde` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use glyph_core::snapshot::SubstrateSnapshot;
//! use glyph_core::substrate::Substrate;
//!
//! let snapshot = SubstrateSnapshot::from_substrate(&substrate);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! let restored: SubstrateSnapshot = serde_json::from_str(&json).unwrap();
//! let substrate = restored.restore()?;
//! substrate.sync()?;
//! ```

use crate::error::SubstrateError;
use crate::substrate::{Cell, QuantumState, Substrate};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Serializable image of a [`Substrate`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct SubstrateSnapshot {
    /// Format version, [`SNAPSHOT_VERSION`] for new snapshots.
    pub version: u16,
    /// Ticks elapsed at capture time.
    pub global_time: u64,
    /// Stored checksum at capture time.
    pub checksum: u32,
    /// Read counter.
    pub read_ops: u64,
    /// Write counter.
    pub write_ops: u64,
    /// All cells in index order.
    pub cells: Vec<Cell>,
    /// Stored superpositions, ordered by cell index.
    pub quantum: Vec<QuantumRecord>,
}

/// One quantum pouch entry.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct QuantumRecord {
    /// Cell index.
    pub index: usize,
    /// Stored state.
    pub state: QuantumState,
}

impl SubstrateSnapshot {
    /// Capture a live substrate.
    pub fn from_substrate(substrate: &Substrate) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            global_time: substrate.global_time(),
            checksum: substrate.checksum(),
            read_ops: substrate.read_ops(),
            write_ops: substrate.write_ops(),
            cells: substrate.cells().to_vec(),
            quantum: substrate
                .quantum_entries()
                .into_iter()
                .map(|(index, state)| QuantumRecord {
                    index,
                    state: state.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a substrate from this snapshot.
    ///
    /// Fails if the snapshot was written in another format version, does not
    /// hold exactly one record per cell, or has a quantum record outside the
    /// grid. Cell values are taken as is; call [`Substrate::sync`] to verify
    /// them.
    pub fn restore(&self) -> Result<Substrate, SubstrateError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SubstrateError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Substrate::from_raw_parts(
            self.cells.clone(),
            self.global_time,
            self.checksum,
            self.read_ops,
            self.write_ops,
            self.quantum.iter().map(|r| (r.index, r.state.clone())),
        )
    }

    /// Number of cells carrying a superposition.
    pub fn quantum_count(&self) -> usize {
        self.quantum.len()
    }
}
