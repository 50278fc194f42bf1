//! Bounded activation trace.
//!
//! A ring buffer of [`TraceEntry`] values. When full, the oldest entry is
//! dropped. Entries carry a monotonically increasing sequence number in place
//! of a wall-clock timestamp, so two runs over the same inputs render
//! byte-identical traces.

use std::collections::VecDeque;
use std::fmt;

use crate::config::MAX_TRACE_ENTRIES;
use crate::interpreter::FieldState;

/// One recorded interpreter step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Position in the overall recording order.
    pub seq: u64,
    /// Glyph being executed.
    pub glyph_id: String,
    /// Operation label (`compose`, `resonate(2)`, ...).
    pub operation: String,
    /// Field state after the operation.
    pub state: FieldState,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:04}] {:<8} {:<24} {}",
            self.seq, self.glyph_id, self.operation, self.state
        )
    }
}

/// Ring buffer of trace entries.
#[derive(Clone, Debug)]
pub struct Trace {
    entries: VecDeque<TraceEntry>,
    capacity: usize,
    enabled: bool,
    next_seq: u64,
    dropped: u64,
}

impl Trace {
    /// Enabled trace holding at most `capacity` entries (clamped to `1..=1024`).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_TRACE_ENTRIES);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            enabled: true,
            next_seq: 0,
            dropped: 0,
        }
    }

    /// A trace that records nothing.
    pub fn disabled() -> Self {
        let mut trace = Self::new(1);
        trace.enabled = false;
        trace
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&mut self, glyph_id: &str, operation: impl Into<String>, state: FieldState) {
        if !self.enabled {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(TraceEntry {
            seq: self.next_seq,
            glyph_id: glyph_id.to_string(),
            operation: operation.into(),
            state,
        });
        self.next_seq += 1;
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted since the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Maximum entries held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether recording is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all entries and restart the sequence.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
        self.dropped = 0;
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(MAX_TRACE_ENTRIES)
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Symbolic Trace ({} entries) ===", self.entries.len())?;
        if self.dropped > 0 {
            writeln!(f, "({} older entries dropped)", self.dropped)?;
        }
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut trace = Trace::new(8);
        trace.record("a", "compose", FieldState::default());
        trace.record("a", "stabilize()", FieldState::default());
        let seqs: Vec<u64> = trace.entries().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_ring_drops_oldest() {
        let mut trace = Trace::new(3);
        for i in 0..5 {
            trace.record("g", format!("op{i}"), FieldState::default());
        }
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.dropped(), 2);
        let ops: Vec<&str> = trace.entries().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["op2", "op3", "op4"]);
        assert_eq!(trace.entries().next().map(|e| e.seq), Some(2));
    }

    #[test]
    fn test_capacity_clamped() {
        assert_eq!(Trace::new(0).capacity(), 1);
        assert_eq!(Trace::new(1_000_000).capacity(), MAX_TRACE_ENTRIES);
    }

    #[test]
    fn test_disabled_records_nothing() {
        let mut trace = Trace::disabled();
        trace.record("a", "compose", FieldState::default());
        assert!(trace.is_empty());
        assert!(!trace.is_enabled());
    }

    #[test]
    fn test_clear_restarts_sequence() {
        let mut trace = Trace::new(4);
        trace.record("a", "x", FieldState::default());
        trace.clear();
        trace.record("a", "y", FieldState::default());
        assert_eq!(trace.entries().next().map(|e| e.seq), Some(0));
    }

    #[test]
    fn test_rendering_is_stable() {
        let mut a = Trace::new(4);
        let mut b = Trace::new(4);
        for t in [&mut a, &mut b] {
            t.record("000", "compose", FieldState::default());
        }
        assert_eq!(a.to_string(), b.to_string());
        assert!(a.to_string().contains("[0000] 000"));
    }
}
