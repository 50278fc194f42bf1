/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Deterministic field-state memory: a fixed 64×64 grid of bounded cells.
//!
//! - [`Cell`]: one field value (magnitude, phase, coherence, decay rate).
//! - [`Substrate`]: the grid, its counters, rolling checksum and quantum pouch.
//! - [`QuantumState`]: up to [`MAX_SUPERPOSITION_STATES`] superposed components.
//!
//! # Invariants
//!
//! - **SUB-001**: every cell has `phase ∈ [0, 2π)`, `magnitude ∈ [0, 1000]`,
//!   `coherence ∈ [0, 1000]`, `decay_rate ∈ [0, 1]` after any write.
//! - **SUB-002**: writes normalize out-of-range values instead of rejecting them;
//!   only an invalid index fails.
//! - **SUB-003**: the stored checksum tracks every mutation made through this API,
//!   so `sync()` right after `init()` (or any API write) never reports parity errors.
//! - **SUB-004**: the checksum is the exact rotate-left/XOR fold below; other
//!   implementations reproduce it bit for bit.
//!
//! ```text
//! acc = 0
//! for cell in index order:
//!     v   = u32(mag·1000) ^ u32(phase·1000) ^ u32(coh·1000)
//!     acc = rotl(acc, 1) ^ v
//! ```

use core::cell::Cell as Counter;
use core::f64::consts::TAU;
use core::fmt;

use hashbrown::HashMap;
use heapless::Vec as HVec;

use crate::error::SubstrateError;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Grid edge length.
pub const GRID_WIDTH: usize = 64;

/// Total number of cells (64 × 64).
pub const CELL_COUNT: usize = GRID_WIDTH * GRID_WIDTH;

/// Magnitude bounds.
pub const MAGNITUDE_MAX: f64 = 1000.0;

/// Coherence bounds (cell-level unit, 0–1000).
pub const COHERENCE_MAX: f64 = 1000.0;

/// Decay-rate bounds.
pub const DECAY_RATE_MAX: f64 = 1.0;

/// Neutral magnitude written by [`Substrate::init`].
pub const INITIAL_MAGNITUDE: f64 = 100.0;

/// Neutral coherence written by [`Substrate::init`].
pub const INITIAL_COHERENCE: f64 = 500.0;

/// Default per-tick decay rate.
pub const DEFAULT_DECAY_RATE: f64 = 0.01;

/// Wave propagation speed (cells per unit time).
pub const WAVE_SPEED: f64 = 1.0;

/// Amplitude retained per BFS hop.
pub const WAVE_DAMPING: f64 = 0.95;

/// Furthest BFS hop a wave reaches.
pub const WAVE_MAX_HOPS: u32 = 10;

/// Fraction of an applied force lost to the fluid.
pub const FERROFLUID_VISCOSITY: f64 = 0.1;

/// Superposition components held per quantum cell.
pub const MAX_SUPERPOSITION_STATES: usize = 8;

/// Scale applied to each cell quantity before it enters the checksum.
const CHECKSUM_SCALE: f64 = 1000.0;

/// Cell flag: the quantum pouch holds a state for this cell.
pub const FLAG_QUANTUM: u8 = 0x01;

// ─── Normalization ──────────────────────────────────────────────────────────

/// Wrap a phase into `[0, 2π)`. Non-finite input maps to 0.
pub fn normalize_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Clamp into `[0, max]`; NaN maps to 0, infinities to the nearest bound.
fn clamp_bounded(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn phase_in_range(phase: f64) -> bool {
    (0.0..TAU).contains(&phase)
}

// ─── Cell ───────────────────────────────────────────────────────────────────

/// One field-state cell.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    /// Field strength [0, 1000].
    pub magnitude: f64,
    /// Oscillation phase [0, 2π).
    pub phase: f64,
    /// Coherence [0, 1000].
    pub coherence: f64,
    /// Fraction of magnitude lost per tick [0, 1].
    pub decay_rate: f64,
    /// Global time of the most recent write.
    pub last_update: u64,
    /// Status bits ([`FLAG_QUANTUM`]).
    pub flags: u8,
}

impl Cell {
    /// The neutral configuration used by [`Substrate::init`].
    pub const fn neutral() -> Self {
        Self {
            magnitude: INITIAL_MAGNITUDE,
            phase: 0.0,
            coherence: INITIAL_COHERENCE,
            decay_rate: DEFAULT_DECAY_RATE,
            last_update: 0,
            flags: 0,
        }
    }

    /// `true` when every quantity lies inside its bounds (SUB-001).
    pub fn is_valid(&self) -> bool {
        (0.0..=MAGNITUDE_MAX).contains(&self.magnitude)
            && phase_in_range(self.phase)
            && (0.0..=COHERENCE_MAX).contains(&self.coherence)
            && (0.0..=DECAY_RATE_MAX).contains(&self.decay_rate)
    }

    /// This cell's checksum contribution.
    fn parity_word(&self) -> u32 {
        // `as` saturates: negatives and NaN become 0, overflow becomes u32::MAX.
        let mag = (self.magnitude * CHECKSUM_SCALE) as u32;
        let phs = (self.phase * CHECKSUM_SCALE) as u32;
        let coh = (self.coherence * CHECKSUM_SCALE) as u32;
        mag ^ phs ^ coh
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Values returned by [`Substrate::read_cell`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellReading {
    /// Field strength.
    pub magnitude: f64,
    /// Phase in radians.
    pub phase: f64,
    /// Cell-level coherence.
    pub coherence: f64,
}

/// Rolling checksum over a cell slice (SUB-004).
pub fn compute_checksum(cells: &[Cell]) -> u32 {
    cells
        .iter()
        .fold(0u32, |acc, cell| acc.rotate_left(1) ^ cell.parity_word())
}

/// Change to a full-grid checksum when the word of cell `idx` flips by `diff`.
///
/// The fold is linear over XOR: cell `i` ends up rotated left by
/// `(CELL_COUNT - 1 - i) mod 32` bits.
fn checksum_delta(idx: usize, diff: u32) -> u32 {
    diff.rotate_left(((CELL_COUNT - 1 - idx) % 32) as u32)
}

// ─── Quantum pouch ──────────────────────────────────────────────────────────

/// One component of a superposition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Superposition {
    /// Component amplitude.
    pub amplitude: f64,
    /// Component phase in radians.
    pub phase: f64,
}

/// Superposed state stored beside a cell.
///
/// An unstored cell retrieves as the empty state (no components, not collapsed).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantumState {
    /// Up to [`MAX_SUPERPOSITION_STATES`] components.
    pub components: HVec<Superposition, MAX_SUPERPOSITION_STATES>,
    /// Whether the state has collapsed to a single outcome.
    pub collapsed: bool,
}

impl QuantumState {
    /// Build a state from `(amplitude, phase)` pairs.
    ///
    /// Phases are wrapped into `[0, 2π)`. Fails when more than
    /// [`MAX_SUPERPOSITION_STATES`] components are supplied.
    pub fn from_components(pairs: &[(f64, f64)]) -> Result<Self, SubstrateError> {
        let mut components = HVec::new();
        for &(amplitude, phase) in pairs {
            components
                .push(Superposition {
                    amplitude,
                    phase: normalize_phase(phase),
                })
                .map_err(|_| SubstrateError::SuperpositionOverflow {
                    max: MAX_SUPERPOSITION_STATES,
                })?;
        }
        Ok(Self {
            components,
            collapsed: false,
        })
    }

    /// `true` when no components are held.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sum of component amplitudes.
    pub fn total_amplitude(&self) -> f64 {
        self.components.iter().map(|c| c.amplitude).sum()
    }
}

// ─── Status ─────────────────────────────────────────────────────────────────

/// Introspection summary for monitoring collaborators.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubstrateStatus {
    /// Number of cells in the grid.
    pub cell_count: usize,
    /// Ticks elapsed since `init`.
    pub global_time: u64,
    /// Stored checksum.
    pub checksum: u32,
    /// Successful reads.
    pub read_ops: u64,
    /// Successful writes.
    pub write_ops: u64,
    /// Mean magnitude.
    pub avg_magnitude: f64,
    /// Largest magnitude.
    pub max_magnitude: f64,
    /// Mean coherence.
    pub avg_coherence: f64,
    /// Cells with a stored superposition.
    pub quantum_cells: usize,
}

impl fmt::Display for SubstrateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Substrate Status ===")?;
        writeln!(f, "Cell Count:     {}", self.cell_count)?;
        writeln!(f, "Global Time:    {}", self.global_time)?;
        writeln!(f, "Checksum:       0x{:08X}", self.checksum)?;
        writeln!(f, "Read Ops:       {}", self.read_ops)?;
        writeln!(f, "Write Ops:      {}", self.write_ops)?;
        writeln!(f, "Avg Magnitude:  {:.2}", self.avg_magnitude)?;
        writeln!(f, "Max Magnitude:  {:.2}", self.max_magnitude)?;
        writeln!(f, "Avg Coherence:  {:.2}", self.avg_coherence)?;
        write!(f, "Quantum Cells:  {}", self.quantum_cells)
    }
}

// ─── Substrate ──────────────────────────────────────────────────────────────

/// The 64×64 field-state grid.
///
/// Owned by exactly one driver; there are no concurrent mutators.
pub struct Substrate {
    cells: Box<[Cell]>,
    global_time: u64,
    checksum: u32,
    read_ops: Counter<u64>,
    write_ops: u64,
    quantum: HashMap<usize, QuantumState>,
}

impl Substrate {
    /// Construct an initialized substrate.
    pub fn new() -> Self {
        let mut substrate = Self {
            cells: vec![Cell::neutral(); CELL_COUNT].into_boxed_slice(),
            global_time: 0,
            checksum: 0,
            read_ops: Counter::new(0),
            write_ops: 0,
            quantum: HashMap::new(),
        };
        substrate.init();
        substrate
    }

    /// Reset every cell to the neutral configuration and clear counters,
    /// time and the quantum pouch. Idempotent.
    pub fn init(&mut self) {
        self.cells.fill(Cell::neutral());
        self.global_time = 0;
        self.read_ops.set(0);
        self.write_ops = 0;
        self.quantum.clear();
        self.checksum = compute_checksum(&self.cells);
    }

    fn check_index(idx: usize) -> Result<(), SubstrateError> {
        if idx < CELL_COUNT {
            Ok(())
        } else {
            Err(SubstrateError::OutOfRange {
                index: idx,
                max: CELL_COUNT - 1,
            })
        }
    }

    // ── Handoff API ────────────────────────────────────────────────────────

    /// Read `(magnitude, phase, coherence)` from a cell.
    pub fn read_cell(&self, idx: usize) -> Result<CellReading, SubstrateError> {
        Self::check_index(idx)?;
        let cell = &self.cells[idx];
        self.read_ops.set(self.read_ops.get().saturating_add(1));
        Ok(CellReading {
            magnitude: cell.magnitude,
            phase: cell.phase,
            coherence: cell.coherence,
        })
    }

    /// Write a cell, normalizing the values (SUB-002).
    ///
    /// Magnitude and coherence are clamped to `[0, 1000]`, phase is wrapped
    /// into `[0, 2π)`. Only an invalid index is an error.
    pub fn write_cell(
        &mut self,
        idx: usize,
        magnitude: f64,
        phase: f64,
        coherence: f64,
    ) -> Result<(), SubstrateError> {
        Self::check_index(idx)?;
        let now = self.global_time;
        let cell = &mut self.cells[idx];
        let old_word = cell.parity_word();
        cell.magnitude = clamp_bounded(magnitude, MAGNITUDE_MAX);
        cell.phase = normalize_phase(phase);
        cell.coherence = clamp_bounded(coherence, COHERENCE_MAX);
        cell.last_update = now;
        let new_word = cell.parity_word();
        self.write_ops = self.write_ops.saturating_add(1);
        self.checksum ^= checksum_delta(idx, old_word ^ new_word);
        Ok(())
    }

    /// Set a cell's decay rate, clamped to `[0, 1]`.
    pub fn set_decay_rate(&mut self, idx: usize, rate: f64) -> Result<(), SubstrateError> {
        Self::check_index(idx)?;
        self.cells[idx].decay_rate = clamp_bounded(rate, DECAY_RATE_MAX);
        Ok(())
    }

    /// Verify parity across the grid.
    ///
    /// Recomputes the checksum and re-validates every cell against its bounds.
    /// Reports [`SubstrateError::ParityError`] on any mismatch; nothing is
    /// repaired, the stored checksum is left as it was.
    pub fn sync(&self) -> Result<(), SubstrateError> {
        let computed = compute_checksum(&self.cells);
        let invalid_cells = self.cells.iter().filter(|c| !c.is_valid()).count();
        if computed != self.checksum || invalid_cells > 0 {
            tracing::warn!(
                stored = self.checksum,
                computed,
                invalid_cells,
                "substrate parity check failed"
            );
            return Err(SubstrateError::ParityError {
                stored: self.checksum,
                computed,
                invalid_cells,
            });
        }
        Ok(())
    }

    /// Advance time by one tick, decaying every cell's magnitude by its rate.
    pub fn tick(&mut self) {
        self.global_time = self.global_time.wrapping_add(1);
        for cell in self.cells.iter_mut() {
            cell.magnitude *= 1.0 - cell.decay_rate;
        }
        self.checksum = compute_checksum(&self.cells);
    }

    // ── Musculature (ferrofluid) ───────────────────────────────────────────

    /// Apply a force vector to one cell.
    ///
    /// The force magnitude raises the cell's magnitude (less viscosity) and
    /// coherence; the force direction in the x/y plane nudges the phase.
    pub fn apply_force(
        &mut self,
        idx: usize,
        fx: f64,
        fy: f64,
        fz: f64,
    ) -> Result<(), SubstrateError> {
        Self::check_index(idx)?;
        let force = (fx * fx + fy * fy + fz * fz).sqrt();
        let angle = fy.atan2(fx);
        let cell = self.cells[idx];
        self.write_cell(
            idx,
            cell.magnitude + force * (1.0 - FERROFLUID_VISCOSITY),
            cell.phase + angle * 0.1,
            cell.coherence + force * 0.5,
        )
    }

    /// Propagate a damped wave outward from `origin`.
    ///
    /// Breadth-first over grid adjacency: every cell at hop distance `d` is
    /// written before any cell at `d + 1`. A cell at distance `d ≤ 10` gains
    /// `amplitude · 0.95^d` magnitude and `2π·d/λ` phase, with
    /// `λ = WAVE_SPEED / frequency`. Returns the number of cells written.
    pub fn propagate_wave(
        &mut self,
        origin: usize,
        amplitude: f64,
        frequency: f64,
    ) -> Result<usize, SubstrateError> {
        Self::check_index(origin)?;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(SubstrateError::InvalidArgument {
                name: "frequency",
                reason: format!("{frequency} is not a positive finite frequency"),
            });
        }
        if !amplitude.is_finite() {
            return Err(SubstrateError::InvalidArgument {
                name: "amplitude",
                reason: "must be finite".to_string(),
            });
        }
        let wavelength = WAVE_SPEED / frequency;

        let mut visited = vec![false; CELL_COUNT];
        let mut frontier = vec![origin];
        visited[origin] = true;
        let mut written = 0usize;

        for distance in 0..=WAVE_MAX_HOPS {
            if frontier.is_empty() {
                break;
            }
            let d = f64::from(distance);
            let attenuation = WAVE_DAMPING.powi(distance as i32);
            let phase_shift = TAU * d / wavelength;

            let mut next = Vec::new();
            for &idx in &frontier {
                let cell = self.cells[idx];
                self.write_cell(
                    idx,
                    cell.magnitude + amplitude * attenuation,
                    cell.phase + phase_shift,
                    cell.coherence,
                )?;
                written += 1;
                for n in neighbors(idx) {
                    if !visited[n] {
                        visited[n] = true;
                        next.push(n);
                    }
                }
            }
            frontier = next;
        }
        tracing::debug!(origin, amplitude, frequency, written, "wave propagated");
        Ok(written)
    }

    // ── Quantum pouch ──────────────────────────────────────────────────────

    /// Store a superposition beside a cell and flag the cell as quantum.
    pub fn quantum_store(&mut self, idx: usize, state: QuantumState) -> Result<(), SubstrateError> {
        Self::check_index(idx)?;
        self.cells[idx].flags |= FLAG_QUANTUM;
        self.quantum.insert(idx, state);
        Ok(())
    }

    /// Retrieve a cell's superposition; the empty state if none was stored.
    pub fn quantum_retrieve(&self, idx: usize) -> Result<QuantumState, SubstrateError> {
        Self::check_index(idx)?;
        Ok(self.quantum.get(&idx).cloned().unwrap_or_default())
    }

    // ── Introspection ──────────────────────────────────────────────────────

    /// Borrow a cell.
    pub fn cell(&self, idx: usize) -> Result<&Cell, SubstrateError> {
        Self::check_index(idx)?;
        Ok(&self.cells[idx])
    }

    /// All cells in index order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Ticks elapsed since `init`.
    pub fn global_time(&self) -> u64 {
        self.global_time
    }

    /// Stored checksum.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Successful reads since `init`.
    pub fn read_ops(&self) -> u64 {
        self.read_ops.get()
    }

    /// Successful writes since `init`.
    pub fn write_ops(&self) -> u64 {
        self.write_ops
    }

    /// Summary statistics.
    pub fn status(&self) -> SubstrateStatus {
        let total_magnitude: f64 = self.cells.iter().map(|c| c.magnitude).sum();
        let total_coherence: f64 = self.cells.iter().map(|c| c.coherence).sum();
        let max_magnitude = self
            .cells
            .iter()
            .map(|c| c.magnitude)
            .fold(0.0_f64, f64::max);
        SubstrateStatus {
            cell_count: CELL_COUNT,
            global_time: self.global_time,
            checksum: self.checksum,
            read_ops: self.read_ops.get(),
            write_ops: self.write_ops,
            avg_magnitude: total_magnitude / CELL_COUNT as f64,
            max_magnitude,
            avg_coherence: total_coherence / CELL_COUNT as f64,
            quantum_cells: self.quantum.len(),
        }
    }

    /// Rebuild a substrate from raw parts without normalizing anything.
    ///
    /// Used by snapshot restore so that a tampered snapshot surfaces through
    /// [`Substrate::sync`] instead of being silently corrected.
    pub(crate) fn from_raw_parts(
        cells: Vec<Cell>,
        global_time: u64,
        checksum: u32,
        read_ops: u64,
        write_ops: u64,
        quantum: impl IntoIterator<Item = (usize, QuantumState)>,
    ) -> Result<Self, SubstrateError> {
        if cells.len() != CELL_COUNT {
            return Err(SubstrateError::CellCountMismatch {
                found: cells.len(),
                expected: CELL_COUNT,
            });
        }
        let mut table = HashMap::new();
        for (idx, state) in quantum {
            Self::check_index(idx)?;
            table.insert(idx, state);
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
            global_time,
            checksum,
            read_ops: Counter::new(read_ops),
            write_ops,
            quantum: table,
        })
    }

    /// Iterate over stored superpositions, ordered by cell index.
    pub fn quantum_entries(&self) -> Vec<(usize, &QuantumState)> {
        let mut entries: Vec<(usize, &QuantumState)> =
            self.quantum.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(idx, _)| *idx);
        entries
    }
}

impl Default for Substrate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Substrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substrate")
            .field("global_time", &self.global_time)
            .field("checksum", &format_args!("0x{:08X}", self.checksum))
            .field("read_ops", &self.read_ops.get())
            .field("write_ops", &self.write_ops)
            .field("quantum_cells", &self.quantum.len())
            .finish()
    }
}

/// Up to four grid neighbours of `idx`: left, right, up, down.
///
/// Edge and corner cells have fewer. An out-of-range index has none.
pub fn neighbors(idx: usize) -> HVec<usize, 4> {
    let mut out = HVec::new();
    if idx >= CELL_COUNT {
        return out;
    }
    let x = idx % GRID_WIDTH;
    let y = idx / GRID_WIDTH;
    // Capacity is exactly four, so pushes cannot fail.
    if x > 0 {
        let _ = out.push(idx - 1);
    }
    if x < GRID_WIDTH - 1 {
        let _ = out.push(idx + 1);
    }
    if y > 0 {
        let _ = out.push(idx - GRID_WIDTH);
    }
    if y < GRID_WIDTH - 1 {
        let _ = out.push(idx + GRID_WIDTH);
    }
    out
}

/// Grid (Manhattan) distance between two cells, i.e. their BFS hop count.
pub fn grid_distance(a: usize, b: usize) -> usize {
    let (ax, ay) = (a % GRID_WIDTH, a / GRID_WIDTH);
    let (bx, by) = (b % GRID_WIDTH, b / GRID_WIDTH);
    ax.abs_diff(bx) + ay.abs_diff(by)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
