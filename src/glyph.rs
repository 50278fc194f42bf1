//! Glyph definitions: the validated, immutable record produced by the parser.
//!
//! Numeric fields are `Option` so that inheritance can tell a declared value
//! from an absent one. Text fields are ordinary `String`s bounded by the
//! ceilings below; the parser rejects anything longer.

use crate::substrate::CELL_COUNT;

// ─── Field ceilings (bytes) ─────────────────────────────────────────────────

/// `glyph_id` and each parent id.
pub const MAX_GLYPH_ID_LEN: usize = 64;
/// `chronocode`.
pub const MAX_CHRONOCODE_LEN: usize = 32;
/// `contributor_inheritance`.
pub const MAX_CONTRIBUTOR_LEN: usize = 64;
/// `material_spec`.
pub const MAX_MATERIAL_SPEC_LEN: usize = 256;
/// `frequency_signature`.
pub const MAX_FREQUENCY_SIGNATURE_LEN: usize = 512;
/// `activation_simulation`.
pub const MAX_ACTIVATION_LEN: usize = 256;
/// `metadata`, `dependencies`, `outputs`, `constraints`.
pub const MAX_OPAQUE_LEN: usize = 512;
/// Parents per glyph.
pub const MAX_PARENTS: usize = 16;

// ─── Numeric ranges ─────────────────────────────────────────────────────────

/// `resonance_freq` range (Hz).
pub const RESONANCE_RANGE: (f64, f64) = (0.0, 100_000.0);
/// `field_magnitude` range.
pub const MAGNITUDE_RANGE: (f64, f64) = (0.0, 1000.0);
/// `coherence` range (glyph-level, percent).
pub const COHERENCE_RANGE: (f64, f64) = (0.0, 100.0);
/// `entanglement_coeff` range.
pub const ENTANGLEMENT_RANGE: (f64, f64) = (0.0, 100.0);
/// `phase_offset` range (degrees).
pub const PHASE_OFFSET_RANGE: (f64, f64) = (-360.0, 360.0);
/// Largest `quantum_state` (superposition component count).
pub const MAX_QUANTUM_STATE: u8 = 8;

/// A validated glyph definition.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphDef {
    /// Unique identifier, `[A-Za-z0-9_-]{1,64}`.
    pub glyph_id: String,
    /// Creation timestamp, opaque.
    pub chronocode: String,
    /// Parent ids in declaration order.
    pub parent_glyphs: Vec<String>,
    /// Base resonance (Hz).
    pub resonance_freq: Option<f64>,
    /// Base field magnitude.
    pub field_magnitude: Option<f64>,
    /// Coherence percentage.
    pub coherence: Option<f64>,
    /// Contributor lineage, opaque.
    pub contributor_inheritance: String,
    /// Material description, opaque.
    pub material_spec: String,
    /// Frequency signature, opaque.
    pub frequency_signature: String,
    /// Activation script (raw DSL).
    pub activation_simulation: String,
    /// Entanglement coefficient.
    pub entanglement_coeff: Option<f64>,
    /// Phase offset in degrees.
    pub phase_offset: Option<f64>,
    /// Number of superposition components to project.
    pub quantum_state: Option<u8>,
    /// Opaque metadata.
    pub metadata: String,
    /// Opaque dependency list.
    pub dependencies: String,
    /// Opaque output list.
    pub outputs: String,
    /// Opaque constraints.
    pub constraints: String,
}

impl GlyphDef {
    /// A definition carrying only an id.
    pub fn new(glyph_id: impl Into<String>) -> Self {
        Self {
            glyph_id: glyph_id.into(),
            ..Self::default()
        }
    }

    /// First declared parent, if any.
    pub fn first_parent(&self) -> Option<&str> {
        self.parent_glyphs.first().map(String::as_str)
    }

    /// Substrate cell this glyph projects onto.
    pub fn home_cell(&self) -> usize {
        home_cell(&self.glyph_id)
    }
}

// ─── Identifier hygiene ─────────────────────────────────────────────────────

/// `true` when an id looks like a filesystem path or smuggles control bytes.
///
/// Such ids are treated as adversarial input, not as a format mistake.
pub fn is_path_like(id: &str) -> bool {
    id.contains('/') || id.contains('\\') || id.contains("..") || id.chars().any(char::is_control)
}

/// `true` for a non-empty id of at most 64 bytes drawn from `[A-Za-z0-9_-]`.
pub fn is_valid_glyph_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_GLYPH_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Deterministic FNV-1a hash of a glyph id.
pub fn glyph_hash_u32(glyph_id: &str) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for &b in glyph_id.as_bytes() {
        h ^= u32::from(b);
        h = h.wrapping_mul(16_777_619);
    }
    h
}

/// Home cell of a glyph id: `FNV-1a(id) mod 4096`.
pub fn home_cell(glyph_id: &str) -> usize {
    glyph_hash_u32(glyph_id) as usize % CELL_COUNT
}
