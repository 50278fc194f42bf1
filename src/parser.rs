/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! GDF (Glyph Definition Format) parser.
//!
//! GDF is line oriented:
//!
//! ```text
//! # comment
//! glyph_id: 001
//! parent_glyphs: 000
//! resonance_freq: 440.0
//! activation_simulation: resonate(2.0) | entangle(parent)
//! ```
//!
//! Each non-blank, non-comment line splits on its first `:` into a trimmed key
//! and value. Unknown keys and lines without a colon are ignored. A repeated
//! key overwrites the earlier value.
//!
//! A definition is accepted only when it carries a valid `glyph_id` and every
//! field validates. Identifiers that look like paths are reported as
//! [`SecurityRejection::UnsafeGlyphId`], not as parse errors.

use crate::config::MAX_FILE_SIZE;
use crate::error::{LoadError, ParseError, SecurityRejection};
use crate::glyph::{
    is_path_like, is_valid_glyph_id, GlyphDef, COHERENCE_RANGE, ENTANGLEMENT_RANGE,
    MAGNITUDE_RANGE, MAX_ACTIVATION_LEN, MAX_CHRONOCODE_LEN, MAX_CONTRIBUTOR_LEN,
    MAX_FREQUENCY_SIGNATURE_LEN, MAX_MATERIAL_SPEC_LEN, MAX_OPAQUE_LEN, MAX_PARENTS,
    MAX_QUANTUM_STATE, PHASE_OFFSET_RANGE, RESONANCE_RANGE,
};

// ─── Keys ───────────────────────────────────────────────────────────────────

/// Recognized field, after alias folding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    GlyphId,
    Chronocode,
    ParentGlyphs,
    ResonanceFreq,
    FieldMagnitude,
    Coherence,
    ContributorInheritance,
    MaterialSpec,
    FrequencySignature,
    ActivationSimulation,
    EntanglementCoeff,
    PhaseOffset,
    QuantumState,
    Metadata,
    Dependencies,
    Outputs,
    Constraints,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "glyph_id" => Field::GlyphId,
            "chronocode" => Field::Chronocode,
            "parent_glyphs" | "parent" => Field::ParentGlyphs,
            "resonance_freq" | "resonance" => Field::ResonanceFreq,
            "field_magnitude" | "magnitude" => Field::FieldMagnitude,
            "coherence" => Field::Coherence,
            "contributor_inheritance" | "contributor" => Field::ContributorInheritance,
            "material_spec" | "material" => Field::MaterialSpec,
            "frequency_signature" | "freq_sig" => Field::FrequencySignature,
            "activation_simulation" | "activation" => Field::ActivationSimulation,
            "entanglement_coeff" | "entanglement" => Field::EntanglementCoeff,
            "phase_offset" | "phase" => Field::PhaseOffset,
            "quantum_state" => Field::QuantumState,
            "metadata" => Field::Metadata,
            "dependencies" => Field::Dependencies,
            "outputs" => Field::Outputs,
            "constraints" => Field::Constraints,
            _ => return None,
        };
        Some(field)
    }

    fn name(self) -> &'static str {
        match self {
            Field::GlyphId => "glyph_id",
            Field::Chronocode => "chronocode",
            Field::ParentGlyphs => "parent_glyphs",
            Field::ResonanceFreq => "resonance_freq",
            Field::FieldMagnitude => "field_magnitude",
            Field::Coherence => "coherence",
            Field::ContributorInheritance => "contributor_inheritance",
            Field::MaterialSpec => "material_spec",
            Field::FrequencySignature => "frequency_signature",
            Field::ActivationSimulation => "activation_simulation",
            Field::EntanglementCoeff => "entanglement_coeff",
            Field::PhaseOffset => "phase_offset",
            Field::QuantumState => "quantum_state",
            Field::Metadata => "metadata",
            Field::Dependencies => "dependencies",
            Field::Outputs => "outputs",
            Field::Constraints => "constraints",
        }
    }
}

// ─── Value validation ───────────────────────────────────────────────────────

fn parse_bounded(field: Field, value: &str, (min, max): (f64, f64)) -> Result<f64, ParseError> {
    let parsed: f64 = value.parse().map_err(|_| ParseError::InvalidNumber {
        field: field.name(),
        value: value.to_string(),
    })?;
    if !parsed.is_finite() {
        return Err(ParseError::NonFinite { field: field.name() });
    }
    if parsed < min || parsed > max {
        return Err(ParseError::OutOfRange {
            field: field.name(),
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}

fn parse_quantum_state(value: &str) -> Result<u8, ParseError> {
    let field = Field::QuantumState;
    let parsed: i64 = value.parse().map_err(|_| ParseError::InvalidNumber {
        field: field.name(),
        value: value.to_string(),
    })?;
    if !(0..=i64::from(MAX_QUANTUM_STATE)).contains(&parsed) {
        return Err(ParseError::OutOfRange {
            field: field.name(),
            value: parsed as f64,
            min: 0.0,
            max: f64::from(MAX_QUANTUM_STATE),
        });
    }
    Ok(parsed as u8)
}

fn bounded_text(field: Field, value: &str, max: usize) -> Result<String, ParseError> {
    if value.len() > max {
        return Err(ParseError::FieldTooLong {
            field: field.name(),
            len: value.len(),
            max,
        });
    }
    Ok(value.to_string())
}

/// Validate an identifier (own id or parent id).
pub fn validate_glyph_id(id: &str) -> Result<(), LoadError> {
    if is_path_like(id) {
        tracing::warn!(target: "glyph_core::security", id, "path-like glyph id refused");
        return Err(SecurityRejection::UnsafeGlyphId { id: id.to_string() }.into());
    }
    if !is_valid_glyph_id(id) {
        return Err(ParseError::InvalidGlyphId { id: id.to_string() }.into());
    }
    Ok(())
}

fn parse_parents(value: &str) -> Result<Vec<String>, LoadError> {
    let parents: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if parents.len() > MAX_PARENTS {
        return Err(ParseError::TooManyParents {
            count: parents.len(),
            max: MAX_PARENTS,
        }
        .into());
    }
    for parent in &parents {
        validate_glyph_id(parent)?;
    }
    Ok(parents)
}

// ─── Entry points ───────────────────────────────────────────────────────────

/// Parse GDF text into a validated [`GlyphDef`].
pub fn parse_gdf(text: &str) -> Result<GlyphDef, LoadError> {
    if text.len() as u64 > MAX_FILE_SIZE {
        return Err(ParseError::ContentTooLarge {
            len: text.len(),
            max: MAX_FILE_SIZE as usize,
        }
        .into());
    }

    let mut def = GlyphDef::default();
    let mut glyph_id: Option<String> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            tracing::debug!(line = lineno + 1, "skipping line without `:`");
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let Some(field) = Field::from_key(key) else {
            tracing::debug!(line = lineno + 1, key, "ignoring unknown key");
            continue;
        };

        match field {
            Field::GlyphId => glyph_id = Some(value.to_string()),
            Field::Chronocode => {
                def.chronocode = bounded_text(field, value, MAX_CHRONOCODE_LEN)?;
            }
            Field::ParentGlyphs => def.parent_glyphs = parse_parents(value)?,
            Field::ResonanceFreq => {
                def.resonance_freq = Some(parse_bounded(field, value, RESONANCE_RANGE)?);
            }
            Field::FieldMagnitude => {
                def.field_magnitude = Some(parse_bounded(field, value, MAGNITUDE_RANGE)?);
            }
            Field::Coherence => {
                def.coherence = Some(parse_bounded(field, value, COHERENCE_RANGE)?);
            }
            Field::ContributorInheritance => {
                def.contributor_inheritance = bounded_text(field, value, MAX_CONTRIBUTOR_LEN)?;
            }
            Field::MaterialSpec => {
                def.material_spec = bounded_text(field, value, MAX_MATERIAL_SPEC_LEN)?;
            }
            Field::FrequencySignature => {
                def.frequency_signature =
                    bounded_text(field, value, MAX_FREQUENCY_SIGNATURE_LEN)?;
            }
            Field::ActivationSimulation => {
                def.activation_simulation = bounded_text(field, value, MAX_ACTIVATION_LEN)?;
            }
            Field::EntanglementCoeff => {
                def.entanglement_coeff = Some(parse_bounded(field, value, ENTANGLEMENT_RANGE)?);
            }
            Field::PhaseOffset => {
                def.phase_offset = Some(parse_bounded(field, value, PHASE_OFFSET_RANGE)?);
            }
            Field::QuantumState => def.quantum_state = Some(parse_quantum_state(value)?),
            Field::Metadata => def.metadata = bounded_text(field, value, MAX_OPAQUE_LEN)?,
            Field::Dependencies => {
                def.dependencies = bounded_text(field, value, MAX_OPAQUE_LEN)?;
            }
            Field::Outputs => def.outputs = bounded_text(field, value, MAX_OPAQUE_LEN)?,
            Field::Constraints => def.constraints = bounded_text(field, value, MAX_OPAQUE_LEN)?,
        }
    }

    let glyph_id = match glyph_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ParseError::MissingGlyphId.into()),
    };
    validate_glyph_id(&glyph_id)?;
    def.glyph_id = glyph_id;
    Ok(def)
}

/// Parse raw bytes: size ceiling and UTF-8 check, then [`parse_gdf`].
pub fn parse_gdf_bytes(bytes: &[u8]) -> Result<GlyphDef, LoadError> {
    if bytes.len() as u64 > MAX_FILE_SIZE {
        return Err(ParseError::ContentTooLarge {
            len: bytes.len(),
            max: MAX_FILE_SIZE as usize,
        }
        .into());
    }
    let text = core::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    parse_gdf(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(text: &str) -> ParseError {
        match parse_gdf(text) {
            Err(LoadError::Parse(e)) => e,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_full_definition() {
        let text = "\
# fire sigil
glyph_id: 002
chronocode: 20250101_130000
parent_glyphs: 001, 000
resonance_freq: 1320.0
field_magnitude: 0.8
coherence: 85
contributor_inheritance: alice
material_spec: copper coil
frequency_signature: 1320/660
activation_simulation: resonate(1.5) | entangle(001) | phase_shift(30) | stabilize()
entanglement_coeff: 2.0
phase_offset: 90
quantum_state: 3
metadata: {\"k\": \"v\"}
dependencies: none
outputs: light
constraints: daylight
";
        let g = parse_gdf(text).unwrap();
        assert_eq!(g.glyph_id, "002");
        assert_eq!(g.chronocode, "20250101_130000");
        assert_eq!(g.parent_glyphs, vec!["001".to_string(), "000".to_string()]);
        assert_eq!(g.resonance_freq, Some(1320.0));
        assert_eq!(g.field_magnitude, Some(0.8));
        assert_eq!(g.coherence, Some(85.0));
        assert_eq!(g.contributor_inheritance, "alice");
        assert_eq!(g.material_spec, "copper coil");
        assert_eq!(g.frequency_signature, "1320/660");
        assert_eq!(
            g.activation_simulation,
            "resonate(1.5) | entangle(001) | phase_shift(30) | stabilize()"
        );
        assert_eq!(g.entanglement_coeff, Some(2.0));
        assert_eq!(g.phase_offset, Some(90.0));
        assert_eq!(g.quantum_state, Some(3));
        assert_eq!(g.metadata, "{\"k\": \"v\"}");
        assert_eq!(g.dependencies, "none");
        assert_eq!(g.outputs, "light");
        assert_eq!(g.constraints, "daylight");
    }

    #[test]
    fn test_aliases() {
        let g = parse_gdf(
            "glyph_id: a\nparent: p\nresonance: 220\nmagnitude: 2\ncontributor: c\n\
             material: m\nfreq_sig: f\nactivation: amplify(2)\nentanglement: 1.5\nphase: 45\n",
        )
        .unwrap();
        assert_eq!(g.parent_glyphs, vec!["p".to_string()]);
        assert_eq!(g.resonance_freq, Some(220.0));
        assert_eq!(g.field_magnitude, Some(2.0));
        assert_eq!(g.contributor_inheritance, "c");
        assert_eq!(g.material_spec, "m");
        assert_eq!(g.frequency_signature, "f");
        assert_eq!(g.activation_simulation, "amplify(2)");
        assert_eq!(g.entanglement_coeff, Some(1.5));
        assert_eq!(g.phase_offset, Some(45.0));
    }

    #[test]
    fn test_undeclared_numbers_stay_none() {
        let g = parse_gdf("glyph_id: bare").unwrap();
        assert_eq!(g.resonance_freq, None);
        assert_eq!(g.coherence, None);
        assert_eq!(g.quantum_state, None);
        assert!(g.parent_glyphs.is_empty());
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let g = parse_gdf("glyph_id: t\nmetadata: a:b:c\n").unwrap();
        assert_eq!(g.metadata, "a:b:c");
    }

    #[test]
    fn test_skips_noise_lines() {
        let g = parse_gdf("\n   \n# c\nno colon here\nunknown_key: 5\r\nglyph_id: x\r\n").unwrap();
        assert_eq!(g.glyph_id, "x");
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let g = parse_gdf("glyph_id: x\nresonance_freq: 100\nresonance: 200\n").unwrap();
        assert_eq!(g.resonance_freq, Some(200.0));
    }

    #[test]
    fn test_missing_glyph_id() {
        assert_eq!(parse_err("resonance_freq: 440"), ParseError::MissingGlyphId);
        assert_eq!(parse_err("glyph_id:   "), ParseError::MissingGlyphId);
    }

    #[test]
    fn test_invalid_glyph_id() {
        assert!(matches!(parse_err("glyph_id: has space"), ParseError::InvalidGlyphId { .. }));
        let long = format!("glyph_id: {}", "x".repeat(65));
        assert!(matches!(parse_err(&long), ParseError::InvalidGlyphId { .. }));
    }

    #[test]
    fn test_path_like_id_is_security_rejection() {
        let err = parse_gdf("glyph_id: ../../etc/passwd").unwrap_err();
        assert!(err.is_security(), "{err}");
        let err = parse_gdf("glyph_id: ok\nparent_glyphs: ..\\up").unwrap_err();
        assert!(err.is_security(), "{err}");
    }

    #[test]
    fn test_numeric_out_of_range() {
        match parse_err("glyph_id: x\nresonance_freq: 99999999999") {
            ParseError::OutOfRange { field, max, .. } => {
                assert_eq!(field, "resonance_freq");
                assert_eq!(max, 100_000.0);
            }
            other => panic!("{other:?}"),
        }
        assert!(matches!(
            parse_err("glyph_id: x\ncoherence: 101"),
            ParseError::OutOfRange { field: "coherence", .. }
        ));
        assert!(matches!(
            parse_err("glyph_id: x\nfield_magnitude: -1"),
            ParseError::OutOfRange { .. }
        ));
        assert!(matches!(
            parse_err("glyph_id: x\nquantum_state: 9"),
            ParseError::OutOfRange { field: "quantum_state", .. }
        ));
    }

    #[test]
    fn test_numeric_garbage() {
        assert!(matches!(
            parse_err("glyph_id: x\nresonance_freq: loud"),
            ParseError::InvalidNumber { .. }
        ));
        assert!(matches!(
            parse_err("glyph_id: x\nresonance_freq: NaN"),
            ParseError::NonFinite { .. }
        ));
        assert!(matches!(
            parse_err("glyph_id: x\nphase_offset: inf"),
            ParseError::NonFinite { .. }
        ));
        assert!(matches!(
            parse_err("glyph_id: x\nquantum_state: 2.5"),
            ParseError::InvalidNumber { .. }
        ));
    }

    #[test]
    fn test_text_ceilings() {
        let text = format!("glyph_id: x\nchronocode: {}", "9".repeat(33));
        assert!(matches!(parse_err(&text), ParseError::FieldTooLong { field: "chronocode", .. }));
        let text = format!("glyph_id: x\nactivation_simulation: {}", "a".repeat(257));
        assert!(matches!(parse_err(&text), ParseError::FieldTooLong { max: 256, .. }));
    }

    #[test]
    fn test_parent_list() {
        let g = parse_gdf("glyph_id: x\nparent_glyphs: a, ,b,,c ").unwrap();
        assert_eq!(g.parent_glyphs, vec!["a", "b", "c"]);

        let many: Vec<String> = (0..17).map(|i| format!("p{i}")).collect();
        let text = format!("glyph_id: x\nparent_glyphs: {}", many.join(","));
        assert_eq!(parse_err(&text), ParseError::TooManyParents { count: 17, max: 16 });

        assert!(matches!(
            parse_err("glyph_id: x\nparent_glyphs: ok, bad id"),
            ParseError::InvalidGlyphId { .. }
        ));
    }

    #[test]
    fn test_bytes_entry_point() {
        assert!(parse_gdf_bytes(b"glyph_id: b").is_ok());
        assert!(matches!(
            parse_gdf_bytes(&[b'g', 0xFF, 0xFE]),
            Err(LoadError::Parse(ParseError::NotUtf8))
        ));
        let big = vec![b'#'; MAX_FILE_SIZE as usize + 1];
        assert!(matches!(
            parse_gdf_bytes(&big),
            Err(LoadError::Parse(ParseError::ContentTooLarge { .. }))
        ));
    }
}
