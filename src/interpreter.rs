/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Activation interpreter: composes a glyph's field state from its
//! inheritance chain and runs its activation script.
//!
//! # Activation DSL
//!
//! A script is a `|`-separated list of calls:
//!
//! | Command | Effect on [`FieldState`] |
//! |---------|--------------------------|
//! | `resonate(f)` | `resonance *= f` |
//! | `entangle(parent)` / `entangle(id)` | activate the target, then `entanglement += (R_t / 440) · 0.95 · coeff` and `resonance *= C_t / 100` |
//! | `amplify(f)` | `magnitude *= f` |
//! | `phase_shift(deg)` | `phase = (phase + deg·π/180) mod 2π` |
//! | `stabilize()` | `coherence = min(coherence + 10, 100)` |
//! | `decay(f)` | `magnitude *= 1 − f`, `f ∈ [0, 1]` |
//!
//! `parent` names the first declared parent. Unknown or malformed commands are
//! logged, traced and otherwise skipped. An `entangle` that cycles, exceeds the
//! depth limit or names a missing glyph fails that activation only.
//!
//! # Composition
//!
//! The state starts from [`FieldState::default`]. For every glyph of the chain,
//! oldest ancestor first and the glyph itself last, each declared numeric field
//! overwrites the state: `phase_offset` is converted from degrees, and
//! `entanglement_coeff` sets both the working coefficient and the initial
//! entanglement.

use core::f64::consts::TAU;
use std::fmt;

use hashbrown::HashMap;

use crate::config::InterpreterConfig;
use crate::error::{ActivationError, ConfigError, ResolveError, SubstrateError};
use crate::glyph::{home_cell, is_valid_glyph_id, GlyphDef};
use crate::registry::Registry;
use crate::resolver::{Resolution, Resolver};
use crate::substrate::{normalize_phase, CellReading, QuantumState, Substrate};
use crate::trace::Trace;

/// Glyph coherence is a percentage; cell coherence spans 0–1000.
pub const CELL_COHERENCE_SCALE: f64 = 10.0;

/// Upper bound on the working coherence.
const COHERENCE_CEILING: f64 = 100.0;

// ─── FieldState ─────────────────────────────────────────────────────────────

/// Computed field state of an activated glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldState {
    /// Resonance frequency (Hz).
    pub resonance: f64,
    /// Field magnitude.
    pub magnitude: f64,
    /// Phase in radians, `[0, 2π)`.
    pub phase: f64,
    /// Coherence percentage.
    pub coherence: f64,
    /// Accumulated entanglement factor.
    pub entanglement: f64,
    /// Inheritance depth of the glyph.
    pub depth: u32,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            resonance: 440.0,
            magnitude: 1.0,
            phase: 0.0,
            coherence: 100.0,
            entanglement: 1.0,
            depth: 0,
        }
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R={:.2}Hz M={:.3} P={:.3} C={:.1} E={:.3} D={}",
            self.resonance, self.magnitude, self.phase, self.coherence, self.entanglement, self.depth
        )
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// Target of an `entangle` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The first declared parent.
    Parent,
    /// A glyph named by id.
    Glyph(String),
}

/// One parsed activation command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `resonate(f)`.
    Resonate(f64),
    /// `entangle(target)`.
    Entangle(Target),
    /// `amplify(f)`.
    Amplify(f64),
    /// `phase_shift(degrees)`.
    PhaseShift(f64),
    /// `stabilize()`.
    Stabilize,
    /// `decay(f)`.
    Decay(f64),
    /// A command name the interpreter does not know.
    Unknown(String),
    /// A known command with an unusable argument list.
    Malformed {
        /// Command name.
        name: String,
        /// Raw argument text.
        arg: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Resonate(x) => write!(f, "resonate({x})"),
            Command::Entangle(Target::Parent) => write!(f, "entangle(parent)"),
            Command::Entangle(Target::Glyph(id)) => write!(f, "entangle({id})"),
            Command::Amplify(x) => write!(f, "amplify({x})"),
            Command::PhaseShift(x) => write!(f, "phase_shift({x})"),
            Command::Stabilize => write!(f, "stabilize()"),
            Command::Decay(x) => write!(f, "decay({x})"),
            Command::Unknown(name) => write!(f, "unknown:{name}"),
            Command::Malformed { name, arg, .. } => write!(f, "malformed:{name}({arg})"),
        }
    }
}

fn malformed(name: &str, arg: &str, reason: &'static str) -> Command {
    Command::Malformed {
        name: name.to_string(),
        arg: arg.to_string(),
        reason,
    }
}

fn parse_number(name: &str, arg: &str) -> Result<f64, Command> {
    match arg.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(malformed(name, arg, "argument is not finite")),
        Err(_) => Err(malformed(name, arg, "argument is not a number")),
    }
}

fn parse_factor(name: &str, arg: &str) -> Result<f64, Command> {
    let v = parse_number(name, arg)?;
    if v < 0.0 {
        return Err(malformed(name, arg, "factor must be non-negative"));
    }
    Ok(v)
}

/// Parse one `name(args)` piece.
pub fn parse_command(piece: &str) -> Command {
    let piece = piece.trim();
    let (name, arg) = match piece.find('(') {
        Some(open) => {
            let name = piece[..open].trim();
            let rest = &piece[open + 1..];
            match rest.strip_suffix(')') {
                Some(arg) => (name, Some(arg.trim())),
                None => return malformed(name, rest, "missing closing parenthesis"),
            }
        }
        None => (piece, None),
    };
    if name.is_empty() {
        return malformed(name, arg.unwrap_or(""), "empty command name");
    }

    let known = matches!(
        name,
        "resonate" | "entangle" | "amplify" | "phase_shift" | "stabilize" | "decay"
    );
    if !known {
        return Command::Unknown(name.to_string());
    }
    let Some(arg) = arg else {
        return malformed(name, "", "missing argument list");
    };

    let parsed = match name {
        "resonate" => parse_factor(name, arg).map(Command::Resonate),
        "amplify" => parse_factor(name, arg).map(Command::Amplify),
        "phase_shift" => parse_number(name, arg).map(Command::PhaseShift),
        "decay" => parse_number(name, arg).and_then(|f| {
            if (0.0..=1.0).contains(&f) {
                Ok(Command::Decay(f))
            } else {
                Err(malformed(name, arg, "decay factor must be in [0, 1]"))
            }
        }),
        "stabilize" => {
            if arg.is_empty() {
                Ok(Command::Stabilize)
            } else {
                Err(malformed(name, arg, "takes no argument"))
            }
        }
        "entangle" => match arg {
            "parent" => Ok(Command::Entangle(Target::Parent)),
            id if is_valid_glyph_id(id) => Ok(Command::Entangle(Target::Glyph(id.to_string()))),
            _ => Err(malformed(name, arg, "target is not a glyph id")),
        },
        _ => Ok(Command::Unknown(name.to_string())),
    };
    parsed.unwrap_or_else(|cmd| cmd)
}

/// Split a script on `|` and parse each non-empty piece.
pub fn parse_script(script: &str) -> Vec<Command> {
    script
        .split('|')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(parse_command)
        .collect()
}

// ─── Activation ─────────────────────────────────────────────────────────────

/// Result of activating one glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct Activation {
    /// Activated glyph.
    pub glyph_id: String,
    /// Final field state.
    pub state: FieldState,
    /// Inheritance chain used for composition.
    pub resolution: Resolution,
    /// Declared superposition component count.
    pub quantum_state: Option<u8>,
}

impl Activation {
    /// Substrate cell this activation projects onto.
    pub fn home_cell(&self) -> usize {
        home_cell(&self.glyph_id)
    }

    /// Write the final state into the glyph's home cell.
    ///
    /// Glyph coherence (0–100) is scaled ×10 into cell coherence (0–1000). A
    /// declared `quantum_state = n > 0` stores an `n`-component superposition
    /// with equal amplitudes and evenly spread phases. Returns the normalized
    /// cell as read back.
    pub fn project(&self, substrate: &mut Substrate) -> Result<CellReading, SubstrateError> {
        let idx = self.home_cell();
        substrate.write_cell(
            idx,
            self.state.magnitude,
            self.state.phase,
            self.state.coherence * CELL_COHERENCE_SCALE,
        )?;
        if let Some(n) = self.quantum_state.filter(|n| *n > 0) {
            let count = f64::from(n);
            let amplitude = (1.0 / count).sqrt();
            let pairs: Vec<(f64, f64)> = (0..n)
                .map(|k| (amplitude, self.state.phase + TAU * f64::from(k) / count))
                .collect();
            substrate.quantum_store(idx, QuantumState::from_components(&pairs)?)?;
        }
        tracing::debug!(glyph_id = %self.glyph_id, cell = idx, "activation projected");
        substrate.read_cell(idx)
    }
}

// ─── Interpreter ────────────────────────────────────────────────────────────

/// Runs activations against a registry.
#[derive(Debug)]
pub struct Interpreter<'r> {
    registry: &'r Registry,
    config: InterpreterConfig,
    trace: Trace,
}

impl<'r> Interpreter<'r> {
    /// Interpreter with the default configuration.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            config: InterpreterConfig::default(),
            trace: Trace::default(),
        }
    }

    /// Interpreter with a validated configuration.
    pub fn with_config(registry: &'r Registry, config: InterpreterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let trace = if config.trace_enabled {
            Trace::new(config.trace_capacity)
        } else {
            Trace::disabled()
        };
        Ok(Self {
            registry,
            config,
            trace,
        })
    }

    /// Recorded trace.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Drop the recorded trace.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Active configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Activate one glyph.
    pub fn activate(&mut self, glyph_id: &str) -> Result<Activation, ActivationError> {
        let mut walk = Walk::default();
        let result = self.activate_inner(glyph_id, &mut walk).map(|(act, _)| act);
        match &result {
            Ok(act) => tracing::info!(glyph_id, state = %act.state, "glyph activated"),
            Err(err) => tracing::warn!(glyph_id, error = %err, "activation failed"),
        }
        result
    }

    /// Activate several glyphs independently; one failure does not affect the others.
    pub fn activate_batch<I, S>(&mut self, ids: I) -> Vec<(String, Result<Activation, ActivationError>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| {
                let id = id.as_ref();
                (id.to_string(), self.activate(id))
            })
            .collect()
    }

    /// Compose the starting state of a resolved glyph.
    ///
    /// Returns the state and the working entanglement coefficient.
    pub fn compose(&self, resolution: &Resolution) -> (FieldState, f64) {
        let mut state = FieldState::default();
        let mut coeff = 1.0;
        for id in resolution.composition_order() {
            let Some(def) = self.registry.get(id) else {
                continue;
            };
            if let Some(r) = def.resonance_freq {
                state.resonance = r;
            }
            if let Some(m) = def.field_magnitude {
                state.magnitude = m;
            }
            if let Some(c) = def.coherence {
                state.coherence = c;
            }
            if let Some(p) = def.phase_offset {
                state.phase = normalize_phase(p.to_radians());
            }
            if let Some(e) = def.entanglement_coeff {
                coeff = e;
                state.entanglement = e;
            }
        }
        state.depth = resolution.depth;
        (state, coeff)
    }

    /// Returns the activation and the height of its `entangle` tree.
    fn activate_inner(
        &mut self,
        glyph_id: &str,
        walk: &mut Walk,
    ) -> Result<(Activation, u32), ActivationError> {
        let path = &walk.path;
        if let Some(start) = path.iter().position(|p| p == glyph_id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(glyph_id.to_string());
            return Err(ResolveError::CircularInheritance {
                glyph_id: glyph_id.to_string(),
                cycle,
            }
            .into());
        }
        if path.len() as u32 > self.config.max_depth {
            return Err(ResolveError::DepthExceeded {
                glyph_id: glyph_id.to_string(),
                limit: self.config.max_depth,
            }
            .into());
        }
        if let Some((act, height)) = walk.finished.get(glyph_id) {
            // A finished target is never on the path; only its depth can differ.
            if path.len() as u32 + height > self.config.max_depth {
                return Err(ResolveError::DepthExceeded {
                    glyph_id: glyph_id.to_string(),
                    limit: self.config.max_depth,
                }
                .into());
            }
            return Ok((act.clone(), *height));
        }

        let registry = self.registry;
        let resolution = Resolver::with_max_depth(registry, self.config.max_depth).resolve(glyph_id)?;
        let def = registry
            .get(glyph_id)
            .ok_or_else(|| ResolveError::UnknownGlyph {
                glyph_id: glyph_id.to_string(),
            })?;

        let (mut state, coeff) = self.compose(&resolution);
        self.trace.record(glyph_id, "compose", state);

        walk.path.push(glyph_id.to_string());
        let mut height = 0;
        for command in parse_script(&def.activation_simulation) {
            if let Some(h) = self.execute(def, &command, &mut state, coeff, walk)? {
                height = height.max(h + 1);
            }
            self.trace.record(glyph_id, command.to_string(), state);
        }
        walk.path.pop();

        let activation = Activation {
            glyph_id: glyph_id.to_string(),
            state,
            resolution,
            quantum_state: def.quantum_state,
        };
        walk.finished
            .insert(glyph_id.to_string(), (activation.clone(), height));
        Ok((activation, height))
    }

    fn execute(
        &mut self,
        def: &GlyphDef,
        command: &Command,
        state: &mut FieldState,
        coeff: f64,
        walk: &mut Walk,
    ) -> Result<Option<u32>, ActivationError> {
        match command {
            Command::Resonate(f) => state.resonance *= f,
            Command::Amplify(f) => state.magnitude *= f,
            Command::PhaseShift(deg) => state.phase = normalize_phase(state.phase + deg.to_radians()),
            Command::Stabilize => {
                state.coherence = (state.coherence + self.config.stabilize_increment).min(COHERENCE_CEILING);
            }
            Command::Decay(f) => state.magnitude *= 1.0 - f,
            Command::Entangle(target) => {
                let target_id = match target {
                    Target::Parent => def.first_parent().ok_or_else(|| ActivationError::NoParent {
                        glyph_id: def.glyph_id.clone(),
                    })?,
                    Target::Glyph(id) => id.as_str(),
                };
                if !self.registry.contains(target_id) {
                    return Err(ActivationError::UnknownTarget {
                        glyph_id: def.glyph_id.clone(),
                        target: target_id.to_string(),
                    });
                }
                let (target, height) = self.activate_inner(target_id, walk)?;
                state.entanglement += (target.state.resonance / self.config.reference_resonance)
                    * self.config.entangle_damping
                    * coeff;
                state.resonance *= target.state.coherence / COHERENCE_CEILING;
                return Ok(Some(height));
            }
            Command::Unknown(name) => {
                tracing::warn!(glyph_id = %def.glyph_id, command = %name, "unknown command skipped");
            }
            Command::Malformed { name, arg, reason } => {
                tracing::warn!(
                    glyph_id = %def.glyph_id,
                    command = %name,
                    arg = %arg,
                    reason,
                    "malformed command skipped"
                );
            }
        }
        Ok(None)
    }
}

/// State of one top-level activation: the `entangle` path being walked and
/// the glyphs already finished, with the height of their `entangle` trees.
///
/// A glyph's result depends only on the registry, so each glyph runs at most
/// once per activation however many scripts entangle it.
#[derive(Default)]
struct Walk {
    path: Vec<String>,
    finished: HashMap<String, (Activation, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gdf;

    fn registry(sources: &[&str]) -> Registry {
        let mut reg = Registry::new();
        for src in sources {
            reg.insert(parse_gdf(src).unwrap()).unwrap();
        }
        reg
    }

    // ── Script parsing ────────────────────────────────────────────────────

    #[test]
    fn test_parse_script_commands() {
        let cmds = parse_script(
            "resonate(2.0) | entangle(parent) | amplify(1.5) | phase_shift(-30) | stabilize() | decay(0.2) | entangle(000)",
        );
        assert_eq!(
            cmds,
            vec![
                Command::Resonate(2.0),
                Command::Entangle(Target::Parent),
                Command::Amplify(1.5),
                Command::PhaseShift(-30.0),
                Command::Stabilize,
                Command::Decay(0.2),
                Command::Entangle(Target::Glyph("000".into())),
            ]
        );
    }

    #[test]
    fn test_parse_script_drops_empty_pieces() {
        assert_eq!(parse_script(" | stabilize() ||  "), vec![Command::Stabilize]);
        assert!(parse_script("").is_empty());
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert_eq!(parse_command("dance(3)"), Command::Unknown("dance".into()));
        assert!(matches!(parse_command("resonate(loud)"), Command::Malformed { .. }));
        assert!(matches!(parse_command("resonate(2.0"), Command::Malformed { .. }));
        assert!(matches!(parse_command("resonate"), Command::Malformed { .. }));
        assert!(matches!(parse_command("resonate(-1)"), Command::Malformed { .. }));
        assert!(matches!(parse_command("decay(1.5)"), Command::Malformed { .. }));
        assert!(matches!(parse_command("stabilize(3)"), Command::Malformed { .. }));
        assert!(matches!(parse_command("entangle(../x)"), Command::Malformed { .. }));
        assert!(matches!(parse_command("entangle()"), Command::Malformed { .. }));
        assert!(matches!(parse_command("(2)"), Command::Malformed { .. }));
    }

    #[test]
    fn test_command_labels() {
        assert_eq!(Command::Resonate(2.0).to_string(), "resonate(2)");
        assert_eq!(Command::Stabilize.to_string(), "stabilize()");
        assert_eq!(Command::Entangle(Target::Parent).to_string(), "entangle(parent)");
    }

    // ── Activation ────────────────────────────────────────────────────────

    #[test]
    fn test_root_activation_uses_declared_fields() {
        let reg = registry(&["glyph_id: 000\nresonance_freq: 220\nfield_magnitude: 2\ncoherence: 80"]);
        let act = Interpreter::new(&reg).activate("000").unwrap();
        assert_eq!(act.state.resonance, 220.0);
        assert_eq!(act.state.magnitude, 2.0);
        assert_eq!(act.state.coherence, 80.0);
        assert_eq!(act.state.entanglement, 1.0);
        assert_eq!(act.state.depth, 0);
    }

    #[test]
    fn test_parent_entangle_worked_example() {
        let reg = registry(&[
            "glyph_id: 000\nresonance_freq: 440",
            "glyph_id: 001\nparent_glyphs: 000\nactivation_simulation: resonate(2.0) | entangle(parent)",
        ]);
        let act = Interpreter::new(&reg).activate("001").unwrap();
        assert!((act.state.resonance - 880.0).abs() < 1e-9);
        assert!((act.state.entanglement - 1.95).abs() < 1e-9);
        assert_eq!(act.state.depth, 1);
        assert_eq!(format!("{:.2}", act.state.resonance), "880.00");
        assert_eq!(format!("{:.3}", act.state.entanglement), "1.950");
    }

    #[test]
    fn test_child_overrides_parent_fields() {
        let reg = registry(&[
            "glyph_id: p\nresonance_freq: 300\nfield_magnitude: 5\nphase_offset: 90",
            "glyph_id: c\nparent_glyphs: p\nfield_magnitude: 2\nentanglement_coeff: 1.5",
        ]);
        let act = Interpreter::new(&reg).activate("c").unwrap();
        assert_eq!(act.state.resonance, 300.0);
        assert_eq!(act.state.magnitude, 2.0);
        assert!((act.state.phase - core::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(act.state.entanglement, 1.5);
    }

    #[test]
    fn test_amplify_decay_stabilize() {
        let reg = registry(&[
            "glyph_id: 000\nresonance_freq: 440\nfield_magnitude: 1",
            "glyph_id: 003\nparent_glyphs: 000\nfield_magnitude: 2\ncoherence: 95\n\
             activation_simulation: amplify(3.0) | decay(0.2) | stabilize()",
        ]);
        let act = Interpreter::new(&reg).activate("003").unwrap();
        assert!((act.state.magnitude - 4.8).abs() < 1e-9);
        assert_eq!(act.state.coherence, 100.0);
    }

    #[test]
    fn test_phase_shift_wraps() {
        let reg = registry(&["glyph_id: p\nphase_offset: 300\nactivation_simulation: phase_shift(90)"]);
        let act = Interpreter::new(&reg).activate("p").unwrap();
        assert!((act.state.phase - 30f64.to_radians()).abs() < 1e-9, "{}", act.state.phase);
    }

    #[test]
    fn test_unknown_command_is_skipped_and_traced() {
        let reg = registry(&["glyph_id: u\nactivation_simulation: dance(2) | resonate(2)"]);
        let mut interp = Interpreter::new(&reg);
        let act = interp.activate("u").unwrap();
        assert_eq!(act.state.resonance, 880.0);
        let ops: Vec<&str> = interp.trace().entries().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["compose", "unknown:dance", "resonate(2)"]);
    }

    #[test]
    fn test_entangle_errors() {
        let reg = registry(&[
            "glyph_id: orphan\nactivation_simulation: entangle(parent)",
            "glyph_id: lost\nactivation_simulation: entangle(nowhere)",
            "glyph_id: selfish\nactivation_simulation: entangle(selfish)",
            "glyph_id: ping\nactivation_simulation: entangle(pong)",
            "glyph_id: pong\nactivation_simulation: entangle(ping)",
        ]);
        let mut interp = Interpreter::new(&reg);
        assert_eq!(
            interp.activate("orphan"),
            Err(ActivationError::NoParent { glyph_id: "orphan".into() })
        );
        assert!(matches!(interp.activate("lost"), Err(ActivationError::UnknownTarget { .. })));
        assert!(matches!(
            interp.activate("selfish"),
            Err(ActivationError::Resolve(ResolveError::CircularInheritance { .. }))
        ));
        match interp.activate("ping") {
            Err(ActivationError::Resolve(ResolveError::CircularInheritance { cycle, .. })) => {
                assert_eq!(cycle, vec!["ping", "pong", "ping"]);
            }
            other => panic!("expected entangle cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_entangle_depth_bounded() {
        let mut sources = vec!["glyph_id: e0".to_string()];
        for i in 1..40 {
            sources.push(format!("glyph_id: e{i}\nactivation_simulation: entangle(e{})", i - 1));
        }
        let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
        let reg = registry(&refs);
        let mut interp = Interpreter::new(&reg);
        assert!(interp.activate("e20").is_ok());
        assert!(matches!(
            interp.activate("e39"),
            Err(ActivationError::Resolve(ResolveError::DepthExceeded { .. }))
        ));
    }

    #[test]
    fn test_entangle_fan_out_runs_each_glyph_once() {
        // Every link entangles the one below it eighteen times.
        let mut sources = vec!["glyph_id: f0".to_string()];
        for i in 1..=32 {
            let script = vec![format!("entangle(f{})", i - 1); 18].join("|");
            sources.push(format!("glyph_id: f{i}\nactivation_simulation: {script}"));
        }
        let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
        let reg = registry(&refs);
        let mut interp = Interpreter::new(&reg);

        let act = interp.activate("f32").unwrap();
        // E = 1 + 18 · (440 / 440) · 0.95 at every level.
        assert!((act.state.entanglement - (1.0 + 18.0 * 0.95)).abs() < 1e-9);
        assert_eq!(act.state.resonance, 440.0);

        let composed = interp
            .trace()
            .entries()
            .filter(|e| e.operation == "compose")
            .count();
        assert_eq!(composed, 33);
        assert_eq!(interp.trace().dropped(), 0);
    }

    #[test]
    fn test_finished_target_still_depth_checked() {
        // `x` first runs at depth 2 under `a`, then is reached again at
        // depth 3 under `b → c`, where its own entangle no longer fits.
        let reg = registry(&[
            "glyph_id: r\nactivation_simulation: entangle(a) | entangle(b)",
            "glyph_id: a\nactivation_simulation: entangle(x)",
            "glyph_id: b\nactivation_simulation: entangle(c)",
            "glyph_id: c\nactivation_simulation: entangle(x)",
            "glyph_id: x\nactivation_simulation: entangle(y)",
            "glyph_id: y",
        ]);
        let config = InterpreterConfig {
            max_depth: 3,
            ..InterpreterConfig::default()
        };
        let mut interp = Interpreter::with_config(&reg, config).unwrap();
        assert!(interp.activate("a").is_ok());
        assert!(matches!(
            interp.activate("r"),
            Err(ActivationError::Resolve(ResolveError::DepthExceeded { limit: 3, .. }))
        ));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let reg = registry(&["glyph_id: ok", "glyph_id: bad\nactivation_simulation: entangle(parent)"]);
        let mut interp = Interpreter::new(&reg);
        let results = interp.activate_batch(["ok", "bad", "missing", "ok"]);
        assert_eq!(results.len(), 4);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(matches!(
            results[2].1,
            Err(ActivationError::Resolve(ResolveError::UnknownGlyph { .. }))
        ));
        assert_eq!(results[3].1, results[0].1);
    }

    #[test]
    fn test_trace_disabled_by_config() {
        let reg = registry(&["glyph_id: t\nactivation_simulation: stabilize()"]);
        let config = InterpreterConfig {
            trace_enabled: false,
            ..InterpreterConfig::default()
        };
        let mut interp = Interpreter::with_config(&reg, config).unwrap();
        interp.activate("t").unwrap();
        assert!(interp.trace().is_empty());
    }

    // ── Projection ────────────────────────────────────────────────────────

    #[test]
    fn test_project_scales_coherence() {
        let reg = registry(&["glyph_id: q\ncoherence: 75\nfield_magnitude: 12\nquantum_state: 4"]);
        let act = Interpreter::new(&reg).activate("q").unwrap();
        let mut substrate = Substrate::new();
        let cell = act.project(&mut substrate).unwrap();
        assert_eq!(cell.coherence, 750.0);
        assert_eq!(cell.magnitude, 12.0);
        let q = substrate.quantum_retrieve(act.home_cell()).unwrap();
        assert_eq!(q.components.len(), 4);
        assert!((q.components[0].amplitude - 0.5).abs() < 1e-12);
        assert!(substrate.sync().is_ok());
    }

    #[test]
    fn test_project_without_quantum_state() {
        let reg = registry(&["glyph_id: plain"]);
        let act = Interpreter::new(&reg).activate("plain").unwrap();
        let mut substrate = Substrate::new();
        act.project(&mut substrate).unwrap();
        assert!(substrate.quantum_retrieve(act.home_cell()).unwrap().is_empty());
    }
}
