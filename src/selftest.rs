//! Built-in diagnostic suite.
//!
//! Registers four reference glyphs from GDF text, exercises the parser,
//! registry, resolver, interpreter and substrate against them, and reports
//! one pass/fail line per check. Used by the `glyph selftest` command.

use std::fmt;

use crate::interpreter::{parse_command, Command, Interpreter};
use crate::parser::parse_gdf;
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::substrate::Substrate;

/// Reference glyphs: a root, a child, a two-parent grandchild and a decay probe.
pub const REFERENCE_GLYPHS: [&str; 4] = [
    "glyph_id: 000\n\
     chronocode: 20250101_000000\n\
     resonance_freq: 440.0\n\
     field_magnitude: 1.0\n\
     coherence: 100\n\
     entanglement_coeff: 1.0\n\
     phase_offset: 0.0\n\
     activation_simulation: resonate(1.5) | stabilize()\n",
    "glyph_id: 001\n\
     chronocode: 20250101_120000\n\
     parent_glyphs: 000\n\
     resonance_freq: 880.0\n\
     field_magnitude: 1.2\n\
     coherence: 95\n\
     entanglement_coeff: 1.5\n\
     phase_offset: 45.0\n\
     activation_simulation: resonate(2.0) | entangle(000) | amplify(1.5)\n",
    "glyph_id: 002\n\
     chronocode: 20250101_130000\n\
     parent_glyphs: 001, 000\n\
     resonance_freq: 1320.0\n\
     field_magnitude: 0.8\n\
     coherence: 85\n\
     entanglement_coeff: 2.0\n\
     phase_offset: 90.0\n\
     activation_simulation: resonate(1.5) | entangle(001) | phase_shift(30) | stabilize()\n",
    "glyph_id: 003\n\
     chronocode: 20250101_140000\n\
     parent_glyphs: 000\n\
     resonance_freq: 220.0\n\
     field_magnitude: 2.0\n\
     coherence: 100\n\
     entanglement_coeff: 1.0\n\
     phase_offset: 0.0\n\
     activation_simulation: amplify(3.0) | decay(0.2) | stabilize()\n",
];

/// Outcome of one check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    /// Check title.
    pub name: &'static str,
    /// Whether it passed.
    pub passed: bool,
    /// One-line detail.
    pub detail: String,
}

/// Outcome of the whole suite.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelfTestReport {
    /// Checks in execution order.
    pub checks: Vec<CheckResult>,
}

impl SelfTestReport {
    fn check(&mut self, name: &'static str, passed: bool, detail: impl Into<String>) {
        let detail = detail.into();
        if passed {
            tracing::debug!(check = name, %detail, "self-test passed");
        } else {
            tracing::warn!(check = name, %detail, "self-test failed");
        }
        self.checks.push(CheckResult { name, passed, detail });
    }

    /// Number of passing checks.
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Number of failing checks.
    pub fn failed(&self) -> usize {
        self.checks.len() - self.passed()
    }

    /// `true` when every check passed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, check) in self.checks.iter().enumerate() {
            let verdict = if check.passed { "PASS" } else { "FAIL" };
            writeln!(f, "[TEST {:>2}] {:<32} {}: {}", i + 1, check.name, verdict, check.detail)?;
        }
        write!(f, "Passed: {}  Failed: {}", self.passed(), self.failed())
    }
}

/// Run the suite.
pub fn run() -> SelfTestReport {
    let mut report = SelfTestReport::default();

    let mut registry = Registry::new();
    let mut parse_failures = 0;
    for source in REFERENCE_GLYPHS {
        match parse_gdf(source) {
            Ok(def) => {
                if registry.insert(def).is_err() {
                    parse_failures += 1;
                }
            }
            Err(_) => parse_failures += 1,
        }
    }
    report.check(
        "GDF parser",
        parse_failures == 0 && registry.len() == REFERENCE_GLYPHS.len(),
        format!("{} reference glyphs loaded", registry.len()),
    );

    report.check(
        "Registry lookup",
        registry.get("001").map(|g| g.glyph_id.as_str()) == Some("001"),
        "glyph 001",
    );

    let parents = registry.get("002").map_or(0, |g| g.parent_glyphs.len());
    report.check("Parent list", parents == 2, format!("glyph 002 declares {parents} parents"));

    match Resolver::new(&registry).resolve("002") {
        Ok(res) => report.check(
            "Inheritance resolution",
            res.ancestors == ["001", "000"] && res.depth == 2,
            format!("ancestors {:?}, depth {}", res.ancestors, res.depth),
        ),
        Err(err) => report.check("Inheritance resolution", false, err.to_string()),
    }

    report.check(
        "Command parsing",
        parse_command("resonate(2.5)") == Command::Resonate(2.5),
        "resonate(2.5)",
    );

    let mut interp = Interpreter::new(&registry);

    let root = interp.activate("000");
    match &root {
        Ok(act) => report.check(
            "Root activation",
            act.state.resonance > 0.0 && act.state.magnitude > 0.0,
            act.state.to_string(),
        ),
        Err(err) => report.check("Root activation", false, err.to_string()),
    }

    match interp.activate("002") {
        Ok(act) => {
            let evolved = root
                .as_ref()
                .map_or(true, |r| r.state.resonance != act.state.resonance);
            report.check(
                "Inherited activation",
                act.state.depth == 2 && act.state.entanglement > 0.0 && evolved,
                act.state.to_string(),
            );
        }
        Err(err) => report.check("Inherited activation", false, err.to_string()),
    }

    match interp.activate("001") {
        Ok(act) => report.check(
            "Entanglement",
            act.state.entanglement > 1.0,
            format!("E={:.3}", act.state.entanglement),
        ),
        Err(err) => report.check("Entanglement", false, err.to_string()),
    }

    match interp.activate("003") {
        Ok(act) => report.check(
            "Decay",
            (act.state.magnitude - 4.8).abs() < 1e-9,
            format!("M={:.3}", act.state.magnitude),
        ),
        Err(err) => report.check("Decay", false, err.to_string()),
    }

    report.check(
        "Trace",
        !interp.trace().is_empty(),
        format!("{} entries", interp.trace().len()),
    );

    let mut substrate = Substrate::new();
    let clean = substrate.sync().is_ok();
    let wave = substrate.propagate_wave(2080, 50.0, 1.0);
    let projected = root.as_ref().map(|act| act.project(&mut substrate));
    let consistent = substrate.sync().is_ok();
    report.check(
        "Substrate parity",
        clean && wave.is_ok() && matches!(projected, Ok(Ok(_))) && consistent,
        format!("checksum 0x{:08X}", substrate.checksum()),
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_passes() {
        let report = run();
        assert!(report.is_success(), "{report}");
        assert_eq!(report.checks.len(), 11);
    }

    #[test]
    fn test_suite_is_deterministic() {
        assert_eq!(run().to_string(), run().to_string());
    }

    #[test]
    fn test_report_counts() {
        let mut report = SelfTestReport::default();
        report.check("a", true, "");
        report.check("b", false, "");
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
    }
}
