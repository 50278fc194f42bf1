//! # glyph-core
//!
//! Deterministic glyph interpretation over a bounded field-state substrate.
//!
//! ---
//!
//! ## Two halves, one narrow seam
//!
//! **The substrate** is a 64×64 grid of cells, each holding a magnitude, a
//! phase and a coherence. Every write is normalized into bounds, every
//! mutation refreshes a rolling checksum, and `sync()` reports, but never
//! repairs, a grid that no longer matches it. The substrate knows nothing
//! about glyphs.
//!
//! **The interpreter** reads glyph definitions (GDF files) from a vault,
//! resolves each glyph's inheritance chain, composes a [`FieldState`] from the
//! declared fields of its ancestors and runs the glyph's activation script
//! against it. The result can be projected into the glyph's home cell.
//!
//! Same vault in, same field states and same trace out. Byte for byte.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! Vault → Parser → Registry → Resolver → Interpreter → Activation
//!   ↑                                         ↓              ↓
//! security gates                            Trace     Substrate (home cell)
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`substrate`] | [`Substrate`], [`Cell`], [`QuantumState`] | Bounded cell grid, checksum parity, decay, force, wave propagation |
//! | [`glyph`] | [`GlyphDef`] | Validated glyph definition, id hygiene, home-cell hash |
//! | [`parser`] | [`parse_gdf`] | GDF text → [`GlyphDef`] |
//! | [`vault`] | [`Vault`], [`LoadReport`] | Directory and file loading behind path, type and size gates |
//! | [`registry`] | [`Registry`] | `glyph_id → GlyphDef`, last loaded wins, 256 glyphs max |
//! | [`resolver`] | [`Resolver`], [`Resolution`] | Ancestor chains with cycle and depth protection |
//! | [`interpreter`] | [`Interpreter`], [`Activation`], [`Command`] | Composition and the activation DSL |
//! | [`trace`] | [`Trace`] | Bounded, sequence-numbered activation trace |
//! | [`config`] | [`VaultConfig`], [`InterpreterConfig`] | Limits and tunables with validated defaults |
//! | [`error`] | [`SubstrateError`], [`LoadError`], [`ActivationError`] | Error taxonomy |
//! | [`selftest`] | [`SelfTestReport`] | Built-in diagnostic suite |
//! | `snapshot` | `SubstrateSnapshot` | Serializable substrate image (requires `serde` feature) |
//!
//! ## Example
//!
//! ```rust
//! use glyph_core::{parse_gdf, Interpreter, Registry, Substrate};
//!
//! let mut registry = Registry::new();
//! registry.insert(parse_gdf("glyph_id: 000\nresonance_freq: 440").unwrap()).unwrap();
//! registry
//!     .insert(
//!         parse_gdf(
//!             "glyph_id: 001\nparent_glyphs: 000\n\
//!              activation_simulation: resonate(2.0) | entangle(parent)",
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let mut interpreter = Interpreter::new(&registry);
//! let activation = interpreter.activate("001").unwrap();
//! assert_eq!(format!("{:.2}", activation.state.resonance), "880.00");
//! assert_eq!(format!("{:.3}", activation.state.entanglement), "1.950");
//!
//! let mut substrate = Substrate::new();
//! activation.project(&mut substrate).unwrap();
//! assert!(substrate.sync().is_ok());
//! ```
//!
//! ## Features
//!
//! - `cli` (default): the `glyph` binary (`clap`, `tracing-subscriber`).
//! - `serde`: serialization derives and the `snapshot` module.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod glyph;
pub mod interpreter;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod selftest;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod substrate;
pub mod trace;
pub mod vault;

pub use config::{InterpreterConfig, VaultConfig};
pub use error::{
    ActivationError, ConfigError, LoadError, ParseError, RegistryError, ResolveError,
    SecurityRejection, SubstrateError, VaultError,
};
pub use glyph::GlyphDef;
pub use interpreter::{parse_script, Activation, Command, FieldState, Interpreter, Target};
pub use parser::parse_gdf;
pub use registry::Registry;
pub use resolver::{Resolution, Resolver};
pub use selftest::SelfTestReport;
pub use substrate::{Cell, QuantumState, Substrate};
pub use trace::Trace;
pub use vault::{LoadReport, Vault};
