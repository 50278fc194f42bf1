/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Error taxonomy for the substrate, the vault loader and the interpreter.
//!
//! Failures are scoped the way the runtime treats them:
//!
//! | Error | Scope | Fatal? |
//! |-------|-------|--------|
//! | [`ParseError`] | one file | no, the batch continues |
//! | [`SecurityRejection`] | one file | no, logged separately as adversarial input |
//! | [`ResolveError`] / [`ActivationError`] | one glyph | terminal for that glyph only |
//! | [`SubstrateError::OutOfRange`] | caller | yes, fails fast |
//! | [`SubstrateError::ParityError`] | substrate | reported, never auto-corrected |
//! | [`VaultError`] | whole load | yes |

use std::path::PathBuf;

use thiserror::Error;

// ─── Substrate ──────────────────────────────────────────────────────────────

/// Errors raised by the field-state substrate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubstrateError {
    /// Cell index outside `[0, CELL_COUNT)`.
    #[error("cell index {index} out of range (max {max})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Largest valid index.
        max: usize,
    },

    /// Stored checksum disagrees with the recomputed one, or a cell holds an
    /// out-of-range value.
    #[error(
        "parity error: stored checksum 0x{stored:08X}, computed 0x{computed:08X}, {invalid_cells} invalid cell(s)"
    )]
    ParityError {
        /// Checksum held by the substrate before the sync.
        stored: u32,
        /// Checksum recomputed over the current cells.
        computed: u32,
        /// Number of cells failing the bounds check.
        invalid_cells: usize,
    },

    /// A numeric argument that cannot be normalized (e.g. a zero wave frequency).
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Why it was refused.
        reason: String,
    },

    /// More superposition components than the quantum pouch holds.
    #[error("superposition holds at most {max} components")]
    SuperpositionOverflow {
        /// Component capacity.
        max: usize,
    },

    /// A snapshot does not describe a full substrate grid.
    #[error("snapshot holds {found} cells, expected {expected}")]
    CellCountMismatch {
        /// Cells present in the snapshot.
        found: usize,
        /// Cells the substrate requires.
        expected: usize,
    },

    /// A snapshot written in a format this build does not read.
    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedVersion {
        /// Version recorded in the snapshot.
        found: u16,
        /// Version this build writes and reads.
        expected: u16,
    },
}

// ─── Parsing and vault hygiene ──────────────────────────────────────────────

/// A glyph definition file that is well-formed enough to read but invalid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No `glyph_id` line, or an empty value.
    #[error("missing glyph_id")]
    MissingGlyphId,

    /// `glyph_id` (or a parent id) uses characters outside `[A-Za-z0-9_-]`.
    #[error("invalid glyph id `{id}`")]
    InvalidGlyphId {
        /// Offending identifier.
        id: String,
    },

    /// A numeric field failed to parse.
    #[error("field `{field}`: `{value}` is not a number")]
    InvalidNumber {
        /// Canonical field name.
        field: &'static str,
        /// Raw value text.
        value: String,
    },

    /// A numeric field parsed to NaN or infinity.
    #[error("field `{field}` is not finite")]
    NonFinite {
        /// Canonical field name.
        field: &'static str,
    },

    /// A numeric field lies outside its declared range.
    #[error("field `{field}` = {value} outside [{min}, {max}]")]
    OutOfRange {
        /// Canonical field name.
        field: &'static str,
        /// Parsed value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A text field exceeds its declared ceiling.
    #[error("field `{field}` is {len} bytes (max {max})")]
    FieldTooLong {
        /// Canonical field name.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Ceiling in bytes.
        max: usize,
    },

    /// More than the permitted number of parents.
    #[error("{count} parent glyphs declared (max {max})")]
    TooManyParents {
        /// Declared parents.
        count: usize,
        /// Ceiling.
        max: usize,
    },

    /// Whole content exceeds the size ceiling.
    #[error("content is {len} bytes (max {max})")]
    ContentTooLarge {
        /// Content length.
        len: usize,
        /// Ceiling.
        max: usize,
    },

    /// Content is not valid UTF-8.
    #[error("content is not valid UTF-8")]
    NotUtf8,
}

/// A file refused by the vault's security gates. These indicate adversarial
/// or misplaced input and are reported apart from ordinary parse errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecurityRejection {
    /// Resolved path escapes the vault root.
    #[error("path traversal: {path} resolves outside the vault")]
    PathTraversal {
        /// Offending path.
        path: PathBuf,
    },

    /// File name contains separators, `..`, control characters or is hidden.
    #[error("unsafe file name: {name}")]
    UnsafeFileName {
        /// Offending name.
        name: String,
    },

    /// Symbolic links are never followed.
    #[error("symlink refused: {path}")]
    Symlink {
        /// Offending path.
        path: PathBuf,
    },

    /// Devices, sockets, directories and other non-regular entries.
    #[error("not a regular file: {path}")]
    NotRegularFile {
        /// Offending path.
        path: PathBuf,
    },

    /// File larger than the size ceiling.
    #[error("oversized file: {path} is {size} bytes (max {max})")]
    Oversized {
        /// Offending path.
        path: PathBuf,
        /// Reported size.
        size: u64,
        /// Ceiling.
        max: u64,
    },

    /// A glyph id that looks like a path.
    #[error("unsafe glyph id `{id}`")]
    UnsafeGlyphId {
        /// Offending identifier.
        id: String,
    },
}

/// Why a single file did not make it into the registry.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Content was read but did not validate.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Refused by a security gate.
    #[error(transparent)]
    Security(#[from] SecurityRejection),

    /// Filesystem error on this file.
    #[error("io error on {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The registry refused the glyph.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LoadError {
    /// `true` for rejections raised by a security gate.
    pub fn is_security(&self) -> bool {
        matches!(self, LoadError::Security(_))
    }
}

/// Fatal vault-level failure: nothing could be loaded.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The vault root cannot be resolved or listed.
    #[error("vault {path} is unreadable: {source}")]
    Unreadable {
        /// Vault root as given.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The vault root is not a directory.
    #[error("vault {path} is not a directory")]
    NotADirectory {
        /// Vault root as given.
        path: PathBuf,
    },
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Registry refusals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Capacity reached; new ids are refused (replacements still succeed).
    #[error("registry full ({capacity} glyphs), `{glyph_id}` refused")]
    Full {
        /// Refused id.
        glyph_id: String,
        /// Registry capacity.
        capacity: usize,
    },
}

// ─── Resolution and activation ──────────────────────────────────────────────

/// Terminal inheritance failures for a single glyph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The requested glyph is not registered.
    #[error("glyph `{glyph_id}` not found")]
    UnknownGlyph {
        /// Requested id.
        glyph_id: String,
    },

    /// A glyph is its own ancestor.
    #[error("circular inheritance at `{glyph_id}`: {}", .cycle.join(" -> "))]
    CircularInheritance {
        /// Glyph that closed the cycle.
        glyph_id: String,
        /// Path from the first occurrence back to `glyph_id`.
        cycle: Vec<String>,
    },

    /// The chain is deeper than the permitted limit.
    #[error("inheritance depth exceeded at `{glyph_id}` (limit {limit})")]
    DepthExceeded {
        /// Glyph being visited when the limit tripped.
        glyph_id: String,
        /// Configured limit.
        limit: u32,
    },
}

/// Terminal failures of a single activation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivationError {
    /// Inheritance or entangle recursion failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// `entangle(id)` named a glyph that is not registered.
    #[error("`{glyph_id}` entangles unknown target `{target}`")]
    UnknownTarget {
        /// Glyph running the command.
        glyph_id: String,
        /// Missing target.
        target: String,
    },

    /// `entangle(parent)` on a glyph without parents.
    #[error("`{glyph_id}` entangles its parent but declares none")]
    NoParent {
        /// Glyph running the command.
        glyph_id: String,
    },
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// Invalid configuration value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid configuration `{field}`: {reason}")]
pub struct ConfigError {
    /// Field name.
    pub field: &'static str,
    /// Why it was refused.
    pub reason: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
