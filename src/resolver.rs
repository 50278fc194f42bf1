//! Inheritance resolver.
//!
//! Walks the parent graph of a glyph with an explicit work stack instead of
//! recursion. `Enter` frames expand a glyph, `Exit` frames retire it; the set
//! of glyphs with a pending `Exit` is exactly the current path, which makes
//! cycle detection a set lookup.
//!
//! # Invariants
//! - **RES-001**: no glyph is its own transitive ancestor (cycle → terminal error)
//! - **RES-002**: inheritance depth never exceeds the configured limit (≤ 32)
//! - **RES-003**: ancestors are listed closest first, each exactly once
//! - **RES-004**: a missing parent contributes nothing and is reported, not fatal

use hashbrown::{HashMap, HashSet};

use crate::config::MAX_INHERITANCE_DEPTH;
use crate::error::ResolveError;
use crate::registry::Registry;

/// A parent id that is not registered.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DanglingParent {
    /// Glyph declaring the parent.
    pub child: String,
    /// Missing parent id.
    pub parent: String,
}

/// The resolved inheritance chain of one glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// The glyph resolved.
    pub glyph_id: String,
    /// Every reachable ancestor, closest first, deduplicated.
    pub ancestors: Vec<String>,
    /// Generations above the glyph (0 for a root glyph).
    pub depth: u32,
    /// Parents that are declared but not registered.
    pub dangling: Vec<DanglingParent>,
}

impl Resolution {
    /// Ancestors oldest first, followed by the glyph itself: the order in
    /// which declared fields are composed.
    pub fn composition_order(&self) -> impl Iterator<Item = &str> {
        self.ancestors
            .iter()
            .rev()
            .map(String::as_str)
            .chain(core::iter::once(self.glyph_id.as_str()))
    }
}

enum Frame<'r> {
    Enter { id: &'r str, depth: u32 },
    Exit { id: &'r str },
}

/// Resolves inheritance chains against a registry.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    max_depth: u32,
}

impl<'r> Resolver<'r> {
    /// Resolver with the default depth limit.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            max_depth: MAX_INHERITANCE_DEPTH,
        }
    }

    /// Resolver with a tighter depth limit (capped at [`MAX_INHERITANCE_DEPTH`]).
    pub fn with_max_depth(registry: &'r Registry, max_depth: u32) -> Self {
        Self {
            registry,
            max_depth: max_depth.min(MAX_INHERITANCE_DEPTH),
        }
    }

    /// Resolve the ancestor chain of `glyph_id`.
    pub fn resolve(&self, glyph_id: &str) -> Result<Resolution, ResolveError> {
        let root = match self.registry.get(glyph_id) {
            Some(def) => def.glyph_id.as_str(),
            None => {
                return Err(ResolveError::UnknownGlyph {
                    glyph_id: glyph_id.to_string(),
                })
            }
        };

        let mut stack = vec![Frame::Enter { id: root, depth: 0 }];
        let mut path: Vec<&'r str> = Vec::new();
        let mut on_path: HashSet<&'r str> = HashSet::new();
        // Finished glyph → generations of ancestry above it.
        let mut heights: HashMap<&'r str, u32> = HashMap::new();
        let mut post_order: Vec<&'r str> = Vec::new();
        let mut dangling: Vec<DanglingParent> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter { id, depth } => {
                    if on_path.contains(id) {
                        let start = path.iter().position(|p| *p == id).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|p| p.to_string()).collect();
                        cycle.push(id.to_string());
                        tracing::warn!(glyph_id = id, cycle = %cycle.join(" -> "), "circular inheritance");
                        return Err(ResolveError::CircularInheritance {
                            glyph_id: id.to_string(),
                            cycle,
                        });
                    }
                    if let Some(&height) = heights.get(id) {
                        // Diamond: already explored, only re-check the depth.
                        if depth + height > self.max_depth {
                            return Err(self.depth_exceeded(id));
                        }
                        continue;
                    }
                    if depth > self.max_depth {
                        return Err(self.depth_exceeded(id));
                    }
                    let Some(def) = self.registry.get(id) else {
                        continue;
                    };

                    for parent in &def.parent_glyphs {
                        if self.registry.contains(parent) {
                            continue;
                        }
                        let missing = DanglingParent {
                            child: id.to_string(),
                            parent: parent.clone(),
                        };
                        if !dangling.contains(&missing) {
                            tracing::warn!(child = id, parent = %parent, "dangling parent ignored");
                            dangling.push(missing);
                        }
                    }

                    path.push(id);
                    on_path.insert(id);
                    stack.push(Frame::Exit { id });
                    // Reversed so the first declared parent is explored first.
                    for parent in def.parent_glyphs.iter().rev() {
                        if self.registry.contains(parent) {
                            stack.push(Frame::Enter {
                                id: parent.as_str(),
                                depth: depth + 1,
                            });
                        }
                    }
                }
                Frame::Exit { id } => {
                    let height = self
                        .registry
                        .get(id)
                        .into_iter()
                        .flat_map(|def| def.parent_glyphs.iter())
                        .filter_map(|p| heights.get(p.as_str()))
                        .map(|h| h + 1)
                        .max()
                        .unwrap_or(0);
                    heights.insert(id, height);
                    path.pop();
                    on_path.remove(id);
                    post_order.push(id);
                }
            }
        }

        let depth = heights.get(root).copied().unwrap_or(0);
        let ancestors = post_order
            .iter()
            .rev()
            .filter(|id| **id != root)
            .map(|id| id.to_string())
            .collect();

        Ok(Resolution {
            glyph_id: root.to_string(),
            ancestors,
            depth,
            dangling,
        })
    }

    fn depth_exceeded(&self, glyph_id: &str) -> ResolveError {
        tracing::warn!(glyph_id, limit = self.max_depth, "inheritance depth exceeded");
        ResolveError::DepthExceeded {
            glyph_id: glyph_id.to_string(),
            limit: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::GlyphDef;

    fn glyph(id: &str, parents: &[&str]) -> GlyphDef {
        let mut g = GlyphDef::new(id);
        g.parent_glyphs = parents.iter().map(|p| p.to_string()).collect();
        g
    }

    fn registry(defs: &[(&str, &[&str])]) -> Registry {
        let mut reg = Registry::new();
        for (id, parents) in defs {
            reg.insert(glyph(id, parents)).unwrap();
        }
        reg
    }

    #[test]
    fn test_root_glyph() {
        let reg = registry(&[("000", &[])]);
        let res = Resolver::new(&reg).resolve("000").unwrap();
        assert!(res.ancestors.is_empty());
        assert_eq!(res.depth, 0);
        assert_eq!(res.composition_order().collect::<Vec<_>>(), vec!["000"]);
    }

    #[test]
    fn test_unknown_glyph() {
        let reg = Registry::new();
        assert_eq!(
            Resolver::new(&reg).resolve("nope"),
            Err(ResolveError::UnknownGlyph { glyph_id: "nope".into() })
        );
    }

    #[test]
    fn test_closest_first_chain() {
        let reg = registry(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let res = Resolver::new(&reg).resolve("c").unwrap();
        assert_eq!(res.ancestors, vec!["b", "a"]);
        assert_eq!(res.depth, 2);
        assert_eq!(res.composition_order().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_multi_parent_declaration_order() {
        // 002 → [001, 000], 001 → [000]
        let reg = registry(&[("000", &[]), ("001", &["000"]), ("002", &["001", "000"])]);
        let res = Resolver::new(&reg).resolve("002").unwrap();
        assert_eq!(res.ancestors, vec!["001", "000"]);
        assert_eq!(res.depth, 2);
    }

    #[test]
    fn test_diamond_visits_once() {
        let reg = registry(&[("r", &[]), ("l", &["r"]), ("m", &["r"]), ("d", &["l", "m"])]);
        let res = Resolver::new(&reg).resolve("d").unwrap();
        assert_eq!(res.ancestors.iter().filter(|a| *a == "r").count(), 1);
        assert_eq!(res.ancestors.len(), 3);
        assert_eq!(res.depth, 2);
    }

    #[test]
    fn test_two_cycle() {
        let reg = registry(&[("a", &["b"]), ("b", &["a"])]);
        match Resolver::new(&reg).resolve("a") {
            Err(ResolveError::CircularInheritance { glyph_id, cycle }) => {
                assert_eq!(glyph_id, "a");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_parent() {
        let reg = registry(&[("s", &["s"])]);
        assert!(matches!(
            Resolver::new(&reg).resolve("s"),
            Err(ResolveError::CircularInheritance { .. })
        ));
    }

    #[test]
    fn test_cycle_above_entry_point() {
        let reg = registry(&[("x", &["y"]), ("y", &["z"]), ("z", &["y"])]);
        match Resolver::new(&reg).resolve("x") {
            Err(ResolveError::CircularInheritance { glyph_id, cycle }) => {
                assert_eq!(glyph_id, "y");
                assert_eq!(cycle, vec!["y", "z", "y"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_parent_is_diagnostic() {
        let reg = registry(&[("a", &[]), ("b", &["ghost", "a"])]);
        let res = Resolver::new(&reg).resolve("b").unwrap();
        assert_eq!(res.ancestors, vec!["a"]);
        assert_eq!(
            res.dangling,
            vec![DanglingParent { child: "b".into(), parent: "ghost".into() }]
        );
    }

    fn chain(len: usize) -> Registry {
        let mut reg = Registry::new();
        reg.insert(GlyphDef::new("g0")).unwrap();
        for i in 1..len {
            let parent = format!("g{}", i - 1);
            reg.insert(glyph(&format!("g{i}"), &[parent.as_str()])).unwrap();
        }
        reg
    }

    #[test]
    fn test_depth_limit() {
        // g32 has exactly 32 generations above it.
        let reg = chain(34);
        let res = Resolver::new(&reg).resolve("g32").unwrap();
        assert_eq!(res.depth, 32);
        assert!(matches!(
            Resolver::new(&reg).resolve("g33"),
            Err(ResolveError::DepthExceeded { limit: 32, .. })
        ));
    }

    #[test]
    fn test_depth_limit_through_diamond() {
        // "top" reaches g0 through a short branch first, then again through
        // a long one; the long path must still trip a tight limit.
        let mut reg = chain(5);
        reg.insert(glyph("top", &["g0", "g4"])).unwrap();
        let resolver = Resolver::with_max_depth(&reg, 4);
        assert!(matches!(
            resolver.resolve("top"),
            Err(ResolveError::DepthExceeded { .. })
        ));
        assert_eq!(Resolver::with_max_depth(&reg, 5).resolve("top").unwrap().depth, 5);
    }

    #[test]
    fn test_custom_limit_capped() {
        let reg = chain(34);
        let resolver = Resolver::with_max_depth(&reg, 1000);
        assert!(resolver.resolve("g33").is_err());
    }
}
