//! Glyph registry: `glyph_id → GlyphDef`, owned by the driver and passed by
//! reference to the resolver and interpreter.
//!
//! Keys are unique. Re-registering an id replaces the earlier definition
//! (last loaded wins) and logs a warning. At most [`REGISTRY_CAPACITY`] glyphs
//! are held; a new id beyond that is refused, a replacement never is.

use hashbrown::HashMap;

use crate::error::RegistryError;
use crate::glyph::GlyphDef;

/// Maximum live glyphs.
pub const REGISTRY_CAPACITY: usize = 256;

/// The set of loaded glyph definitions.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    glyphs: HashMap<String, GlyphDef>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// Returns the replaced definition when the id was already present.
    pub fn insert(&mut self, def: GlyphDef) -> Result<Option<GlyphDef>, RegistryError> {
        if !self.glyphs.contains_key(&def.glyph_id) && self.glyphs.len() >= REGISTRY_CAPACITY {
            return Err(RegistryError::Full {
                glyph_id: def.glyph_id,
                capacity: REGISTRY_CAPACITY,
            });
        }
        let id = def.glyph_id.clone();
        let previous = self.glyphs.insert(id, def);
        if let Some(prev) = &previous {
            tracing::warn!(glyph_id = %prev.glyph_id, "duplicate glyph id, later definition wins");
        }
        Ok(previous)
    }

    /// Look up a glyph.
    pub fn get(&self, glyph_id: &str) -> Option<&GlyphDef> {
        self.glyphs.get(glyph_id)
    }

    /// `true` when `glyph_id` is registered.
    pub fn contains(&self, glyph_id: &str) -> bool {
        self.glyphs.contains_key(glyph_id)
    }

    /// Number of registered glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.glyphs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Definitions ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &GlyphDef> + '_ {
        self.ids().into_iter().filter_map(move |id| self.glyphs.get(id))
    }

    /// Remove a glyph.
    pub fn remove(&mut self, glyph_id: &str) -> Option<GlyphDef> {
        self.glyphs.remove(glyph_id)
    }

    /// Remove every glyph.
    pub fn clear(&mut self) {
        self.glyphs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut reg = Registry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.insert(GlyphDef::new("000")), Ok(None));
        assert!(reg.contains("000"));
        assert_eq!(reg.get("000").map(|g| g.glyph_id.as_str()), Some("000"));
        assert!(reg.get("001").is_none());
    }

    #[test]
    fn test_last_loaded_wins() {
        let mut reg = Registry::new();
        let mut first = GlyphDef::new("x");
        first.resonance_freq = Some(100.0);
        let mut second = GlyphDef::new("x");
        second.resonance_freq = Some(200.0);
        reg.insert(first.clone()).unwrap();
        assert_eq!(reg.insert(second).unwrap(), Some(first));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("x").and_then(|g| g.resonance_freq), Some(200.0));
    }

    #[test]
    fn test_capacity() {
        let mut reg = Registry::new();
        for i in 0..REGISTRY_CAPACITY {
            reg.insert(GlyphDef::new(format!("g{i}"))).unwrap();
        }
        assert_eq!(
            reg.insert(GlyphDef::new("overflow")),
            Err(RegistryError::Full {
                glyph_id: "overflow".into(),
                capacity: REGISTRY_CAPACITY
            })
        );
        // Replacing an existing id still succeeds at capacity.
        assert!(reg.insert(GlyphDef::new("g0")).is_ok());
        assert_eq!(reg.len(), REGISTRY_CAPACITY);
    }

    #[test]
    fn test_ids_sorted() {
        let mut reg = Registry::new();
        for id in ["b", "c", "a"] {
            reg.insert(GlyphDef::new(id)).unwrap();
        }
        assert_eq!(reg.ids(), vec!["a", "b", "c"]);
        let order: Vec<&str> = reg.iter().map(|g| g.glyph_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        reg.remove("b");
        assert_eq!(reg.ids(), vec!["a", "c"]);
        reg.clear();
        assert!(reg.is_empty());
    }
}
