//! Field-name dispatch table for the tree walker
//!
//! Some fields change the context their children are walked in (a list of
//! page blocks names the owning block, a service category sets the service
//! slug). Those transitions live here as data so new block layouts can be
//! registered without touching the walker.

use std::collections::HashMap;

/// How children of a field are walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Array of page blocks; each element's `blockName` becomes the owner,
    /// falling back to the global bucket when absent
    BlockList,
    /// Array of nested blocks; elements with a `blockName` become the owner,
    /// others keep the enclosing owner
    NestedBlockList,
    /// Array of service entries; the field name is the service category
    ServiceCategory,
    /// Homogeneous array of media items; unnamed items get `image_{index}`
    MediaList,
    /// Walk with the enclosing context unchanged
    Preserve,
}

/// Field name → rule mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    rules: HashMap<String, FieldRule>,
}

impl Default for FieldRules {
    fn default() -> Self {
        let mut rules = Self::empty();
        rules.insert("mainPageBlocks", FieldRule::BlockList);
        rules.insert("blocks", FieldRule::NestedBlockList);
        rules.insert("commercial", FieldRule::ServiceCategory);
        rules.insert("residential", FieldRule::ServiceCategory);
        for media in ["images", "gallery", "overlayImages", "employee", "items", "pictures"] {
            rules.insert(media, FieldRule::MediaList);
        }
        rules.insert("config", FieldRule::Preserve);
        rules
    }
}

impl FieldRules {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, rule: FieldRule) -> Option<FieldRule> {
        self.rules.insert(field.into(), rule)
    }

    pub fn with(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.insert(field, rule);
        self
    }

    pub fn get(&self, field: &str) -> Option<FieldRule> {
        self.rules.get(field).copied()
    }
}
