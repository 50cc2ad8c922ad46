//! Per-pass asset collection

use std::collections::HashMap;

use crate::media::{AssetDescriptor, AssetSource};

/// Two distinct assets that resolved to the same destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCollision {
    pub path: String,
    /// Source that won (last writer)
    pub kept: String,
    /// Source that was replaced
    pub replaced: String,
}

/// Outcome of adding a descriptor to an accumulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Added,
    /// Same destination and same source already collected
    Duplicate,
    /// Same destination, different source; the new one replaced the old
    Collision(PathCollision),
}

/// Assets collected by one walker pass
///
/// Each pass owns its accumulator; nothing is shared across passes.
#[derive(Debug, Default)]
pub struct AssetAccumulator {
    assets: Vec<AssetDescriptor>,
    by_path: HashMap<String, usize>,
    collisions: Vec<PathCollision>,
    /// Sources that lost a collision, still part of the pass's view
    replaced: Vec<(String, AssetSource)>,
}

impl AssetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: AssetDescriptor) -> PushOutcome {
        match self.by_path.get(&descriptor.destination_path) {
            None => {
                self.by_path
                    .insert(descriptor.destination_path.clone(), self.assets.len());
                self.assets.push(descriptor);
                PushOutcome::Added
            }
            Some(&index) if self.assets[index].source == descriptor.source => PushOutcome::Duplicate,
            Some(&index) => {
                let collision = PathCollision {
                    path: descriptor.destination_path.clone(),
                    kept: descriptor.source.location().to_string(),
                    replaced: self.assets[index].source.location().to_string(),
                };
                tracing::warn!(
                    path = %collision.path,
                    kept = %collision.kept,
                    replaced = %collision.replaced,
                    "Two assets resolved to the same destination"
                );
                let loser = std::mem::replace(&mut self.assets[index], descriptor);
                self.replaced.push((collision.path.clone(), loser.source));
                self.collisions.push(collision.clone());
                PushOutcome::Collision(collision)
            }
        }
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn collisions(&self) -> &[PathCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Lookup table used as the baseline of a later pass
    ///
    /// Includes sources that lost a collision so a later pass does not
    /// mistake them for new assets.
    pub fn index(&self) -> AssetIndex {
        let mut index = AssetIndex::default();
        let kept = self
            .assets
            .iter()
            .map(|d| (&d.destination_path, &d.source));
        let replaced = self.replaced.iter().map(|(path, source)| (path, source));
        for (path, source) in kept.chain(replaced) {
            index
                .sources
                .entry(path.clone())
                .or_default()
                .push(source.clone());
        }
        index
    }

    pub fn into_parts(self) -> (Vec<AssetDescriptor>, Vec<PathCollision>) {
        (self.assets, self.collisions)
    }
}

/// Destination → sources map of an earlier pass
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    sources: HashMap<String, Vec<AssetSource>>,
}

impl AssetIndex {
    /// Whether the exact asset (same path, same source) is already known
    pub fn contains(&self, path: &str, source: &AssetSource) -> bool {
        self.sources
            .get(path)
            .is_some_and(|known| known.iter().any(|k| k == source))
    }

    /// Number of distinct destination paths
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
