//! Instance tags: a sorted, duplicate-free label set.

use crate::config;
use crate::error::MacpineError;
use crate::paths::Paths;

/// Ordered set of labels backed by a sorted `Vec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a persisted list, restoring order and uniqueness if the
    /// file was edited by hand.
    pub fn from_persisted(mut tags: Vec<String>) -> Self {
        tags.sort();
        tags.dedup();
        Self { tags }
    }

    /// First index whose element is `>= tag`, and whether it equals `tag`.
    pub fn position(&self, tag: &str) -> (usize, bool) {
        match self.tags.binary_search_by(|t| t.as_str().cmp(tag)) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).1
    }

    /// Insert `tag`. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let (i, found) = self.position(tag);
        if !found {
            self.tags.insert(i, tag.to_string());
        }
        !found
    }

    /// Remove `tag`. Returns `false` if it was not present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let (i, found) = self.position(tag);
        if found {
            self.tags.remove(i);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Add,
    Remove,
}

/// Add or remove `labels` on the instance `alias` and persist the result.
///
/// Adding a present label or removing an absent one is a no-op.
pub fn edit_tags(
    paths: &Paths,
    alias: &str,
    labels: &[String],
    mode: TagMode,
) -> Result<Vec<String>, MacpineError> {
    let path = paths.config_path(alias);
    let mut instance = config::load(&path)?;

    let mut set = TagSet::from_persisted(std::mem::take(&mut instance.tags));
    for label in labels {
        let changed = match mode {
            TagMode::Add => set.insert(label),
            TagMode::Remove => set.remove(label),
        };
        tracing::debug!(alias, label = %label, ?mode, changed, "tag");
    }

    instance.tags = set.into_vec();
    config::save(&path, &instance)?;
    Ok(instance.tags)
}
