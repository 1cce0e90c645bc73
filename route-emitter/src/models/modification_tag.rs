//! Logical `(epoch, index)` timestamps issued by the state store.

use serde::{Deserialize, Serialize};

/// Per-record logical clock used to order updates that may arrive out of
/// order. Epochs are opaque; a rolled epoch always counts as newer. Within
/// one epoch, indexes compare by magnitude.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ModificationTag {
    #[serde(default)]
    pub epoch: String,
    #[serde(default)]
    pub index: u64,
}

impl ModificationTag {
    pub fn new(epoch: impl Into<String>, index: u64) -> Self {
        Self {
            epoch: epoch.into(),
            index,
        }
    }

    /// A zero tag carries no ordering information; mutations against it (or
    /// carrying it) always apply.
    pub fn is_zero(&self) -> bool {
        self.epoch.is_empty()
    }

    /// Returns true when `other` strictly succeeds `self`.
    pub fn succeeded_by(&self, other: &ModificationTag) -> bool {
        if self.epoch.is_empty() || other.epoch.is_empty() {
            return true;
        }

        self.epoch != other.epoch || other.index > self.index
    }

    pub fn equal_or_succeeded_by(&self, other: &ModificationTag) -> bool {
        self == other || self.succeeded_by(other)
    }
}
