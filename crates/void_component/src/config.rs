//! Node configuration

use serde::{Deserialize, Serialize};

/// Construction-time options for a [`Node`](crate::Node)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Install no-op lifecycle hooks at construction
    pub preset_hooks: bool,
    /// `create()` also creates children that are not yet created
    pub cascade_create: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            preset_hooks: false,
            cascade_create: true,
        }
    }
}

impl NodeConfig {
    /// Create the default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether lifecycle hooks are preset
    pub fn with_preset_hooks(mut self, preset: bool) -> Self {
        self.preset_hooks = preset;
        self
    }

    /// Set whether `create()` cascades to children
    pub fn with_cascade_create(mut self, cascade: bool) -> Self {
        self.cascade_create = cascade;
        self
    }
}
