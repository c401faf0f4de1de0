//! View definitions: a shared animation part plus one variant per breakpoint.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollSyncError};
use crate::ids::{NodeId, ScopeId};
use crate::loops::LoopConfig;
use crate::timeline::TimelineConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    pub timelines: Vec<TimelineConfig>,
    pub loops: Vec<LoopConfig>,
}

impl VariantConfig {
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty() && self.loops.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
    #[serde(default)]
    pub shared: VariantConfig,
    /// Keyed by breakpoint name. A breakpoint without an entry animates only the shared part.
    #[serde(default)]
    pub variants: IndexMap<String, VariantConfig>,
}

impl ViewDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: VariantConfig::default(),
            variants: IndexMap::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let def: ViewDefinition = serde_json::from_str(s)?;
        def.validate()?;
        Ok(def)
    }

    pub fn variant(&self, breakpoint: &str) -> Option<&VariantConfig> {
        self.variants.get(breakpoint)
    }

    pub fn validate(&self) -> Result<()> {
        let parts = std::iter::once(&self.shared).chain(self.variants.values());
        for part in parts {
            for tl in &part.timelines {
                tl.validate()?;
            }
            for lp in &part.loops {
                if !lp.period_s.is_finite() || lp.period_s <= 0.0 {
                    return Err(ScrollSyncError::InvalidLoop(format!(
                        "view '{}': loop period must be positive",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Bookkeeping for a view currently mounted in a scope.
#[derive(Clone, Debug)]
pub struct MountedView {
    pub scope: ScopeId,
    pub root: NodeId,
    pub definition: ViewDefinition,
    /// Breakpoint whose variant is built, if any.
    pub variant: Option<String>,
}
