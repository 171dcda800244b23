//! Single-scope resource ledger
//!
//! Quantities never go negative: every modification is clipped at zero.

use std::sync::Arc;

use avida_common::{ResourceDef, ResourceError, ResourceLevels, ResourceScope};

/// Levels of every resource in one accounting scope
#[derive(Debug, Clone)]
pub struct ResourceLedger {
    scope: ResourceScope,
    defs: Arc<[ResourceDef]>,
    levels: ResourceLevels,
}

impl ResourceLedger {
    /// Create a ledger seeded with `seed`
    pub fn new(scope: ResourceScope, defs: Arc<[ResourceDef]>, seed: ResourceLevels) -> Self {
        Self {
            scope,
            defs,
            levels: seed,
        }
    }

    /// Scope this ledger accounts for
    #[inline]
    pub fn scope(&self) -> ResourceScope {
        self.scope
    }

    /// Current levels
    #[inline]
    pub fn query(&self) -> &ResourceLevels {
        &self.levels
    }

    /// Apply an organism-driven delta, clipping at zero
    pub fn modify(&mut self, delta: &[f64]) -> Result<(), ResourceError> {
        self.levels.apply_delta(delta)
    }

    /// Replace levels with a historical snapshot
    pub(crate) fn replace(&mut self, levels: &ResourceLevels) {
        self.levels = levels.clone();
    }

    /// Extrapolate one update of inflow/outflow dynamics
    pub(crate) fn step(&mut self) {
        self.levels.step_with(&self.defs);
    }
}
