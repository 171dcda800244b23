//! Four-scope resource bank
//!
//! The ambient, faced-cell, deme and cell ledgers advance together, so a
//! query on any scope during a cycle sees the same simulated instant. The
//! frozen scope keeps the seed levels for the whole run.

use std::sync::Arc;

use avida_common::{ConfigError, ResourceDef, ResourceError, ResourceLevels, ResourceScope};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::history::ResourceHistory;
use crate::ledger::ResourceLedger;
use crate::method::AccountingMethod;

/// Parameters fixed for the lifetime of one bank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankSettings {
    /// Requested accounting method
    pub method: AccountingMethod,
    /// Update the test replays from
    pub update_index: u64,
    /// CPU cycles already elapsed within `update_index`
    pub cycle_offset: u64,
    /// CPU cycles per simulated update
    pub cycles_per_update: u64,
    /// Refuse to fall back to fresh levels when history is unusable
    pub strict_history: bool,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            method: AccountingMethod::Fresh,
            update_index: 0,
            cycle_offset: 0,
            cycles_per_update: avida_common::DEFAULT_CYCLES_PER_UPDATE,
            strict_history: false,
        }
    }
}

/// Resource state of one sandboxed run
#[derive(Debug, Clone)]
pub struct ResourceBank {
    settings: BankSettings,
    effective: AccountingMethod,
    history: Option<Arc<ResourceHistory>>,
    ambient: ResourceLedger,
    faced_cell: ResourceLedger,
    deme: ResourceLedger,
    cell: ResourceLedger,
    frozen: ResourceLevels,
    current_update: u64,
    cycles_used: u64,
}

impl ResourceBank {
    /// Initialize the bank for one test
    ///
    /// Historical and Exact fall back to Fresh when no usable seed snapshot
    /// exists, unless `strict_history` is set.
    pub fn initialize(
        defs: Arc<[ResourceDef]>,
        history: Option<Arc<ResourceHistory>>,
        settings: BankSettings,
    ) -> Result<Self, ConfigError> {
        if settings.cycles_per_update == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cycles_per_update".into(),
                reason: "must be positive".into(),
            });
        }
        if settings.cycle_offset >= settings.cycles_per_update {
            return Err(ConfigError::InvalidValue {
                key: "cycle_offset".into(),
                reason: format!(
                    "{} is not within the {} cycles of one update",
                    settings.cycle_offset, settings.cycles_per_update
                ),
            });
        }

        let fresh = || ResourceLevels::from_clipped(defs.iter().map(|d| d.initial));
        let (effective, seed) = match settings.method {
            AccountingMethod::Fresh => (AccountingMethod::Fresh, fresh()),
            method => {
                let exact = method == AccountingMethod::Exact;
                let seed = history
                    .as_deref()
                    .and_then(|h| h.levels_at(settings.update_index, exact))
                    .filter(|levels| levels.len() == defs.len())
                    .cloned();
                match seed {
                    Some(levels) => (method, levels),
                    None if settings.strict_history => {
                        return Err(ConfigError::MissingHistory {
                            method: method.to_string(),
                            update: settings.update_index,
                        });
                    }
                    None => {
                        warn!(
                            requested = %method,
                            update = settings.update_index,
                            "No usable resource history, falling back to fresh accounting"
                        );
                        (AccountingMethod::Fresh, fresh())
                    }
                }
            }
        };

        debug!(
            method = %effective,
            update = settings.update_index,
            offset = settings.cycle_offset,
            resources = defs.len(),
            "Initialized resource bank"
        );

        Ok(Self {
            settings,
            effective,
            history: if effective.uses_history() { history } else { None },
            ambient: ResourceLedger::new(ResourceScope::Global, defs.clone(), seed.clone()),
            faced_cell: ResourceLedger::new(ResourceScope::FacedCell, defs.clone(), seed.clone()),
            deme: ResourceLedger::new(ResourceScope::Deme, defs.clone(), seed.clone()),
            cell: ResourceLedger::new(ResourceScope::Cell, defs, seed.clone()),
            frozen: seed,
            current_update: settings.update_index,
            cycles_used: 0,
        })
    }

    /// Method actually in effect (differs from the request after a fallback)
    #[inline]
    pub fn effective_method(&self) -> AccountingMethod {
        self.effective
    }

    /// Settings the bank was created with
    #[inline]
    pub fn settings(&self) -> &BankSettings {
        &self.settings
    }

    /// Simulated update the ledgers currently reflect
    #[inline]
    pub fn current_update(&self) -> u64 {
        self.current_update
    }

    /// Total CPU cycles applied so far
    #[inline]
    pub fn cycles_used(&self) -> u64 {
        self.cycles_used
    }

    /// Apply elapsed cycles; `cycles_used` counts from the start of the test
    pub fn advance(&mut self, cycles_used: u64) {
        self.cycles_used = self.cycles_used.max(cycles_used);
        if !self.effective.uses_history() {
            return;
        }

        let elapsed = self.settings.cycle_offset.saturating_add(self.cycles_used);
        let target = self
            .settings
            .update_index
            .saturating_add(elapsed / self.settings.cycles_per_update);

        while self.current_update < target {
            self.current_update += 1;
            let snapshot = self
                .history
                .as_deref()
                .and_then(|h| h.exact(self.current_update))
                .cloned();
            match (snapshot, self.effective) {
                (Some(levels), _) => {
                    for ledger in self.ledgers_mut() {
                        ledger.replace(&levels);
                    }
                }
                (None, AccountingMethod::Historical) => {
                    for ledger in self.ledgers_mut() {
                        ledger.step();
                    }
                }
                // Exact replay never extrapolates
                (None, _) => {}
            }
            trace!(update = self.current_update, "Advanced resource bank");
        }
    }

    /// Organism-driven change to one scope, clipped at zero
    ///
    /// The frozen scope ignores modifications. Avatar changes land in the
    /// cell ledger.
    pub fn modify(&mut self, scope: ResourceScope, delta: &[f64]) -> Result<(), ResourceError> {
        match scope {
            ResourceScope::Global => self.ambient.modify(delta),
            ResourceScope::FacedCell => self.faced_cell.modify(delta),
            ResourceScope::Deme => self.deme.modify(delta),
            ResourceScope::Cell | ResourceScope::Avatar => self.cell.modify(delta),
            ResourceScope::Frozen => Ok(()),
        }
    }

    /// Current levels of one scope
    pub fn query(&self, scope: ResourceScope) -> &ResourceLevels {
        match scope {
            ResourceScope::Global => self.ambient.query(),
            ResourceScope::FacedCell => self.faced_cell.query(),
            ResourceScope::Deme => self.deme.query(),
            ResourceScope::Cell | ResourceScope::Avatar => self.cell.query(),
            ResourceScope::Frozen => &self.frozen,
        }
    }

    /// Number of tracked resources
    pub fn resource_count(&self) -> usize {
        self.frozen.len()
    }

    fn ledgers_mut(&mut self) -> [&mut ResourceLedger; 4] {
        [
            &mut self.ambient,
            &mut self.faced_cell,
            &mut self.deme,
            &mut self.cell,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Arc<[ResourceDef]> {
        vec![ResourceDef::new("glucose", 100.0).with_flow(10.0, 0.0)].into()
    }

    fn history() -> Arc<ResourceHistory> {
        let mut h = ResourceHistory::new();
        h.record(10, vec![50.0].into()).unwrap();
        h.record(11, vec![40.0].into()).unwrap();
        h.record(12, vec![30.0].into()).unwrap();
        Arc::new(h)
    }

    fn settings(method: AccountingMethod, update: u64) -> BankSettings {
        BankSettings {
            method,
            update_index: update,
            cycles_per_update: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_has_no_inflow() {
        let mut bank =
            ResourceBank::initialize(defs(), None, settings(AccountingMethod::Fresh, 0)).unwrap();
        bank.advance(1000);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 100.0);
        assert_eq!(bank.current_update(), 0);
    }

    #[test]
    fn test_historical_replays_then_extrapolates() {
        let mut bank = ResourceBank::initialize(
            defs(),
            Some(history()),
            settings(AccountingMethod::Historical, 10),
        )
        .unwrap();
        assert_eq!(bank.query(ResourceScope::Global).get(0), 50.0);

        bank.advance(10);
        assert_eq!(bank.query(ResourceScope::Deme).get(0), 40.0);
        bank.advance(20);
        assert_eq!(bank.query(ResourceScope::Cell).get(0), 30.0);
        // Past the series end: inflow of 10 per update
        bank.advance(40);
        assert_eq!(bank.query(ResourceScope::FacedCell).get(0), 50.0);
        assert_eq!(bank.current_update(), 14);
    }

    #[test]
    fn test_exact_freezes_past_series_end() {
        let mut bank =
            ResourceBank::initialize(defs(), Some(history()), settings(AccountingMethod::Exact, 11))
                .unwrap();
        assert_eq!(bank.effective_method(), AccountingMethod::Exact);
        bank.advance(50);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 30.0);
    }

    #[test]
    fn test_exact_requires_exact_snapshot() {
        let bank = ResourceBank::initialize(
            defs(),
            Some(history()),
            settings(AccountingMethod::Exact, 15),
        )
        .unwrap();
        assert_eq!(bank.effective_method(), AccountingMethod::Fresh);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 100.0);
    }

    #[test]
    fn test_historical_without_series_falls_back() {
        let bank =
            ResourceBank::initialize(defs(), None, settings(AccountingMethod::Historical, 10))
                .unwrap();
        assert_eq!(bank.effective_method(), AccountingMethod::Fresh);
    }

    #[test]
    fn test_strict_history_rejects_fallback() {
        let mut s = settings(AccountingMethod::Historical, 10);
        s.strict_history = true;
        let err = ResourceBank::initialize(defs(), None, s).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHistory { update: 10, .. }));
    }

    #[test]
    fn test_cycle_offset_shifts_update_boundary() {
        let mut s = settings(AccountingMethod::Historical, 10);
        s.cycle_offset = 9;
        let mut bank = ResourceBank::initialize(defs(), Some(history()), s).unwrap();
        bank.advance(1);
        assert_eq!(bank.current_update(), 11);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 40.0);
    }

    #[test]
    fn test_cycle_offset_beyond_update_rejected() {
        let mut s = settings(AccountingMethod::Historical, 10);
        s.cycle_offset = 10;
        let err = ResourceBank::initialize(defs(), Some(history()), s).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "cycle_offset"));
    }

    #[test]
    fn test_advance_saturates_at_last_update() {
        let mut s = settings(AccountingMethod::Historical, u64::MAX - 1);
        s.cycle_offset = 9;
        let mut h = ResourceHistory::new();
        h.record(u64::MAX - 1, vec![50.0].into()).unwrap();
        let mut bank = ResourceBank::initialize(defs(), Some(Arc::new(h)), s).unwrap();
        assert_eq!(bank.effective_method(), AccountingMethod::Historical);

        bank.advance(u64::MAX);
        assert_eq!(bank.current_update(), u64::MAX);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 60.0);
    }

    #[test]
    fn test_frozen_scope_is_immutable() {
        let mut bank =
            ResourceBank::initialize(defs(), None, settings(AccountingMethod::Fresh, 0)).unwrap();
        bank.modify(ResourceScope::Frozen, &[-50.0]).unwrap();
        bank.modify(ResourceScope::Global, &[-30.0]).unwrap();
        assert_eq!(bank.query(ResourceScope::Frozen).get(0), 100.0);
        assert_eq!(bank.query(ResourceScope::Global).get(0), 70.0);
        assert_eq!(bank.query(ResourceScope::Cell).get(0), 100.0);
    }

    #[test]
    fn test_avatar_reads_cell() {
        let mut bank =
            ResourceBank::initialize(defs(), None, settings(AccountingMethod::Fresh, 0)).unwrap();
        bank.modify(ResourceScope::Avatar, &[-1.0]).unwrap();
        assert_eq!(bank.query(ResourceScope::Cell).get(0), 99.0);
        assert_eq!(bank.query(ResourceScope::Avatar).get(0), 99.0);
    }

    #[test]
    fn test_zero_cycles_per_update_rejected() {
        let mut s = settings(AccountingMethod::Fresh, 0);
        s.cycles_per_update = 0;
        assert!(ResourceBank::initialize(defs(), None, s).is_err());
    }
}
