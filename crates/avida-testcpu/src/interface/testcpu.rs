//! Sandbox organism interface backed by an execution context

use avida_common::{Genome, ResourceLevels, ResourceScope};
use tracing::{trace, warn};

use super::{AvatarId, OrganismId, OrganismInterface};
use crate::context::ExecutionContext;
use crate::hardware::{GestationSummary, Phenotype};

/// What the organism reported during one depth of a test
#[derive(Debug, Clone, Default)]
pub struct DepthState {
    /// Lineage depth being executed
    pub depth: usize,
    /// Last merit pushed through `update_merit`
    pub merit: Option<f64>,
    /// Gestation closed by the divide, if any
    pub divide: Option<GestationSummary>,
    /// Kaboom instructions executed
    pub kabooms: u32,
}

/// Organism interface of a test run
///
/// Borrows the run's [`ExecutionContext`] for one depth. There is no world
/// behind it: the neighborhood is empty, avatars are absent and every divide
/// is accepted.
pub struct TestCpuInterface<'a> {
    ctx: &'a mut ExecutionContext,
    state: DepthState,
}

impl<'a> TestCpuInterface<'a> {
    pub fn new(ctx: &'a mut ExecutionContext, depth: usize) -> Self {
        Self {
            ctx,
            state: DepthState {
                depth,
                ..Default::default()
            },
        }
    }

    /// Apply the cycles elapsed in this depth to the resource bank
    pub fn advance(&mut self, cycles_in_depth: u64) {
        self.ctx.advance(cycles_in_depth);
    }

    pub fn context(&self) -> &ExecutionContext {
        self.ctx
    }

    pub fn state(&self) -> &DepthState {
        &self.state
    }

    pub fn into_state(self) -> DepthState {
        self.state
    }

    fn modify(&mut self, scope: ResourceScope, delta: &[f64]) {
        if let Err(e) = self.ctx.modify_resources(scope, delta) {
            warn!(scope = %scope, error = %e, "Ignoring resource change");
        }
    }
}

impl OrganismInterface for TestCpuInterface<'_> {
    fn divide(&mut self, parent: &mut Phenotype, offspring: &Genome) -> bool {
        let summary = parent.divide_reset(offspring).clone();
        trace!(
            depth = self.state.depth,
            gestation = summary.gestation_time,
            "Offspring produced"
        );
        self.state.divide = Some(summary);
        true
    }

    fn kaboom(&mut self, _distance: u32) {
        self.state.kabooms += 1;
    }

    fn live_org_list(&self) -> Vec<OrganismId> {
        Vec::new()
    }

    fn faced_avatars(&self, count: usize) -> Vec<Option<AvatarId>> {
        vec![None; count]
    }

    fn cell_avatars(&self, count: usize) -> Vec<Option<AvatarId>> {
        vec![None; count]
    }

    fn faced_prey_avatars(&self, count: usize) -> Vec<Option<AvatarId>> {
        vec![None; count]
    }

    fn update_merit(&mut self, merit: f64) -> bool {
        self.state.merit = Some(merit);
        true
    }

    fn receive_value(&mut self) -> Option<i32> {
        Some(self.ctx.get_receive_value())
    }

    fn buy_value(&mut self, _label: u32, _price: i32) -> Option<i32> {
        Some(self.ctx.get_receive_value())
    }

    fn get_input(&mut self) -> i32 {
        self.ctx.get_input()
    }

    fn resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::Global).clone()
    }

    fn cell_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::Cell).clone()
    }

    fn deme_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::Deme).clone()
    }

    fn faced_cell_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::FacedCell).clone()
    }

    fn avatar_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::Avatar).clone()
    }

    fn faced_avatar_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::FacedCell).clone()
    }

    fn frozen_resources(&self) -> ResourceLevels {
        self.ctx.resources(ResourceScope::Frozen).clone()
    }

    fn update_resources(&mut self, delta: &[f64]) {
        self.modify(ResourceScope::Global, delta);
    }

    fn update_deme_resources(&mut self, delta: &[f64]) {
        self.modify(ResourceScope::Deme, delta);
    }

    fn update_avatar_resources(&mut self, delta: &[f64]) {
        self.modify(ResourceScope::Avatar, delta);
    }

    fn state_grid_id(&self) -> usize {
        self.ctx.state_grid()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use avida_common::{ResourceDef, FIXED_INPUTS};
    use avida_resources::BankSettings;

    use super::*;
    use crate::config::BaseMerit;

    fn context() -> ExecutionContext {
        let defs: Arc<[ResourceDef]> = vec![
            ResourceDef::new("glucose", 100.0),
            ResourceDef::new("lactose", 10.0),
        ]
        .into();
        ExecutionContext::new(defs, None, BankSettings::default(), false, 0, 4).unwrap()
    }

    #[test]
    fn test_no_world_behind_sandbox() {
        let mut ctx = context();
        let iface = TestCpuInterface::new(&mut ctx, 0);
        assert!(iface.live_org_list().is_empty());
        assert_eq!(iface.faced_avatars(3), vec![None, None, None]);
        assert_eq!(iface.cell_avatars(2), vec![None, None]);
        assert!(iface.faced_prey_avatars(1)[0].is_none());
        assert_eq!(iface.state_grid_id(), 4);
    }

    #[test]
    fn test_divide_always_accepted() {
        let mut ctx = context();
        let mut iface = TestCpuInterface::new(&mut ctx, 1);
        let offspring: Genome = "nop\n".parse().unwrap();
        let mut parent = Phenotype::new(BaseMerit::Const, 1, 0);
        parent.tick(0);

        assert!(iface.divide(&mut parent, &offspring));
        assert_eq!(parent.num_divides(), 1);

        let state = iface.into_state();
        assert_eq!(state.depth, 1);
        assert_eq!(state.divide.unwrap().gestation_time, 1);
    }

    #[test]
    fn test_scoped_updates_stay_in_scope() {
        let mut ctx = context();
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        iface.update_deme_resources(&[-40.0, 0.0]);
        iface.update_avatar_resources(&[0.0, -4.0]);
        iface.update_resources(&[-1.0, 0.0]);

        assert_eq!(iface.deme_resources().get(0), 60.0);
        assert_eq!(iface.avatar_resources().get(1), 6.0);
        assert_eq!(iface.cell_resources().get(1), 6.0);
        assert_eq!(iface.resources().get(0), 99.0);
        assert_eq!(iface.faced_cell_resources().get(0), 100.0);
        assert_eq!(iface.faced_avatar_resources().get(0), 100.0);
        assert_eq!(iface.frozen_resources().get(0), 100.0);
    }

    #[test]
    fn test_mismatched_update_is_ignored() {
        let mut ctx = context();
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        iface.update_resources(&[-1.0]);
        assert_eq!(iface.resources().get(0), 100.0);
    }

    #[test]
    fn test_merit_and_inputs() {
        let mut ctx = context();
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        assert!(iface.update_merit(12.5));
        assert_eq!(iface.get_input(), FIXED_INPUTS[0]);
        let received = iface.receive_value().unwrap();
        let bought = iface.buy_value(7, 3).unwrap();
        assert_ne!(received, bought);
        iface.kaboom(2);
        let state = iface.into_state();
        assert_eq!(state.merit, Some(12.5));
        assert_eq!(state.kabooms, 1);
    }
}
