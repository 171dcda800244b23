//! Execution context - one sandboxed run's resource and I/O state
//!
//! A context is created per `test_genome` call and owned by it. It holds the
//! run's resource bank, its input and receive buffers, and an explicitly
//! seeded random source, so runs are reproducible and never share mutable
//! state with each other or with the live population.

use std::sync::Arc;

use avida_common::{
    ConfigError, ResourceDef, ResourceError, ResourceLevels, ResourceScope, FIXED_INPUTS,
    RANDOM_INPUT_MARKERS, RECEIVE_BUFFER_SIZE,
};
use avida_resources::{AccountingMethod, BankSettings, ResourceBank, ResourceHistory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Sandboxed state of one genome test
#[derive(Debug)]
pub struct ExecutionContext {
    defs: Arc<[ResourceDef]>,
    history: Option<Arc<ResourceHistory>>,
    bank_settings: BankSettings,
    bank: ResourceBank,
    rng: ChaCha8Rng,
    use_random_inputs: bool,
    inputs: Vec<i32>,
    input_cursor: usize,
    receive: Vec<i32>,
    receive_cursor: usize,
    depth_start: u64,
    state_grid: usize,
}

impl ExecutionContext {
    /// Create a context and initialize its resource bank
    pub fn new(
        defs: Arc<[ResourceDef]>,
        history: Option<Arc<ResourceHistory>>,
        bank_settings: BankSettings,
        use_random_inputs: bool,
        seed: u64,
        state_grid: usize,
    ) -> Result<Self, ConfigError> {
        let bank = ResourceBank::initialize(defs.clone(), history.clone(), bank_settings)?;
        let mut ctx = Self {
            defs,
            history,
            bank_settings,
            bank,
            rng: ChaCha8Rng::seed_from_u64(seed),
            use_random_inputs,
            inputs: Vec::new(),
            input_cursor: 0,
            receive: Vec::new(),
            receive_cursor: 0,
            depth_start: 0,
            state_grid,
        };
        ctx.reset_inputs();
        Ok(ctx)
    }

    /// Regenerate the input and receive buffers and rewind both cursors
    pub fn reset_inputs(&mut self) {
        self.inputs = self.generate_inputs();
        self.receive = self.generate_inputs();
        self.receive.truncate(RECEIVE_BUFFER_SIZE);
        self.input_cursor = 0;
        self.receive_cursor = 0;
    }

    fn generate_inputs(&mut self) -> Vec<i32> {
        if self.use_random_inputs {
            RANDOM_INPUT_MARKERS
                .iter()
                .map(|marker| (marker << 24) + self.rng.gen_range(0..(1 << 24)))
                .collect()
        } else {
            FIXED_INPUTS.to_vec()
        }
    }

    /// Next input, advancing and wrapping the internal cursor
    pub fn get_input(&mut self) -> i32 {
        let mut cursor = self.input_cursor;
        let value = self.get_input_at(&mut cursor);
        self.input_cursor = cursor;
        value
    }

    /// Next input, advancing a caller-owned cursor instead of the internal one
    pub fn get_input_at(&self, cursor: &mut usize) -> i32 {
        let value = self.inputs[*cursor % self.inputs.len()];
        *cursor = (*cursor + 1) % self.inputs.len();
        value
    }

    /// Next receive-buffer value, cyclic
    pub fn get_receive_value(&mut self) -> i32 {
        let value = self.receive[self.receive_cursor % self.receive.len()];
        self.receive_cursor = (self.receive_cursor + 1) % self.receive.len();
        value
    }

    /// Current input vector
    pub fn inputs(&self) -> &[i32] {
        &self.inputs
    }

    /// Apply cycles elapsed within the current depth
    pub fn advance(&mut self, cycles_in_depth: u64) {
        self.bank.advance(self.depth_start + cycles_in_depth);
    }

    /// Prepare for the next lineage depth after a gestation of `cycles`
    ///
    /// Historical and Exact accounting continue the resource timeline; Fresh
    /// accounting restarts from initial levels.
    pub fn continue_from(&mut self, cycles: u64) -> Result<(), ConfigError> {
        if self.bank.effective_method() == AccountingMethod::Fresh {
            // A history fallback already happened once; re-seed as plain Fresh
            let settings = BankSettings {
                method: AccountingMethod::Fresh,
                ..self.bank_settings
            };
            self.bank = ResourceBank::initialize(self.defs.clone(), None, settings)?;
            self.depth_start = 0;
        } else {
            self.depth_start += cycles;
        }
        debug!(depth_start = self.depth_start, "Continuing to next depth");
        Ok(())
    }

    /// Levels of one scope
    pub fn resources(&self, scope: ResourceScope) -> &ResourceLevels {
        self.bank.query(scope)
    }

    /// Modify one scope, clipping at zero
    pub fn modify_resources(
        &mut self,
        scope: ResourceScope,
        delta: &[f64],
    ) -> Result<(), ResourceError> {
        self.bank.modify(scope, delta)
    }

    /// Accounting method in effect
    pub fn effective_method(&self) -> AccountingMethod {
        self.bank.effective_method()
    }

    /// Underlying bank
    pub fn bank(&self) -> &ResourceBank {
        &self.bank
    }

    /// State-grid identity
    pub fn state_grid(&self) -> usize {
        self.state_grid
    }
}
