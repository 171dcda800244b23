//! Virtual CPU interpreter
//!
//! Executes one instruction per cycle. Everything outside the registers,
//! heads and offspring buffer is reached through [`OrganismInterface`].

use std::collections::VecDeque;
use std::sync::Arc;

use avida_common::{
    Environment, Genome, Instruction, Register, ResourceLevels, ResourceScope, TestCpuError,
    INPUT_BUFFER_SIZE,
};
use tracing::trace;

use super::phenotype::Phenotype;
use crate::config::BaseMerit;
use crate::interface::OrganismInterface;

/// Result of one executed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Divided,
    Died,
}

/// Register machine running a single genome
#[derive(Debug, Clone)]
pub struct VirtualCpu {
    genome: Genome,
    environment: Arc<Environment>,
    min_copied_fraction: f64,
    registers: [i32; 3],
    ip: usize,
    read_head: usize,
    offspring: Vec<Instruction>,
    inputs: VecDeque<i32>,
    bins: Vec<f64>,
    phenotype: Phenotype,
}

impl VirtualCpu {
    pub fn new(
        genome: Genome,
        environment: Arc<Environment>,
        base_merit: BaseMerit,
        min_copied_fraction: f64,
    ) -> Result<Self, TestCpuError> {
        if genome.is_empty() {
            return Err(TestCpuError::EmptyGenome);
        }
        let phenotype = Phenotype::new(base_merit, genome.len(), environment.reactions.len());
        Ok(Self {
            bins: vec![0.0; environment.resource_count()],
            genome,
            environment,
            min_copied_fraction,
            registers: [0; 3],
            ip: 0,
            read_head: 0,
            offspring: Vec::new(),
            inputs: VecDeque::with_capacity(INPUT_BUFFER_SIZE),
            phenotype,
        })
    }

    #[inline]
    pub fn ip(&self) -> usize {
        self.ip
    }

    #[inline]
    pub fn registers(&self) -> [i32; 3] {
        self.registers
    }

    /// Instruction at the instruction pointer
    pub fn current_instruction(&self) -> &Instruction {
        &self.genome.instructions()[self.ip]
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn phenotype(&self) -> &Phenotype {
        &self.phenotype
    }

    /// Resources held in the organism's internal bins
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Execute one instruction
    pub fn single_process(&mut self, iface: &mut dyn OrganismInterface) -> StepOutcome {
        let len = self.genome.len();
        let ip = self.ip;
        self.phenotype.tick(ip);
        let inst = self.genome.instructions()[ip].clone();
        let mut next = (ip + 1) % len;

        match inst {
            Instruction::Nop => {}
            Instruction::Set { reg, value } => self.set(reg, value),
            Instruction::Inc(r) => self.set(r, self.get(r).wrapping_add(1)),
            Instruction::Dec(r) => self.set(r, self.get(r).wrapping_sub(1)),
            Instruction::Add { dst, lhs, rhs } => {
                self.set(dst, self.get(lhs).wrapping_add(self.get(rhs)))
            }
            Instruction::Sub { dst, lhs, rhs } => {
                self.set(dst, self.get(lhs).wrapping_sub(self.get(rhs)))
            }
            Instruction::Nand { dst, lhs, rhs } => self.set(dst, !(self.get(lhs) & self.get(rhs))),
            Instruction::ShiftL(r) => self.set(r, self.get(r).wrapping_shl(1)),
            Instruction::ShiftR(r) => self.set(r, self.get(r) >> 1),
            Instruction::Swap(a, b) => self.registers.swap(a.index(), b.index()),
            Instruction::Io(r) => self.io(r, iface),
            Instruction::IfEqu(a, b) => {
                if self.get(a) != self.get(b) {
                    next = (ip + 2) % len;
                }
            }
            Instruction::IfNEqu(a, b) => {
                if self.get(a) == self.get(b) {
                    next = (ip + 2) % len;
                }
            }
            Instruction::IfLess(a, b) => {
                if self.get(a) >= self.get(b) {
                    next = (ip + 2) % len;
                }
            }
            Instruction::Jump(offset) => {
                next = (ip as i64 + offset as i64).rem_euclid(len as i64) as usize;
            }
            Instruction::HCopy => {
                let copied = self.genome.instructions()[self.read_head % len].clone();
                self.offspring.push(copied);
                self.read_head = (self.read_head + 1) % len;
                self.phenotype.add_copied();
            }
            Instruction::IfNCopied => {
                if self.offspring.len() >= len {
                    next = (ip + 2) % len;
                }
            }
            Instruction::Divide => {
                if self.divide(iface) {
                    return StepOutcome::Divided;
                }
            }
            Instruction::Die => {
                self.phenotype.set_to_die();
                return StepOutcome::Died;
            }
            Instruction::Collect { resource, amount } => self.collect(resource, amount, iface),
            Instruction::Release { resource, amount } => self.release(resource, amount, iface),
            Instruction::Sense { scope, resource, reg } => {
                let levels = sense_scope(scope, iface);
                self.set(reg, levels.get(resource).floor() as i32);
            }
            Instruction::Receive(r) => {
                if let Some(value) = iface.receive_value() {
                    self.set(r, value);
                }
            }
            Instruction::Buy { label, price, reg } => {
                if let Some(value) = iface.buy_value(label, price) {
                    self.set(reg, value);
                }
            }
            Instruction::Kaboom(distance) => iface.kaboom(distance),
            Instruction::Neighbors(r) => self.set(r, iface.live_org_list().len() as i32),
            Instruction::LookAhead(r) => {
                let seen = iface.faced_avatars(1).into_iter().flatten().count();
                self.set(r, seen as i32);
            }
        }

        self.ip = next;
        StepOutcome::Continue
    }

    #[inline]
    fn get(&self, reg: Register) -> i32 {
        self.registers[reg.index()]
    }

    #[inline]
    fn set(&mut self, reg: Register, value: i32) {
        self.registers[reg.index()] = value;
    }

    fn io(&mut self, reg: Register, iface: &mut dyn OrganismInterface) {
        let output = self.get(reg);
        let inputs: Vec<i32> = self.inputs.iter().copied().collect();
        let mut rewarded = false;

        for (index, reaction) in self.environment.reactions.iter().enumerate() {
            if !reaction.task.check(output, &inputs) {
                continue;
            }
            if !self.phenotype.record_task(index, reaction.max_count) {
                continue;
            }
            let value = match &reaction.resource {
                Some(bound) => {
                    let consumed = bound.consumption(iface.resources().get(bound.resource));
                    if consumed > 0.0 {
                        iface.update_resources(&self.delta(bound.resource, -consumed));
                    }
                    reaction.value * consumed / bound.max
                }
                None => reaction.value,
            };
            trace!(task = reaction.task.name(), value, "Reaction triggered");
            self.phenotype.apply_reward(reaction.process, value);
            rewarded = true;
        }

        if rewarded {
            iface.update_merit(self.phenotype.projected_merit());
        }

        let input = iface.get_input();
        self.set(reg, input);
        if self.inputs.len() == INPUT_BUFFER_SIZE {
            self.inputs.pop_front();
        }
        self.inputs.push_back(input);
    }

    fn collect(&mut self, resource: usize, amount: f64, iface: &mut dyn OrganismInterface) {
        if resource >= self.bins.len() {
            return;
        }
        let taken = amount.min(iface.resources().get(resource));
        if taken > 0.0 {
            iface.update_resources(&self.delta(resource, -taken));
            self.bins[resource] += taken;
        }
    }

    fn release(&mut self, resource: usize, amount: f64, iface: &mut dyn OrganismInterface) {
        if resource >= self.bins.len() {
            return;
        }
        let given = amount.min(self.bins[resource]);
        if given > 0.0 {
            self.bins[resource] -= given;
            iface.update_resources(&self.delta(resource, given));
        }
    }

    fn delta(&self, resource: usize, change: f64) -> Vec<f64> {
        let mut delta = vec![0.0; self.bins.len()];
        delta[resource] = change;
        delta
    }

    /// Attempt a divide; false leaves the organism executing
    fn divide(&mut self, iface: &mut dyn OrganismInterface) -> bool {
        let len = self.genome.len();
        let required = ((self.min_copied_fraction * len as f64).ceil() as usize).max(1);
        if self.offspring.len() < required {
            trace!(copied = self.offspring.len(), required, "Divide failed");
            return false;
        }

        let offspring = Genome::new(std::mem::take(&mut self.offspring));
        if !iface.divide(&mut self.phenotype, &offspring) {
            return false;
        }
        iface.update_merit(self.phenotype.last_merit());

        self.registers = [0; 3];
        self.ip = 0;
        self.read_head = 0;
        self.inputs.clear();
        true
    }
}

fn sense_scope(scope: ResourceScope, iface: &dyn OrganismInterface) -> ResourceLevels {
    match scope {
        ResourceScope::Global => iface.resources(),
        ResourceScope::Cell => iface.cell_resources(),
        ResourceScope::Deme => iface.deme_resources(),
        ResourceScope::FacedCell => iface.faced_cell_resources(),
        ResourceScope::Avatar => iface.avatar_resources(),
        ResourceScope::Frozen => iface.frozen_resources(),
    }
}

#[cfg(test)]
mod tests {
    use avida_common::{ResourceDef, FIXED_INPUTS};
    use avida_resources::BankSettings;

    use super::*;
    use crate::context::ExecutionContext;
    use crate::interface::TestCpuInterface;

    const REPLICATOR: &str = "collect 0 30\nh-copy\nif-n-copied\njump -2\ndivide\n";

    fn environment() -> Arc<Environment> {
        Arc::new(Environment::logic_nine().with_resource(ResourceDef::new("glucose", 100.0)))
    }

    fn context(env: &Environment) -> ExecutionContext {
        let defs: Arc<[ResourceDef]> = env.resources.clone().into();
        ExecutionContext::new(defs, None, BankSettings::default(), false, 0, 0).unwrap()
    }

    fn cpu(text: &str, env: Arc<Environment>) -> VirtualCpu {
        VirtualCpu::new(text.parse().unwrap(), env, BaseMerit::LeastSize, 0.5).unwrap()
    }

    fn run(cpu: &mut VirtualCpu, iface: &mut TestCpuInterface<'_>, limit: u64) -> StepOutcome {
        for _ in 0..limit {
            match cpu.single_process(iface) {
                StepOutcome::Continue => continue,
                done => return done,
            }
        }
        StepOutcome::Continue
    }

    #[test]
    fn test_empty_genome_rejected() {
        let err = VirtualCpu::new(Genome::new(Vec::new()), environment(), BaseMerit::Const, 0.5)
            .unwrap_err();
        assert_eq!(err, TestCpuError::EmptyGenome);
    }

    #[test]
    fn test_replicator_divides() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu(REPLICATOR, env);

        assert_eq!(run(&mut cpu, &mut iface, 100), StepOutcome::Divided);
        assert_eq!(cpu.bins(), &[30.0]);
        assert_eq!(iface.resources().get(0), 70.0);

        let state = iface.into_state();
        let summary = state.divide.unwrap();
        assert_eq!(summary.gestation_time, 16);
        assert_eq!(summary.copied_size, 5);
        assert_eq!(summary.executed_size, 5);
        assert_eq!(&summary.offspring, cpu.genome());
        assert_eq!(state.merit, Some(5.0));
    }

    #[test]
    fn test_divide_requires_copied_fraction() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("h-copy\ndivide\nnop\nnop\nnop\nnop\n", env);

        assert_eq!(run(&mut cpu, &mut iface, 2), StepOutcome::Continue);
        assert!(iface.state().divide.is_none());
        assert_eq!(cpu.ip(), 2);
    }

    #[test]
    fn test_die_halts() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("nop\ndie\n", env);

        assert_eq!(run(&mut cpu, &mut iface, 10), StepOutcome::Died);
        assert!(cpu.phenotype().to_die());
    }

    #[test]
    fn test_not_task_rewarded() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("io a\nnand b a a\nio b\n", env);

        run(&mut cpu, &mut iface, 3);
        assert_eq!(cpu.registers()[0], FIXED_INPUTS[0]);
        assert_eq!(cpu.registers()[1], FIXED_INPUTS[1]);
        assert_eq!(cpu.phenotype().task_counts()[0], 1);
        assert_eq!(cpu.phenotype().bonus(), 2.0);
        assert!(iface.state().merit.is_some());
    }

    #[test]
    fn test_conditional_skips_next() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("set a 1\nif-equ a b\ninc c\ninc c\n", env);

        run(&mut cpu, &mut iface, 3);
        assert_eq!(cpu.registers(), [1, 0, 1]);
        assert_eq!(cpu.ip(), 0);
    }

    #[test]
    fn test_jump_wraps_backwards() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("jump -3\nnop\n", env);

        run(&mut cpu, &mut iface, 1);
        assert_eq!(cpu.ip(), 1);
    }

    #[test]
    fn test_sense_and_release() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu(
            "collect 0 40\nsense global 0 a\nrelease 0 15\nsense frozen 0 b\nsense global 0 c\n",
            env,
        );

        run(&mut cpu, &mut iface, 5);
        assert_eq!(cpu.registers(), [60, 100, 75]);
        assert_eq!(cpu.bins(), &[25.0]);
    }

    #[test]
    fn test_sandbox_neighborhood_is_empty() {
        let env = environment();
        let mut ctx = context(&env);
        let mut iface = TestCpuInterface::new(&mut ctx, 0);
        let mut cpu = cpu("set a 9\nset b 9\nneighbors a\nlook-ahead b\nkaboom 2\n", env);

        assert_eq!(run(&mut cpu, &mut iface, 5), StepOutcome::Continue);
        assert_eq!(cpu.registers(), [0, 0, 0]);
        assert_eq!(iface.state().kabooms, 1);
    }
}
