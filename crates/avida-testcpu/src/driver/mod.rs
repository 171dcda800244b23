//! Genome test driver
//!
//! Runs a genome to gestation completion inside a private execution context
//! and, on a successful divide, moves on to the offspring until the
//! configured number of generations has been tested.
//!
//! ```text
//! depth d:  Init -> Gestating -> Divided -> Recorded -> depth d+1 ...
//!                            \-> Died     -> test fails
//! last depth divided                     -> test passes
//! ```

pub mod print;

use std::io::Write;
use std::sync::Arc;

use avida_common::{
    AvidaError, DeathCause, DepthOutcome, Environment, Genome, GenomeHash, PhenotypeRecord,
    ResourceDef, Result, TestCpuError, MAX_GENERATION_TESTS,
};
use avida_resources::{AccountingMethod, BankSettings, ResourceHistory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, instrument};
use uuid::Uuid;

use crate::config::{TestCpuConfig, TestSettings};
use crate::context::ExecutionContext;
use crate::hardware::{StepOutcome, VirtualCpu};
use crate::interface::{OrganismInterface, TestCpuInterface};

pub use print::{print_bio_group, print_genome};

/// Result of one `test_genome` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    /// Unique run identifier (UUIDv7)
    pub run_id: Uuid,
    /// Fingerprint of the tested genome
    pub fingerprint: GenomeHash,
    /// Every tested depth divided
    pub passed: bool,
    /// Phenotypes of the depths that divided, ordered by depth
    pub records: Vec<PhenotypeRecord>,
    /// Terminal state of every executed depth
    pub outcomes: Vec<DepthOutcome>,
    /// Number of depths that divided
    pub depth_found: usize,
    /// Lineage presumed stable
    pub is_viable: bool,
    /// Accounting method in effect after any history fallback
    pub effective_method: AccountingMethod,
    /// Wall-clock time the run started
    pub tested_at: DateTime<Utc>,
}

impl TestReport {
    /// Phenotype recorded at `depth`
    pub fn record(&self, depth: usize) -> Option<&PhenotypeRecord> {
        self.records.iter().find(|r| r.depth == depth)
    }

    /// Fitness of the tested genome (0 when depth 0 did not divide)
    pub fn fitness(&self) -> f64 {
        self.record(0).map_or(0.0, |r| r.fitness)
    }
}

#[derive(Default)]
struct Lineage {
    records: Vec<PhenotypeRecord>,
    outcomes: Vec<DepthOutcome>,
}

/// Sandboxed gestation tester
///
/// Holds only immutable shared state. Every call builds its own
/// [`ExecutionContext`], so one `TestCpu` can serve many threads at once.
#[derive(Debug, Clone)]
pub struct TestCpu {
    config: Arc<TestCpuConfig>,
    environment: Arc<Environment>,
    defs: Arc<[ResourceDef]>,
    history: Option<Arc<ResourceHistory>>,
    tester_id: Uuid,
}

impl TestCpu {
    /// Create a tester for `environment`
    pub fn new(config: TestCpuConfig, environment: Environment) -> Result<Self> {
        config.validate()?;
        environment.validate()?;
        let defs: Arc<[ResourceDef]> = environment.resources.clone().into();
        Ok(Self {
            config: Arc::new(config),
            environment: Arc::new(environment),
            defs,
            history: None,
            tester_id: Uuid::now_v7(),
        })
    }

    /// Attach the resource history used by Historical and Exact accounting
    pub fn with_history(mut self, history: Arc<ResourceHistory>) -> Self {
        self.history = Some(history);
        self.tester_id = Uuid::now_v7();
        self
    }

    /// Identity of this tester's configuration, environment and history
    ///
    /// Clones share it; `new` and `with_history` mint a fresh one.
    pub fn tester_id(&self) -> Uuid {
        self.tester_id
    }

    pub fn config(&self) -> &TestCpuConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Test a genome
    ///
    /// Death and depth limits are reported in the returned [`TestReport`];
    /// `Err` means the call itself was invalid.
    pub fn test_genome(&self, genome: &Genome, settings: &TestSettings) -> Result<TestReport> {
        self.run(genome, settings, None)
    }

    /// Test a genome, writing one line per executed cycle to `out`
    pub fn test_genome_traced(
        &self,
        genome: &Genome,
        settings: &TestSettings,
        out: &mut dyn Write,
    ) -> Result<TestReport> {
        self.run(genome, settings, Some(out))
    }

    fn run(
        &self,
        genome: &Genome,
        settings: &TestSettings,
        trace: Option<&mut dyn Write>,
    ) -> Result<TestReport> {
        if genome.is_empty() {
            return Err(TestCpuError::EmptyGenome.into());
        }
        if settings.generation_tests == 0 {
            return Err(TestCpuError::ZeroDepth.into());
        }
        if settings.generation_tests > MAX_GENERATION_TESTS {
            return Err(TestCpuError::TooManyGenerations {
                requested: settings.generation_tests,
                max: MAX_GENERATION_TESTS,
            }
            .into());
        }

        let run_id = Uuid::now_v7();
        let fingerprint = genome.fingerprint();
        let span = info_span!(
            "test_genome",
            run_id = %run_id,
            genome = %fingerprint.short(),
            method = %settings.method
        );
        let _enter = span.enter();

        let tested_at = Utc::now();
        let bank_settings = BankSettings {
            method: settings.method,
            update_index: settings.update,
            cycle_offset: settings.cycle_offset,
            cycles_per_update: self.config.cycles_per_update,
            strict_history: self.config.strict_history,
        };
        let mut ctx = ExecutionContext::new(
            self.defs.clone(),
            self.history.clone(),
            bank_settings,
            settings.use_random_inputs,
            settings.seed,
            settings.state_grid,
        )?;

        let mut lineage = Lineage::default();
        let mut trace = trace;
        let mut current = genome.clone();
        let mut passed = false;
        for depth in 0..settings.generation_tests {
            let out = trace.as_mut().map(|w| &mut **w as &mut dyn Write);
            let Some((offspring, cycles)) =
                self.test_depth(&mut ctx, &current, depth, &mut lineage, out)?
            else {
                break;
            };
            if depth + 1 >= settings.generation_tests {
                passed = true;
                break;
            }
            ctx.continue_from(cycles)?;
            current = offspring;
        }

        info!(
            passed,
            depths = lineage.outcomes.len(),
            method = %ctx.effective_method(),
            "Genome test complete"
        );

        Ok(TestReport {
            run_id,
            fingerprint,
            passed,
            depth_found: lineage.records.len(),
            is_viable: passed,
            records: lineage.records,
            outcomes: lineage.outcomes,
            effective_method: ctx.effective_method(),
            tested_at,
        })
    }

    /// Gestate `genome` at `depth`
    ///
    /// Returns the offspring and the cycles spent when the depth divided.
    #[instrument(level = "debug", skip(self, ctx, genome, lineage, trace))]
    fn test_depth(
        &self,
        ctx: &mut ExecutionContext,
        genome: &Genome,
        depth: usize,
        lineage: &mut Lineage,
        mut trace: Option<&mut dyn Write>,
    ) -> Result<Option<(Genome, u64)>> {
        ctx.reset_inputs();
        let mut cpu = VirtualCpu::new(
            genome.clone(),
            self.environment.clone(),
            self.config.base_merit,
            self.config.min_copied_fraction,
        )?;
        let limit = self.config.gestation_limit(genome.len());

        let mut iface = TestCpuInterface::new(ctx, depth);
        let mut cycles = 0u64;
        let outcome = loop {
            if cycles >= limit {
                break DepthOutcome::Died(DeathCause::CycleLimit);
            }
            iface.advance(cycles);
            if let Some(out) = trace.as_deref_mut() {
                write_trace_line(out, depth, cycles, &cpu, &iface)?;
            }
            let step = cpu.single_process(&mut iface);
            cycles += 1;
            match step {
                StepOutcome::Continue => {}
                StepOutcome::Divided => break DepthOutcome::Divided,
                StepOutcome::Died => break DepthOutcome::Died(DeathCause::Fatal),
            }
        };
        let final_resources = iface.resources();
        let state = iface.into_state();
        lineage.outcomes.push(outcome);

        if !outcome.is_divided() {
            debug!(?outcome, cycles, "Gestation failed");
            return Ok(None);
        }
        let summary = state
            .divide
            .ok_or_else(|| AvidaError::Internal("divide completed without a summary".into()))?;

        let merit = state.merit.unwrap_or(summary.merit);
        let fitness = if summary.gestation_time > 0 {
            merit / summary.gestation_time as f64
        } else {
            0.0
        };
        debug!(merit, fitness, gestation = summary.gestation_time, "Gestation divided");

        let offspring = summary.offspring.clone();
        lineage.records.push(PhenotypeRecord {
            depth,
            merit,
            fitness,
            gestation_time: summary.gestation_time,
            copied_size: summary.copied_size,
            executed_size: summary.executed_size,
            genome_length: summary.genome_length,
            task_counts: summary.task_counts,
            bonus: summary.bonus,
            copy_true: summary.offspring == *genome,
            offspring: summary.offspring,
            final_resources,
        });

        Ok(Some((offspring, cycles)))
    }
}

fn write_trace_line(
    out: &mut dyn Write,
    depth: usize,
    cycle: u64,
    cpu: &VirtualCpu,
    iface: &TestCpuInterface<'_>,
) -> Result<()> {
    let [a, b, c] = cpu.registers();
    writeln!(
        out,
        "{}:{:>5} ip={:<3} {:<16} a={} b={} c={} res={}",
        depth,
        cycle,
        cpu.ip(),
        cpu.current_instruction().to_string(),
        a,
        b,
        c,
        iface.resources()
    )?;
    Ok(())
}
