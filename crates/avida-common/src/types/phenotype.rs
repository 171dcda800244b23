//! Phenotype records produced by gestation tests

use serde::{Deserialize, Serialize};

use super::genome::Genome;
use super::resource::ResourceLevels;

/// Why a gestation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeathCause {
    /// No divide before the gestation cycle bound
    CycleLimit,
    /// An instruction signaled a fatal halt
    Fatal,
}

/// Terminal state of one depth of a lineage test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "cause")]
pub enum DepthOutcome {
    Divided,
    Died(DeathCause),
}

impl DepthOutcome {
    /// Check if gestation succeeded
    #[inline]
    pub fn is_divided(&self) -> bool {
        matches!(self, DepthOutcome::Divided)
    }
}

/// Phenotype captured at a successful divide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeRecord {
    /// Lineage depth (0 = tested genome)
    pub depth: usize,
    /// Merit = base merit × bonus (or the last merit pushed by the organism)
    pub merit: f64,
    /// merit / gestation_time
    pub fitness: f64,
    /// CPU cycles from birth to divide
    pub gestation_time: u64,
    /// Instructions copied into the offspring
    pub copied_size: usize,
    /// Distinct genome positions executed
    pub executed_size: usize,
    /// Length of the genome tested at this depth
    pub genome_length: usize,
    /// Completions per task, in environment reaction order
    pub task_counts: Vec<u32>,
    /// Accumulated reaction bonus
    pub bonus: f64,
    /// Offspring genome produced by the divide
    pub offspring: Genome,
    /// Offspring identical to the parent
    pub copy_true: bool,
    /// Ambient resource levels at the divide
    pub final_resources: ResourceLevels,
}

impl PhenotypeRecord {
    /// Number of distinct tasks completed at least once
    pub fn tasks_done(&self) -> usize {
        self.task_counts.iter().filter(|c| **c > 0).count()
    }
}
