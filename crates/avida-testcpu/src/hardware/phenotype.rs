//! Per-organism phenotype counters

use avida_common::{Genome, ReactionProcess};
use serde::{Deserialize, Serialize};

use crate::config::BaseMerit;

/// Counters of one completed gestation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestationSummary {
    pub gestation_time: u64,
    pub copied_size: usize,
    pub executed_size: usize,
    pub genome_length: usize,
    pub task_counts: Vec<u32>,
    pub bonus: f64,
    pub merit: f64,
    pub offspring: Genome,
}

/// Phenotype of an executing organism
///
/// Holds the counters of the gestation in progress. `divide_reset` folds them
/// into a [`GestationSummary`] and starts the next gestation from zero.
#[derive(Debug, Clone)]
pub struct Phenotype {
    base_merit: BaseMerit,
    genome_length: usize,
    cycles: u64,
    executed: Vec<bool>,
    copied_size: usize,
    task_counts: Vec<u32>,
    bonus: f64,
    to_die: bool,
    num_divides: u32,
    last: Option<GestationSummary>,
}

impl Phenotype {
    pub fn new(base_merit: BaseMerit, genome_length: usize, reaction_count: usize) -> Self {
        Self {
            base_merit,
            genome_length,
            cycles: 0,
            executed: vec![false; genome_length],
            copied_size: 0,
            task_counts: vec![0; reaction_count],
            bonus: 1.0,
            to_die: false,
            num_divides: 0,
            last: None,
        }
    }

    /// Count one executed cycle at instruction `ip`
    pub fn tick(&mut self, ip: usize) {
        self.cycles += 1;
        if let Some(flag) = self.executed.get_mut(ip) {
            *flag = true;
        }
    }

    /// Cycles of the current gestation
    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Distinct genome positions executed this gestation
    pub fn executed_size(&self) -> usize {
        self.executed.iter().filter(|e| **e).count()
    }

    pub fn add_copied(&mut self) {
        self.copied_size += 1;
    }

    #[inline]
    pub fn copied_size(&self) -> usize {
        self.copied_size
    }

    /// Count a completion of reaction `index`
    ///
    /// Returns true while the completion is still rewarded (`max_count` not
    /// yet reached this gestation).
    pub fn record_task(&mut self, index: usize, max_count: u32) -> bool {
        match self.task_counts.get_mut(index) {
            Some(count) => {
                *count += 1;
                *count <= max_count
            }
            None => false,
        }
    }

    /// Fold a reaction reward into the bonus
    pub fn apply_reward(&mut self, process: ReactionProcess, value: f64) {
        self.bonus = process.apply(self.bonus, value);
    }

    #[inline]
    pub fn bonus(&self) -> f64 {
        self.bonus
    }

    pub fn task_counts(&self) -> &[u32] {
        &self.task_counts
    }

    /// Merit the current gestation would earn if it divided now
    pub fn projected_merit(&self) -> f64 {
        self.base_merit
            .compute(self.copied_size, self.executed_size(), self.genome_length)
            * self.bonus
    }

    pub fn set_to_die(&mut self) {
        self.to_die = true;
    }

    #[inline]
    pub fn to_die(&self) -> bool {
        self.to_die
    }

    #[inline]
    pub fn num_divides(&self) -> u32 {
        self.num_divides
    }

    /// Close the current gestation and start a new one
    pub fn divide_reset(&mut self, offspring: &Genome) -> &GestationSummary {
        let reactions = self.task_counts.len();
        let summary = GestationSummary {
            gestation_time: self.cycles,
            copied_size: self.copied_size,
            executed_size: self.executed_size(),
            genome_length: self.genome_length,
            task_counts: std::mem::replace(&mut self.task_counts, vec![0; reactions]),
            bonus: self.bonus,
            merit: self.projected_merit(),
            offspring: offspring.clone(),
        };

        self.cycles = 0;
        self.executed.iter_mut().for_each(|e| *e = false);
        self.copied_size = 0;
        self.bonus = 1.0;
        self.num_divides += 1;
        self.last.insert(summary)
    }

    /// Summary of the most recent completed gestation
    pub fn last_gestation(&self) -> Option<&GestationSummary> {
        self.last.as_ref()
    }

    /// Merit earned by the most recent gestation (0 before any divide)
    pub fn last_merit(&self) -> f64 {
        self.last.as_ref().map_or(0.0, |s| s.merit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executed_size_counts_distinct_positions() {
        let mut p = Phenotype::new(BaseMerit::LeastSize, 4, 0);
        p.tick(0);
        p.tick(1);
        p.tick(1);
        assert_eq!(p.cycles(), 3);
        assert_eq!(p.executed_size(), 2);
    }

    #[test]
    fn test_task_reward_capped_by_max_count() {
        let mut p = Phenotype::new(BaseMerit::Const, 1, 2);
        assert!(p.record_task(1, 1));
        assert!(!p.record_task(1, 1));
        assert_eq!(p.task_counts(), &[0, 2]);
        assert!(!p.record_task(5, 1));
    }

    #[test]
    fn test_divide_reset_moves_counters() {
        let genome: Genome = "nop\nnop\n".parse().unwrap();
        let mut p = Phenotype::new(BaseMerit::CopiedSize, 2, 1);
        p.tick(0);
        p.tick(1);
        p.add_copied();
        p.add_copied();
        p.record_task(0, 1);
        p.apply_reward(ReactionProcess::Pow, 1.0);

        let summary = p.divide_reset(&genome).clone();
        assert_eq!(summary.gestation_time, 2);
        assert_eq!(summary.merit, 4.0);
        assert_eq!(summary.task_counts, vec![1]);

        assert_eq!(p.cycles(), 0);
        assert_eq!(p.copied_size(), 0);
        assert_eq!(p.bonus(), 1.0);
        assert_eq!(p.task_counts(), &[0]);
        assert_eq!(p.num_divides(), 1);
        assert_eq!(p.last_merit(), 4.0);
    }
}
