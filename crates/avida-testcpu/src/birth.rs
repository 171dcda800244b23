//! Birth outcome classification
//!
//! Offspring are tested in the sandbox and compared with their parent. The
//! resulting [`MutationEffect`] drives an optional revert/sterilize policy.

use avida_common::{Genome, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::TestResultCache;
use crate::config::TestSettings;
use crate::driver::{TestCpu, TestReport};

/// Fitness effect of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationEffect {
    Lethal,
    Detrimental,
    Neutral,
    Beneficial,
}

impl MutationEffect {
    /// Classify a child against its parent's fitness
    ///
    /// A non-viable child is lethal. Otherwise the fitness ratio
    /// `child / parent` is compared with the neutral band
    /// `[neutral_min, neutral_max]`.
    pub fn classify(
        parent_fitness: f64,
        child: &TestReport,
        neutral_min: f64,
        neutral_max: f64,
    ) -> Self {
        if !child.is_viable {
            return MutationEffect::Lethal;
        }
        let child_fitness = child.fitness();
        if parent_fitness <= 0.0 {
            return if child_fitness > 0.0 {
                MutationEffect::Beneficial
            } else {
                MutationEffect::Neutral
            };
        }
        let ratio = child_fitness / parent_fitness;
        if ratio < neutral_min {
            MutationEffect::Detrimental
        } else if ratio > neutral_max {
            MutationEffect::Beneficial
        } else {
            MutationEffect::Neutral
        }
    }
}

/// What to do with a newborn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BirthVerdict {
    /// Keep the offspring as born
    Accept,
    /// Replace the offspring genome with the parent's
    Revert,
    /// Keep the offspring but prevent it from reproducing
    Sterilize,
}

/// Revert and sterilize probabilities per mutation effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirthPolicy {
    pub revert_fatal: f64,
    pub revert_detrimental: f64,
    pub revert_neutral: f64,
    pub revert_beneficial: f64,
    pub sterilize_fatal: f64,
    pub sterilize_detrimental: f64,
    pub sterilize_neutral: f64,
    pub sterilize_beneficial: f64,
    /// Lower bound of the neutral fitness ratio band
    pub neutral_min: f64,
    /// Upper bound of the neutral fitness ratio band
    pub neutral_max: f64,
}

impl Default for BirthPolicy {
    fn default() -> Self {
        Self {
            revert_fatal: 0.0,
            revert_detrimental: 0.0,
            revert_neutral: 0.0,
            revert_beneficial: 0.0,
            sterilize_fatal: 0.0,
            sterilize_detrimental: 0.0,
            sterilize_neutral: 0.0,
            sterilize_beneficial: 0.0,
            neutral_min: 1.0,
            neutral_max: 1.0,
        }
    }
}

impl BirthPolicy {
    /// Check whether any probability is set, i.e. offspring need testing
    pub fn is_active(&self) -> bool {
        [
            self.revert_fatal,
            self.revert_detrimental,
            self.revert_neutral,
            self.revert_beneficial,
            self.sterilize_fatal,
            self.sterilize_detrimental,
            self.sterilize_neutral,
            self.sterilize_beneficial,
        ]
        .iter()
        .any(|p| *p > 0.0)
    }

    /// Draw a verdict for `effect`; revert is checked before sterilize
    pub fn decide<R: Rng + ?Sized>(&self, effect: MutationEffect, rng: &mut R) -> BirthVerdict {
        let (revert, sterilize) = match effect {
            MutationEffect::Lethal => (self.revert_fatal, self.sterilize_fatal),
            MutationEffect::Detrimental => (self.revert_detrimental, self.sterilize_detrimental),
            MutationEffect::Neutral => (self.revert_neutral, self.sterilize_neutral),
            MutationEffect::Beneficial => (self.revert_beneficial, self.sterilize_beneficial),
        };
        if revert > 0.0 && rng.gen_bool(revert.min(1.0)) {
            BirthVerdict::Revert
        } else if sterilize > 0.0 && rng.gen_bool(sterilize.min(1.0)) {
            BirthVerdict::Sterilize
        } else {
            BirthVerdict::Accept
        }
    }
}

/// Classification of one offspring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BirthAssessment {
    pub parent_fitness: f64,
    pub child_fitness: f64,
    pub effect: MutationEffect,
    pub verdict: BirthVerdict,
}

/// Test parent and child (through `cache`) and decide the child's fate
pub fn evaluate_offspring<R: Rng + ?Sized>(
    cpu: &TestCpu,
    cache: &TestResultCache,
    parent: &Genome,
    child: &Genome,
    settings: &TestSettings,
    policy: &BirthPolicy,
    rng: &mut R,
) -> Result<BirthAssessment> {
    let parent_report = cache.get_or_test(cpu, parent, settings)?;
    let child_report = cache.get_or_test(cpu, child, settings)?;

    let parent_fitness = parent_report.fitness();
    let effect = MutationEffect::classify(
        parent_fitness,
        &child_report,
        policy.neutral_min,
        policy.neutral_max,
    );
    let verdict = policy.decide(effect, rng);
    debug!(?effect, ?verdict, "Offspring classified");

    Ok(BirthAssessment {
        parent_fitness,
        child_fitness: child_report.fitness(),
        effect,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use avida_common::{Environment, ResourceDef};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::TestCpuConfig;

    const PARENT: &str = "h-copy\nif-n-copied\njump -2\ndivide\n";

    fn tester() -> TestCpu {
        let env = Environment::logic_nine().with_resource(ResourceDef::new("glucose", 100.0));
        TestCpu::new(TestCpuConfig::default(), env).unwrap()
    }

    #[test]
    fn test_identical_child_is_neutral() {
        let cpu = tester();
        let cache = TestResultCache::new();
        let genome: Genome = PARENT.parse().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let assessment = evaluate_offspring(
            &cpu,
            &cache,
            &genome,
            &genome,
            &TestSettings::default(),
            &BirthPolicy::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(assessment.effect, MutationEffect::Neutral);
        assert_eq!(assessment.verdict, BirthVerdict::Accept);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_broken_child_is_lethal_and_reverted() {
        let cpu = tester();
        let cache = TestResultCache::new();
        let parent: Genome = PARENT.parse().unwrap();
        let child: Genome = "h-copy\nif-n-copied\njump -2\nnop\n".parse().unwrap();
        let policy = BirthPolicy {
            revert_fatal: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let assessment = evaluate_offspring(
            &cpu,
            &cache,
            &parent,
            &child,
            &TestSettings::default(),
            &policy,
            &mut rng,
        )
        .unwrap();
        assert_eq!(assessment.effect, MutationEffect::Lethal);
        assert_eq!(assessment.verdict, BirthVerdict::Revert);
        assert_eq!(assessment.child_fitness, 0.0);
    }

    #[test]
    fn test_inactive_policy_accepts() {
        let policy = BirthPolicy::default();
        assert!(!policy.is_active());
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(
            policy.decide(MutationEffect::Lethal, &mut rng),
            BirthVerdict::Accept
        );
    }

    #[test]
    fn test_certain_sterilize() {
        let policy = BirthPolicy {
            sterilize_beneficial: 1.0,
            ..Default::default()
        };
        assert!(policy.is_active());
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(
            policy.decide(MutationEffect::Beneficial, &mut rng),
            BirthVerdict::Sterilize
        );
    }
}
