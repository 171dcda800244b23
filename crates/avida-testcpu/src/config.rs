//! Test CPU configuration

use std::path::Path;

use avida_common::{ConfigError, TestCpuError, MAX_GENERATION_TESTS};
use avida_resources::AccountingMethod;
use serde::{Deserialize, Serialize};

/// How base merit is derived from a gestation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseMerit {
    /// Constant base merit of 100
    Const,
    /// Instructions copied into the offspring
    CopiedSize,
    /// Distinct genome positions executed
    ExecutedSize,
    /// Length of the parent genome
    GenomeLength,
    /// Smaller of copied and executed size
    #[default]
    LeastSize,
}

impl BaseMerit {
    /// Base merit of one gestation
    pub fn compute(&self, copied: usize, executed: usize, genome_length: usize) -> f64 {
        match self {
            BaseMerit::Const => 100.0,
            BaseMerit::CopiedSize => copied as f64,
            BaseMerit::ExecutedSize => executed as f64,
            BaseMerit::GenomeLength => genome_length as f64,
            BaseMerit::LeastSize => copied.min(executed) as f64,
        }
    }
}

/// Engine-wide test CPU configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCpuConfig {
    /// Gestation cycle budget per genome instruction
    pub time_mod: u64,
    /// Explicit gestation cycle bound (overrides `time_mod`)
    pub max_gestation_cycles: Option<u64>,
    /// Generations tested (maximum lineage depth)
    pub generation_tests: usize,
    /// CPU cycles per simulated update
    pub cycles_per_update: u64,
    /// Draw random environment inputs instead of the fixed vector
    pub use_random_inputs: bool,
    /// Fraction of the genome that must be copied before a divide
    pub min_copied_fraction: f64,
    /// Base merit method
    pub base_merit: BaseMerit,
    /// Treat unusable resource history as an error instead of falling back
    pub strict_history: bool,
    /// Default accounting method
    pub method: AccountingMethod,
    /// Default random seed for input generation
    pub seed: u64,
}

impl Default for TestCpuConfig {
    fn default() -> Self {
        Self {
            time_mod: avida_common::TEST_CPU_TIME_MOD,
            max_gestation_cycles: None,
            generation_tests: avida_common::DEFAULT_GENERATION_TESTS,
            cycles_per_update: avida_common::DEFAULT_CYCLES_PER_UPDATE,
            use_random_inputs: false,
            min_copied_fraction: avida_common::DEFAULT_MIN_COPIED_FRACTION,
            base_merit: BaseMerit::default(),
            strict_history: false,
            method: AccountingMethod::Fresh,
            seed: 0,
        }
    }
}

impl TestCpuConfig {
    /// Load configuration from `.env` and `AVIDA_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Some(v) = env_parse("AVIDA_TIME_MOD")? {
            cfg.time_mod = v;
        }
        if let Some(v) = env_parse("AVIDA_MAX_GESTATION_CYCLES")? {
            cfg.max_gestation_cycles = Some(v);
        }
        if let Some(v) = env_parse("AVIDA_GENERATION_TESTS")? {
            cfg.generation_tests = v;
        }
        if let Some(v) = env_parse("AVIDA_CYCLES_PER_UPDATE")? {
            cfg.cycles_per_update = v;
        }
        if let Some(v) = env_parse("AVIDA_USE_RANDOM_INPUTS")? {
            cfg.use_random_inputs = v;
        }
        if let Some(v) = env_parse("AVIDA_MIN_COPIED_FRACTION")? {
            cfg.min_copied_fraction = v;
        }
        if let Some(v) = env_parse("AVIDA_STRICT_HISTORY")? {
            cfg.strict_history = v;
        }
        if let Some(v) = env_parse("AVIDA_METHOD")? {
            cfg.method = v;
        }
        if let Some(v) = env_parse("AVIDA_SEED")? {
            cfg.seed = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a TOML/JSON/YAML file, with `AVIDA_*` variables layered on top
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("AVIDA").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_tests == 0 {
            return Err(invalid("generation_tests", TestCpuError::ZeroDepth));
        }
        if self.generation_tests > MAX_GENERATION_TESTS {
            return Err(invalid(
                "generation_tests",
                TestCpuError::TooManyGenerations {
                    requested: self.generation_tests,
                    max: MAX_GENERATION_TESTS,
                },
            ));
        }
        if self.cycles_per_update == 0 {
            return Err(invalid("cycles_per_update", TestCpuError::ZeroCyclesPerUpdate));
        }
        if self.time_mod == 0 && self.max_gestation_cycles.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "time_mod".into(),
                reason: "must be positive when no explicit cycle bound is set".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_copied_fraction) {
            return Err(ConfigError::InvalidValue {
                key: "min_copied_fraction".into(),
                reason: "must be within 0..=1".into(),
            });
        }
        Ok(())
    }

    /// Gestation cycle bound for a genome of `length` instructions
    pub fn gestation_limit(&self, length: usize) -> u64 {
        self.max_gestation_cycles
            .unwrap_or_else(|| self.time_mod.saturating_mul(length as u64))
    }

    /// Default per-call settings derived from this configuration
    pub fn default_settings(&self) -> TestSettings {
        TestSettings {
            method: self.method,
            update: 0,
            cycle_offset: 0,
            generation_tests: self.generation_tests,
            use_random_inputs: self.use_random_inputs,
            seed: self.seed,
            state_grid: 0,
        }
    }
}

fn invalid(key: &str, err: TestCpuError) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("cannot parse '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}

/// Per-call test settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestSettings {
    /// Resource accounting method
    pub method: AccountingMethod,
    /// Update replayed from (historical methods)
    pub update: u64,
    /// CPU cycles already elapsed within `update`
    pub cycle_offset: u64,
    /// Generations tested (maximum lineage depth)
    pub generation_tests: usize,
    /// Random vs fixed environment inputs
    pub use_random_inputs: bool,
    /// Seed of the context's random source
    pub seed: u64,
    /// State-grid identity reported to the organism
    pub state_grid: usize,
}

impl Default for TestSettings {
    fn default() -> Self {
        TestCpuConfig::default().default_settings()
    }
}

impl TestSettings {
    /// Replay from a historical update
    pub fn at_update(mut self, method: AccountingMethod, update: u64, cycle_offset: u64) -> Self {
        self.method = method;
        self.update = update;
        self.cycle_offset = cycle_offset;
        self
    }

    /// Set the maximum lineage depth
    pub fn with_generations(mut self, generation_tests: usize) -> Self {
        self.generation_tests = generation_tests;
        self
    }

    /// Use random inputs drawn from `seed`
    pub fn with_random_inputs(mut self, seed: u64) -> Self {
        self.use_random_inputs = true;
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = TestCpuConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.gestation_limit(50), 1000);
    }

    #[test]
    fn test_explicit_gestation_bound() {
        let cfg = TestCpuConfig {
            max_gestation_cycles: Some(64),
            ..Default::default()
        };
        assert_eq!(cfg.gestation_limit(50), 64);
    }

    #[test]
    fn test_zero_generations_rejected() {
        let cfg = TestCpuConfig {
            generation_tests: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_generation_tests_upper_bound() {
        let at_max = TestCpuConfig {
            generation_tests: MAX_GENERATION_TESTS,
            ..Default::default()
        };
        assert!(at_max.validate().is_ok());

        let over = TestCpuConfig {
            generation_tests: MAX_GENERATION_TESTS + 1,
            ..Default::default()
        };
        assert!(matches!(
            over.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "generation_tests"
        ));
    }

    #[test]
    fn test_base_merit_methods() {
        assert_eq!(BaseMerit::LeastSize.compute(10, 7, 12), 7.0);
        assert_eq!(BaseMerit::CopiedSize.compute(10, 7, 12), 10.0);
        assert_eq!(BaseMerit::GenomeLength.compute(10, 7, 12), 12.0);
        assert_eq!(BaseMerit::Const.compute(0, 0, 0), 100.0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testcpu.toml");
        std::fs::write(&path, "time_mod = 5\ngeneration_tests = 2\nmethod = \"historical\"\n").unwrap();
        let cfg = TestCpuConfig::from_file(&path).unwrap();
        assert_eq!(cfg.time_mod, 5);
        assert_eq!(cfg.generation_tests, 2);
        assert_eq!(cfg.method, AccountingMethod::Historical);
        assert_eq!(cfg.cycles_per_update, avida_common::DEFAULT_CYCLES_PER_UPDATE);
    }
}
