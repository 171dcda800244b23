//! # Avida Common
//!
//! Shared types, errors, and genome primitives for the Avida test-CPU engine.
//!
//! ## Core Types
//!
//! - [`Genome`]: immutable instruction sequence executed by the virtual CPU
//! - [`Instruction`]: one virtual-CPU instruction (text form: one per line)
//! - [`ResourceDef`]/[`ResourceLevels`]: resource definitions and quantity vectors
//! - [`Environment`]: ordered resource list plus the reaction (task) table
//! - [`PhenotypeRecord`]: per-depth result of a gestation test
//! - [`Genotype`]: a named group of organisms sharing one genome
//!
//! ## Errors
//!
//! - [`error::AvidaError`]: unified error type with domain sub-enums

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{AvidaError, ConfigError, GenomeError, ResourceError, Result, TestCpuError};
pub use types::{
    environment::{Environment, Reaction, ReactionProcess, ReactionResource, Task},
    genome::{Genome, GenomeHash},
    genotype::Genotype,
    instruction::{Instruction, Register},
    phenotype::{DeathCause, DepthOutcome, PhenotypeRecord},
    resource::{ResourceDef, ResourceGeometry, ResourceLevels, ResourceScope},
};

/// Avida engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gestation cycle budget per genome instruction
pub const TEST_CPU_TIME_MOD: u64 = 20;

/// Default number of generations tested by the test CPU
pub const DEFAULT_GENERATION_TESTS: usize = 3;

/// Upper bound on generations tested in one call
pub const MAX_GENERATION_TESTS: usize = 256;

/// Average CPU cycles per organism per update
pub const DEFAULT_CYCLES_PER_UPDATE: u64 = 30;

/// Fixed environment inputs used when random inputs are disabled
pub const FIXED_INPUTS: [i32; 3] = [0x0f13149f, 0x3308e53e, 0x556241eb];

/// High-byte markers for randomly drawn inputs
pub const RANDOM_INPUT_MARKERS: [i32; 3] = [15, 51, 85];

/// Size of the pre-seeded receive buffer
pub const RECEIVE_BUFFER_SIZE: usize = 3;

/// Number of recent inputs remembered for task detection
pub const INPUT_BUFFER_SIZE: usize = 3;

/// Minimum fraction of the genome copied before a divide is allowed
pub const DEFAULT_MIN_COPIED_FRACTION: f64 = 0.5;
