//! # Avida Test CPU
//!
//! Sandboxed gestation testing: run a genome to its first divide (or death)
//! without touching the live population, and report its phenotype.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │   TestCpu   │──▶│ ExecutionContext │──▶│   ResourceBank   │
//! │  (driver)   │   │ inputs, receive  │   │ ambient/cell/... │
//! └──────┬──────┘   └────────▲─────────┘   └──────────────────┘
//!        │                   │
//!        ▼                   │
//! ┌─────────────┐   ┌────────┴─────────┐
//! │ VirtualCpu  │──▶│ TestCpuInterface │
//! │ (hardware)  │   │ (OrganismIface)  │
//! └─────────────┘   └──────────────────┘
//! ```
//!
//! Each `test_genome` call owns its execution context, so a single
//! [`TestCpu`] can be shared across threads.

pub mod birth;
pub mod cache;
pub mod config;
pub mod context;
pub mod driver;
pub mod hardware;
pub mod interface;

pub use birth::{evaluate_offspring, BirthAssessment, BirthPolicy, BirthVerdict, MutationEffect};
pub use cache::{CacheStats, TestResultCache};
pub use config::{BaseMerit, TestCpuConfig, TestSettings};
pub use context::ExecutionContext;
pub use driver::{print_bio_group, print_genome, TestCpu, TestReport};
pub use hardware::{GestationSummary, Phenotype, StepOutcome, VirtualCpu};
pub use interface::{AvatarId, OrganismId, OrganismInterface, TestCpuInterface};
