//! Virtual CPU hardware and phenotype

pub mod cpu;
pub mod phenotype;

pub use cpu::{StepOutcome, VirtualCpu};
pub use phenotype::{GestationSummary, Phenotype};
