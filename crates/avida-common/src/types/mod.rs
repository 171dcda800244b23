//! Core data types for the Avida engine

pub mod environment;
pub mod genome;
pub mod genotype;
pub mod instruction;
pub mod phenotype;
pub mod resource;
