//! Error types for the Avida engine
//!
//! Provides a unified error type and domain-specific error variants. Expected
//! biological outcomes (death, depth limits, resource underflow) are never
//! errors; they are reported through test results.

use thiserror::Error;

/// Result type alias using AvidaError
pub type Result<T> = std::result::Result<T, AvidaError>;

/// Unified error type for Avida operations
#[derive(Debug, Error)]
pub enum AvidaError {
    // Genome parsing errors
    #[error("Genome error: {0}")]
    Genome(#[from] GenomeError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Resource accounting errors
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    // Test CPU precondition violations
    #[error("Test CPU error: {0}")]
    TestCpu(#[from] TestCpuError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Genome text parsing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenomeError {
    #[error("Unknown instruction '{token}' on line {line}")]
    UnknownInstruction { line: usize, token: String },

    #[error("Instruction '{mnemonic}' on line {line} expects {expected} operand(s), got {actual}")]
    OperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid operand '{operand}' on line {line}")]
    InvalidOperand { line: usize, operand: String },
}

/// Configuration and world-setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Historical resource series required for {method} accounting but none usable at update {update}")]
    MissingHistory { method: String, update: u64 },

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Config source error: {0}")]
    Source(String),
}

/// Resource accounting errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource vector length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("History updates must be strictly increasing: {update} after {last}")]
    OutOfOrderUpdate { update: u64, last: u64 },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}

/// Test CPU precondition violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TestCpuError {
    #[error("Cannot test an empty genome")]
    EmptyGenome,

    #[error("Generation tests must be at least 1")]
    ZeroDepth,

    #[error("Cycles per update must be positive")]
    ZeroCyclesPerUpdate,

    #[error("Generation tests {requested} exceed the maximum of {max}")]
    TooManyGenerations { requested: usize, max: usize },
}

// Implement From for common external error types
impl From<serde_json::Error> for AvidaError {
    fn from(err: serde_json::Error) -> Self {
        AvidaError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AvidaError {
    fn from(err: std::io::Error) -> Self {
        AvidaError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for AvidaError {
    fn from(err: anyhow::Error) -> Self {
        AvidaError::Internal(err.to_string())
    }
}
