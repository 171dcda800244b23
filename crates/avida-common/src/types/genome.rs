//! Genome - immutable instruction sequence
//!
//! A genome is the program one organism's virtual CPU executes. Its text form
//! is one instruction per line; `#` starts a comment and blank lines are
//! ignored. The BLAKE3 fingerprint of the canonical text identifies a genome
//! in caches and diagnostic dumps.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::instruction::Instruction;
use crate::error::GenomeError;

/// BLAKE3 digest of a genome's canonical text form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeHash(pub [u8; 32]);

impl GenomeHash {
    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for GenomeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Immutable ordered instruction sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Genome {
    instructions: Arc<[Instruction]>,
}

impl Genome {
    /// Create a genome from instructions
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Number of instructions
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the genome has no instructions
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at a position (no wrapping)
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Borrow all instructions
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterate instructions in order
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// BLAKE3 fingerprint of the canonical text form
    pub fn fingerprint(&self) -> GenomeHash {
        GenomeHash(*blake3::hash(self.to_string().as_bytes()).as_bytes())
    }
}

impl FromStr for Genome {
    type Err = GenomeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut instructions = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            instructions.push(Instruction::parse_line(line, idx + 1)?);
        }
        Ok(Self::new(instructions))
    }
}

impl TryFrom<String> for Genome {
    type Error = GenomeError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Genome> for String {
    fn from(genome: Genome) -> Self {
        genome.to_string()
    }
}

impl std::fmt::Display for Genome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for inst in self.instructions.iter() {
            writeln!(f, "{}", inst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLICATOR: &str = "\
# simple replicator
collect 0 30
h-copy
if-n-copied
jump -2   # loop until copied
divide
";

    #[test]
    fn test_parse_with_comments() {
        let genome: Genome = REPLICATOR.parse().unwrap();
        assert_eq!(genome.len(), 5);
        assert_eq!(genome.get(4), Some(&Instruction::Divide));
    }

    #[test]
    fn test_error_reports_source_line() {
        let err = "nop\n\nwarp 3\n".parse::<Genome>().unwrap_err();
        assert!(matches!(err, GenomeError::UnknownInstruction { line: 3, .. }));
    }

    #[test]
    fn test_fingerprint_ignores_comments() {
        let a: Genome = REPLICATOR.parse().unwrap();
        let b: Genome = "collect 0 30\nh-copy\nif-n-copied\njump -2\ndivide\n".parse().unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().to_hex().len(), 64);
    }

    #[test]
    fn test_serde_as_text() {
        let genome: Genome = "inc a\ndivide".parse().unwrap();
        let json = serde_json::to_string(&genome).unwrap();
        assert_eq!(json, "\"inc a\\ndivide\\n\"");
        let back: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, genome);
    }
}
