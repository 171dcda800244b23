//! Genotype - a group of organisms sharing one genome

use serde::{Deserialize, Serialize};

use super::genome::Genome;

/// Named bio group tracked by the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genotype {
    /// Population-assigned identifier
    pub id: u64,
    /// Human-readable name (e.g. `100-aaaab`)
    pub name: String,
    /// Shared genome
    pub genome: Genome,
    /// Organisms currently carrying this genome
    pub num_units: u64,
    /// Update the genotype first appeared
    pub update_born: u64,
    /// Phylogenetic depth
    pub depth: u64,
}

impl Genotype {
    /// Create a genotype with a length-derived name (`<len>-<id as letters>`)
    pub fn new(id: u64, genome: Genome, update_born: u64) -> Self {
        let name = format!("{:03}-{}", genome.len(), Self::letters(id));
        Self {
            id,
            name,
            genome,
            num_units: 1,
            update_born,
            depth: 0,
        }
    }

    fn letters(mut id: u64) -> String {
        let mut out = [b'a'; 5];
        for slot in out.iter_mut().rev() {
            *slot = b'a' + (id % 26) as u8;
            id /= 26;
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
