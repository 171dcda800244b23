//! Diagnostic genome dumps

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use avida_common::{Genome, Genotype, Result};
use chrono::Utc;
use tracing::info;

use super::{TestCpu, TestReport};
use crate::config::TestSettings;

/// Test `genome` and write its listing, phenotype and cycle trace to `path`
pub fn print_genome(
    cpu: &TestCpu,
    genome: &Genome,
    settings: &TestSettings,
    path: impl AsRef<Path>,
    update: u64,
) -> Result<TestReport> {
    write_dump(cpu, genome, None, settings, path.as_ref(), update)
}

/// Like [`print_genome`], with the genotype's identity in the header
pub fn print_bio_group(
    cpu: &TestCpu,
    genotype: &Genotype,
    settings: &TestSettings,
    path: impl AsRef<Path>,
    update: u64,
) -> Result<TestReport> {
    write_dump(cpu, &genotype.genome, Some(genotype), settings, path.as_ref(), update)
}

fn write_dump(
    cpu: &TestCpu,
    genome: &Genome,
    genotype: Option<&Genotype>,
    settings: &TestSettings,
    path: &Path,
    update: u64,
) -> Result<TestReport> {
    let mut trace = Vec::new();
    let report = cpu.test_genome_traced(genome, settings, &mut trace)?;

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# Avida genome dump")?;
    writeln!(out, "# generated: {}", Utc::now().to_rfc3339())?;
    writeln!(out, "# update: {}", update)?;
    if let Some(g) = genotype {
        writeln!(out, "# genotype: {} (id {}, born {})", g.name, g.id, g.update_born)?;
    }
    writeln!(out, "# fingerprint: {}", report.fingerprint)?;
    writeln!(out, "# length: {}", genome.len())?;
    writeln!(out, "# method: {}", report.effective_method)?;
    writeln!(out, "# viable: {}", report.is_viable)?;
    writeln!(out)?;

    for (i, inst) in genome.iter().enumerate() {
        writeln!(out, "{:>4}  {}", i, inst)?;
    }
    writeln!(out)?;

    let reactions = &cpu.environment().reactions;
    for (depth, outcome) in report.outcomes.iter().enumerate() {
        match report.record(depth) {
            Some(r) => {
                writeln!(
                    out,
                    "depth {}: divided  merit={:.3} fitness={:.5} gestation={} copied={} executed={} copy_true={}",
                    depth,
                    r.merit,
                    r.fitness,
                    r.gestation_time,
                    r.copied_size,
                    r.executed_size,
                    r.copy_true
                )?;
                let tasks: Vec<&str> = r
                    .task_counts
                    .iter()
                    .zip(reactions)
                    .filter(|(count, _)| **count > 0)
                    .map(|(_, reaction)| reaction.task.name())
                    .collect();
                let tasks = if tasks.is_empty() {
                    "-".to_string()
                } else {
                    tasks.join(" ")
                };
                writeln!(out, "  tasks: {}", tasks)?;
                writeln!(out, "  resources: {}", r.final_resources)?;
            }
            None => writeln!(out, "depth {}: {:?}", depth, outcome)?,
        }
    }
    writeln!(out)?;

    writeln!(out, "# trace: depth:cycle ip instruction registers resources")?;
    out.write_all(&trace)?;
    out.flush()?;

    info!(path = %path.display(), update, "Wrote genome dump");
    Ok(report)
}
