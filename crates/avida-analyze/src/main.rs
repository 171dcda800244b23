//! Avida analyze
//!
//! Runs sandboxed gestation tests on genome files and prints the results.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use avida_common::{Environment, Genome, Genotype};
use avida_resources::{AccountingMethod, ResourceHistory};
use avida_testcpu::{
    print_bio_group, print_genome, TestCpu, TestCpuConfig, TestResultCache, TestSettings,
};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Environment JSON (defaults to logic-nine without resources)
    #[clap(long, global = true)]
    environment: Option<PathBuf>,

    /// Resource history JSON for historical and exact accounting
    #[clap(long, global = true)]
    history: Option<PathBuf>,

    /// Configuration file; otherwise `.env` and AVIDA_* variables are used
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct SettingsArgs {
    /// Resource accounting method (fresh, historical, exact)
    #[clap(long)]
    method: Option<AccountingMethod>,

    /// Update to replay resources from
    #[clap(long, default_value_t = 0)]
    update: u64,

    /// CPU cycles already elapsed within the update
    #[clap(long, default_value_t = 0)]
    offset: u64,

    /// Generations to test
    #[clap(long)]
    generations: Option<usize>,

    /// Use random inputs drawn from this seed
    #[clap(long)]
    seed: Option<u64>,
}

impl SettingsArgs {
    fn resolve(&self, config: &TestCpuConfig) -> TestSettings {
        let mut settings = config.default_settings().at_update(
            self.method.unwrap_or(config.method),
            self.update,
            self.offset,
        );
        if let Some(n) = self.generations {
            settings = settings.with_generations(n);
        }
        if let Some(seed) = self.seed {
            settings = settings.with_random_inputs(seed);
        }
        settings
    }
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Test a genome and print the report as JSON
    Test {
        genome: PathBuf,
        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Test a genome and print its per-cycle execution trace
    Trace {
        genome: PathBuf,
        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Write a diagnostic dump of a genome to a file
    Print {
        genome: PathBuf,
        /// Output file
        #[clap(long)]
        out: PathBuf,
        /// Genotype id to label the dump with
        #[clap(long)]
        genotype_id: Option<u64>,
        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Test many genomes concurrently and print a JSON summary
    Batch {
        genomes: Vec<PathBuf>,
        /// Worker threads
        #[clap(long, default_value_t = 4)]
        threads: usize,
        #[clap(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    path: PathBuf,
    passed: bool,
    fitness: f64,
    depth_found: usize,
    error: Option<String>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    info!("Starting avida-analyze v{}", avida_common::VERSION);

    let config = match &args.config {
        Some(path) => TestCpuConfig::from_file(path)?,
        None => TestCpuConfig::load()?,
    };
    let cpu = build_cpu(&args, config)?;

    match args.cmd {
        Command::Test { genome, settings } => {
            let genome = read_genome(&genome)?;
            let report = cpu.test_genome(&genome, &settings.resolve(cpu.config()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Trace { genome, settings } => {
            let genome = read_genome(&genome)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let report =
                cpu.test_genome_traced(&genome, &settings.resolve(cpu.config()), &mut out)?;
            out.flush()?;
            info!(passed = report.passed, depths = report.outcomes.len(), "Trace complete");
        }
        Command::Print {
            genome: path,
            out,
            genotype_id,
            settings,
        } => {
            let genome = read_genome(&path)?;
            let settings = settings.resolve(cpu.config());
            let report = match genotype_id {
                Some(id) => {
                    let genotype = Genotype::new(id, genome, settings.update);
                    print_bio_group(&cpu, &genotype, &settings, &out, settings.update)?
                }
                None => print_genome(&cpu, &genome, &settings, &out, settings.update)?,
            };
            info!(path = %out.display(), passed = report.passed, "Dump written");
        }
        Command::Batch {
            genomes,
            threads,
            settings,
        } => {
            let settings = settings.resolve(cpu.config());
            let entries = run_batch(&cpu, &genomes, &settings, threads.max(1));
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

fn build_cpu(args: &Args, config: TestCpuConfig) -> Result<TestCpu> {
    let environment = match &args.environment {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading environment {}", path.display()))?;
            Environment::from_json(&text)?
        }
        None => Environment::logic_nine(),
    };

    let mut cpu = TestCpu::new(config, environment)?;
    if let Some(path) = &args.history {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading history {}", path.display()))?;
        let history = ResourceHistory::from_json(&text)?;
        info!(snapshots = history.len(), "Loaded resource history");
        cpu = cpu.with_history(Arc::new(history));
    }
    Ok(cpu)
}

fn read_genome(path: &Path) -> Result<Genome> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading genome {}", path.display()))?;
    let genome = text
        .parse::<Genome>()
        .with_context(|| format!("parsing genome {}", path.display()))?;
    Ok(genome)
}

fn run_batch(
    cpu: &TestCpu,
    paths: &[PathBuf],
    settings: &TestSettings,
    threads: usize,
) -> Vec<BatchEntry> {
    let cache = TestResultCache::new();
    let chunk = paths.len().div_ceil(threads).max(1);

    let mut entries: Vec<BatchEntry> = std::thread::scope(|s| {
        let workers: Vec<_> = paths
            .chunks(chunk)
            .map(|chunk| {
                let cache = &cache;
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|path| batch_entry(cpu, cache, path, settings))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap_or_default())
            .collect()
    });

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let stats = cache.stats();
    info!(
        genomes = paths.len(),
        hits = stats.hits,
        misses = stats.misses,
        "Batch complete"
    );
    entries
}

fn batch_entry(
    cpu: &TestCpu,
    cache: &TestResultCache,
    path: &Path,
    settings: &TestSettings,
) -> BatchEntry {
    let result = read_genome(path).and_then(|genome| {
        cache
            .get_or_test(cpu, &genome, settings)
            .map_err(anyhow::Error::from)
    });
    match result {
        Ok(report) => BatchEntry {
            path: path.to_path_buf(),
            passed: report.passed,
            fitness: report.fitness(),
            depth_found: report.depth_found,
            error: None,
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Genome test failed");
            BatchEntry {
                path: path.to_path_buf(),
                passed: false,
                fitness: 0.0,
                depth_found: 0,
                error: Some(format!("{:#}", e)),
            }
        }
    }
}
