//! Times commit / generate / verify of the permutation-commitment proof for a
//! chosen size, group preset and compute backend.
//!
//! Proof-system parameters come from `ZK_MIXNET_*` variables (see
//! `zk_mixnet::config`); command-line flags override the backend.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zk_mixnet::config::{BackendKind, GroupParameters, ProofSystemConfig};
use zk_mixnet::{Permutation, PermutationCommitmentProofSystem};

const LOG_TARGET: &str = "bin::permutation_proof_bench";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupPreset {
    Toy,
    #[value(name = "256")]
    Bits256,
    #[value(name = "512")]
    Bits512,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendChoice {
    Sequential,
    Parallel,
}

#[derive(Debug, Parser)]
#[command(name = "permutation_proof_bench")]
#[command(about = "Benchmark the permutation commitment proof", long_about = None)]
struct Args {
    /// Number of permuted positions
    #[arg(long, short = 'n', default_value_t = 64)]
    size: usize,

    /// Group parameters to run over
    #[arg(long, value_enum, default_value_t = GroupPreset::Bits256)]
    group: GroupPreset,

    /// Compute backend; unset keeps the configured one
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// Worker threads for the parallel backend
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// RNG seed for permutations and prover randomness
    #[arg(long, env = "ZK_MIXNET_BENCH_SEED", default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bin::permutation_proof_bench=info,zk_mixnet=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }

    let parameters = match args.group {
        GroupPreset::Toy => GroupParameters::toy(),
        GroupPreset::Bits256 => GroupParameters::test_256(),
        GroupPreset::Bits512 => GroupParameters::test_512(),
    };
    let group = parameters.build().context("failed to build group")?;

    let mut config = ProofSystemConfig::from_env().context("failed to read configuration")?;
    match args.backend {
        Some(BackendChoice::Sequential) => config.backend = BackendKind::Sequential,
        Some(BackendChoice::Parallel) => {
            config.backend = BackendKind::Parallel {
                threads: args.threads,
            }
        }
        None => {}
    }

    let setup_start = Instant::now();
    let system = PermutationCommitmentProofSystem::new(group.clone(), args.size, &config)
        .context("failed to set up proof system")?;
    info!(
        target: LOG_TARGET,
        size = args.size,
        group = ?args.group,
        backend = ?config.backend,
        setup_ms = setup_start.elapsed().as_millis(),
        "Proof system ready"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut totals = [Duration::ZERO; 3];
    for iteration in 0..args.iterations {
        let pi = Permutation::random(args.size, &mut rng)?;
        let s = group.zmod().random_vector(&mut rng, args.size);

        let start = Instant::now();
        let commitment = system.commit(&pi, &s)?;
        let commit_time = start.elapsed();

        let start = Instant::now();
        let proof = system.generate(&pi, &s, &commitment, &mut rng)?;
        let generate_time = start.elapsed();

        let start = Instant::now();
        let accepted = system.verify(&proof, &commitment)?;
        let verify_time = start.elapsed();

        if !accepted {
            bail!("honest proof rejected in iteration {iteration}");
        }

        info!(
            target: LOG_TARGET,
            iteration,
            commit_ms = commit_time.as_millis(),
            generate_ms = generate_time.as_millis(),
            verify_ms = verify_time.as_millis(),
            "Iteration complete"
        );
        for (total, time) in totals.iter_mut().zip([commit_time, generate_time, verify_time]) {
            *total += time;
        }
    }

    let runs = args.iterations as u32;
    println!("size: {}, group: {:?}, iterations: {}", args.size, args.group, args.iterations);
    for (name, total) in ["commit", "generate", "verify"].iter().zip(totals) {
        println!("  {name:<9} avg {:>10.3} ms", (total / runs).as_secs_f64() * 1e3);
    }

    Ok(())
}
