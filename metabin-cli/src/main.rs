//! # metabin - Command-Line Genome Binning
//!
//! Bins metagenomic contigs by recursive, marker-guided density clustering
//! and scores binnings against reference genome assignments.
//!
//! ## Usage
//!
//! ```bash
//! # DBSCAN radius scan with default cutoffs
//! metabin bin -i embedding.tsv -m markers.tsv -o binning.tsv
//!
//! # HDBSCAN, taxonomy guided, with a bin summary
//! metabin bin -i embedding.tsv -m markers.tsv --lineage lineage.tsv \
//!     --method hdbscan --taxonomy --summary bins.tsv -o binning.tsv
//!
//! # Compare two binnings with the reference
//! metabin benchmark -r reference.tsv binning.tsv other.tsv
//! ```
//!
//! ## `bin` Options
//!
//! - `-i, --contigs <FILE>`: Contig embedding table
//! - `-m, --markers <FILE>`: Marker hit table
//! - `--lineage <FILE>`: Lineage table (required with `--taxonomy`)
//! - `--assembly <FILE>`: Assembly FASTA for lengths and GC content
//! - `-o, --output <FILE>`: Assignment table (default: stdout)
//! - `--summary <FILE>`: Per-bin summary table
//! - `-f, --format <FORMAT>`: tsv or json (default: tsv)
//! - `-d, --domain <DOMAIN>`: bacteria or archaea (default: bacteria)
//! - `--completeness <PCT>`, `--purity <PCT>`: Acceptance cutoffs
//! - `--method <METHOD>`: dbscan or hdbscan, and the scan range flags
//! - `--taxonomy`, `--reverse-ranks`, `--starting-rank <RANK>`
//! - `-t, --threads <N>`: Worker threads
//! - `-q, --quiet`, `-v, --verbose`: Log level

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use metabin_core::Binner;
use metabin_core::benchmark::{BenchmarkReport, compare};
use metabin_core::config::{
    BinningConfig, ClusterMethod, CoverageFeature, EpsScan, MinSizeScan, OutputFormat, RankOrder,
};
use metabin_core::constants::VERSION;
use metabin_core::io::{
    apply_assembly_lengths, merge_lineages, read_assembly, read_assignments, read_contig_table,
    read_marker_table, read_reference,
};
use metabin_core::output::{write_benchmark, write_bin_summary, write_results};
use metabin_core::summary::summarize;
use metabin_core::types::{Domain, Rank};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

fn cli() -> Command {
    Command::new("metabin")
        .version(VERSION)
        .about("Recursive marker-guided binning of metagenomic contigs")
        .subcommand_required(true)
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only report errors"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace)"),
        )
        .subcommand(bin_command())
        .subcommand(benchmark_command())
}

fn format_arg() -> Arg {
    Arg::new("format")
        .short('f')
        .long("format")
        .value_name("FORMAT")
        .help("Output format: tsv or json")
        .value_parser(value_parser!(OutputFormat))
        .default_value("tsv")
}

fn bin_command() -> Command {
    Command::new("bin")
        .about("Bin contigs into genomes")
        .arg(
            Arg::new("contigs")
                .short('i')
                .long("contigs")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Contig table: contig, embedding columns, optional coverage and length"),
        )
        .arg(
            Arg::new("markers")
                .short('m')
                .long("markers")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Marker hit table: contig and marker (or sacc)"),
        )
        .arg(
            Arg::new("lineage")
                .long("lineage")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Lineage table with one column per rank"),
        )
        .arg(
            Arg::new("assembly")
                .long("assembly")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Assembly FASTA, used for lengths and GC content"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Assignment table (default: stdout)"),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Per-bin summary table"),
        )
        .arg(format_arg())
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .value_name("DOMAIN")
                .value_parser(value_parser!(Domain))
                .default_value("bacteria")
                .help("Marker set: bacteria or archaea"),
        )
        .arg(
            Arg::new("completeness")
                .long("completeness")
                .value_name("PCT")
                .value_parser(value_parser!(f64))
                .help("Minimum bin completeness (default: 20)"),
        )
        .arg(
            Arg::new("purity")
                .long("purity")
                .value_name("PCT")
                .value_parser(value_parser!(f64))
                .help("Minimum bin purity (default: 90)"),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .value_name("METHOD")
                .value_parser(value_parser!(ClusterMethod))
                .default_value("dbscan")
                .help("Clustering method: dbscan or hdbscan"),
        )
        .arg(
            Arg::new("eps-start")
                .long("eps-start")
                .value_name("EPS")
                .value_parser(value_parser!(f64))
                .help("First (largest) DBSCAN radius"),
        )
        .arg(
            Arg::new("eps-factor")
                .long("eps-factor")
                .value_name("FACTOR")
                .value_parser(value_parser!(f64))
                .help("Radius multiplier between scan steps"),
        )
        .arg(
            Arg::new("eps-steps")
                .long("eps-steps")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Number of radii to scan"),
        )
        .arg(
            Arg::new("max-cluster-size")
                .long("max-cluster-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("First (largest) HDBSCAN minimum cluster size"),
        )
        .arg(
            Arg::new("min-cluster-size")
                .long("min-cluster-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Last (smallest) HDBSCAN minimum cluster size"),
        )
        .arg(
            Arg::new("size-step")
                .long("size-step")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Decrement between HDBSCAN cluster sizes"),
        )
        .arg(
            Arg::new("min-samples")
                .long("min-samples")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Neighbourhood size for core points"),
        )
        .arg(
            Arg::new("taxonomy")
                .long("taxonomy")
                .action(ArgAction::SetTrue)
                .help("Bin within taxa, rank by rank"),
        )
        .arg(
            Arg::new("reverse-ranks")
                .long("reverse-ranks")
                .action(ArgAction::SetTrue)
                .help("Visit ranks from species up to superkingdom"),
        )
        .arg(
            Arg::new("starting-rank")
                .long("starting-rank")
                .value_name("RANK")
                .value_parser(value_parser!(Rank))
                .help("Skip ranks visited before this one"),
        )
        .arg(
            Arg::new("min-subset-size")
                .long("min-subset-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Smallest taxon subset worth clustering (default: 3)"),
        )
        .arg(
            Arg::new("no-coverage")
                .long("no-coverage")
                .action(ArgAction::SetTrue)
                .help("Cluster on the embedding alone"),
        )
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Cap on clustering passes per contig set"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Worker threads (default: all cores)"),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .action(ArgAction::SetTrue)
                .help("Scan parameters on the calling thread"),
        )
}

fn benchmark_command() -> Command {
    Command::new("benchmark")
        .about("Score binnings against reference genome assignments")
        .arg(
            Arg::new("reference")
                .short('r')
                .long("reference")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Reference table: contig and reference_genome"),
        )
        .arg(
            Arg::new("predictions")
                .value_name("PREDICTIONS")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("Assignment tables written by `metabin bin`"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Metrics table (default: stdout)"),
        )
        .arg(format_arg())
}

fn init_logging(matches: &ArgMatches) {
    let filter = if matches.get_flag("quiet") {
        EnvFilter::new("error")
    } else {
        match matches.get_count("verbose") {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Default scan range of the chosen method with any range flags applied
fn cluster_method(matches: &ArgMatches) -> Result<ClusterMethod> {
    let method = matches
        .get_one::<ClusterMethod>("method")
        .copied()
        .unwrap_or_default();
    let min_samples = matches.get_one::<usize>("min-samples").copied();
    Ok(match method {
        ClusterMethod::DensityEpsScan(defaults) => {
            for flag in ["max-cluster-size", "min-cluster-size", "size-step"] {
                if matches.contains_id(flag) {
                    bail!("--{flag} only applies to --method hdbscan");
                }
            }
            ClusterMethod::DensityEpsScan(EpsScan {
                start: matches.get_one("eps-start").copied().unwrap_or(defaults.start),
                factor: matches.get_one("eps-factor").copied().unwrap_or(defaults.factor),
                steps: matches.get_one("eps-steps").copied().unwrap_or(defaults.steps),
                min_samples: min_samples.unwrap_or(defaults.min_samples),
            })
        }
        ClusterMethod::DensityMinSizeScan(defaults) => {
            for flag in ["eps-start", "eps-factor", "eps-steps"] {
                if matches.contains_id(flag) {
                    bail!("--{flag} only applies to --method dbscan");
                }
            }
            ClusterMethod::DensityMinSizeScan(MinSizeScan {
                max_cluster_size: matches
                    .get_one("max-cluster-size")
                    .copied()
                    .unwrap_or(defaults.max_cluster_size),
                min_cluster_size: matches
                    .get_one("min-cluster-size")
                    .copied()
                    .unwrap_or(defaults.min_cluster_size),
                step: matches.get_one("size-step").copied().unwrap_or(defaults.step),
                min_samples: min_samples.or(defaults.min_samples),
            })
        }
    })
}

fn binning_config(matches: &ArgMatches) -> Result<BinningConfig> {
    let defaults = BinningConfig::default();
    Ok(BinningConfig {
        domain: matches
            .get_one::<Domain>("domain")
            .copied()
            .unwrap_or(defaults.domain),
        completeness_cutoff: matches
            .get_one("completeness")
            .copied()
            .unwrap_or(defaults.completeness_cutoff),
        purity_cutoff: matches
            .get_one("purity")
            .copied()
            .unwrap_or(defaults.purity_cutoff),
        method: cluster_method(matches)?,
        use_taxonomy: matches.get_flag("taxonomy"),
        rank_order: RankOrder {
            reverse: matches.get_flag("reverse-ranks"),
            starting_rank: matches.get_one::<Rank>("starting-rank").copied(),
            ..defaults.rank_order
        },
        min_subset_size: matches
            .get_one("min-subset-size")
            .copied()
            .unwrap_or(defaults.min_subset_size),
        coverage: if matches.get_flag("no-coverage") {
            CoverageFeature::Ignore
        } else {
            CoverageFeature::Log10
        },
        max_iterations: matches.get_one("max-iterations").copied(),
        parallel_scan: !matches.get_flag("sequential"),
        num_threads: matches.get_one("threads").copied(),
    })
}

fn run_bin(matches: &ArgMatches) -> Result<()> {
    let config = binning_config(matches)?;
    let format = matches
        .get_one::<OutputFormat>("format")
        .copied()
        .unwrap_or_default();

    let contigs_path = matches
        .get_one::<PathBuf>("contigs")
        .context("missing --contigs")?;
    let mut table = read_contig_table(contigs_path)
        .with_context(|| format!("reading contig table {}", contigs_path.display()))?;
    let markers_path = matches
        .get_one::<PathBuf>("markers")
        .context("missing --markers")?;
    let markers = read_marker_table(markers_path, config.domain)
        .with_context(|| format!("reading marker table {}", markers_path.display()))?;

    if let Some(path) = matches.get_one::<PathBuf>("lineage") {
        let merged = merge_lineages(&mut table, path)
            .with_context(|| format!("reading lineage table {}", path.display()))?;
        info!(contigs = merged, "Attached lineages");
    } else if config.use_taxonomy {
        bail!("--taxonomy requires --lineage");
    }

    let assembly = match matches.get_one::<PathBuf>("assembly") {
        Some(path) => {
            let assembly = read_assembly(path)
                .with_context(|| format!("reading assembly {}", path.display()))?;
            let updated = apply_assembly_lengths(&mut table, &assembly);
            info!(contigs = updated, "Filled contig lengths from assembly");
            Some(assembly)
        }
        None => None,
    };

    let binner = Binner::with_config(config)?;
    let results = binner.bin(&table, &markers)?;

    let mut writer = open_output(matches.get_one::<PathBuf>("output"))?;
    write_results(&mut writer, &results, format)?;
    writer.flush()?;

    if let Some(path) = matches.get_one::<PathBuf>("summary") {
        let summaries = summarize(&results, &table, assembly.as_ref());
        let mut writer = open_output(Some(path))?;
        write_bin_summary(&mut writer, &summaries, format)?;
        writer.flush()?;
    }

    info!(
        bins = results.bins.len(),
        unclustered = results.n_unclustered(),
        contigs = results.assignments.len(),
        "Binning complete"
    );
    Ok(())
}

fn run_benchmark(matches: &ArgMatches) -> Result<()> {
    let format = matches
        .get_one::<OutputFormat>("format")
        .copied()
        .unwrap_or_default();
    let reference_path = matches
        .get_one::<PathBuf>("reference")
        .context("missing --reference")?;
    let reference = read_reference(reference_path)
        .with_context(|| format!("reading reference {}", reference_path.display()))?;

    let mut reports = Vec::new();
    for path in matches.get_many::<PathBuf>("predictions").into_iter().flatten() {
        let predictions = read_assignments(path)
            .with_context(|| format!("reading predictions {}", path.display()))?;
        let metrics = compare(&predictions, &reference)
            .with_context(|| format!("scoring {}", path.display()))?;
        reports.push(BenchmarkReport {
            predictions: path.display().to_string(),
            metrics,
        });
    }

    let mut writer = open_output(matches.get_one::<PathBuf>("output"))?;
    write_benchmark(&mut writer, &reports, format)?;
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(&matches);

    match matches.subcommand() {
        Some(("bin", sub)) => run_bin(sub),
        Some(("benchmark", sub)) => run_benchmark(sub),
        _ => unreachable!("clap requires a subcommand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_binning_config_from_flags() {
        let matches = cli().get_matches_from([
            "metabin", "bin", "-i", "c.tsv", "-m", "m.tsv", "--method", "hdbscan",
            "--max-cluster-size", "8", "--min-samples", "3", "--purity", "95",
            "--no-coverage", "--sequential",
        ]);
        let (_, sub) = matches.subcommand().unwrap();
        let config = binning_config(sub).unwrap();
        assert_eq!(config.purity_cutoff, 95.0);
        assert_eq!(config.coverage, CoverageFeature::Ignore);
        assert!(!config.parallel_scan);
        assert_eq!(
            config.method,
            ClusterMethod::DensityMinSizeScan(MinSizeScan {
                max_cluster_size: 8,
                min_samples: Some(3),
                ..MinSizeScan::default()
            })
        );
    }

    #[test]
    fn test_scan_flags_must_match_method() {
        let matches = cli().get_matches_from([
            "metabin", "bin", "-i", "c.tsv", "-m", "m.tsv", "--eps-start", "2.0", "--method",
            "hdbscan",
        ]);
        let (_, sub) = matches.subcommand().unwrap();
        assert!(binning_config(sub).is_err());
    }
}
