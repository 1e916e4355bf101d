//! # metabin
//!
//! Recursive, marker-guided density clustering of metagenomic contigs into
//! genome bins.
//!
//! ## Overview
//!
//! Each contig carries a low-dimensional embedding of its k-mer composition
//! and, optionally, its read coverage. Single-copy marker gene hits give every
//! candidate cluster a completeness and a purity score. The binner scans a
//! range of density-clustering parameters, keeps the best clusters that pass
//! both cutoffs, removes their contigs and repeats on the remainder until no
//! new bin appears. Optionally the contigs are first split by taxonomy, one
//! rank at a time.
//!
//! ## Features
//!
//! - **Two clustering families**: DBSCAN with a decreasing `eps` scan and
//!   HDBSCAN with a decreasing minimum cluster size scan
//! - **Taxonomic guidance**: binning within each taxon of canonical ranks
//! - **Parallel parameter scan**: every scan value evaluated with Rayon
//! - **Output**: TSV or JSON assignments plus per-bin summaries
//! - **Benchmarking**: external clustering metrics against reference genomes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metabin_core::Binner;
//! use metabin_core::io::{read_contig_table, read_marker_table};
//! use metabin_core::types::Domain;
//!
//! let table = read_contig_table("embedding.tsv")?;
//! let markers = read_marker_table("markers.tsv", Domain::Bacteria)?;
//!
//! let results = Binner::new().bin(&table, &markers)?;
//! println!(
//!     "{} bins, {} contigs unclustered",
//!     results.bins.len(),
//!     results.n_unclustered()
//! );
//! # Ok::<(), metabin_core::types::MetabinError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Binning configuration and scan ranges
//! - [`engine`]: The binning driver
//! - [`partition`]: Recursive partitioning of one contig set
//! - [`search`]: Parameter scan and cluster selection
//! - [`quality`]: Completeness and purity scoring
//! - [`taxonomy`]: Taxon subsets for one rank
//! - [`algorithms`]: DBSCAN and HDBSCAN
//! - [`table`]: Contig, marker and feature tables
//! - [`io`]: Table and FASTA readers
//! - [`output`]: Result writers
//! - [`summary`]: Per-bin statistics
//! - [`benchmark`]: Clustering metrics against a reference
//! - [`results`]: Binning results
//! - [`types`]: Core data types and errors
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, MetabinError>`](types::MetabinError),
//! covering:
//!
//! - Unknown clustering methods or out-of-range scan parameters
//! - Inputs without any marker hit for the requested domain
//! - Malformed tables
//! - I/O errors during file operations

pub mod algorithms;
pub mod benchmark;
pub mod config;
pub mod constants;
pub mod engine;
pub mod io;
pub mod output;
pub mod partition;
pub mod quality;
pub mod results;
pub mod search;
pub mod summary;
pub mod table;
pub mod taxonomy;
pub mod types;

pub use engine::Binner;
