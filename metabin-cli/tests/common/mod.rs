#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Two tight four-contig genomes with distinct single-copy markers and one
/// distant contig without markers.
pub const CONTIGS: &str = "\
contig\tx\ty
a1\t0.0\t0.0
a2\t0.1\t0.0
a3\t0.0\t0.1
a4\t0.1\t0.1
b1\t10.0\t10.0
b2\t10.1\t10.0
b3\t10.0\t10.1
b4\t10.1\t10.1
o1\t30.0\t30.0
";

pub const MARKERS: &str = "\
contig\tmarker
a1\tPF00001
a2\tPF00002
a3\tPF00003
a4\tPF00004
b1\tPF00001
b2\tPF00002
b3\tPF00003
b4\tPF00004
";

pub const REFERENCE: &str = "\
contig\treference_genome
a1\tgenome_a
a2\tgenome_a
a3\tgenome_a
a4\tgenome_a
b1\tgenome_b
b2\tgenome_b
b3\tgenome_b
b4\tgenome_b
o1\tgenome_c
";

/// Scratch directory holding the fixture tables
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("contigs.tsv"), CONTIGS).unwrap();
        fs::write(dir.path().join("markers.tsv"), MARKERS).unwrap();
        fs::write(dir.path().join("reference.tsv"), REFERENCE).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// `metabin bin` over the fixture with a scan that resolves both genomes
pub fn bin_command(workspace: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("metabin").unwrap();
    cmd.arg("--quiet")
        .arg("bin")
        .arg("-i")
        .arg(workspace.path("contigs.tsv"))
        .arg("-m")
        .arg(workspace.path("markers.tsv"))
        .args(["--eps-start", "2.0", "--eps-factor", "0.5", "--eps-steps", "4"])
        .args(["--min-samples", "2", "--completeness", "2"])
        .args(["--no-coverage", "--sequential"]);
    cmd
}

/// Tab-separated text with tabs shown as commas, so empty trailing fields
/// stay visible in inline snapshots.
pub fn as_csv(text: &str) -> String {
    text.lines()
        .map(|line| line.replace('\t', ","))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
