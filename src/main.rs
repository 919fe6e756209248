use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xenosplit::classify::{
    CigarPenalties, MappingState, PairPolicy, ScoreSelection, ScoreTags, Scoring, NO_SCORE,
};
use xenosplit::engine::StreamClassifier;
use xenosplit::output::{OutputPlan, OutputRouter};
use xenosplit::report;
use xenosplit::stream::BatchReader;

const OUTPUT_OPTIONS: [&str; 6] = [
    "primary_specific",
    "primary_multi",
    "secondary_specific",
    "secondary_multi",
    "unresolved",
    "unassigned",
];

#[derive(Parser, Debug)]
#[command(
    name = "xenosplit",
    version,
    about = "Split reads aligned to two genomes into per-origin BAM files",
    long_about = "Reads two BAM files containing the same reads aligned to two \
                  different reference genomes and assigns each read or read pair \
                  to the genome it maps best in. Inputs must present reads in \
                  identical order with same-name records adjacent (raw aligner \
                  output or samtools sort -n); coordinate-sorted files are \
                  rejected. Categories without an output file are counted but \
                  not written."
)]
struct Cli {
    /// BAM file of alignments to the primary genome (e.g. the graft)
    #[arg(long)]
    primary: PathBuf,

    /// BAM file of alignments to the secondary genome (e.g. the host)
    #[arg(long)]
    secondary: PathBuf,

    /// Output BAM for reads specific to the primary genome
    #[arg(long)]
    primary_specific: Option<PathBuf>,

    /// Output BAM for reads multimapping in the primary genome
    #[arg(long)]
    primary_multi: Option<PathBuf>,

    /// Output BAM for reads specific to the secondary genome
    #[arg(long)]
    secondary_specific: Option<PathBuf>,

    /// Output BAM for reads multimapping in the secondary genome
    #[arg(long)]
    secondary_multi: Option<PathBuf>,

    /// Output BAM for reads mapping equally well in both genomes
    #[arg(long)]
    unresolved: Option<PathBuf>,

    /// Output BAM for reads with no valid mapping in either genome
    #[arg(long)]
    unassigned: Option<PathBuf>,

    /// Prefix for writing all six categories as <PREFIX>_<category>.bam
    #[arg(long, conflicts_with_all = OUTPUT_OPTIONS)]
    basename: Option<String>,

    /// Minimum alignment score; reads scoring at or below it are
    /// unassigned
    #[arg(long)]
    min_score: Option<i32>,

    /// Read the competing score from the ZS tag (HISAT2 and other
    /// spliced aligners)
    #[arg(long, conflicts_with = "cigar")]
    zs: bool,

    /// Recompute scores from the CIGAR string and NM tag, for aligners
    /// that emit no AS tag; no multimap detection is possible
    #[arg(long)]
    cigar: bool,

    /// Score each strand by its best record instead of its primary
    /// alignment record
    #[arg(long)]
    max: bool,

    /// Require both ends of a pair to corroborate the assignment;
    /// discordant pairs become unresolved
    #[arg(long)]
    conservative: bool,

    /// BGZF compression level for output BAMs
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression: Option<u32>,
}

impl Cli {
    fn scoring(&self) -> Scoring {
        let tags = if self.cigar {
            ScoreTags::Cigar(CigarPenalties::default())
        } else if self.zs {
            ScoreTags::Spliced
        } else {
            ScoreTags::Standard
        };
        let selection = if self.max {
            ScoreSelection::MaxOverBatch
        } else {
            ScoreSelection::PrimaryRecord
        };
        Scoring { tags, selection }
    }

    fn output_plan(&self) -> OutputPlan {
        if let Some(prefix) = &self.basename {
            let mut plan = OutputPlan::with_basename(prefix);
            if let Some(level) = self.compression {
                plan = plan.compression(level);
            }
            return plan;
        }
        let mut plan = OutputPlan::new();
        let destinations = [
            (MappingState::PrimarySpecific, &self.primary_specific),
            (MappingState::PrimaryMulti, &self.primary_multi),
            (MappingState::SecondarySpecific, &self.secondary_specific),
            (MappingState::SecondaryMulti, &self.secondary_multi),
            (MappingState::Unresolved, &self.unresolved),
            (MappingState::Unassigned, &self.unassigned),
        ];
        for (state, path) in destinations {
            if let Some(path) = path {
                plan = plan.destination(state, path.clone());
            }
        }
        if let Some(level) = self.compression {
            plan = plan.compression(level);
        }
        plan
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let start = Instant::now();
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    info!(version = env!("CARGO_PKG_VERSION"), "xenosplit starting");

    let mut primary = BatchReader::from_path(&cli.primary)
        .with_context(|| format!("failed to open primary BAM {}", cli.primary.display()))?;
    let mut secondary = BatchReader::from_path(&cli.secondary)
        .with_context(|| format!("failed to open secondary BAM {}", cli.secondary.display()))?;

    let plan = cli.output_plan();
    let mut router = OutputRouter::create(
        &plan,
        primary.header(),
        secondary.header(),
        &command_line,
    )
    .context("failed to create output files")?;

    let classifier = StreamClassifier {
        scoring: cli.scoring(),
        policy: if cli.conservative {
            PairPolicy::Conservative
        } else {
            PairPolicy::Priority
        },
        min_score: cli.min_score.unwrap_or(NO_SCORE),
    };

    let counts = classifier
        .run(&mut primary, &mut secondary, &mut router)
        .context("classification run failed")?;

    // Close the output files before reporting, as a crash while printing
    // must not leave truncated BAMs behind.
    drop(router);

    let mut stderr = io::stderr().lock();
    report::write_summary(
        &mut stderr,
        "Read Category Summary",
        &report::category_rows(&counts),
    )?;
    report::write_summary(
        &mut stderr,
        "Read Pair Category Summary",
        &report::pair_count_rows(&counts),
    )?;
    writeln!(
        stderr,
        "\n\nTotal templates assigned : {} in {:.2}s\n",
        counts.templates(),
        start.elapsed().as_secs_f64()
    )?;

    Ok(())
}
