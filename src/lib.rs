//! # Dual-genome read classification
//!
//! This library classifies sequencing reads that were independently aligned
//! against two reference genomes (a "primary" and a "secondary" species),
//! deciding for each read or read pair which genome it is specific to,
//! whether it multimaps, or whether the evidence is ambiguous or absent.
//! It is used to split mixed-origin sequencing data, such as xenograft
//! tissue containing both host and graft DNA, into per-origin BAM files.
//!
//! ## Pipeline
//!
//! 1. **Batching**: records of the two name-grouped BAM streams are grouped
//!    into same-name batches ([`stream::BatchReader`])
//! 2. **Mate splitting**: each batch is partitioned into forward and reverse
//!    reads by flag ([`stream::split_forward_reverse`])
//! 3. **Scoring**: each strand is reduced to a best/second-best score pair
//!    ([`classify::Scoring`])
//! 4. **Classification**: four scores become one of six mapping states
//!    ([`classify::mapping_state`]), and the forward/reverse states of a
//!    fragment are combined into a single category ([`classify::PairPolicy`])
//! 5. **Routing**: the fragment's raw records are appended verbatim to the
//!    per-category output BAM ([`output::OutputRouter`])
//!
//! The [`engine::StreamClassifier`] drives the two input streams in
//! lock-step and accumulates per-category statistics.
//!
//! ## Usage Example
//!
//! ```ignore
//! use xenosplit::classify::{PairPolicy, Scoring, NO_SCORE};
//! use xenosplit::engine::StreamClassifier;
//! use xenosplit::output::{OutputPlan, OutputRouter};
//! use xenosplit::stream::BatchReader;
//!
//! let mut primary = BatchReader::from_path("graft.bam")?;
//! let mut secondary = BatchReader::from_path("host.bam")?;
//! let plan = OutputPlan::with_basename("sample1");
//! let mut router = OutputRouter::create(
//!     &plan, primary.header(), secondary.header(), "xenosplit ...")?;
//!
//! let classifier = StreamClassifier {
//!     scoring: Scoring::default(),
//!     policy: PairPolicy::Priority,
//!     min_score: NO_SCORE,
//! };
//! let counts = classifier.run(&mut primary, &mut secondary, &mut router)?;
//! ```

#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

pub mod classify; // score extraction and the six-state decision procedure
pub mod engine; // lock-step coordination of the two streams
pub mod output; // per-category BAM channels
pub mod report; // human-readable count summaries
pub mod stream; // batching and mate splitting of BAM records

pub use classify::{MappingState, PairPolicy, Score, ScorePair, Scoring, NO_SCORE};
pub use engine::{EngineError, Genome, RunCounts, StreamClassifier};
pub use output::{OutputPlan, OutputRouter};
pub use stream::{AlignBatch, BatchReader, SortOrder};

/// Program name recorded in `@PG` header lines of every output file.
pub const PROGRAM_NAME: &str = "xenosplit";
