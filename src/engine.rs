//! Lock-step classification of two name-grouped BAM streams.

use std::collections::BTreeMap;

use rust_htslib::bam::Record;
use thiserror::Error;
use tracing::{info, trace};

use crate::classify::{
    mapping_state, ClassifyError, MappingState, PairPolicy, Score, ScoreError, ScorePair, Scoring,
};
pub use crate::classify::Genome;
use crate::output::{OutputError, OutputRouter};
use crate::stream::{split_forward_reverse, AlignBatch, BatchReader, StreamError};

/// Errors that abort a classification run.
///
/// Every fatal condition names the stream (and where available the read)
/// that triggered it; there is no partial-file salvage or retry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reading or splitting one of the input streams failed.
    #[error("{genome} stream: {source}")]
    Stream {
        /// Which input stream failed.
        genome: Genome,
        /// Underlying stream error.
        #[source]
        source: StreamError,
    },

    /// Score extraction failed for one read batch.
    #[error("{genome} stream, read {name}: {source}")]
    Score {
        /// Which input stream the batch came from.
        genome: Genome,
        /// Read name of the offending batch.
        name: String,
        /// Underlying score error.
        #[source]
        source: ScoreError,
    },

    /// The decision procedure reported an internal inconsistency.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// The two streams disagree about which read comes next; they must
    /// enumerate reads in identical order.
    #[error(
        "read name mismatch between streams: primary has {primary}, \
         secondary has {secondary}"
    )]
    ReadNameMismatch {
        /// Read name at the front of the primary stream.
        primary: String,
        /// Read name at the front of the secondary stream.
        secondary: String,
    },

    /// One stream ended while the other still holds reads.
    #[error("{exhausted} stream ended early; {remaining} stream still has read {pending}")]
    UnequalStreams {
        /// The stream that ran out first.
        exhausted: Genome,
        /// The stream that still has data.
        remaining: Genome,
        /// Read name pending on the longer stream.
        pending: String,
    },

    /// Writing to an output channel failed.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Statistics accumulated over one run.
///
/// Both tallies are bumped exactly once per fragment and are, besides the
/// routed records themselves, the only persisted output of a run.
#[derive(Debug, Default)]
pub struct RunCounts {
    pair_counts: BTreeMap<(MappingState, Option<MappingState>), u64>,
    category_counts: [u64; 6],
}

impl RunCounts {
    /// Empty tallies.
    pub fn new() -> RunCounts {
        RunCounts::default()
    }

    fn bump_pair(&mut self, forward: MappingState, reverse: Option<MappingState>) {
        *self.pair_counts.entry((forward, reverse)).or_insert(0) += 1;
    }

    fn bump_category(&mut self, category: MappingState) {
        self.category_counts[category.index()] += 1;
    }

    /// Occurrence count per observed `(forward, reverse)` state pair, in
    /// deterministic priority order.
    pub fn pair_counts(
        &self,
    ) -> impl Iterator<Item = (&(MappingState, Option<MappingState>), &u64)> {
        self.pair_counts.iter()
    }

    /// Fragments assigned to one category.
    pub fn category(&self, category: MappingState) -> u64 {
        self.category_counts[category.index()]
    }

    /// Total fragments classified.
    pub fn templates(&self) -> u64 {
        self.category_counts.iter().sum()
    }
}

/// The classification engine: scoring strategy, pair policy and score
/// floor, applied to two streams in lock-step.
///
/// Single-threaded and order-preserving; fragments are classified and
/// routed in exactly the order the streams present them.
#[derive(Debug, Clone, Copy)]
pub struct StreamClassifier {
    /// How batch records reduce to score pairs.
    pub scoring: Scoring,
    /// How forward and reverse states combine.
    pub policy: PairPolicy,
    /// Exclusive floor below which scores do not count as mappings.
    pub min_score: Score,
}

impl StreamClassifier {
    /// Walk both streams to exhaustion, classifying and routing every
    /// fragment.
    ///
    /// Returns the accumulated tallies; the router is left open for the
    /// caller to summarize and drop. Coordinate-sorted inputs were
    /// already rejected when the [`BatchReader`]s were opened.
    pub fn run(
        &self,
        primary: &mut BatchReader,
        secondary: &mut BatchReader,
        router: &mut OutputRouter,
    ) -> Result<RunCounts, EngineError> {
        let mut counts = RunCounts::new();
        loop {
            let primary_batch = primary.next_batch().map_err(|source| EngineError::Stream {
                genome: Genome::Primary,
                source,
            })?;
            let secondary_batch = secondary
                .next_batch()
                .map_err(|source| EngineError::Stream {
                    genome: Genome::Secondary,
                    source,
                })?;
            let (primary_batch, secondary_batch) = match (primary_batch, secondary_batch) {
                (None, None) => break,
                (Some(batch), None) => {
                    return Err(EngineError::UnequalStreams {
                        exhausted: Genome::Secondary,
                        remaining: Genome::Primary,
                        pending: batch.name_lossy(),
                    })
                }
                (None, Some(batch)) => {
                    return Err(EngineError::UnequalStreams {
                        exhausted: Genome::Primary,
                        remaining: Genome::Secondary,
                        pending: batch.name_lossy(),
                    })
                }
                (Some(p), Some(s)) => (p, s),
            };
            if primary_batch.name() != secondary_batch.name() {
                return Err(EngineError::ReadNameMismatch {
                    primary: primary_batch.name_lossy(),
                    secondary: secondary_batch.name_lossy(),
                });
            }

            let category =
                self.classify_fragment(&primary_batch, &secondary_batch, &mut counts)?;
            let routed = match category.genome() {
                Some(Genome::Secondary) => &secondary_batch,
                _ => &primary_batch,
            };
            router.write_batch(category, routed)?;
            trace!(
                read = %primary_batch.name_lossy(),
                category = %category,
                "fragment routed"
            );
        }
        info!(templates = counts.templates(), "classification complete");
        Ok(counts)
    }

    /// Classify one fragment and bump both tallies.
    fn classify_fragment(
        &self,
        primary_batch: &AlignBatch,
        secondary_batch: &AlignBatch,
        counts: &mut RunCounts,
    ) -> Result<MappingState, EngineError> {
        let primary_halves =
            split_forward_reverse(primary_batch).map_err(|source| EngineError::Stream {
                genome: Genome::Primary,
                source,
            })?;
        let secondary_halves =
            split_forward_reverse(secondary_batch).map_err(|source| EngineError::Stream {
                genome: Genome::Secondary,
                source,
            })?;

        let forward_state = mapping_state(
            self.strand_scores(&primary_halves.forward, Genome::Primary, primary_batch)?,
            self.strand_scores(&secondary_halves.forward, Genome::Secondary, secondary_batch)?,
            self.min_score,
        )?;
        // A fragment with no reverse reads on either side carries
        // forward-only information; that is degraded, not an error.
        let reverse_state = if primary_halves.reverse.is_empty()
            && secondary_halves.reverse.is_empty()
        {
            None
        } else {
            Some(mapping_state(
                self.strand_scores(&primary_halves.reverse, Genome::Primary, primary_batch)?,
                self.strand_scores(
                    &secondary_halves.reverse,
                    Genome::Secondary,
                    secondary_batch,
                )?,
                self.min_score,
            )?)
        };

        counts.bump_pair(forward_state, reverse_state);
        let category = self.policy.resolve(forward_state, reverse_state);
        counts.bump_category(category);
        Ok(category)
    }

    fn strand_scores(
        &self,
        records: &[&Record],
        genome: Genome,
        batch: &AlignBatch,
    ) -> Result<ScorePair, EngineError> {
        self.scoring
            .strand_scores(records)
            .map_err(|source| EngineError::Score {
                genome,
                name: batch.name_lossy(),
                source,
            })
    }
}
