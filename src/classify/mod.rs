//! Classification of aligned reads by comparative mapping score.
//!
//! The submodules are arranged along the data flow: [`score`] reduces the
//! records of one strand of a read batch to a comparable best/second-best
//! score pair, [`state`] maps the score pairs of both genomes to one of six
//! mapping states, and [`resolve`] combines the forward and reverse states
//! of a fragment into its final category.

mod resolve;
mod score;
mod state;

pub use resolve::PairPolicy;
pub use score::{
    alignment_score, cigar_score, cigar_score_with, max_scores, no_score, primary_record_scores,
    spliced_suboptimal_score, suboptimal_score, CigarPenalties, Score, ScoreError, ScorePair,
    ScoreSelection, ScoreTags, Scoring, NO_SCORE,
};
pub use state::{mapping_state, ClassifyError, Genome, MappingState};
