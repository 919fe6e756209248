//! Extraction of comparable alignment scores from BAM records.
//!
//! Aligners report the score of the reported alignment in the `AS` tag and
//! the score of the best competing alignment in `XS` (or `ZS` for spliced
//! aligners such as HISAT2). Aligners that emit no usable score tags are
//! supported by recomputing a score from the CIGAR string and the `NM` edit
//! distance tag.
//!
//! All scores share a single signed 32-bit domain in which better matches
//! have strictly higher scores. The minimum representable value is reserved
//! as the [`NO_SCORE`] sentinel meaning "no value"; a second-best score of
//! `NO_SCORE` means "no competing alignment", not a very bad one.

use rust_htslib::bam::record::{Aux, Cigar};
use rust_htslib::bam::Record;
use thiserror::Error;

/// Comparable alignment score. Better matches have higher scores; scores
/// may be negative (local alignment against a poor reference).
pub type Score = i32;

/// Sentinel meaning "no score available".
///
/// Matches the integer domain of BAM score tags; comparisons against real
/// scores behave as negative infinity would.
pub const NO_SCORE: Score = i32::MIN;

/// Best and second-best score extracted from one strand of a read batch.
///
/// The derived ordering is lexicographic on `(best, second)`, which is the
/// order used by [`max_scores`] to pick the strongest record of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScorePair {
    /// Score of the best alignment.
    pub best: Score,
    /// Score of the best competing alignment, or [`NO_SCORE`] when the
    /// aligner reported no competitor.
    pub second: Score,
}

impl ScorePair {
    /// Score pair carrying no information at all, produced for strands
    /// with no records.
    pub const EMPTY: ScorePair = ScorePair {
        best: NO_SCORE,
        second: NO_SCORE,
    };

    /// Construct a score pair.
    pub fn new(best: Score, second: Score) -> Self {
        Self { best, second }
    }
}

/// Errors surfaced while extracting scores from a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// Primary-record scoring found no record without the secondary
    /// alignment flag.
    #[error("no primary alignment record in batch")]
    NoPrimaryAlignment,

    /// Primary-record scoring found more than one record without the
    /// secondary alignment flag.
    #[error("multiple primary alignment records in batch")]
    MultiplePrimaryAlignments,
}

/// Read an integer-valued aux tag, tolerating every integer width BAM
/// permits. Absent or non-integer tags yield [`NO_SCORE`].
fn int_tag(record: &Record, tag: &[u8; 2]) -> Score {
    match record.aux(tag) {
        Ok(Aux::I8(v)) => Score::from(v),
        Ok(Aux::U8(v)) => Score::from(v),
        Ok(Aux::I16(v)) => Score::from(v),
        Ok(Aux::U16(v)) => Score::from(v),
        Ok(Aux::I32(v)) => v,
        Ok(Aux::U32(v)) => v.try_into().unwrap_or(Score::MAX),
        _ => NO_SCORE,
    }
}

/// Alignment score of the reported alignment (`AS` tag).
pub fn alignment_score(record: &Record) -> Score {
    int_tag(record, b"AS")
}

/// Score of the best competing alignment (`XS` tag).
pub fn suboptimal_score(record: &Record) -> Score {
    int_tag(record, b"XS")
}

/// Score of the best competing alignment for spliced aligners (`ZS` tag).
///
/// HISAT2 and other spliced aligners conventionally use `XS:A` for strand,
/// so the competing score moves to `ZS`.
pub fn spliced_suboptimal_score(record: &Record) -> Score {
    int_tag(record, b"ZS")
}

/// Constant [`NO_SCORE`], for use as a second-best extractor when no
/// multimap discrimination is possible (CIGAR scoring).
pub fn no_score(_record: &Record) -> Score {
    NO_SCORE
}

/// Penalties applied when recomputing a score from the CIGAR string.
///
/// All penalties are negative; a perfect full-length match scores 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarPenalties {
    /// Penalty per mismatched base.
    pub mismatch: Score,
    /// Penalty per opened insertion or deletion.
    pub gap_open: Score,
    /// Penalty per inserted or deleted base.
    pub gap_extend: Score,
    /// Penalty per soft-clipped base.
    pub softclip: Score,
}

impl Default for CigarPenalties {
    fn default() -> Self {
        Self {
            mismatch: -6,
            gap_open: -5,
            gap_extend: -3,
            softclip: -2,
        }
    }
}

/// Recompute an alignment score from CIGAR operations and the `NM` tag
/// using the default penalties.
pub fn cigar_score(record: &Record) -> Score {
    cigar_score_with(record, CigarPenalties::default())
}

/// Recompute an alignment score from CIGAR operations and the `NM` tag.
///
/// `NM` counts mismatched plus inserted plus deleted bases, so the
/// mismatch count is recovered by subtracting the indel bases seen in the
/// CIGAR. Reference skips (`N`), hard clips and pads contribute nothing.
/// An unmapped record or one missing the `NM` tag yields [`NO_SCORE`].
pub fn cigar_score_with(record: &Record, penalties: CigarPenalties) -> Score {
    if record.is_unmapped() {
        return NO_SCORE;
    }
    let edit_distance = int_tag(record, b"NM");
    if edit_distance == NO_SCORE {
        return NO_SCORE;
    }

    let mut gap_opens: i64 = 0;
    let mut inserted: i64 = 0;
    let mut deleted: i64 = 0;
    let mut softclipped: i64 = 0;
    for op in record.cigar().iter() {
        match *op {
            Cigar::Ins(len) => {
                gap_opens += 1;
                inserted += i64::from(len);
            }
            Cigar::Del(len) => {
                gap_opens += 1;
                deleted += i64::from(len);
            }
            Cigar::SoftClip(len) => softclipped += i64::from(len),
            _ => {}
        }
    }

    let mismatches = (i64::from(edit_distance) - inserted - deleted).max(0);
    let score = i64::from(penalties.mismatch) * mismatches
        + i64::from(penalties.gap_open) * gap_opens
        + i64::from(penalties.gap_extend) * (inserted + deleted)
        + i64::from(penalties.softclip) * softclipped;
    score as Score
}

/// Score the unique record of a batch that lacks the secondary alignment
/// flag.
///
/// Fails when no such record exists or when more than one does; aligners
/// that mark their alignments correctly produce exactly one.
pub fn primary_record_scores<'a, I, F, G>(
    records: I,
    best_fn: F,
    second_fn: G,
) -> Result<ScorePair, ScoreError>
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> Score,
    G: Fn(&Record) -> Score,
{
    let mut primaries = records.into_iter().filter(|r| !r.is_secondary());
    let record = primaries.next().ok_or(ScoreError::NoPrimaryAlignment)?;
    if primaries.next().is_some() {
        return Err(ScoreError::MultiplePrimaryAlignments);
    }
    Ok(ScorePair::new(best_fn(record), second_fn(record)))
}

/// Lexicographically maximal `(best, second)` pair over all records of a
/// batch. An empty batch yields [`ScorePair::EMPTY`] rather than failing.
pub fn max_scores<'a, I, F, G>(records: I, best_fn: F, second_fn: G) -> ScorePair
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> Score,
    G: Fn(&Record) -> Score,
{
    records
        .into_iter()
        .map(|r| ScorePair::new(best_fn(r), second_fn(r)))
        .max()
        .unwrap_or(ScorePair::EMPTY)
}

/// Which aux tags supply the best and second-best scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTags {
    /// `AS` best, `XS` second-best (Bowtie2, BWA).
    Standard,
    /// `AS` best, `ZS` second-best (HISAT2 and other spliced aligners).
    Spliced,
    /// Score recomputed from CIGAR and `NM`; no second-best available, so
    /// no multimap discrimination is attempted.
    Cigar(CigarPenalties),
}

impl ScoreTags {
    /// Best score of one record under this tag convention.
    pub fn best(&self, record: &Record) -> Score {
        match *self {
            ScoreTags::Standard | ScoreTags::Spliced => alignment_score(record),
            ScoreTags::Cigar(penalties) => cigar_score_with(record, penalties),
        }
    }

    /// Second-best score of one record under this tag convention.
    pub fn second(&self, record: &Record) -> Score {
        match *self {
            ScoreTags::Standard => suboptimal_score(record),
            ScoreTags::Spliced => spliced_suboptimal_score(record),
            ScoreTags::Cigar(_) => NO_SCORE,
        }
    }
}

/// How the records of one strand are reduced to a single score pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSelection {
    /// Use the unique non-secondary record of the strand.
    PrimaryRecord,
    /// Use the lexicographic maximum over all records of the strand.
    MaxOverBatch,
}

/// Complete scoring strategy: tag convention plus batch reduction.
///
/// Passed explicitly to the engine at construction; there are no global
/// scoring defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoring {
    /// Which aux tags carry the scores.
    pub tags: ScoreTags,
    /// How a multi-record strand collapses to one pair.
    pub selection: ScoreSelection,
}

impl Default for Scoring {
    /// `AS`/`XS` tags, primary-record selection.
    fn default() -> Self {
        Self {
            tags: ScoreTags::Standard,
            selection: ScoreSelection::PrimaryRecord,
        }
    }
}

impl Scoring {
    /// Reduce one strand's records to a score pair.
    ///
    /// A strand with no records yields [`ScorePair::EMPTY`] under either
    /// selection; a missing strand is a degraded condition, not an error.
    pub fn strand_scores<'a>(&self, records: &[&'a Record]) -> Result<ScorePair, ScoreError> {
        if records.is_empty() {
            return Ok(ScorePair::EMPTY);
        }
        match self.selection {
            ScoreSelection::PrimaryRecord => primary_record_scores(
                records.iter().copied(),
                |r| self.tags.best(r),
                |r| self.tags.second(r),
            ),
            ScoreSelection::MaxOverBatch => Ok(max_scores(
                records.iter().copied(),
                |r| self.tags.best(r),
                |r| self.tags.second(r),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::CigarString;

    fn mapped_record(cigar: &str, tags: &[(&[u8; 2], i32)]) -> Record {
        let cigar = CigarString::try_from(cigar.as_bytes()).expect("valid cigar");
        let read_len: usize = cigar
            .iter()
            .map(|op| match *op {
                Cigar::Match(l)
                | Cigar::Ins(l)
                | Cigar::SoftClip(l)
                | Cigar::Equal(l)
                | Cigar::Diff(l) => l as usize,
                _ => 0,
            })
            .sum();
        let mut record = Record::new();
        record.set(
            b"read1",
            Some(&cigar),
            &vec![b'A'; read_len],
            &vec![30u8; read_len],
        );
        record.set_tid(0);
        record.set_pos(100);
        record.set_flags(0);
        for (tag, value) in tags {
            record.push_aux(*tag, Aux::I32(*value)).expect("push tag");
        }
        record
    }

    fn unmapped_record() -> Record {
        let mut record = Record::new();
        record.set(b"read1", None, b"ACGT", &[30u8; 4]);
        record.set_flags(0x4);
        record
    }

    #[test]
    fn tag_scores_read_every_integer_width() {
        let mut record = mapped_record("50M", &[]);
        record.push_aux(b"AS", Aux::U8(200)).unwrap();
        record.push_aux(b"XS", Aux::I16(-120)).unwrap();
        assert_eq!(alignment_score(&record), 200);
        assert_eq!(suboptimal_score(&record), -120);
    }

    #[test]
    fn absent_tag_is_no_score() {
        let record = mapped_record("50M", &[(b"AS", 7)]);
        assert_eq!(suboptimal_score(&record), NO_SCORE);
        assert_eq!(spliced_suboptimal_score(&record), NO_SCORE);
        assert_eq!(no_score(&record), NO_SCORE);
    }

    #[test]
    fn cigar_score_matches_reference_values() {
        // (cigar, NM) -> expected score
        let cases = [
            ("50M", 0, 0),
            ("1S49M", 0, -2),
            ("50M", 2, -12),
            ("10M1I39M", 0, -8),
            ("10M2D38M", 0, -11),
            ("10M1I10M1D28M", 0, -16),
            ("10M1234N40M", 0, 0),
        ];
        for (cigar, nm, expected) in cases {
            let record = mapped_record(cigar, &[(b"NM", nm)]);
            assert_eq!(cigar_score(&record), expected, "cigar {cigar} NM {nm}");
        }
    }

    #[test]
    fn cigar_score_sentinels() {
        assert_eq!(cigar_score(&unmapped_record()), NO_SCORE);
        let no_nm = mapped_record("50M", &[]);
        assert_eq!(cigar_score(&no_nm), NO_SCORE);
    }

    #[test]
    fn primary_record_scoring_requires_exactly_one_primary() {
        let primary = mapped_record("50M", &[(b"AS", 198), (b"XS", 126)]);
        let mut secondary = mapped_record("50M", &[(b"AS", 150)]);
        secondary.set_flags(0x100);

        let batch = vec![primary, secondary];
        let scores = primary_record_scores(&batch, alignment_score, suboptimal_score).unwrap();
        assert_eq!(scores, ScorePair::new(198, 126));

        assert_eq!(
            primary_record_scores(&[], alignment_score, suboptimal_score),
            Err(ScoreError::NoPrimaryAlignment)
        );
        let two = vec![
            mapped_record("50M", &[(b"AS", 1)]),
            mapped_record("50M", &[(b"AS", 2)]),
        ];
        assert_eq!(
            primary_record_scores(&two, alignment_score, suboptimal_score),
            Err(ScoreError::MultiplePrimaryAlignments)
        );
    }

    #[test]
    fn max_scores_takes_lexicographic_maximum() {
        let batch = vec![
            mapped_record("50M", &[(b"AS", 150), (b"XS", 149)]),
            mapped_record("50M", &[(b"AS", 198), (b"XS", 126)]),
            mapped_record("50M", &[(b"AS", 198), (b"XS", 50)]),
        ];
        let scores = max_scores(&batch, alignment_score, suboptimal_score);
        assert_eq!(scores, ScorePair::new(198, 126));
    }

    #[test]
    fn max_scores_on_empty_batch_is_empty_pair() {
        assert_eq!(
            max_scores([], alignment_score, suboptimal_score),
            ScorePair::EMPTY
        );
        assert_eq!(max_scores([], cigar_score, no_score), ScorePair::EMPTY);
    }

    #[test]
    fn strand_scores_empty_is_degraded_not_fatal() {
        let scoring = Scoring::default();
        assert_eq!(scoring.strand_scores(&[]).unwrap(), ScorePair::EMPTY);
    }

    #[test]
    fn spliced_tags_read_zs() {
        let mut record = mapped_record("50M", &[(b"AS", 100)]);
        record.push_aux(b"ZS", Aux::I32(90)).unwrap();
        record.push_aux(b"XS", Aux::I32(10)).unwrap();
        assert_eq!(ScoreTags::Spliced.second(&record), 90);
        assert_eq!(ScoreTags::Standard.second(&record), 10);
    }
}
