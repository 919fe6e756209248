//! The six-state mapping decision procedure.

use std::fmt;

use thiserror::Error;

use super::score::{Score, ScorePair, NO_SCORE};

/// Which of the two reference genomes a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Genome {
    /// The genome of interest (e.g. the graft species).
    Primary,
    /// The contaminating or co-sequenced genome (e.g. the host species).
    Secondary,
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Genome::Primary => f.write_str("primary"),
            Genome::Secondary => f.write_str("secondary"),
        }
    }
}

/// Mapping state of one strand of a fragment, and equally the final
/// category of a whole fragment.
///
/// Variants are declared in resolution-priority order, most confident
/// first; the derived `Ord` is that priority, so `a.min(b)` is the more
/// confident of two states. The same order indexes the output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MappingState {
    /// Maps to a unique location in the primary genome only.
    PrimarySpecific,
    /// Maps to a unique location in the secondary genome only.
    SecondarySpecific,
    /// Maps better in the primary genome but to multiple locations.
    PrimaryMulti,
    /// Maps better in the secondary genome but to multiple locations.
    SecondaryMulti,
    /// Maps equally well in both genomes.
    Unresolved,
    /// No valid mapping in either genome.
    Unassigned,
}

impl MappingState {
    /// All six states in priority order.
    pub const ALL: [MappingState; 6] = [
        MappingState::PrimarySpecific,
        MappingState::SecondarySpecific,
        MappingState::PrimaryMulti,
        MappingState::SecondaryMulti,
        MappingState::Unresolved,
        MappingState::Unassigned,
    ];

    /// Dense index of this state, usable as an array offset.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The genome this state attributes the read to, if any.
    pub fn genome(self) -> Option<Genome> {
        match self {
            MappingState::PrimarySpecific | MappingState::PrimaryMulti => Some(Genome::Primary),
            MappingState::SecondarySpecific | MappingState::SecondaryMulti => {
                Some(Genome::Secondary)
            }
            MappingState::Unresolved | MappingState::Unassigned => None,
        }
    }

    /// Stable lowercase name, used in summaries and output file names.
    pub fn name(self) -> &'static str {
        match self {
            MappingState::PrimarySpecific => "primary_specific",
            MappingState::SecondarySpecific => "secondary_specific",
            MappingState::PrimaryMulti => "primary_multi",
            MappingState::SecondaryMulti => "secondary_multi",
            MappingState::Unresolved => "unresolved",
            MappingState::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for MappingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the decision procedure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// The score combination escaped the decision table. Unreachable for
    /// integer scores; reported rather than panicking.
    #[error(
        "mapping state decision table has no entry for scores \
         ({best1}, {second1}, {best2}, {second2}) with floor {min_score}"
    )]
    DecisionGap {
        /// Best primary-genome score.
        best1: Score,
        /// Second-best primary-genome score.
        second1: Score,
        /// Best secondary-genome score.
        best2: Score,
        /// Second-best secondary-genome score.
        second2: Score,
        /// Exclusive validity floor in effect.
        min_score: Score,
    },
}

/// Decide the mapping state of one strand from its score pairs in both
/// genomes.
///
/// `min_score` is an exclusive floor: scores less than or equal to it are
/// treated as "no valid mapping". A winning genome is called *specific*
/// when its second-best score is absent ([`NO_SCORE`]) or strictly below
/// its best; the losing genome's second-best never participates. The first
/// matching rule wins:
///
/// 1. both bests at or below the floor: [`MappingState::Unassigned`]
/// 2. primary above the floor and strictly better (or secondary below the
///    floor): primary-specific or primary-multi
/// 3. equal bests, both above the floor: [`MappingState::Unresolved`]
/// 4. mirror of rule 2 for the secondary genome
pub fn mapping_state(
    primary: ScorePair,
    secondary: ScorePair,
    min_score: Score,
) -> Result<MappingState, ClassifyError> {
    let ScorePair {
        best: best1,
        second: second1,
    } = primary;
    let ScorePair {
        best: best2,
        second: second2,
    } = secondary;

    if best1 <= min_score && best2 <= min_score {
        Ok(MappingState::Unassigned)
    } else if best1 > min_score && (best2 <= min_score || best1 > best2) {
        if second1 == NO_SCORE || best1 > second1 {
            Ok(MappingState::PrimarySpecific)
        } else {
            Ok(MappingState::PrimaryMulti)
        }
    } else if best1 == best2 {
        Ok(MappingState::Unresolved)
    } else if best2 > min_score && (best1 <= min_score || best2 > best1) {
        if second2 == NO_SCORE || best2 > second2 {
            Ok(MappingState::SecondarySpecific)
        } else {
            Ok(MappingState::SecondaryMulti)
        }
    } else {
        Err(ClassifyError::DecisionGap {
            best1,
            second1,
            best2,
            second2,
            min_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MappingState::*;
    use super::*;
    use test_case::test_case;

    const M: Score = NO_SCORE;

    #[test_case(200, 199, 199, 198, M => PrimarySpecific; "clear primary winner")]
    #[test_case(200, 200, 199, 198, M => PrimaryMulti; "primary winner multimaps")]
    #[test_case(199, 198, 200, 198, M => SecondarySpecific; "clear secondary winner")]
    #[test_case(199, 198, 200, 200, M => SecondaryMulti; "secondary winner multimaps")]
    #[test_case(M, M, M, M, M => Unassigned; "nothing mapped")]
    #[test_case(200, 199, 200, 198, M => Unresolved; "equal bests")]
    #[test_case(200, 199, 199, 199, M => PrimarySpecific; "loser seconds ignored")]
    #[test_case(200, 200, 199, 199, M => PrimaryMulti; "tie with own second")]
    #[test_case(199, 199, 200, 199, M => SecondarySpecific; "secondary unique win")]
    #[test_case(199, 199, 200, 200, M => SecondaryMulti; "secondary tie with own second")]
    #[test_case(9, 8, 8, 8, 10 => Unassigned; "floor masks both")]
    #[test_case(200, 200, 200, 200, M => Unresolved; "four-way tie")]
    #[test_case(-6, M, M, M, M => PrimarySpecific; "negative score still valid")]
    #[test_case(M, M, -6, M, M => SecondarySpecific; "secondary only")]
    #[test_case(-6, M, -2, M, M => SecondarySpecific; "less negative wins")]
    #[test_case(0, M, -2, M, M => PrimarySpecific; "zero beats negative")]
    #[test_case(-2, M, 0, M, M => SecondarySpecific; "zero best is a real score")]
    fn decision_table(
        best1: Score,
        second1: Score,
        best2: Score,
        second2: Score,
        min_score: Score,
    ) -> MappingState {
        mapping_state(
            ScorePair::new(best1, second1),
            ScorePair::new(best2, second2),
            min_score,
        )
        .unwrap()
    }

    #[test]
    fn floor_is_exclusive() {
        // best1 exactly at the floor is invalid, so the secondary wins.
        let state = mapping_state(ScorePair::new(10, M), ScorePair::new(11, M), 10).unwrap();
        assert_eq!(state, SecondarySpecific);
        // Both at the floor: nothing valid at all.
        let state = mapping_state(ScorePair::new(10, M), ScorePair::new(10, M), 10).unwrap();
        assert_eq!(state, Unassigned);
    }

    #[test]
    fn second_best_of_zero_counts_as_competition() {
        // A second-best of 0 is a real competing score, not "absent".
        let state = mapping_state(ScorePair::new(0, 0), ScorePair::new(M, M), M).unwrap();
        assert_eq!(state, PrimaryMulti);
    }

    #[test]
    fn priority_order_matches_declaration() {
        assert!(PrimarySpecific < SecondarySpecific);
        assert!(SecondarySpecific < PrimaryMulti);
        assert!(PrimaryMulti < SecondaryMulti);
        assert!(SecondaryMulti < Unresolved);
        assert!(Unresolved < Unassigned);
    }

    #[test]
    fn genome_attribution() {
        assert_eq!(PrimarySpecific.genome(), Some(Genome::Primary));
        assert_eq!(PrimaryMulti.genome(), Some(Genome::Primary));
        assert_eq!(SecondarySpecific.genome(), Some(Genome::Secondary));
        assert_eq!(SecondaryMulti.genome(), Some(Genome::Secondary));
        assert_eq!(Unresolved.genome(), None);
        assert_eq!(Unassigned.genome(), None);
    }
}
