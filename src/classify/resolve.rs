//! Combining the forward and reverse states of a fragment.

use super::state::MappingState;

/// Policy for combining a fragment's forward state with its optional
/// reverse state into one category.
///
/// Both policies are total over the full state grid; a fragment with no
/// reverse reads keeps its forward state unchanged under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairPolicy {
    /// Take whichever end carries the more confident signal, in the
    /// priority order of [`MappingState`]'s declaration. An end that is
    /// specific in one genome outranks any multimap or ambiguous call on
    /// the other end.
    Priority,
    /// Require corroboration from both ends. Any unassigned end makes the
    /// fragment unassigned; any unresolved end, or disagreement between
    /// the ends about the genome, makes it unresolved. Only when both
    /// ends agree on the genome does specificity resolve the category.
    Conservative,
}

impl PairPolicy {
    /// Combine the two strand states into the fragment category.
    pub fn resolve(self, forward: MappingState, reverse: Option<MappingState>) -> MappingState {
        let Some(reverse) = reverse else {
            return forward;
        };
        match self {
            PairPolicy::Priority => forward.min(reverse),
            PairPolicy::Conservative => conservative(forward, reverse),
        }
    }
}

fn conservative(forward: MappingState, reverse: MappingState) -> MappingState {
    use MappingState::{Unassigned, Unresolved};
    if forward == Unassigned || reverse == Unassigned {
        return Unassigned;
    }
    if forward == Unresolved || reverse == Unresolved || forward.genome() != reverse.genome() {
        return Unresolved;
    }
    // Same genome on both ends: the more specific call stands.
    forward.min(reverse)
}
