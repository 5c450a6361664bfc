//! Path consistency checks
//!
//! Decides whether an observed path could be the output of hop injection
//! applied to a given optimal path: every optimal node must be present, in
//! order, with at most one foreign node spliced between each consecutive
//! pair, and both paths must end together.

use std::collections::HashSet;
use std::hash::Hash;

/// Check whether `observed` could NOT have been derived from `optimal`
///
/// Returns `true` when hop injection cannot explain `observed`.
pub fn is_impossible_modification<I: Eq + Hash>(observed: &[I], optimal: &[I]) -> bool {
    if observed.is_empty() || optimal.is_empty() {
        return observed.len() != optimal.len();
    }

    // Injection only adds nodes; the optimal path must be fully contained
    let observed_nodes: HashSet<&I> = observed.iter().collect();
    if optimal.iter().any(|node| !observed_nodes.contains(node)) {
        return true;
    }

    // Nothing is ever spliced in front of the first node
    if observed[0] != optimal[0] {
        return true;
    }

    let (mut i, mut j) = (1, 1);
    while i < optimal.len() && j < observed.len() {
        if observed[j] == optimal[i] {
            i += 1;
            j += 1;
        } else if j + 1 >= observed.len() || observed[j + 1] != optimal[i] {
            // observed[j] is not a spliced hop: the path does not rejoin
            return true;
        } else {
            i += 1;
            j += 2;
        }
    }

    // Both sequences must be exhausted in lockstep
    j < observed.len() || i < optimal.len()
}

/// Check whether `observed` could have been derived from `optimal`
pub fn could_be_modification<I: Eq + Hash>(observed: &[I], optimal: &[I]) -> bool {
    !is_impossible_modification(observed, optimal)
}
