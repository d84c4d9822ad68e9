//! Picks, among several candidate routes, the one closest to the route
//! being replaced, so guidance changes as little as possible.

use crate::route::Route;

/// Levenshtein distance between two strings, counted in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Index of the candidate whose description is closest to `prior`'s.
/// The first candidate wins ties. None when there are no candidates.
pub fn most_similar(prior: &Route, candidates: &[Route]) -> Option<usize> {
    let reference = prior.description();
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, candidate)| edit_distance(&reference, &candidate.description()))
        .map(|(index, _)| index)
}
