//! Train/test splitting that preserves entity and relation coverage.
//!
//! Rank-based evaluation requires every test identifier to have an
//! embedding, i.e. to occur in the training set. A uniform random split
//! does not guarantee that; [`train_test_split_no_unseen`] does.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{Error, Result, Triple};

/// Requested test-set size: an absolute triple count or a fraction of the
/// input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestSize {
    /// Exact number of test triples.
    Count(usize),
    /// Fraction of the input, in (0, 1).
    Fraction(f64),
}

impl From<usize> for TestSize {
    fn from(n: usize) -> Self {
        Self::Count(n)
    }
}

impl From<f64> for TestSize {
    fn from(f: f64) -> Self {
        Self::Fraction(f)
    }
}

impl TestSize {
    fn resolve(self, total: usize) -> Result<usize> {
        let target = match self {
            Self::Count(n) => n,
            Self::Fraction(f) => {
                if !(0.0..1.0).contains(&f) || f <= 0.0 {
                    return Err(Error::InvalidArgument(format!(
                        "test fraction must be in (0, 1), got {f}"
                    )));
                }
                (f * total as f64).round() as usize
            }
        };
        if target == 0 || target >= total {
            return Err(Error::InvalidArgument(format!(
                "test_size must select between 1 and {} triples, resolved to {target}",
                total - 1
            )));
        }
        Ok(target)
    }
}

/// Split `triples` into train and test so that every entity and relation
/// appearing in test also appears in train.
///
/// Candidates are visited in a seed-shuffled order; a triple moves to test
/// only if removing it from train leaves at least one other occurrence of
/// its subject, object and predicate. When the requested size cannot be
/// reached this way the call fails with [`Error::InfeasibleSplit`], unless
/// `allow_duplication` is set, in which case the shortfall is covered by
/// triples placed in test *and* kept in train — the combined output is
/// then larger than the input.
///
/// Deterministic for a given `(input, test_size, seed)`.
///
/// # Example
///
/// ```rust
/// use vektra_core::{train_test_split_no_unseen, Triple};
///
/// let x: Vec<Triple> = vec![
///     ("a", "y", "b").into(),
///     ("a", "y", "c").into(),
///     ("c", "y", "a").into(),
///     ("d", "y", "e").into(),
///     ("e", "y", "f").into(),
///     ("f", "y", "c").into(),
///     ("f", "y", "c").into(),
/// ];
/// let (train, test) = train_test_split_no_unseen(&x, 2usize, 0, false).unwrap();
/// assert_eq!(train.len(), 5);
/// assert_eq!(test.len(), 2);
/// ```
pub fn train_test_split_no_unseen(
    triples: &[Triple],
    test_size: impl Into<TestSize>,
    seed: u64,
    allow_duplication: bool,
) -> Result<(Vec<Triple>, Vec<Triple>)> {
    if triples.is_empty() {
        return Err(Error::EmptyInput("train_test_split_no_unseen"));
    }
    let target = test_size.into().resolve(triples.len())?;

    let mut ent_count: HashMap<&str, usize> = HashMap::new();
    let mut rel_count: HashMap<&str, usize> = HashMap::new();
    for t in triples {
        *ent_count.entry(t.subject.as_str()).or_insert(0) += 1;
        *ent_count.entry(t.object.as_str()).or_insert(0) += 1;
        *rel_count.entry(t.predicate.as_str()).or_insert(0) += 1;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..triples.len()).collect();
    order.shuffle(&mut rng);

    let mut in_test = vec![false; triples.len()];
    let mut picked = 0usize;

    for &i in &order {
        if picked == target {
            break;
        }
        let t = &triples[i];
        // A self-loop consumes two occurrences of the same entity.
        let need_subj = if t.subject == t.object { 2 } else { 1 };
        let removable = ent_count[t.subject.as_str()] > need_subj
            && (t.subject == t.object || ent_count[t.object.as_str()] > 1)
            && rel_count[t.predicate.as_str()] > 1;
        if removable {
            in_test[i] = true;
            picked += 1;
            *ent_count.get_mut(t.subject.as_str()).unwrap() -= 1;
            *ent_count.get_mut(t.object.as_str()).unwrap() -= 1;
            *rel_count.get_mut(t.predicate.as_str()).unwrap() -= 1;
        }
    }

    let mut test: Vec<Triple> = triples
        .iter()
        .zip(&in_test)
        .filter(|(_, &is_test)| is_test)
        .map(|(t, _)| t.clone())
        .collect();

    if picked < target {
        if !allow_duplication {
            return Err(Error::InfeasibleSplit);
        }
        // Cover the shortfall with triples that stay in train as well.
        let shortfall = target - picked;
        let duplicated: Vec<Triple> = order
            .iter()
            .filter(|&&i| !in_test[i])
            .take(shortfall)
            .map(|&i| triples[i].clone())
            .collect();
        test.extend(duplicated);
    }

    let train: Vec<Triple> = triples
        .iter()
        .zip(&in_test)
        .filter(|(_, &is_test)| !is_test)
        .map(|(t, _)| t.clone())
        .collect();

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn toy_graph() -> Vec<Triple> {
        vec![
            Triple::new("a", "y", "b"),
            Triple::new("a", "y", "c"),
            Triple::new("c", "y", "a"),
            Triple::new("d", "y", "e"),
            Triple::new("e", "y", "f"),
            Triple::new("f", "y", "c"),
            Triple::new("f", "y", "c"),
        ]
    }

    fn coverage_holds(train: &[Triple], test: &[Triple]) -> bool {
        let train_ents: HashSet<&str> = train
            .iter()
            .flat_map(|t| [t.subject.as_str(), t.object.as_str()])
            .collect();
        let train_rels: HashSet<&str> = train.iter().map(|t| t.predicate.as_str()).collect();
        test.iter().all(|t| {
            train_ents.contains(t.subject.as_str())
                && train_ents.contains(t.object.as_str())
                && train_rels.contains(t.predicate.as_str())
        })
    }

    #[test]
    fn test_split_counts_and_coverage() {
        let x = toy_graph();
        let (train, test) = train_test_split_no_unseen(&x, 2usize, 0, false).unwrap();

        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 2);
        assert!(coverage_holds(&train, &test));
    }

    #[test]
    fn test_split_is_deterministic() {
        let x = toy_graph();
        let a = train_test_split_no_unseen(&x, 2usize, 7, false).unwrap();
        let b = train_test_split_no_unseen(&x, 2usize, 7, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_infeasible_without_duplication() {
        let x = toy_graph();
        // 6 of 7 triples in test cannot preserve coverage.
        assert!(matches!(
            train_test_split_no_unseen(&x, 6usize, 0, false),
            Err(Error::InfeasibleSplit)
        ));
    }

    #[test]
    fn test_split_duplication_grows_output() {
        let x = toy_graph();
        let (train, test) = train_test_split_no_unseen(&x, 6usize, 0, true).unwrap();

        assert_eq!(test.len(), 6);
        assert!(train.len() + test.len() > x.len());
        assert!(coverage_holds(&train, &test));
    }

    #[test]
    fn test_split_fraction_form() {
        let x = toy_graph();
        // ~29% of 7 rounds to 2 test triples.
        let (train, test) = train_test_split_no_unseen(&x, 0.29, 0, false).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 5);
    }

    #[test]
    fn test_split_rejects_degenerate_sizes() {
        let x = toy_graph();
        assert!(train_test_split_no_unseen(&x, 0usize, 0, false).is_err());
        assert!(train_test_split_no_unseen(&x, 7usize, 0, false).is_err());
        assert!(train_test_split_no_unseen(&x, 1.5, 0, false).is_err());
    }
}
