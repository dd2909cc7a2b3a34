//! Negative triple generation.
//!
//! Knowledge graphs only record true facts, so negatives are synthesized by
//! *corrupting* a true triple: replacing its subject or object with another
//! candidate entity. Two regimes with different requirements:
//!
//! | Path | Randomness | Filtering | Used by |
//! |------|------------|-----------|---------|
//! | [`generate_corruptions_for_fit`] | seeded, uniform | none | training loops |
//! | [`generate_corruptions_for_eval`] | none | optional | ranking evaluation |
//!
//! Training corruptions are sampled and may coincidentally reproduce a true
//! triple; that false-negative noise is tolerated statistically and no
//! resampling happens on collision. Evaluation corruptions enumerate the
//! whole candidate pool deterministically and may be filtered against known
//! true triples ("filtered" protocol).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use vektra_core::IndexedTriple;

use crate::{Error, Result};

/// Which triple position(s) to corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorruptSide {
    /// Replace the subject (`"s"`).
    Subject,
    /// Replace the object (`"o"`).
    Object,
    /// Corrupt subject and object separately, splitting the budget between
    /// them (`"s,o"`).
    Both,
    /// Replace subject and object within the same corruption (`"s+o"`).
    Joint,
}

impl FromStr for CorruptSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s" => Ok(Self::Subject),
            "o" => Ok(Self::Object),
            "s,o" => Ok(Self::Both),
            "s+o" => Ok(Self::Joint),
            other => Err(Error::InvalidArgument(format!(
                "unknown corruption side `{other}`; expected one of s, o, s,o, s+o"
            ))),
        }
    }
}

impl fmt::Display for CorruptSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Subject => "s",
            Self::Object => "o",
            Self::Both => "s,o",
            Self::Joint => "s+o",
        };
        write!(f, "{s}")
    }
}

/// Fast membership structure over known-true triples.
///
/// Built once per evaluation call from the union of the splits the caller
/// wants filtered out, then discarded.
#[derive(Debug, Clone, Default)]
pub struct TripleFilter {
    set: HashSet<IndexedTriple>,
}

impl TripleFilter {
    /// Build from any sequence of indexed triples.
    pub fn from_triples(triples: impl IntoIterator<Item = IndexedTriple>) -> Self {
        Self {
            set: triples.into_iter().collect(),
        }
    }

    /// Whether `triple` is a known true triple.
    pub fn contains(&self, triple: &IndexedTriple) -> bool {
        self.set.contains(triple)
    }

    /// Number of distinct known triples.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the filter is empty.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl FromIterator<IndexedTriple> for TripleFilter {
    fn from_iter<I: IntoIterator<Item = IndexedTriple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

/// Expand `Both` into its per-corruption cycle; other sides pass through.
fn side_cycle(sides: &[CorruptSide]) -> Vec<CorruptSide> {
    sides
        .iter()
        .flat_map(|s| match s {
            CorruptSide::Both => vec![CorruptSide::Subject, CorruptSide::Object],
            other => vec![*other],
        })
        .collect()
}

/// Generate `eta` random corruptions per positive for training.
///
/// For each positive triple, `eta` negatives are produced by drawing a
/// replacement entity uniformly from `entity_pool`. The side to corrupt
/// cycles round-robin through `sides` (with `"s,o"` expanding to subject
/// then object, so an odd budget gives the subject the extra draw);
/// `"s+o"` replaces both positions with independent draws in a single
/// corruption.
///
/// Output length is exactly `batch.len() * eta`, grouped per positive in
/// input order. Draws may reproduce the true entity; training tolerates
/// those false negatives, so there is no resampling on collision.
/// Reproducible for a fixed seed.
pub fn generate_corruptions_for_fit(
    batch: &[IndexedTriple],
    eta: usize,
    sides: &[CorruptSide],
    entity_pool: &[usize],
    rng: &mut ChaCha8Rng,
) -> Result<Vec<IndexedTriple>> {
    if eta == 0 {
        return Err(Error::InvalidArgument("eta must be at least 1".into()));
    }
    if sides.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one corruption side is required".into(),
        ));
    }
    if entity_pool.is_empty() {
        return Err(Error::InvalidArgument(
            "entity pool for corruption is empty".into(),
        ));
    }

    let cycle = side_cycle(sides);
    let mut out = Vec::with_capacity(batch.len() * eta);

    for positive in batch {
        for i in 0..eta {
            let side = cycle[i % cycle.len()];
            let corrupted = match side {
                CorruptSide::Subject => {
                    positive.with_subject(entity_pool[rng.gen_range(0..entity_pool.len())])
                }
                CorruptSide::Object => {
                    positive.with_object(entity_pool[rng.gen_range(0..entity_pool.len())])
                }
                CorruptSide::Joint => positive
                    .with_subject(entity_pool[rng.gen_range(0..entity_pool.len())])
                    .with_object(entity_pool[rng.gen_range(0..entity_pool.len())]),
                // expanded by side_cycle
                CorruptSide::Both => unreachable!(),
            };
            out.push(corrupted);
        }
    }

    Ok(out)
}

/// Enumerate evaluation corruptions for one triple.
///
/// For each requested side, every entity in `candidates` is substituted
/// into that position, producing one candidate per entity. With a filter,
/// candidates that are themselves known true triples are removed — except
/// the true triple itself, which always survives so the candidate set can
/// never lose its one correct answer. When both sides are requested the
/// subject block comes first, then the object block.
///
/// Deterministic: output order follows `candidates` order.
pub fn generate_corruptions_for_eval(
    triple: IndexedTriple,
    candidates: &[usize],
    filter: Option<&TripleFilter>,
    side: CorruptSide,
) -> Vec<IndexedTriple> {
    let both = matches!(side, CorruptSide::Both | CorruptSide::Joint);
    let mut out = Vec::with_capacity(if both {
        candidates.len() * 2
    } else {
        candidates.len()
    });

    if both || side == CorruptSide::Subject {
        extend_side(&mut out, triple, candidates, filter, CorruptSide::Subject);
    }
    if both || side == CorruptSide::Object {
        extend_side(&mut out, triple, candidates, filter, CorruptSide::Object);
    }

    out
}

fn extend_side(
    out: &mut Vec<IndexedTriple>,
    triple: IndexedTriple,
    candidates: &[usize],
    filter: Option<&TripleFilter>,
    side: CorruptSide,
) {
    for &entity in candidates {
        let candidate = match side {
            CorruptSide::Subject => triple.with_subject(entity),
            CorruptSide::Object => triple.with_object(entity),
            _ => unreachable!(),
        };
        // The true triple is kept even when present in the filter.
        if candidate != triple {
            if let Some(f) = filter {
                if f.contains(&candidate) {
                    continue;
                }
            }
        }
        out.push(candidate);
    }
}
