//! Rank aggregation metrics.
//!
//! All metrics are pure functions over a flat sequence of 1-based ranks:
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | MR | [1, inf) | Mean Rank: average rank |
//! | MRR | (0, 1] | Mean Reciprocal Rank: average of 1/rank |
//! | Hits@N | [0, 1] | Fraction of ranks at or below N |
//!
//! Empty input and zero ranks are errors, never silent NaN.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Error, Result};

fn validate(ranks: &[usize]) -> Result<()> {
    if ranks.is_empty() {
        return Err(Error::EmptyRanks);
    }
    if let Some(pos) = ranks.iter().position(|&r| r == 0) {
        return Err(Error::InvalidRank(pos));
    }
    Ok(())
}

/// Mean Rank: arithmetic mean of the ranks.
pub fn mr_score(ranks: &[usize]) -> Result<f64> {
    validate(ranks)?;
    Ok(ranks.iter().map(|&r| r as f64).sum::<f64>() / ranks.len() as f64)
}

/// Mean Reciprocal Rank: mean of `1 / rank`.
pub fn mrr_score(ranks: &[usize]) -> Result<f64> {
    validate(ranks)?;
    Ok(ranks.iter().map(|&r| 1.0 / r as f64).sum::<f64>() / ranks.len() as f64)
}

/// Hits@N: fraction of ranks at or below `n`.
pub fn hits_at_n_score(ranks: &[usize], n: usize) -> Result<f64> {
    validate(ranks)?;
    if n == 0 {
        return Err(Error::InvalidArgument(
            "hits_at_n_score requires n >= 1".into(),
        ));
    }
    Ok(ranks.iter().filter(|&&r| r <= n).count() as f64 / ranks.len() as f64)
}

/// Aggregate rank-based evaluation results.
#[derive(Debug, Clone, Serialize)]
pub struct RankMetrics {
    /// Mean Reciprocal Rank.
    pub mrr: f64,
    /// Mean Rank.
    pub mr: f64,
    /// Hits@1.
    pub hits_1: f64,
    /// Hits@3.
    pub hits_3: f64,
    /// Hits@10.
    pub hits_10: f64,
    /// Number of ranks aggregated.
    pub num_ranks: usize,
}

impl RankMetrics {
    /// Compute all standard metrics from a rank sequence.
    pub fn from_ranks(ranks: &[usize]) -> Result<Self> {
        Ok(Self {
            mrr: mrr_score(ranks)?,
            mr: mr_score(ranks)?,
            hits_1: hits_at_n_score(ranks, 1)?,
            hits_3: hits_at_n_score(ranks, 3)?,
            hits_10: hits_at_n_score(ranks, 10)?,
            num_ranks: ranks.len(),
        })
    }

    /// Metrics as a mapping with fixed keys
    /// (`mrr`, `mr`, `hits_1`, `hits_3`, `hits_10`).
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("mrr", self.mrr),
            ("mr", self.mr),
            ("hits_1", self.hits_1),
            ("hits_3", self.hits_3),
            ("hits_10", self.hits_10),
        ])
    }

    /// Format as a summary string.
    pub fn summary(&self) -> String {
        format!(
            "MRR: {:.4} | MR: {:.1} | H@1: {:.3} | H@3: {:.3} | H@10: {:.3} (n={})",
            self.mrr, self.mr, self.hits_1, self.hits_3, self.hits_10, self.num_ranks
        )
    }
}
