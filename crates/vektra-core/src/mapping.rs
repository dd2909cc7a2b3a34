//! String-to-index vocabularies built from triple sets.
//!
//! Embedding models and the evaluation protocol operate on dense integer
//! indices. A [`Vocabulary`] assigns those indices in order of first
//! appearance, so a given input ordering always produces the same mapping.
//! Entities and relations get separate vocabularies.

use std::collections::HashMap;

use tracing::warn;

use crate::{Error, IndexedTriple, Result, Triple};

/// Bijection between string identifiers and dense integer indices.
///
/// Built once from a triple set and immutable afterwards. Indices are
/// assigned in order of first appearance and are stable only within one
/// instance's lifetime; two vocabularies built from differently ordered
/// inputs assign different indices.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    labels: Vec<String>,
}

impl Vocabulary {
    fn insert(&mut self, label: &str) {
        if !self.index.contains_key(label) {
            self.index.insert(label.to_string(), self.labels.len());
            self.labels.push(label.to_string());
        }
    }

    /// Index assigned to `label`, if present.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Label stored at `idx`, if in range.
    pub fn label_of(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    /// Whether `label` is part of this vocabulary.
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels, in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Build `(relations, entities)` vocabularies from a triple set.
///
/// Indices follow first appearance. Entities are visited subject first,
/// then object, per triple, so for
/// `[[a,x,b], [c,x,d]]` the entity order is `a, b, c, d`.
///
/// Fails on an empty input.
pub fn create_mappings(triples: &[Triple]) -> Result<(Vocabulary, Vocabulary)> {
    if triples.is_empty() {
        return Err(Error::EmptyInput("create_mappings"));
    }

    let mut relations = Vocabulary::default();
    let mut entities = Vocabulary::default();

    for t in triples {
        entities.insert(&t.subject);
        relations.insert(&t.predicate);
        entities.insert(&t.object);
    }

    Ok((relations, entities))
}

/// Convert raw triples to index form.
///
/// Every identifier must already be present in the vocabularies; an
/// unmapped identifier is an error, not a silent skip. Use
/// [`filter_unseen_entities`] first when the input may contain identifiers
/// outside the vocabulary.
pub fn to_idx(
    triples: &[Triple],
    entities: &Vocabulary,
    relations: &Vocabulary,
) -> Result<Vec<IndexedTriple>> {
    triples
        .iter()
        .map(|t| {
            let s = entities
                .index_of(&t.subject)
                .ok_or_else(|| Error::UnknownEntity(t.subject.clone()))?;
            let p = relations
                .index_of(&t.predicate)
                .ok_or_else(|| Error::UnknownRelation(t.predicate.clone()))?;
            let o = entities
                .index_of(&t.object)
                .ok_or_else(|| Error::UnknownEntity(t.object.clone()))?;
            Ok(IndexedTriple::new(s, p, o))
        })
        .collect()
}

/// Keep only triples whose subject, predicate and object are all present
/// in the vocabularies.
///
/// With `strict = false`, offending triples are dropped and a warning is
/// emitted with the count. With `strict = true`, any offending triple is
/// an error instead. Run this before evaluation or calibration so unseen
/// identifiers never reach index-based operations.
pub fn filter_unseen_entities(
    triples: &[Triple],
    entities: &Vocabulary,
    relations: &Vocabulary,
    strict: bool,
) -> Result<Vec<Triple>> {
    let (seen, unseen): (Vec<_>, Vec<_>) = triples.iter().partition(|t| {
        entities.contains(&t.subject)
            && relations.contains(&t.predicate)
            && entities.contains(&t.object)
    });

    if !unseen.is_empty() {
        if strict {
            return Err(Error::UnseenEntities(unseen.len()));
        }
        warn!(
            dropped = unseen.len(),
            "dropping triples with identifiers outside the vocabulary"
        );
    }

    Ok(seen.into_iter().cloned().collect())
}
