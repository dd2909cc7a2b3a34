//! Triple types for knowledge graphs.
//!
//! A triple is a (subject, predicate, object) statement. It exists in two
//! forms: [`Triple`] carries the raw string identifiers, [`IndexedTriple`]
//! carries dense indices assigned by a [`Vocabulary`](crate::Vocabulary)
//! pair. Index form is only meaningful relative to the vocabularies that
//! produced it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// A (subject, predicate, object) statement in raw string form.
///
/// # Example
///
/// ```rust
/// use vektra_core::Triple;
///
/// let triple = Triple::new("Apple", "founded_by", "Steve Jobs");
/// assert_eq!(triple.subject, "Apple");
/// assert_eq!(triple.predicate, "founded_by");
/// assert_eq!(triple.object, "Steve Jobs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject entity.
    pub subject: String,

    /// Predicate (relation type).
    pub predicate: String,

    /// Object entity.
    pub object: String,
}

impl Triple {
    /// Create a new triple.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Build a triple from a raw record, e.g. one row of a TSV file.
    ///
    /// Fails unless the row has exactly three columns.
    pub fn from_row(row: &[String]) -> Result<Self> {
        if row.len() != 3 {
            return Err(Error::MalformedTriple(row.len()));
        }
        Ok(Self::new(row[0].clone(), row[1].clone(), row[2].clone()))
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

impl From<(&str, &str, &str)> for Triple {
    fn from((s, p, o): (&str, &str, &str)) -> Self {
        Self::new(s, p, o)
    }
}

/// A triple in dense-index form.
///
/// Indices refer to the [`Vocabulary`](crate::Vocabulary) pair that produced
/// them and are stable only for that pair's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedTriple {
    /// Subject entity index.
    pub subject: usize,

    /// Relation index.
    pub predicate: usize,

    /// Object entity index.
    pub object: usize,
}

impl IndexedTriple {
    /// Create a new indexed triple.
    pub fn new(subject: usize, predicate: usize, object: usize) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Copy with the subject replaced.
    pub fn with_subject(self, subject: usize) -> Self {
        Self { subject, ..self }
    }

    /// Copy with the object replaced.
    pub fn with_object(self, object: usize) -> Self {
        Self { object, ..self }
    }
}

impl From<[usize; 3]> for IndexedTriple {
    fn from([s, p, o]: [usize; 3]) -> Self {
        Self::new(s, p, o)
    }
}

impl From<IndexedTriple> for [usize; 3] {
    fn from(t: IndexedTriple) -> Self {
        [t.subject, t.predicate, t.object]
    }
}

impl fmt::Display for IndexedTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.subject, self.predicate, self.object)
    }
}
