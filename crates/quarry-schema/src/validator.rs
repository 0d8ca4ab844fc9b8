//! Allow-list decisions for extracted labels and relationship types.
//!
//! Labels fail open: an unknown label is replaced by [`FALLBACK_LABEL`] so the
//! entity is still captured. Relationship types fail closed: an unknown type
//! is rejected and never substituted.
//!
//! [`Label`] and [`RelationshipType`] can only be produced here, which makes
//! them the only values a query template may embed.

use std::fmt;

use serde::Serialize;

use crate::allowlist::AllowList;

/// Generic label for entities whose extracted type is not allow-listed.
pub const FALLBACK_LABEL: &str = "Entity";

/// A node label that passed the allow-list (or is the fallback).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn fallback() -> Self {
        Self(FALLBACK_LABEL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_LABEL
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A relationship type that passed the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RelationshipType(String);

impl RelationshipType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A property key allowed on a given label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PropertyKey(String);

impl PropertyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of [`validate_label`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelDecision {
    /// The candidate is allow-listed and is used unchanged.
    Accepted(Label),
    /// The candidate is unknown; the fallback label is used instead.
    Fallback { candidate: String, label: Label },
}

impl LabelDecision {
    pub fn label(&self) -> &Label {
        match self {
            LabelDecision::Accepted(label) => label,
            LabelDecision::Fallback { label, .. } => label,
        }
    }

    pub fn into_label(self) -> Label {
        match self {
            LabelDecision::Accepted(label) => label,
            LabelDecision::Fallback { label, .. } => label,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, LabelDecision::Fallback { .. })
    }
}

/// A relationship type outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown relationship type: {0:?}")]
pub struct UnknownRelationshipType(pub String);

/// Check a candidate node label. Exact match only.
pub fn validate_label(candidate: &str, allow_list: &AllowList) -> LabelDecision {
    if allow_list.contains_label(candidate) {
        LabelDecision::Accepted(Label(candidate.to_string()))
    } else {
        LabelDecision::Fallback {
            candidate: candidate.to_string(),
            label: Label::fallback(),
        }
    }
}

/// Check a candidate relationship type. Exact match only; unknown types fail.
pub fn validate_relationship_type(
    candidate: &str,
    allow_list: &AllowList,
) -> Result<RelationshipType, UnknownRelationshipType> {
    if allow_list.contains_relationship_type(candidate) {
        Ok(RelationshipType(candidate.to_string()))
    } else {
        Err(UnknownRelationshipType(candidate.to_string()))
    }
}

/// Check a property key against the keys allowed on `label`.
pub fn validate_property(label: &str, key: &str, allow_list: &AllowList) -> Option<PropertyKey> {
    allow_list
        .contains_property(label, key)
        .then(|| PropertyKey(key.to_string()))
}
