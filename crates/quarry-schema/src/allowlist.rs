//! The canonical set of labels, relationship types and properties that may be
//! written to the graph.
//!
//! Every entry must be a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`). Entries
//! end up inside Cypher templates, so anything else is rejected at load time.
//! The structural identifiers in [`crate::reserved`] cannot be listed as
//! extraction labels or relationship types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::reserved::{is_reserved_label, is_reserved_relationship_type};

/// Longest identifier accepted into the allow-list.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Schema definition as written by hand (TOML schema file) or read back from
/// a snapshot. Only becomes an [`AllowList`] after identifier checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDefinition {
    pub node_labels: Vec<String>,
    #[serde(default)]
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

/// Immutable allow-list snapshot for one run.
///
/// Backed by ordered collections so serialization is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDefinition")]
pub struct AllowList {
    node_labels: BTreeSet<String>,
    relationship_types: BTreeSet<String>,
    properties: BTreeMap<String, BTreeSet<String>>,
}

impl AllowList {
    /// Build an allow-list, rejecting any entry that is not a safe identifier.
    pub fn new<L, R, P>(node_labels: L, relationship_types: R, properties: P) -> Result<Self>
    where
        L: IntoIterator,
        L::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator<Item = (String, Vec<String>)>,
    {
        let node_labels = collect_identifiers("node label", node_labels)?;
        if node_labels.is_empty() {
            return Err(SchemaError::EmptyNodeLabels);
        }
        ensure_unreserved("node label", &node_labels, is_reserved_label)?;

        let relationship_types = collect_identifiers("relationship type", relationship_types)?;
        ensure_unreserved(
            "relationship type",
            &relationship_types,
            is_reserved_relationship_type,
        )?;

        let mut props = BTreeMap::new();
        for (label, keys) in properties {
            ensure_identifier("property label", &label)?;
            props.insert(label, collect_identifiers("property", keys)?);
        }

        Ok(Self {
            node_labels,
            relationship_types,
            properties: props,
        })
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.node_labels.contains(label)
    }

    pub fn contains_relationship_type(&self, rel_type: &str) -> bool {
        self.relationship_types.contains(rel_type)
    }

    pub fn contains_property(&self, label: &str, key: &str) -> bool {
        self.properties
            .get(label)
            .is_some_and(|keys| keys.contains(key))
    }

    pub fn node_labels(&self) -> impl Iterator<Item = &str> {
        self.node_labels.iter().map(String::as_str)
    }

    pub fn relationship_types(&self) -> impl Iterator<Item = &str> {
        self.relationship_types.iter().map(String::as_str)
    }

    /// Property keys allowed on `label`, in canonical order.
    pub fn properties_for(&self, label: &str) -> impl Iterator<Item = &str> {
        self.properties
            .get(label)
            .into_iter()
            .flat_map(|keys| keys.iter().map(String::as_str))
    }
}

impl TryFrom<SchemaDefinition> for AllowList {
    type Error = SchemaError;

    fn try_from(def: SchemaDefinition) -> Result<Self> {
        AllowList::new(def.node_labels, def.relationship_types, def.properties)
    }
}

/// Whether `value` can be embedded in a Cypher template as a label,
/// relationship type or property key.
pub fn is_safe_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    value.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn ensure_identifier(kind: &'static str, value: &str) -> Result<()> {
    if is_safe_identifier(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

fn ensure_unreserved(
    kind: &'static str,
    values: &BTreeSet<String>,
    is_reserved: fn(&str) -> bool,
) -> Result<()> {
    match values.iter().find(|v| is_reserved(v.as_str())) {
        Some(value) => Err(SchemaError::Reserved {
            kind,
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

fn collect_identifiers<I>(kind: &'static str, values: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .map(|v: String| ensure_identifier(kind, &v).map(|()| v))
        .collect()
}
