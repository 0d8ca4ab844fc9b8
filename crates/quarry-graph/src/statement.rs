//! Parameterised write statements.
//!
//! A [`Statement`] pairs a Cypher template with its parameters. Untrusted text
//! only ever travels as a parameter; templates are assembled in
//! [`crate::mutations`] from literals and allow-list-validated identifiers.

use neo4rs::{query, Query};
use serde::Serialize;

/// What a statement writes; used for logging and by the in-memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    UpsertDocument,
    UpsertChunk,
    SetChunkEmbedding,
    UpsertEntity,
    MergeRelationship,
}

/// A typed query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    FloatList(Vec<f64>),
    StringList(Vec<String>),
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::FloatList(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::StringList(v)
    }
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A node addressed by label and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub label: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Result column of statements that must match existing nodes.
pub const MATCHED_COLUMN: &str = "matched";

/// A Cypher template plus its parameters.
///
/// A statement that `requires` nodes starts with `MATCH` on them and returns
/// the number of rows it wrote in [`MATCHED_COLUMN`]; zero rows means one of
/// the required nodes was missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    kind: StatementKind,
    template: String,
    params: Vec<(String, ParamValue)>,
    creates: Vec<NodeRef>,
    requires: Vec<NodeRef>,
}

impl Statement {
    pub(crate) fn new(kind: StatementKind, template: impl Into<String>) -> Self {
        Self {
            kind,
            template: template.into(),
            params: Vec::new(),
            creates: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub(crate) fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub(crate) fn creating(mut self, label: &str, id: &str) -> Self {
        self.creates.push(NodeRef::new(label, id));
        self
    }

    pub(crate) fn requiring(mut self, label: &str, id: &str) -> Self {
        self.requires.push(NodeRef::new(label, id));
        self
    }

    /// Nodes this statement upserts.
    pub fn creates(&self) -> &[NodeRef] {
        &self.creates
    }

    /// Nodes that must already exist for this statement to write anything.
    pub fn requires(&self) -> &[NodeRef] {
        &self.requires
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Look up a parameter by name.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Convenience for string parameters.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// Build the neo4rs query for this statement.
    pub fn to_query(&self) -> Query {
        self.params
            .iter()
            .fold(query(&self.template), |q, (key, value)| match value {
                ParamValue::String(v) => q.param(key, v.clone()),
                ParamValue::Int(v) => q.param(key, *v),
                ParamValue::Float(v) => q.param(key, *v),
                ParamValue::Bool(v) => q.param(key, *v),
                ParamValue::FloatList(v) => q.param(key, v.clone()),
                ParamValue::StringList(v) => q.param(key, v.clone()),
            })
    }
}
