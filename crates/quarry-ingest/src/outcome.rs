//! Per-item outcomes and the run report.

use serde::Serialize;

use quarry_audit::RunId;

/// What happened to one document, chunk or extracted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ItemOutcome {
    Written,
    Skipped(String),
    Failed(String),
}

/// The kind of item an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Document,
    Chunk,
    Embedding,
    Extraction,
    Node,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    pub kind: ItemKind,
    pub id: String,
    pub outcome: ItemOutcome,
}

/// Counts of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    fn add(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Written => self.written += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Everything a completed run did, item by item.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub items: Vec<ItemRecord>,
    pub label_fallbacks: usize,
    pub flagged_chunks: usize,
    /// Audit events that could not be persisted.
    pub audit_failures: u64,
}

impl RunReport {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            items: Vec::new(),
            label_fallbacks: 0,
            flagged_chunks: 0,
            audit_failures: 0,
        }
    }

    pub fn push(&mut self, kind: ItemKind, id: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(ItemRecord {
            kind,
            id: id.into(),
            outcome,
        });
    }

    /// Outcome of the item `id` of `kind`, if recorded.
    pub fn outcome(&self, kind: ItemKind, id: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|r| r.kind == kind && r.id == id)
            .map(|r| &r.outcome)
    }

    /// Counts for one kind of item.
    pub fn tally(&self, kind: ItemKind) -> Tally {
        let mut tally = Tally::default();
        for record in self.items.iter().filter(|r| r.kind == kind) {
            tally.add(&record.outcome);
        }
        tally
    }

    /// Counts across every item.
    pub fn total(&self) -> Tally {
        let mut tally = Tally::default();
        for record in &self.items {
            tally.add(&record.outcome);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_by_kind() {
        let mut report = RunReport::new(RunId::new());
        report.push(ItemKind::Document, "a", ItemOutcome::Written);
        report.push(ItemKind::Document, "b", ItemOutcome::Skipped("missing id".into()));
        report.push(ItemKind::Chunk, "a:chunk:0", ItemOutcome::Failed("timeout".into()));

        assert_eq!(
            report.tally(ItemKind::Document),
            Tally { written: 1, skipped: 1, failed: 0 }
        );
        assert_eq!(report.total().failed, 1);
        assert_eq!(
            report.outcome(ItemKind::Chunk, "a:chunk:0"),
            Some(&ItemOutcome::Failed("timeout".into()))
        );
        assert!(report.outcome(ItemKind::Node, "a").is_none());
    }
}
