//! Read operations used to inspect what an ingestion run wrote.

use neo4rs::query;

use quarry_schema::{Label, RelationshipType};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    /// Whether a node with `label` and `id` exists.
    pub async fn node_exists(&self, label: &Label, id: &str) -> Result<bool, GraphError> {
        let cypher = format!("MATCH (n:{label} {{id: $id}}) RETURN count(n) AS cnt");
        let q = query(&cypher).param("id", id.to_string());
        Ok(self.count(q).await? > 0)
    }

    /// Number of chunks linked to a document with `PART_OF`.
    pub async fn count_document_chunks(&self, document_id: &str) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (c:Chunk)-[:PART_OF]->(d:Document {id: $id})
             RETURN count(c) AS cnt",
        )
        .param("id", document_id.to_string());
        self.count(q).await
    }

    /// Number of entities a chunk `MENTIONS`.
    pub async fn count_mentions(&self, chunk_id: &str) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (c:Chunk {id: $id})-[:MENTIONS]->(n)
             RETURN count(n) AS cnt",
        )
        .param("id", chunk_id.to_string());
        self.count(q).await
    }

    /// Number of `relationship_type` edges from `source_id` to `target_id`.
    pub async fn count_relationships(
        &self,
        source_id: &str,
        relationship_type: &RelationshipType,
        target_id: &str,
    ) -> Result<i64, GraphError> {
        let cypher = format!(
            "MATCH ({{id: $source_id}})-[r:{relationship_type}]->({{id: $target_id}})
             RETURN count(r) AS cnt"
        );
        let q = query(&cypher)
            .param("source_id", source_id.to_string())
            .param("target_id", target_id.to_string());
        self.count(q).await
    }

    async fn count(&self, q: neo4rs::Query) -> Result<i64, GraphError> {
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}
