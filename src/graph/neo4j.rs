//! Neo4j backend over Bolt
//!
//! Each record is one auto-committed Cypher statement: required endpoints are
//! matched first, so a missing endpoint yields zero rows and writes nothing.

use async_trait::async_trait;
use neo4rs::{query, BoltType, Graph, Query};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, info};

use super::backend::{GraphBackend, WriteFault};
use super::mapping::{Direction, EndpointMode, RecordWrite};
use super::property::{PropertyMap, PropertyValue};
use super::store::{GraphError, GraphResult};
use super::types::{EdgeType, Label};
use crate::model::{DATE_FORMAT, TIMESTAMP_FORMAT};

pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    pub async fn connect(uri: &str, user: &str, password: &str) -> GraphResult<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphError::Connection(format!("{}: {}", uri, e)))?;
        info!("Connected to Neo4j at {}", uri);
        Ok(Neo4jGraph { graph })
    }

    async fn scalar(&self, q: Query, column: &str) -> GraphResult<i64> {
        let mut stream = self.graph.execute(q).await.map_err(classify)?;
        match stream.next().await.map_err(classify)? {
            Some(row) => row
                .get::<i64>(column)
                .map_err(|e| GraphError::Backend(e.to_string())),
            None => Ok(0),
        }
    }
}

fn classify(err: neo4rs::Error) -> GraphError {
    match err {
        neo4rs::Error::IOError { .. }
        | neo4rs::Error::ConnectionError
        | neo4rs::Error::AuthenticationError(_) => GraphError::Connection(err.to_string()),
        other => GraphError::Backend(other.to_string()),
    }
}

/// Bolt value of a property; nulls are not stored
fn bolt(value: &PropertyValue) -> Option<BoltType> {
    Some(match value {
        PropertyValue::String(s) => s.clone().into(),
        PropertyValue::Integer(i) => (*i).into(),
        PropertyValue::Float(f) => (*f).into(),
        PropertyValue::Boolean(b) => (*b).into(),
        PropertyValue::Date(d) => d.format(DATE_FORMAT).to_string().into(),
        PropertyValue::DateTime(ts) => ts.format(TIMESTAMP_FORMAT).to_string().into(),
        PropertyValue::Null => return None,
    })
}

fn bolt_map(properties: &PropertyMap) -> HashMap<String, BoltType> {
    properties
        .iter()
        .filter_map(|(k, v)| bolt(v).map(|b| (k.clone(), b)))
        .collect()
}

/// Single MERGE statement writing one record and its relationships
fn record_query(write: &RecordWrite) -> Query {
    let mut cypher = String::new();
    for (i, rel) in write.relationships.iter().enumerate() {
        if rel.mode == EndpointMode::Existing {
            let _ = writeln!(
                cypher,
                "MATCH (o{i}:`{}` {{`{}`: $o{i}}})",
                rel.other.label, rel.other.key
            );
        }
    }
    let _ = writeln!(
        cypher,
        "MERGE (n:`{}` {{`{}`: $key}}) SET n += $props",
        write.node.label, write.node.key
    );
    for (i, rel) in write.relationships.iter().enumerate() {
        if rel.mode == EndpointMode::Merge {
            let _ = writeln!(
                cypher,
                "MERGE (o{i}:`{}` {{`{}`: $o{i}}})",
                rel.other.label, rel.other.key
            );
        }
        let pattern = match rel.direction {
            Direction::Outgoing => format!("(n)-[r{i}:`{}`]->(o{i})", rel.rel_type),
            Direction::Incoming => format!("(o{i})-[r{i}:`{}`]->(n)", rel.rel_type),
        };
        let _ = writeln!(cypher, "MERGE {} SET r{i} += $r{i}", pattern);
    }
    cypher.push_str("RETURN count(n) AS written");

    let mut q = query(&cypher)
        .param("key", write.node.value.clone())
        .param("props", bolt_map(&write.properties));
    for (i, rel) in write.relationships.iter().enumerate() {
        let endpoint = match rel.mode {
            EndpointMode::Merge => rel
                .endpoint_properties()
                .get(rel.other.key)
                .and_then(bolt)
                .unwrap_or_else(|| rel.other.value.clone().into()),
            EndpointMode::Existing => rel.other.value.clone().into(),
        };
        q = q
            .param(&format!("o{}", i), endpoint)
            .param(&format!("r{}", i), bolt_map(&rel.properties));
    }
    q
}

#[async_trait]
impl GraphBackend for Neo4jGraph {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn ping(&self) -> GraphResult<()> {
        self.scalar(query("RETURN 1 AS ok"), "ok").await.map(|_| ())
    }

    async fn ensure_constraints(&self, constraints: &[(Label, &'static str)]) -> GraphResult<()> {
        for (label, key) in constraints {
            let cypher = format!(
                "CREATE CONSTRAINT `{}_{}_unique` IF NOT EXISTS FOR (n:`{}`) REQUIRE n.`{}` IS UNIQUE",
                label.as_str().to_lowercase(),
                key,
                label,
                key
            );
            self.graph.run(query(&cypher)).await.map_err(classify)?;
        }
        Ok(())
    }

    async fn missing_constraints(
        &self,
        constraints: &[(Label, &'static str)],
    ) -> GraphResult<Vec<Label>> {
        let mut present: Vec<(String, String)> = Vec::new();
        let mut stream = self
            .graph
            .execute(query(
                "SHOW CONSTRAINTS YIELD labelsOrTypes, properties RETURN labelsOrTypes, properties",
            ))
            .await
            .map_err(classify)?;
        while let Some(row) = stream.next().await.map_err(classify)? {
            let labels: Vec<String> = row.get("labelsOrTypes").unwrap_or_default();
            let properties: Vec<String> = row.get("properties").unwrap_or_default();
            if let (Some(label), Some(key)) = (labels.first(), properties.first()) {
                present.push((label.clone(), key.clone()));
            }
        }
        Ok(constraints
            .iter()
            .filter(|(label, key)| !present.iter().any(|(l, k)| l == label.as_str() && k.as_str() == *key))
            .map(|(label, _)| label.clone())
            .collect())
    }

    async fn write(&self, writes: &[RecordWrite]) -> GraphResult<Vec<WriteFault>> {
        let mut faults = Vec::new();
        for (index, write) in writes.iter().enumerate() {
            let written = match self.scalar(record_query(write), "written").await {
                Ok(n) => n,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    faults.push((index, e));
                    continue;
                }
            };
            if written == 0 {
                let missing = write
                    .relationships
                    .iter()
                    .find(|r| r.mode == EndpointMode::Existing)
                    .map(|r| GraphError::MissingEndpoint {
                        label: r.other.label.clone(),
                        key: r.other.key.to_string(),
                        value: r.other.value.clone(),
                    })
                    .unwrap_or_else(|| GraphError::Backend("record not written".to_string()));
                debug!("{} {} not written: {}", write.node.label, write.node.value, missing);
                faults.push((index, missing));
            }
        }
        Ok(faults)
    }

    async fn count_nodes(&self, label: &Label) -> GraphResult<u64> {
        let cypher = format!("MATCH (n:`{}`) RETURN count(n) AS n", label);
        Ok(self.scalar(query(&cypher), "n").await?.max(0) as u64)
    }

    async fn count_relationships(&self, rel_type: &EdgeType) -> GraphResult<u64> {
        let cypher = format!("MATCH ()-[r:`{}`]->() RETURN count(r) AS n", rel_type);
        Ok(self.scalar(query(&cypher), "n").await?.max(0) as u64)
    }

    async fn clear(&self) -> GraphResult<()> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(classify)?;
        info!("Cleared Neo4j graph");
        Ok(())
    }
}
