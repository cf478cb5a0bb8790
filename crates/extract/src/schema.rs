use serde::{Deserialize, Serialize};

/// Entity as returned by the extraction model, with a chunk-local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Relationship between two chunk-local entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
}

/// The strict two-key shape the extraction prompt demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkExtraction {
    pub entities: Vec<LocalEntity>,
    pub relationships: Vec<LocalRelationship>,
}
