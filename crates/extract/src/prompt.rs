pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are a precise entity and relationship extractor. Return only valid JSON.";

pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Analyze the following text and extract:
1. Key entities (people, organizations, concepts, etc.)
2. Relationships between these entities

Text: {}

Return the results in JSON format:
{{
    "entities": [
        {{"id": "1", "name": "entity_name", "type": "entity_type"}},
        ...
    ],
    "relationships": [
        {{"source": "1", "target": "2", "type": "relationship_type"}},
        ...
    ]
}}"#,
        chunk_text
    )
}
