//! Concept-graph extraction via schema-constrained JSON generation.

use serde_json::json;
use tracing::info;

use lumina_core::models::concept_graph::ConceptGraph;

use crate::client::{error_for_status, GeminiClient, GRAPH_MODEL};
use crate::error::ProviderError;
use crate::wire::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};

fn graph_prompt(topic: &str) -> String {
    format!(
        "Generate a concept map for the topic: \"{topic}\". \
         Return strictly JSON with two arrays: \"nodes\" (id, group 1-3 based on importance, \
         val 5-20) and \"links\" (source id, target id, value 1-5). \
         Create about 10-15 nodes effectively linking related sub-concepts."
    )
}

/// The response schema the model is constrained to.
fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nodes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "group": { "type": "INTEGER" },
                        "val": { "type": "INTEGER" },
                    }
                }
            },
            "links": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "source": { "type": "STRING" },
                        "target": { "type": "STRING" },
                        "value": { "type": "INTEGER" },
                    }
                }
            }
        }
    })
}

pub(crate) async fn generate(
    client: &GeminiClient,
    topic: &str,
) -> Result<ConceptGraph, ProviderError> {
    let key = client.api_key()?;
    let url = format!(
        "{}/models/{}:generateContent",
        client.base_url(),
        GRAPH_MODEL
    );

    let body = GenerateContentRequest {
        contents: vec![Content::text(Some("user"), graph_prompt(topic))],
        system_instruction: None,
        tools: None,
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        }),
    };

    info!(topic, model = GRAPH_MODEL, "requesting concept graph");

    let response = client
        .http()
        .post(&url)
        .header("x-goog-api-key", key.secret())
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_for_status(status.as_u16(), body));
    }

    let response: GenerateContentResponse = response.json().await?;
    let graph = parse_graph(&response.text())?;

    info!(
        topic,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "concept graph generated"
    );

    Ok(graph)
}

/// Parse and validate the model's JSON before it enters the core.
fn parse_graph(text: &str) -> Result<ConceptGraph, ProviderError> {
    if text.is_empty() {
        return Err(ProviderError::ResponseParse(
            "no data returned for concept graph".to_string(),
        ));
    }
    let graph: ConceptGraph = serde_json::from_str(text).map_err(|e| {
        ProviderError::SchemaViolation(format!("failed to parse ConceptGraph: {e}"))
    })?;
    graph
        .validate()
        .map_err(|e| ProviderError::SchemaViolation(e.to_string()))?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_graph_parses_and_validates() {
        let text = r#"{
            "nodes": [
                {"id": "Fall of Rome", "group": 1, "val": 20},
                {"id": "Odoacer", "group": 2, "val": 10}
            ],
            "links": [
                {"source": "Fall of Rome", "target": "Odoacer", "value": 4}
            ]
        }"#;
        let graph = parse_graph(text).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);
    }

    #[test]
    fn empty_response_is_a_parse_error() {
        assert!(matches!(
            parse_graph(""),
            Err(ProviderError::ResponseParse(_))
        ));
    }

    #[test]
    fn out_of_range_group_is_a_schema_violation() {
        let text = r#"{"nodes":[{"id":"A","group":7,"val":10}],"links":[]}"#;
        assert!(matches!(
            parse_graph(text),
            Err(ProviderError::SchemaViolation(_))
        ));
    }

    #[test]
    fn non_json_text_is_a_schema_violation() {
        assert!(matches!(
            parse_graph("here is your concept map!"),
            Err(ProviderError::SchemaViolation(_))
        ));
    }

    #[test]
    fn prompt_embeds_the_topic() {
        let prompt = graph_prompt("The fall of the Western Roman Empire");
        assert!(prompt.contains("\"The fall of the Western Roman Empire\""));
        assert!(prompt.contains("10-15 nodes"));
    }

    #[test]
    fn schema_names_both_arrays() {
        let schema = response_schema();
        assert!(schema["properties"]["nodes"].is_object());
        assert!(schema["properties"]["links"].is_object());
    }
}
