//! Streaming chat over `streamGenerateContent`.
//!
//! The response arrives as server-sent events, one JSON chunk per `data:`
//! line. A spawned pump task parses each line into a [`StreamEvent`] and
//! forwards it over the stream channel; the consumer sees fragments in
//! receipt order followed by exactly one terminal event.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::info;

use crate::client::{error_for_status, GeminiClient};
use crate::error::ProviderError;
use crate::provider::{ChatRequest, ChatRole, ChatStream, StreamEvent};
use crate::wire::{
    Content, EmptyConfig, GenerateContentRequest, GenerateContentResponse, InlineData, Part, Tool,
};

pub(crate) async fn stream(
    client: &GeminiClient,
    request: ChatRequest,
) -> Result<ChatStream, ProviderError> {
    let key = client.api_key()?;
    let model = GeminiClient::chat_model(request.subject.reasoning_tier());
    let url = format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        client.base_url(),
        model
    );

    info!(
        model,
        subject = request.subject.as_str(),
        history_len = request.history.len(),
        has_image = request.image.is_some(),
        "starting chat stream"
    );

    let body = build_request(&request);
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

    let (tx, stream) = ChatStream::channel(32);
    tokio::spawn(pump_sse(response, tx));
    Ok(stream)
}

/// Assemble the request body: prior history, the subject's system
/// instruction, the grounding tool when the subject enables it, and the new
/// turn (inline image first, then text, as the API expects).
fn build_request(request: &ChatRequest) -> GenerateContentRequest {
    let mut contents: Vec<Content> = request
        .history
        .iter()
        .map(|entry| {
            let role = match entry.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            Content::text(Some(role), entry.text.clone())
        })
        .collect();

    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: BASE64.encode(&image.data),
            }),
        });
    }
    parts.push(Part {
        text: Some(request.text.clone()),
        inline_data: None,
    });
    contents.push(Content {
        role: Some("user".to_string()),
        parts,
    });

    let tools = request.subject.grounding_enabled().then(|| {
        vec![Tool {
            google_search: EmptyConfig {},
        }]
    });

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content::text(
            None,
            request.subject.system_instruction(),
        )),
        tools,
        generation_config: None,
    }
}

/// Read the SSE body line by line, forwarding one event per `data:` payload.
/// Ends with `Completed` when the provider closes the stream, or `Failed` on
/// the first transport or parse error.
async fn pump_sse(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut body = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Failed(ProviderError::Transport(e.to_string())))
                    .await;
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            match event_for_line(line.trim_end()) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        // Consumer went away; nothing left to deliver to.
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = tx.send(StreamEvent::Failed(e)).await;
                    return;
                }
            }
        }
    }

    let _ = tx.send(StreamEvent::Completed).await;
}

/// Parse one SSE line. Non-`data:` lines (blanks, comments, event names)
/// carry no payload and yield `None`.
fn event_for_line(line: &str) -> Result<Option<StreamEvent>, ProviderError> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| ProviderError::ResponseParse(format!("bad stream chunk: {e}")))?;

    let text = chunk.text();
    Ok(Some(StreamEvent::Fragment {
        text: (!text.is_empty()).then_some(text),
        grounding_urls: chunk.grounding_urls(),
    }))
}

#[cfg(test)]
mod tests {
    use lumina_core::models::subject::Subject;

    use super::*;
    use crate::provider::{HistoryEntry, ImagePayload};

    fn request(subject: Subject) -> ChatRequest {
        ChatRequest {
            subject,
            history: vec![
                HistoryEntry {
                    role: ChatRole::Model,
                    text: "Hello!".to_string(),
                },
                HistoryEntry {
                    role: ChatRole::User,
                    text: "Hi there".to_string(),
                },
            ],
            text: "Tell me about volcanoes".to_string(),
            image: None,
        }
    }

    #[test]
    fn history_roles_map_to_wire_roles() {
        let body = serde_json::to_value(build_request(&request(Subject::Science))).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "model");
        assert_eq!(contents[1]["role"], "user");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "Tell me about volcanoes");
    }

    #[test]
    fn grounded_subjects_request_the_search_tool() {
        let body = serde_json::to_value(build_request(&request(Subject::History))).unwrap();
        assert!(body["tools"][0]["googleSearch"].is_object());

        let body = serde_json::to_value(build_request(&request(Subject::Math))).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn system_instruction_carries_the_subject_prompt() {
        let body = serde_json::to_value(build_request(&request(Subject::Math))).unwrap();
        let text = body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(text.contains("Mathematics tutor"));
    }

    #[test]
    fn attached_image_precedes_the_text_part() {
        let mut req = request(Subject::Science);
        req.image = Some(ImagePayload {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        });
        let body = serde_json::to_value(build_request(&req)).unwrap();
        let parts = body["contents"][2]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "/9j/");
        assert_eq!(parts[1]["text"], "Tell me about volcanoes");
    }

    #[test]
    fn data_line_parses_into_a_fragment() {
        let line = r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"The Western "}]},"groundingMetadata":{"groundingChunks":[{"web":{"uri":"https://example.com/rome"}}]}}]}"#;
        match event_for_line(line).unwrap().unwrap() {
            StreamEvent::Fragment {
                text,
                grounding_urls,
            } => {
                assert_eq!(text.as_deref(), Some("The Western "));
                assert_eq!(grounding_urls, vec!["https://example.com/rome"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(event_for_line("").unwrap().is_none());
        assert!(event_for_line(": keep-alive").unwrap().is_none());
        assert!(event_for_line("event: message").unwrap().is_none());
    }

    #[test]
    fn malformed_chunk_is_a_parse_error() {
        assert!(event_for_line("data: {not json").is_err());
    }

    #[test]
    fn chunk_without_text_yields_an_empty_fragment() {
        let line = r#"data: {"candidates":[{"content":{"role":"model","parts":[]}}]}"#;
        match event_for_line(line).unwrap().unwrap() {
            StreamEvent::Fragment {
                text,
                grounding_urls,
            } => {
                assert!(text.is_none());
                assert!(grounding_urls.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
