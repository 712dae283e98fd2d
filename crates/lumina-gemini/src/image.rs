//! Image generation via the Imagen `predict` endpoint.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{error_for_status, GeminiClient, IMAGE_MODEL};
use crate::error::ProviderError;
use crate::provider::GeneratedImage;

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

pub(crate) async fn generate(
    client: &GeminiClient,
    prompt: &str,
) -> Result<GeneratedImage, ProviderError> {
    let key = client.api_key()?;
    let url = format!("{}/models/{}:predict", client.base_url(), IMAGE_MODEL);

    let body = PredictRequest {
        instances: vec![Instance {
            prompt: prompt.to_string(),
        }],
        parameters: Parameters {
            sample_count: 1,
            aspect_ratio: "1:1".to_string(),
            output_mime_type: "image/jpeg".to_string(),
        },
    };

    info!(model = IMAGE_MODEL, "generating image");

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

    let response: PredictResponse = response.json().await?;
    let image = decode_prediction(response)?;

    info!(bytes = image.data.len(), "image generated");

    Ok(image)
}

fn decode_prediction(response: PredictResponse) -> Result<GeneratedImage, ProviderError> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ResponseParse("no image in response".to_string()))?;

    let encoded = prediction
        .bytes_base64_encoded
        .ok_or_else(|| ProviderError::ResponseParse("prediction has no image bytes".to_string()))?;

    let data = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| ProviderError::ResponseParse(format!("bad image encoding: {e}")))?;

    Ok(GeneratedImage {
        data,
        mime_type: prediction
            .mime_type
            .unwrap_or_else(|| "image/jpeg".to_string()),
    })
}
