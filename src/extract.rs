// src/extract.rs

use crate::config::{LlmBackend, LlmSection};
use crate::error::ScanError;
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

/// The prompt template that instructs the model to extract structured
/// rate-confirmation data from a document photo.
const SYSTEM_PROMPT: &str = r#"You are a freight document data extraction assistant.
Given a photo of a Rate Confirmation document, extract structured data and return ONLY valid JSON.

The JSON must match this schema exactly:
{
  "loadNumber": "string",
  "shipper": {
    "name": "string",
    "address": "string",
    "city": "string",
    "state": "string",
    "zipCode": "string",
    "phone": "string"
  },
  "consignee": {
    "name": "string",
    "address": "string",
    "city": "string",
    "state": "string",
    "zipCode": "string",
    "phone": "string"
  },
  "weight": "string",
  "amount": "string",
  "truckNumber": "string"
}

Notes:
- The shipper is the pickup party, the consignee is the delivery party.
- Use "" for fields you cannot determine; never invent values.
- shipper and consignee must always be JSON objects, never plain strings.
- Return ONLY the JSON object, no markdown fences, no commentary."#;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Resolved endpoint configuration ready to make API calls.
pub struct ResolvedEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

/// Resolve the LLM config section into a concrete endpoint.
pub fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, ScanError> {
    match llm.backend {
        LlmBackend::Ollama => {
            info!(
                url = %llm.ollama.base_url,
                model = %llm.ollama.model,
                "Using Ollama (local) backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.ollama.base_url.clone(),
                model: llm.ollama.model.clone(),
                api_key: "ollama".to_string(), // required by API but ignored
            })
        }
        LlmBackend::Cliproxy => {
            info!(
                url = %llm.cliproxy.base_url,
                model = %llm.cliproxy.model,
                "Using CLIProxyAPI backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.cliproxy.base_url.clone(),
                model: llm.cliproxy.model.clone(),
                api_key: "cliproxy".to_string(), // CLIProxyAPI uses OAuth, not API keys
            })
        }
        LlmBackend::Remote => {
            let api_key = std::env::var("LLM_API_KEY").map_err(|_| {
                ScanError::Extraction("LLM_API_KEY env var required for remote backend".to_string())
            })?;
            info!(
                url = %llm.remote.base_url,
                model = %llm.remote.model,
                "Using remote API backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.remote.base_url.clone(),
                model: llm.remote.model.clone(),
                api_key,
            })
        }
    }
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // Ollama's health endpoint is at the root (not under /v1)
    let health_url = base_url.trim_end_matches("/v1").trim_end_matches("/v1/");

    match client
        .get(health_url)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status().is_success() {
                info!("Ollama server is reachable");
                true
            } else {
                warn!(status = %resp.status(), "Ollama server returned non-OK status");
                false
            }
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

/// Send one page image to the model and return its raw, untrusted JSON
/// output. Shape validation happens downstream in the normalizers.
async fn extract_page(
    client: &Client,
    endpoint: &ResolvedEndpoint,
    image_data_uri: &str,
) -> Result<Value, ScanError> {
    let request = ChatRequest {
        model: endpoint.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: Value::String(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user".to_string(),
                content: json!([
                    {
                        "type": "text",
                        "text": "Extract the rate confirmation data from this document photo."
                    },
                    {
                        "type": "image_url",
                        "image_url": { "url": image_data_uri }
                    }
                ]),
            },
        ],
        temperature: 0.0,
    };

    let url = format!("{}/chat/completions", endpoint.base_url);

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", endpoint.api_key))
        .json(&request)
        .send()
        .await
        .map_err(|e| ScanError::Extraction(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ScanError::Extraction(format!("LLM API error {status}: {body}")));
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .map_err(|e| ScanError::Extraction(format!("bad response body: {e}")))?;
    let content = chat_response
        .choices
        .first()
        .map(|c| c.message.content.as_str())
        .ok_or_else(|| ScanError::Extraction("Empty response from LLM".to_string()))?;

    // Strip markdown fences if the model added them despite instructions
    let json_str = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    // Some models (especially with /think mode) may prepend reasoning text.
    // Find the first '{' and last '}' to extract just the JSON object.
    let json_str = extract_json_object(json_str)?;

    serde_json::from_str(json_str)
        .map_err(|e| ScanError::Extraction(format!("LLM response is not JSON: {e}\nRaw: {json_str}")))
}

/// Extract the outermost JSON object from a string that may contain
/// surrounding text (e.g. thinking tokens).
fn extract_json_object(s: &str) -> Result<&str, ScanError> {
    let start = s
        .find('{')
        .ok_or_else(|| ScanError::Extraction("No '{' found in LLM response".to_string()))?;
    let end = s
        .rfind('}')
        .ok_or_else(|| ScanError::Extraction("No '}' found in LLM response".to_string()))?;
    if end <= start {
        return Err(ScanError::Extraction(
            "Malformed JSON in LLM response".to_string(),
        ));
    }
    Ok(&s[start..=end])
}

/// Run extraction once per page image, concurrently, preserving input
/// order in the output. Any single page failure rejects the whole batch:
/// the merge depends on complete, correctly ordered page data.
pub async fn extract_batch(
    client: &Client,
    llm_config: &LlmSection,
    images: &[String],
) -> Result<Vec<Value>, ScanError> {
    let endpoint = resolve_endpoint(llm_config)?;

    if llm_config.backend == LlmBackend::Ollama
        && !check_ollama_health(client, &endpoint.base_url).await
    {
        return Err(ScanError::Extraction(format!(
            "Ollama is not running at {}. Start it with: ollama serve",
            endpoint.base_url
        )));
    }

    info!(
        pages = images.len(),
        backend = ?llm_config.backend,
        model = %endpoint.model,
        "Extracting document batch"
    );

    let results = try_join_all(
        images
            .iter()
            .map(|image| extract_page(client, &endpoint, image)),
    )
    .await?;

    for (page, raw) in results.iter().enumerate() {
        info!(
            page,
            well_formed = raw.is_object(),
            "Page extraction result"
        );
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_is_recovered_from_surrounding_text() {
        let s = "thinking aloud... {\"loadNumber\": \"123\"} done";
        assert_eq!(extract_json_object(s).unwrap(), "{\"loadNumber\": \"123\"}");
    }

    #[test]
    fn missing_braces_are_an_error() {
        assert!(extract_json_object("no json here").is_err());
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn remote_backend_without_api_key_fails_resolution() {
        if std::env::var("LLM_API_KEY").is_ok() {
            return; // environment already provides one
        }
        let llm = LlmSection {
            backend: LlmBackend::Remote,
            ..Default::default()
        };
        assert!(resolve_endpoint(&llm).is_err());
    }

    #[test]
    fn ollama_backend_resolves_to_config_endpoint() {
        let llm = LlmSection::default();
        let endpoint = resolve_endpoint(&llm).unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert_eq!(endpoint.model, "qwen2.5vl:7b");
    }
}
