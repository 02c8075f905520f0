//! The upstream summarization exchange.
//!
//! One OpenRouter chat-completions request per analyzed document: the PDF
//! rides along as a data-URL file part, the response streams back as SSE.
//! Accumulated deltas are re-parsed after every chunk and pushed into the
//! session's ingestion adapter as cumulative snapshots; the full text must
//! parse and validate at stream end or the session fails.

use std::sync::Arc;

use anyhow::anyhow;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::StreamExt;
use mindmap_core::{ExtractionPhase, ExtractionSnapshot, IngestionAdapter, MapSession, MindMapError};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::cache::ExtractionCache;
use crate::stream::{LineBuffer, clean_fences, content_delta, parse_partial_snapshot, parse_sse_line};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";
const MAX_TOKENS: u32 = 4000;

const SYSTEM_PROMPT: &str = "You are a document analyzer. Extract the most important points \
    from the provided PDF document. Focus on key information, main ideas, and significant details.";

const USER_PROMPT: &str = "Please read this PDF and extract the key points. Include relevant \
    context where helpful. Respond **only** with JSON of the form \
    {\"title\": \"...\", \"keyPoints\": [{\"point\": \"...\", \"context\": \"...\"}]} \
    where context is optional.";

/// Upstream endpoint configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl ExtractorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow!("OPENROUTER_API_KEY environment variable not set"))?;
        let model =
            std::env::var("MINDMAP_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            api_key,
            model,
            endpoint: OPENROUTER_URL.to_string(),
        })
    }
}

fn extraction_payload(model: &str, pdf_bytes: &[u8]) -> Value {
    let file_data = format!("data:application/pdf;base64,{}", STANDARD.encode(pdf_bytes));
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": SYSTEM_PROMPT
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": USER_PROMPT
                    },
                    {
                        "type": "file",
                        "file": {
                            "filename": "document.pdf",
                            "file_data": file_data
                        }
                    }
                ]
            }
        ],
        "max_tokens": MAX_TOKENS,
        "stream": true
    })
}

/// Run the whole exchange for one session: stream, ingest, complete, cache.
/// Every failure ends up in the adapter; nothing propagates to the caller.
pub async fn run_extraction(
    config: ExtractorConfig,
    pdf_bytes: Vec<u8>,
    session: Arc<MapSession>,
    cache: Arc<dyn ExtractionCache>,
) {
    info!(session_id = %session.id, "starting PDF extraction exchange");

    match drive_exchange(&config, &pdf_bytes, &session.adapter).await {
        Ok(snapshot) => {
            info!(
                session_id = %session.id,
                key_points = snapshot.key_points.len(),
                "extraction completed"
            );
            cache.set(&session.fingerprint, snapshot).await;
        }
        Err(e) => {
            error!(session_id = %session.id, "extraction failed: {e}");
            // complete() already discarded state on a validation failure
            if session.adapter.phase() != ExtractionPhase::Failed {
                session.adapter.fail(&e.to_string());
            }
        }
    }
}

async fn drive_exchange(
    config: &ExtractorConfig,
    pdf_bytes: &[u8],
    adapter: &IngestionAdapter,
) -> anyhow::Result<ExtractionSnapshot> {
    let payload = extraction_payload(&config.model, pdf_bytes);

    let client = Client::new();
    let response = client
        .post(&config.endpoint)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(
            MindMapError::UpstreamFailure(format!("LLM API request failed: {}", response.status()))
                .into(),
        );
    }

    let mut byte_stream = response.bytes_stream();
    let mut line_buf = LineBuffer::new();
    let mut content = String::new();
    let mut seq = 0u64;
    let mut last_applied: Option<ExtractionSnapshot> = None;

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk?;

        for line in line_buf.push(&chunk) {
            let Some(data) = parse_sse_line(&line) else {
                continue;
            };
            let Some(delta) = content_delta(data) else {
                continue;
            };
            content.push_str(&delta);

            if let Some(snapshot) = parse_partial_snapshot(&content) {
                if last_applied.as_ref() != Some(&snapshot) {
                    seq += 1;
                    adapter.apply(seq, snapshot.clone())?;
                    last_applied = Some(snapshot);
                }
            }
        }
    }

    let cleaned = clean_fences(&content);
    let body = cleaned
        .find('{')
        .map(|i| &cleaned[i..])
        .ok_or_else(|| anyhow!("model returned no JSON object"))?;
    let final_snapshot: ExtractionSnapshot = serde_json::from_str(body)
        .map_err(|e| anyhow!("model returned unparseable extraction: {e}"))?;

    adapter.complete(seq + 1, final_snapshot.clone())?;
    Ok(final_snapshot)
}
