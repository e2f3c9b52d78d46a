//! Extraction service access: the `DocumentExtractor` seam, a mock for
//! tests, and the HTTP client for the hosted vision model.

use base64::Engine as _;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::types::ExtractedDocument;

/// Confidence below this is treated as a failed extraction; the caller may
/// retry with the fallback text parser.
pub const MIN_CONFIDENCE: f32 = 0.3;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const EXTRACTION_PROMPT: &str = "\
この画像は日本の会計書類です。内容を読み取り、次のJSONだけを返してください。\n\
{\"document_type\": \"receipt|invoice|credit_card|bank_statement|petty_cash|expense_report|sales_data|other\",\n\
 \"confidence\": 0.0-1.0,\n\
 \"entries\": [{\"date\": \"YYYY/MM/DD\", \"counterparty\": \"取引先名\", \"description\": \"摘要\",\n\
   \"amount\": 金額(整数), \"is_income\": true|false, \"tax_rate\": \"10%|8%\",\n\
   \"items\": [{\"name\": \"品名\", \"amount\": 金額(整数), \"tax_rate\": \"10%|8%\"}]}]}\n\
取引ごとに1エントリ。日付は西暦に直すこと。コードブロックや説明文は不要。";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction confidence too low ({0:.2})")]
    LowConfidence(f32),
    #[error("document produced no entries")]
    NoEntries,
    #[error("extraction request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("extraction response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("extraction service error: {0}")]
    Service(String),
}

/// Seam over the vision model so the pipeline is testable offline.
#[allow(async_fn_in_trait)]
pub trait DocumentExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedDocument, ExtractError>;
}

/// Progress callback for long-running document jobs. The conversion engine
/// itself is synchronous and never needs one.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, status: &str, fraction: f32);
}

/// Reporter that discards everything.
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&self, _status: &str, _fraction: f32) {}
}

// ── Mock extractor ──────────────────────────────────────────────────────

/// Returns a pre-set document regardless of input. Lets tests drive the
/// adapter and pipeline without network access.
pub struct MockExtractor {
    pub document: ExtractedDocument,
}

impl MockExtractor {
    pub fn new(document: ExtractedDocument) -> Self {
        Self { document }
    }
}

impl DocumentExtractor for MockExtractor {
    async fn extract(
        &self,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedDocument, ExtractError> {
        Ok(self.document.clone())
    }
}

// ── HTTP client ─────────────────────────────────────────────────────────

pub struct ExtractionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ExtractionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl DocumentExtractor for ExtractionClient {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedDocument, ExtractError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    { "inline_data": {
                        "mime_type": mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(image),
                    }},
                ],
            }],
        });

        debug!(endpoint = %self.endpoint, bytes = image.len(), "requesting extraction");
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ExtractError::Service(format!(
                "HTTP {} from extraction service",
                response.status()
            )));
        }
        let envelope: serde_json::Value = response.json().await?;
        parse_model_response(&envelope)
    }
}

/// Pull the model's text out of the response envelope and parse it as an
/// extracted document. Models wrap JSON in code fences despite the prompt.
fn parse_model_response(envelope: &serde_json::Value) -> Result<ExtractedDocument, ExtractError> {
    let text = envelope["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| ExtractError::Service("response carried no text part".to_string()))?;
    let doc: ExtractedDocument = serde_json::from_str(strip_code_fences(text))?;
    Ok(doc)
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) up to the first newline.
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or(rest);
    rest.trim().trim_end_matches("```").trim()
}

/// Run one document through an extractor with progress reporting and
/// outcome validation. Low confidence and empty results are failures here
/// so the caller can decide on a fallback.
pub async fn process_document<E, P>(
    extractor: &E,
    image: &[u8],
    mime_type: &str,
    progress: &P,
) -> Result<ExtractedDocument, ExtractError>
where
    E: DocumentExtractor,
    P: ProgressReporter,
{
    progress.report("書類を解析中", 0.2);
    let doc = extractor.extract(image, mime_type).await?;
    progress.report("抽出結果を検証中", 0.8);

    if doc.confidence < MIN_CONFIDENCE {
        return Err(ExtractError::LowConfidence(doc.confidence));
    }
    if doc.entries.is_empty() {
        return Err(ExtractError::NoEntries);
    }
    progress.report("完了", 1.0);
    Ok(doc)
}
