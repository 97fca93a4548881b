use crate::config::toml_config::ExtractorConfig;
use crate::core::normalize::normalize;
use crate::domain::model::ExtractedRecord;
use crate::domain::ports::FieldExtractor;
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const BASE_PROMPT: &str = r#"You are an expert document analyst.
The following text contains information about a real estate purchase promise or a credit certificate.
Extract the data into a JSON object with the keys:

- nombre: Full name (string)
- rut: Chilean RUT, digits only (string)
- departamento: Department number (string)
- monto_credito: Credit amount in CLP (integer)
- fecha: Date in ISO format YYYY-MM-DD (string) [optional if present]

Ignore any extraneous information.
Return only the JSON, no explanations."#;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// 透過 OpenAI 相容的 chat-completions API 擷取欄位
pub struct OpenAiFieldExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    config: ExtractorConfig,
}

impl OpenAiFieldExtractor {
    pub fn new(config: ExtractorConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let endpoint = format!("{}/chat/completions", config.api_base.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            config,
        })
    }

    async fn complete(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![Message {
                role: "user",
                content: format!("{}\n\nText:\n{}", BASE_PROMPT, text),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!("Calling {} with model {}", self.endpoint, self.config.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReconcileError::extraction(format!(
                "model endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReconcileError::extraction("model returned no content"))
    }
}

#[async_trait]
impl FieldExtractor for OpenAiFieldExtractor {
    async fn extract_fields(&self, text: &str) -> Result<ExtractedRecord> {
        let raw = self.complete(text).await?;
        parse_record(&raw)
    }
}

/// 嚴格解析模型回覆：只接受 JSON 物件，可包在一個 Markdown code fence 裡
///
/// 回覆不是 JSON 物件就視為失敗，絕不嘗試執行或猜測。
/// 物件中單一欄位型別不對時只丟棄該欄位，其他欄位照常保留。
pub fn parse_record(raw: &str) -> Result<ExtractedRecord> {
    let payload = strip_code_fence(raw.trim());
    if !payload.starts_with('{') {
        return Err(ReconcileError::extraction(format!(
            "model reply is not a JSON object: {}",
            truncate(payload, 80)
        )));
    }

    let mut record: ExtractedRecord = serde_json::from_str(payload)?;
    if let Some(rut) = record.rut.take() {
        record.rut = Some(normalize(&rut));
    }
    Ok(record)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // 去掉語言標記 (```json)
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base: String) -> ExtractorConfig {
        ExtractorConfig {
            api_base: base,
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let record = parse_record(
            r#"{"nombre": "Ana Diaz", "rut": "12.345.678-K", "departamento": "101", "monto_credito": 50000000, "fecha": "2024-01-10"}"#,
        )
        .unwrap();
        assert_eq!(record.rut.as_deref(), Some("12345678k"));
        assert_eq!(record.monto_credito, Some(50_000_000));
        assert_eq!(record.key().as_str(), "12345678k_101");
    }

    #[test]
    fn test_parse_fenced_json() {
        let record = parse_record("```json\n{\"nombre\": \"Ana Diaz\"}\n```").unwrap();
        assert_eq!(record.nombre.as_deref(), Some("Ana Diaz"));

        let record = parse_record("```\n{\"departamento\": 202}\n```").unwrap();
        assert_eq!(record.departamento.as_deref(), Some("202"));
    }

    #[test]
    fn test_parse_keeps_key_when_amount_is_unreadable() {
        let record = parse_record(
            r#"{"nombre": "Ana", "rut": "1-9", "departamento": "101", "monto_credito": "cincuenta"}"#,
        )
        .unwrap();
        assert_eq!(record.key().as_str(), "19_101");
        assert_eq!(record.nombre.as_deref(), Some("Ana"));
        assert_eq!(record.monto_credito, None);
    }

    #[test]
    fn test_parse_fails_closed() {
        // 單引號字典不是 JSON
        assert!(parse_record("{'nombre': 'Ana'}").is_err());
        assert!(parse_record("__import__('os').system('rm -rf /')").is_err());
        assert!(parse_record("Here is the data: {\"nombre\": \"Ana\"}").is_err());
        assert!(parse_record("[1, 2]").is_err());
        assert!(parse_record("").is_err());
    }

    #[tokio::test]
    async fn test_extract_fields_from_chat_completion() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .body_contains("gpt-4o-mini")
                .body_contains("Text:\\nPROMESA DE COMPRAVENTA");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": "{\"nombre\": \"Ana Diaz\", \"rut\": \"12345678-k\", \"departamento\": \"101\", \"monto_credito\": 50000000}"
                        }
                    }]
                }));
        });

        let extractor = OpenAiFieldExtractor::new(config(server.url("/v1")), "sk-test").unwrap();
        let record = extractor
            .extract_fields("PROMESA DE COMPRAVENTA")
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(record.nombre.as_deref(), Some("Ana Diaz"));
        assert_eq!(record.rut.as_deref(), Some("12345678k"));
        assert_eq!(record.fecha, None);
    }

    #[tokio::test]
    async fn test_server_error_is_extraction_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("rate limited");
        });

        let extractor = OpenAiFieldExtractor::new(config(server.url("/v1/")), "sk-test").unwrap();
        let err = extractor.extract_fields("texto").await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, ReconcileError::ExtractionError { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_extraction_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"choices": []}));
        });

        let extractor = OpenAiFieldExtractor::new(config(server.url("/v1")), "sk-test").unwrap();
        assert!(extractor.extract_fields("texto").await.is_err());
    }
}
