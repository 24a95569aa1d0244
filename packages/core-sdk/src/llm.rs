use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::config::{ProviderConfig, RemoteRequest};
use crate::models::{Message, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/**
 * \brief 远程（Anthropic Messages API）单次调用，返回第一个文本块。
 */
pub async fn chat_once_remote(
    client: &reqwest::Client,
    config: &ProviderConfig,
    messages: &[Message],
) -> Result<String> {
    let api_key = config
        .remote_api_key
        .as_deref()
        .ok_or_else(|| anyhow!("remote api key missing"))?;
    let url = format!("{}/v1/messages", config.remote_api_base.trim_end_matches('/'));

    let (system_prompt, payload_messages) = match &config.remote_request {
        RemoteRequest::CallerMessages => anthropic_payload(messages),
        RemoteRequest::FixedPrompt(prompt) => (
            None,
            vec![json!({
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            })],
        ),
    };

    let mut body = json!({
        "model": config.remote_model,
        "max_tokens": config.remote_max_tokens,
        "messages": payload_messages,
    });
    if let Some(sys) = system_prompt {
        body["system"] = json!(sys);
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
    headers.insert(
        "anthropic-version",
        HeaderValue::from_static(ANTHROPIC_VERSION),
    );

    let resp = client.post(url).headers(headers).json(&body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow!("remote request failed: {} -> {}", status, text));
    }
    let v: Value = resp.json().await.context("decode remote response")?;
    extract_anthropic_text(&v).ok_or_else(|| anyhow!("remote response has no text block: {}", v))
}

/**
 * \brief 本地 LM Studio（OpenAI 兼容）单次调用，返回 `choices[0].message.content`。
 */
pub async fn chat_once_local(
    client: &reqwest::Client,
    config: &ProviderConfig,
    messages: &[Message],
) -> Result<String> {
    let body = json!({
        "model": config.completion_model,
        "messages": openai_payload(messages),
        "temperature": config.local_temperature,
        "max_tokens": config.local_max_tokens,
    });

    let resp = client
        .post(&config.lm_studio_url)
        .header(CONTENT_TYPE, "application/json")
        .timeout(config.local_timeout)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow!("local request failed: {} -> {}", status, text));
    }
    let v: Value = resp.json().await.context("decode local response")?;
    extract_openai_content(&v).ok_or_else(|| anyhow!("local response missing choices[0].message.content: {}", v))
}

/**
 * \brief 列出本地 LM Studio 可用模型。
 */
pub async fn list_models_local(
    client: &reqwest::Client,
    config: &ProviderConfig,
) -> Result<Vec<String>> {
    let url = models_url(&config.lm_studio_url);
    let resp = client
        .get(url)
        .timeout(config.local_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow!("list models failed: {} -> {}", status, text));
    }
    parse_model_list(resp.json().await?)
}

fn openai_payload(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| json!({"role": msg.role.as_str(), "content": msg.content}))
        .collect()
}

fn anthropic_payload(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut items = Vec::new();
    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content.clone()),
            Role::Assistant => items.push(json!({
                "role": "assistant",
                "content": [{"type": "text", "text": msg.content}]
            })),
            Role::User => items.push(json!({
                "role": "user",
                "content": [{"type": "text", "text": msg.content}]
            })),
        }
    }
    let system_prompt = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system_prompt, items)
}

fn extract_openai_content(v: &Value) -> Option<String> {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
}

fn extract_anthropic_text(v: &Value) -> Option<String> {
    v.get("content")
        .and_then(|arr| arr.as_array())
        .and_then(|arr| {
            arr.iter()
                .find_map(|item| item.get("text").and_then(|t| t.as_str()))
        })
        .map(|s| s.to_string())
}

/** \brief 由 chat completions 地址推导同源的 `/v1/models` 地址。 */
fn models_url(chat_url: &str) -> String {
    let trimmed = chat_url.trim_end_matches('/');
    match trimmed.find("/v1/") {
        Some(pos) => format!("{}/v1/models", &trimmed[..pos]),
        None => format!("{}/v1/models", trimmed),
    }
}

fn parse_model_list(v: Value) -> Result<Vec<String>> {
    if let Some(arr) = v.get("data").and_then(|x| x.as_array()) {
        Ok(arr
            .iter()
            .filter_map(|item| item.get("id").and_then(|s| s.as_str()))
            .map(|s| s.to_string())
            .collect())
    } else {
        Err(anyhow!("unexpected models payload: {}", v))
    }
}
