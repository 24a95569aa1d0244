use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::models::{Backend, CompletionResult, Message, Role};
use crate::{llm, normalize, telemetry};

/**
 * \brief 双后端补全 Provider：有远程凭据时优先远程，失败或无凭据时回退本地 LM Studio。
 * \details 远程/本地模式在构造时确定，之后不再检查。`get_completion` 永不返回错误，
 *          两个后端都失败时得到空结果。
 */
pub struct HybridProvider {
    config: ProviderConfig,
    remote_enabled: bool,
    client: reqwest::Client,
}

impl HybridProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let remote_enabled = config.has_remote_credentials();
        if remote_enabled {
            telemetry::log_event(
                "provider.init",
                &format!(
                    "remote enabled model={} local_model={}",
                    config.remote_model, config.completion_model
                ),
            );
        } else {
            eprintln!("No ANTHROPIC_API_KEY found, using LM Studio only");
            telemetry::log_warn(
                "provider.init",
                &format!(
                    "no remote credential, local only url={}",
                    config.lm_studio_url
                ),
            );
        }
        Self {
            config,
            remote_enabled,
            client: reqwest::Client::new(),
        }
    }

    /**
     * \brief 从进程环境构造 Provider。
     * \param provider_type    后端族标签，如 "openai"
     * \param completion_model 本地模型名
     */
    pub fn from_env(provider_type: &str, completion_model: &str) -> Self {
        Self::new(ProviderConfig::from_env(provider_type, completion_model))
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.remote_enabled
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /**
     * \brief 获取补全并归一化。依次尝试 远程 → 本地 → 空结果。
     * \param messages        有序消息列表
     * \param response_schema 结构化输出占位参数，当前忽略
     */
    pub async fn get_completion(
        &self,
        messages: &[Message],
        _response_schema: Option<&Value>,
    ) -> CompletionResult {
        if self.remote_enabled && !has_conversation(messages) {
            telemetry::log_warn("provider.remote", "no user/assistant message, skipping remote");
        } else if self.remote_enabled {
            match self.try_remote(messages).await {
                Ok(content) => return self.finish(Backend::Remote, messages, &content),
                Err(err) => {
                    eprintln!("API failed: {:#}, falling back to LM Studio", err);
                    telemetry::log_warn("provider.remote", &format!("{:#}", err));
                }
            }
        }

        match self.try_local(messages).await {
            Ok(content) => self.finish(Backend::Local, messages, &content),
            Err(err) => {
                eprintln!("Error calling LM Studio: {:#}", err);
                telemetry::log_error("provider.local", &format!("{:#}", err));
                CompletionResult::empty()
            }
        }
    }

    /**
     * \brief 列出本地 LM Studio 可用模型（诊断用，错误直接返回）。
     */
    pub async fn list_local_models(&self) -> Result<Vec<String>> {
        llm::list_models_local(&self.client, &self.config).await
    }

    async fn try_remote(&self, messages: &[Message]) -> Result<String> {
        tokio::time::sleep(self.config.remote_delay).await;

        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match llm::chat_once_remote(&self.client, &self.config, messages).await {
                Ok(content) => return Ok(content),
                Err(err) if attempt < attempts => {
                    telemetry::log_warn(
                        "provider.remote",
                        &format!("attempt {}/{} failed: {:#}", attempt, attempts, err),
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err.context(format!("remote gave up after {} attempts", attempts)))
                }
            }
        }
    }

    async fn try_local(&self, messages: &[Message]) -> Result<String> {
        llm::chat_once_local(&self.client, &self.config, messages)
            .await
            .with_context(|| format!("local backend {}", self.config.lm_studio_url))
    }

    fn finish(&self, backend: Backend, messages: &[Message], content: &str) -> CompletionResult {
        let mut result = normalize::parse_response(messages, content);
        result.backend = Some(backend);
        telemetry::log_event(
            "provider.result",
            &format!(
                "backend={} entries={} content_len={}",
                backend,
                result.len(),
                content.len()
            ),
        );
        result
    }
}

/** \brief Messages API 至少需要一条 user/assistant 消息。 */
fn has_conversation(messages: &[Message]) -> bool {
    messages.iter().any(|m| m.role != Role::System)
}

/**
 * \brief 按环境变量构造 Provider，供入口处调用一次后传引用复用。
 */
pub fn load_llm_provider(provider_type: &str, completion_model: &str) -> HybridProvider {
    HybridProvider::from_env(provider_type, completion_model)
}
