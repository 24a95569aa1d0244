use std::time::Duration;

pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o";
pub const DEFAULT_LM_STUDIO_URL: &str = "http://host.docker.internal:1234/v1/chat/completions";
pub const DEFAULT_REMOTE_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_REMOTE_MODEL: &str = "claude-3-5-sonnet-20241022";

/** \brief 旧版远程路径固定发送的提示词，兼容模式下使用。 */
pub const LEGACY_REMOTE_PROMPT: &str = "Translate to Polish: She laughed once during the show.";

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_LM_STUDIO_URL: &str = "COURSEFORGE_LM_STUDIO_URL";
pub const ENV_REMOTE_API_BASE: &str = "COURSEFORGE_REMOTE_API_BASE";
pub const ENV_REMOTE_MODEL: &str = "COURSEFORGE_REMOTE_MODEL";
pub const ENV_REMOTE_FIXED_PROMPT: &str = "COURSEFORGE_REMOTE_FIXED_PROMPT";

/**
 * \brief 远程请求携带的消息内容。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /** \brief 发送调用方提供的消息（默认） */
    CallerMessages,
    /** \brief 忽略调用方消息，只发送一条固定的 user 消息 */
    FixedPrompt(String),
}

/**
 * \brief 混合 Provider 配置，构造后只读。
 */
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /** \brief 后端族标签，仅作记录 */
    pub provider_type: String,
    /** \brief 本地后端使用的模型名 */
    pub completion_model: String,
    /** \brief LM Studio chat completions 地址 */
    pub lm_studio_url: String,
    /** \brief 远程 API Key；为空视为未配置 */
    pub remote_api_key: Option<String>,
    pub remote_api_base: String,
    pub remote_model: String,
    pub remote_max_tokens: u32,
    pub remote_request: RemoteRequest,
    /** \brief 远程调用前的固定等待（限流规避） */
    pub remote_delay: Duration,
    pub retry_attempts: u32,
    /** \brief 两次远程尝试之间的等待 */
    pub retry_backoff: Duration,
    pub local_temperature: f64,
    pub local_max_tokens: u32,
    pub local_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(provider_type: &str, completion_model: &str) -> Self {
        Self {
            provider_type: provider_type.to_string(),
            completion_model: completion_model.to_string(),
            lm_studio_url: DEFAULT_LM_STUDIO_URL.to_string(),
            remote_api_key: None,
            remote_api_base: DEFAULT_REMOTE_API_BASE.to_string(),
            remote_model: DEFAULT_REMOTE_MODEL.to_string(),
            remote_max_tokens: 1000,
            remote_request: RemoteRequest::CallerMessages,
            remote_delay: Duration::from_secs(2),
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(10),
            local_temperature: 0.7,
            local_max_tokens: 2000,
            local_timeout: Duration::from_secs(120),
        }
    }

    /**
     * \brief 从进程环境变量读取配置。
     */
    pub fn from_env(provider_type: &str, completion_model: &str) -> Self {
        Self::from_lookup(provider_type, completion_model, |key| std::env::var(key).ok())
    }

    /**
     * \brief 通过任意查找函数读取配置，便于测试时不修改进程环境。
     */
    pub fn from_lookup<F>(provider_type: &str, completion_model: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Self::new(provider_type, completion_model);
        cfg.remote_api_key = get(ENV_API_KEY);
        if let Some(url) = get(ENV_LM_STUDIO_URL) {
            cfg.lm_studio_url = url;
        }
        if let Some(base) = get(ENV_REMOTE_API_BASE) {
            cfg.remote_api_base = base;
        }
        if let Some(model) = get(ENV_REMOTE_MODEL) {
            cfg.remote_model = model;
        }
        if get(ENV_REMOTE_FIXED_PROMPT).map_or(false, |v| is_truthy(&v)) {
            cfg.remote_request = RemoteRequest::FixedPrompt(LEGACY_REMOTE_PROMPT.to_string());
        }
        cfg
    }

    pub fn with_remote_api_key(mut self, key: impl Into<String>) -> Self {
        self.remote_api_key = Some(key.into());
        self
    }

    pub fn with_lm_studio_url(mut self, url: impl Into<String>) -> Self {
        self.lm_studio_url = url.into();
        self
    }

    pub fn with_remote_api_base(mut self, base: impl Into<String>) -> Self {
        self.remote_api_base = base.into();
        self
    }

    pub fn with_remote_request(mut self, request: RemoteRequest) -> Self {
        self.remote_request = request;
        self
    }

    /**
     * \brief 统一设置远程前置等待与重试间隔。
     */
    pub fn with_delays(mut self, remote_delay: Duration, retry_backoff: Duration) -> Self {
        self.remote_delay = remote_delay;
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_local_timeout(mut self, timeout: Duration) -> Self {
        self.local_timeout = timeout;
        self
    }

    /**
     * \brief 是否具备远程凭据（非空 Key）。
     */
    pub fn has_remote_credentials(&self) -> bool {
        self.remote_api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let cfg = ProviderConfig::from_lookup("openai", "gpt-4o", |_| None);
        assert!(!cfg.has_remote_credentials());
        assert_eq!(cfg.completion_model, "gpt-4o");
        assert_eq!(cfg.lm_studio_url, DEFAULT_LM_STUDIO_URL);
        assert_eq!(cfg.remote_model, DEFAULT_REMOTE_MODEL);
        assert_eq!(cfg.remote_request, RemoteRequest::CallerMessages);
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.retry_backoff, Duration::from_secs(10));
        assert_eq!(cfg.local_timeout, Duration::from_secs(120));
        assert_eq!(cfg.local_max_tokens, 2000);
        assert_eq!(cfg.remote_max_tokens, 1000);
    }

    #[test]
    fn test_blank_api_key_means_local_only() {
        let cfg = ProviderConfig::from_lookup("openai", "gpt-4o", lookup_from(&[(ENV_API_KEY, "  ")]));
        assert!(cfg.remote_api_key.is_none());
        assert!(!cfg.has_remote_credentials());
    }

    #[test]
    fn test_overrides_are_honoured() {
        let cfg = ProviderConfig::from_lookup(
            "openai",
            "qwen2.5-7b",
            lookup_from(&[
                (ENV_API_KEY, "sk-ant-test"),
                (ENV_LM_STUDIO_URL, "http://127.0.0.1:1234/v1/chat/completions"),
                (ENV_REMOTE_API_BASE, "http://127.0.0.1:9999"),
                (ENV_REMOTE_MODEL, "claude-test"),
                (ENV_REMOTE_FIXED_PROMPT, "true"),
            ]),
        );
        assert!(cfg.has_remote_credentials());
        assert_eq!(cfg.completion_model, "qwen2.5-7b");
        assert_eq!(cfg.lm_studio_url, "http://127.0.0.1:1234/v1/chat/completions");
        assert_eq!(cfg.remote_api_base, "http://127.0.0.1:9999");
        assert_eq!(cfg.remote_model, "claude-test");
        assert_eq!(
            cfg.remote_request,
            RemoteRequest::FixedPrompt(LEGACY_REMOTE_PROMPT.to_string())
        );
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("nope"));
    }
}
