use std::fmt;

use serde::{Deserialize, Serialize};

/**
 * \brief 消息角色，与 OpenAI / Anthropic 的 role 字段对齐。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
 * \brief 消息结构，与 OpenAI Chat 消息格式对齐。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /** \brief 角色：system/user/assistant */
    pub role: Role,
    /** \brief 内容 */
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/**
 * \brief 产出补全文本的后端。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /** \brief 远程托管 API（Anthropic Messages） */
    Remote,
    /** \brief 本地 LM Studio 推理服务 */
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Remote => f.write_str("remote"),
            Backend::Local => f.write_str("local"),
        }
    }
}

/**
 * \brief 归一化后的一条结果：请求中编号行的 ID 及对应文本。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedEntry {
    pub entry_id: i64,
    pub translated_text: String,
}

/**
 * \brief 统一的补全结果。后端不可用时为空，调用方必须容忍零条结果。
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionResult {
    /** \brief 按请求中编号行顺序排列的条目 */
    pub translations: Vec<TranslatedEntry>,
    /** \brief 产出文本的后端；空结果为 None */
    pub backend: Option<Backend>,
}

impl CompletionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranslatedEntry> {
        self.translations.iter()
    }
}

impl<'a> IntoIterator for &'a CompletionResult {
    type Item = &'a TranslatedEntry;
    type IntoIter = std::slice::Iter<'a, TranslatedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.translations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let msg = Message::system("be brief");
        let v = serde_json::to_value(&msg).expect("serialize message");
        assert_eq!(v["role"], "system");
        assert_eq!(v["content"], "be brief");

        let back: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).expect("deserialize");
        assert_eq!(back, Message::assistant("ok"));
    }

    #[test]
    fn test_empty_result_has_no_backend() {
        let result = CompletionResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert!(result.backend.is_none());
        assert_eq!((&result).into_iter().count(), 0);
    }
}
