pub mod config;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod telemetry;

pub use provider::{load_llm_provider, HybridProvider};

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::config::{ProviderConfig, RemoteRequest};
    pub use crate::models::{Backend, CompletionResult, Message, Role, TranslatedEntry};
    pub use crate::provider::{load_llm_provider, HybridProvider};
    pub use crate::telemetry;
}
