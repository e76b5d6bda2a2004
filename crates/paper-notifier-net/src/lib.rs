//! paper-notifier net — source adapters, OpenRouter impact generator and the
//! Feishu webhook transport.

pub mod arxiv;
pub mod error;
pub mod feishu;
pub mod http;
pub mod openrouter;
pub mod sources;

pub use arxiv::ArxivSource;
pub use error::{NetError, Result};
pub use feishu::FeishuWebhook;
pub use openrouter::OpenRouterGenerator;
pub use sources::{CrossRefSource, RssSource, SemanticScholarSource};
