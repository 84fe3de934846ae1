pub mod audit;
pub mod backend;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod dispatch;
pub mod language;
pub mod orchestrator;
pub mod paths;
pub mod sanitize;
pub mod tokenizer;
pub mod util;

pub use audit::{AuditLogger, CompletionLogger, NoOpLogger};
pub use backend::{BackendType, TextCompleter};
pub use cache::{Cache, FileCache, MemoryCache, NoCache};
pub use dispatch::{BackendDispatcher, BackendPool, Completion};
pub use orchestrator::{SummaryReport, Summarizer};
