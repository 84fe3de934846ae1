pub mod error;
pub mod summarizer;

pub use error::{CompletionError, SummarizeError};
pub use summarizer::sanitize::sanitize;
pub use summarizer::{Summarizer, SummaryReport};
