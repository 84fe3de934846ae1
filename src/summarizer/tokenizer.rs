use crate::error::SummarizeError;
use std::sync::Arc;

/// Pluggable token counting used for every budget decision.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
    fn name(&self) -> &str;
}

/// `cl100k_base` BPE, the encoding of the gpt-3.5/gpt-4 family.
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenTokenizer {
    pub fn cl100k() -> Result<Self, SummarizeError> {
        let bpe =
            tiktoken_rs::cl100k_base().map_err(|err| SummarizeError::Tokenizer(err.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        "cl100k"
    }
}

/// bytes/3 estimate, no vocabulary needed.
pub struct BytesEstimateTokenizer;

impl Tokenizer for BytesEstimateTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.len().div_ceil(3)
    }

    fn name(&self) -> &str {
        "bytes"
    }
}

pub fn create_tokenizer(name: &str) -> Result<Arc<dyn Tokenizer>, SummarizeError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "cl100k" | "cl100k_base" | "tiktoken" => Ok(Arc::new(TiktokenTokenizer::cl100k()?)),
        "bytes" | "bytes-estimate" => Ok(Arc::new(BytesEstimateTokenizer)),
        other => Err(SummarizeError::Config(format!(
            "unknown tokenizer `{other}`; use `cl100k` or `bytes`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{BytesEstimateTokenizer, Tokenizer, create_tokenizer};

    #[test]
    fn bytes_estimate_rounds_up() {
        assert_eq!(BytesEstimateTokenizer.count_tokens(""), 0);
        assert_eq!(BytesEstimateTokenizer.count_tokens("a"), 1);
        assert_eq!(BytesEstimateTokenizer.count_tokens("abcd"), 2);
    }

    #[test]
    fn cl100k_counts_common_words() {
        let tokenizer = create_tokenizer("cl100k").expect("bundled vocabulary should load");
        assert_eq!(tokenizer.name(), "cl100k");
        assert_eq!(tokenizer.count_tokens("hello world"), 2);
    }

    #[test]
    fn unknown_tokenizer_is_a_config_error() {
        let err = create_tokenizer("sentencepiece")
            .err()
            .expect("unknown name must fail");
        assert!(err.to_string().contains("unknown tokenizer"));
    }
}
