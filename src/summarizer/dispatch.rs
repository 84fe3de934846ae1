use crate::error::{CompletionError, SummarizeError};
use crate::summarizer::audit::CompletionLogger;
use crate::summarizer::backend::{
    BackendType, GeminiCompleter, OpenAiCompleter, TextCompleter,
};
use crate::summarizer::config::SummarizerConfig;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_ATTEMPTS_PER_POOL: usize = 3;

/// Instances of one backend type; any member can serve any request.
pub struct BackendPool {
    backend_type: BackendType,
    members: Vec<Box<dyn TextCompleter>>,
}

impl BackendPool {
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Box<dyn TextCompleter>) -> Self {
        self.members.push(member);
        self
    }

    pub fn push(&mut self, member: Box<dyn TextCompleter>) {
        self.members.push(member);
    }

    pub fn name(&self) -> &'static str {
        self.backend_type.label()
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn pick(&self) -> Option<&dyn TextCompleter> {
        if self.members.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.members.len());
        Some(self.members[idx].as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub backend: BackendType,
}

/// Tries pools in priority order with a bounded number of attempts each.
pub struct BackendDispatcher {
    pools: Vec<BackendPool>,
    logger: Arc<dyn CompletionLogger>,
}

impl BackendDispatcher {
    /// `pools` are tried in the order given.
    pub fn new(pools: Vec<BackendPool>, logger: Arc<dyn CompletionLogger>) -> Self {
        Self { pools, logger }
    }

    /// Build one pool per backend type, in dispatch priority order, from the
    /// configured access entries.
    pub fn from_config(
        config: &SummarizerConfig,
        logger: Arc<dyn CompletionLogger>,
    ) -> Result<Self, SummarizeError> {
        let http = config.http_settings();
        let mut pools = BackendType::PRIORITY
            .iter()
            .map(|ty| BackendPool::new(*ty))
            .collect::<Vec<_>>();

        for access in &config.access {
            let member: Box<dyn TextCompleter> = match access.backend_type {
                BackendType::Azure => Box::new(OpenAiCompleter::azure(
                    &access.credential,
                    &access.base_url,
                    &config.models.openai_model,
                    &config.models.azure_api_version,
                    &http,
                )?),
                BackendType::OpenAi => {
                    let base = if access.base_url.trim().is_empty() {
                        config.models.openai_base_url.as_deref()
                    } else {
                        Some(access.base_url.as_str())
                    };
                    Box::new(OpenAiCompleter::direct(
                        &access.credential,
                        base,
                        &config.models.openai_model,
                        &http,
                    )?)
                }
                BackendType::GcpGemini => Box::new(GeminiCompleter::new(
                    &access.credential,
                    Some(access.base_url.as_str()),
                    config.gemini_options(),
                    &http,
                )?),
            };
            let backend = member.backend_type();
            if let Some(pool) = pools.iter_mut().find(|pool| pool.backend_type() == backend) {
                pool.push(member);
            }
        }

        Ok(Self::new(pools, logger))
    }

    pub fn pools(&self) -> &[BackendPool] {
        &self.pools
    }

    pub fn has_backends(&self) -> bool {
        self.pools.iter().any(|pool| !pool.is_empty())
    }

    pub fn complete(&self, prompt: &str, token_budget: usize) -> Result<Completion, SummarizeError> {
        let mut attempts = 0usize;
        let mut rejected_pools = Vec::new();
        let mut last_error: Option<CompletionError> = None;

        for pool in &self.pools {
            for attempt in 1..=MAX_ATTEMPTS_PER_POOL {
                let Some(member) = pool.pick() else {
                    break;
                };
                attempts += 1;
                match member.complete(prompt, token_budget) {
                    Ok(text) => {
                        debug!(backend = pool.name(), attempt, "completion succeeded");
                        self.logger.log(prompt, &text, pool.backend_type());
                        return Ok(Completion {
                            text,
                            backend: pool.backend_type(),
                        });
                    }
                    Err(err) if err.is_fatal() => {
                        warn!(backend = pool.name(), attempt, error = %err, "aborting dispatch");
                        return Err(match err {
                            CompletionError::Serialization(source) => {
                                SummarizeError::Serialization(source)
                            }
                            other => SummarizeError::BackendExhausted {
                                attempts,
                                rejected_pools,
                                last_error: Some(other),
                            },
                        });
                    }
                    // A 400 ends only the Azure pool; other pools retry it.
                    Err(err)
                        if err.is_input_rejected() && pool.backend_type() == BackendType::Azure =>
                    {
                        warn!(backend = pool.name(), attempt, error = %err, "input rejected, leaving pool");
                        rejected_pools.push(pool.name().to_string());
                        last_error = Some(err);
                        break;
                    }
                    Err(err) => {
                        warn!(backend = pool.name(), attempt, error = %err, "completion attempt failed");
                        last_error = Some(err);
                    }
                }
            }
        }

        warn!(attempts, "all backend pools exhausted");
        Err(SummarizeError::BackendExhausted {
            attempts,
            rejected_pools,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendDispatcher, BackendPool, MAX_ATTEMPTS_PER_POOL};
    use crate::error::{CompletionError, SummarizeError};
    use crate::summarizer::audit::{CompletionLogger, NoOpLogger};
    use crate::summarizer::backend::{
        BackendType, GeminiCompleter, GeminiOptions, HttpSettings, TextCompleter,
    };
    use crate::summarizer::config::{AccessConfig, SummarizerConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Transient,
        Reject,
        BrokenPayload,
    }

    struct Scripted {
        backend: BackendType,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl TextCompleter for Scripted {
        fn backend_type(&self) -> BackendType {
            self.backend
        }

        fn complete(&self, prompt: &str, _budget: usize) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(format!("{} says {prompt}", self.backend.label())),
                Behavior::Transient => Err(CompletionError::Status {
                    status: 503,
                    body: String::new(),
                }),
                Behavior::Reject => Err(CompletionError::InputRejected {
                    status: 400,
                    body: "filtered".to_string(),
                }),
                Behavior::BrokenPayload => Err(CompletionError::Serialization(
                    serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json"),
                )),
            }
        }
    }

    fn pool(backend: BackendType, behavior: Behavior) -> (BackendPool, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = BackendPool::new(backend).with_member(Box::new(Scripted {
            backend,
            behavior,
            calls: Arc::clone(&calls),
        }));
        (pool, calls)
    }

    fn dispatcher(pools: Vec<BackendPool>) -> BackendDispatcher {
        BackendDispatcher::new(pools, Arc::new(NoOpLogger))
    }

    #[test]
    fn first_success_skips_remaining_pools() {
        let (azure, azure_calls) = pool(BackendType::Azure, Behavior::Succeed);
        let (openai, openai_calls) = pool(BackendType::OpenAi, Behavior::Succeed);
        let out = dispatcher(vec![azure, openai])
            .complete("p", 10)
            .expect("azure succeeds");
        assert_eq!(out.backend, BackendType::Azure);
        assert_eq!(out.text, "azure says p");
        assert_eq!(azure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(openai_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transient_failures_retry_three_times_then_fail_over() {
        let (azure, azure_calls) = pool(BackendType::Azure, Behavior::Transient);
        let (openai, openai_calls) = pool(BackendType::OpenAi, Behavior::Succeed);
        let (gemini, gemini_calls) = pool(BackendType::GcpGemini, Behavior::Succeed);
        let out = dispatcher(vec![azure, openai, gemini])
            .complete("p", 10)
            .expect("openai succeeds");
        assert_eq!(out.backend, BackendType::OpenAi);
        assert_eq!(azure_calls.load(Ordering::SeqCst), MAX_ATTEMPTS_PER_POOL);
        assert_eq!(openai_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gemini_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejected_input_leaves_only_that_pool() {
        let (azure, azure_calls) = pool(BackendType::Azure, Behavior::Reject);
        let (openai, openai_calls) = pool(BackendType::OpenAi, Behavior::Transient);
        let (gemini, gemini_calls) = pool(BackendType::GcpGemini, Behavior::Succeed);
        let out = dispatcher(vec![azure, openai, gemini])
            .complete("p", 10)
            .expect("gemini succeeds");
        assert_eq!(out.backend, BackendType::GcpGemini);
        assert_eq!(azure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(openai_calls.load(Ordering::SeqCst), MAX_ATTEMPTS_PER_POOL);
        assert_eq!(gemini_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bad_request_outside_azure_is_retried_like_any_status() {
        let (openai, openai_calls) = pool(BackendType::OpenAi, Behavior::Reject);
        let (gemini, gemini_calls) = pool(BackendType::GcpGemini, Behavior::Reject);
        let err = dispatcher(vec![openai, gemini])
            .complete("p", 10)
            .expect_err("every attempt is refused");
        assert_eq!(openai_calls.load(Ordering::SeqCst), MAX_ATTEMPTS_PER_POOL);
        assert_eq!(gemini_calls.load(Ordering::SeqCst), MAX_ATTEMPTS_PER_POOL);
        match err {
            SummarizeError::BackendExhausted {
                attempts,
                rejected_pools,
                last_error,
            } => {
                assert_eq!(attempts, 2 * MAX_ATTEMPTS_PER_POOL);
                assert!(rejected_pools.is_empty());
                assert!(matches!(
                    last_error,
                    Some(CompletionError::InputRejected { status: 400, .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gemini_bad_request_uses_every_attempt() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/models/gemini-1.0-pro:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"status":"INVALID_ARGUMENT"}}"#)
            .expect(MAX_ATTEMPTS_PER_POOL)
            .create();
        let completer = GeminiCompleter::new(
            "k",
            Some(&server.url()),
            GeminiOptions::default(),
            &HttpSettings::default(),
        )
        .expect("client builds");
        let gemini = BackendPool::new(BackendType::GcpGemini).with_member(Box::new(completer));

        let err = dispatcher(vec![gemini])
            .complete("p", 10)
            .expect_err("gemini refuses");
        assert!(matches!(
            err,
            SummarizeError::BackendExhausted { attempts: 3, ref rejected_pools, .. }
                if rejected_pools.is_empty()
        ));
        mock.assert();
    }

    #[test]
    fn exhaustion_reports_attempts_and_last_cause() {
        let (azure, _) = pool(BackendType::Azure, Behavior::Reject);
        let (openai, _) = pool(BackendType::OpenAi, Behavior::Transient);
        let (gemini, _) = pool(BackendType::GcpGemini, Behavior::Transient);
        let err = dispatcher(vec![azure, openai, gemini])
            .complete("p", 10)
            .expect_err("everything fails");
        assert_eq!(err.to_string(), "all retries have failed");
        match err {
            SummarizeError::BackendExhausted {
                attempts,
                rejected_pools,
                last_error,
            } => {
                assert_eq!(attempts, 1 + 2 * MAX_ATTEMPTS_PER_POOL);
                assert_eq!(rejected_pools, vec!["azure".to_string()]);
                assert!(matches!(
                    last_error,
                    Some(CompletionError::Status { status: 503, .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn config_access_entries_fill_pools_in_priority_order() {
        let access = |credential: &str, base_url: &str, backend_type: BackendType| {
            AccessConfig {
                credential: credential.to_string(),
                base_url: base_url.to_string(),
                backend_type,
            }
        };
        let config = SummarizerConfig {
            access: vec![
                access("g1", "", BackendType::GcpGemini),
                access("az", "https://example.openai.azure.com", BackendType::Azure),
                access("g2", "", BackendType::GcpGemini),
            ],
            ..SummarizerConfig::default()
        };

        let dispatcher =
            BackendDispatcher::from_config(&config, Arc::new(NoOpLogger)).expect("pools build");
        let sizes = dispatcher
            .pools()
            .iter()
            .map(|pool| (pool.name(), pool.len()))
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![("azure", 1), ("openai", 0), ("gemini", 2)]);
        assert!(dispatcher.has_backends());
    }

    #[test]
    fn no_configured_backends_is_exhaustion() {
        let pools = BackendType::PRIORITY
            .iter()
            .map(|ty| BackendPool::new(*ty))
            .collect();
        let dispatcher = dispatcher(pools);
        assert!(!dispatcher.has_backends());
        let err = dispatcher.complete("p", 10).expect_err("nothing to call");
        assert!(matches!(
            err,
            SummarizeError::BackendExhausted { attempts: 0, .. }
        ));
    }

    #[test]
    fn serialization_failure_aborts_immediately() {
        let (azure, azure_calls) = pool(BackendType::Azure, Behavior::BrokenPayload);
        let (openai, openai_calls) = pool(BackendType::OpenAi, Behavior::Succeed);
        let err = dispatcher(vec![azure, openai])
            .complete("p", 10)
            .expect_err("payload cannot be built");
        assert!(matches!(err, SummarizeError::Serialization(_)));
        assert_eq!(azure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(openai_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn success_is_logged_with_backend_type() {
        #[derive(Default)]
        struct Recording(Mutex<Vec<(String, String, BackendType)>>);

        impl CompletionLogger for Recording {
            fn log(&self, prompt: &str, completion: &str, backend: BackendType) {
                self.0
                    .lock()
                    .expect("lock")
                    .push((prompt.to_string(), completion.to_string(), backend));
            }
        }

        let logger = Arc::new(Recording::default());
        let (gemini, _) = pool(BackendType::GcpGemini, Behavior::Succeed);
        let dispatcher = BackendDispatcher::new(vec![gemini], logger.clone());
        dispatcher.complete("prompt", 10).expect("success");

        let entries = logger.0.lock().expect("lock");
        assert_eq!(
            entries.as_slice(),
            &[(
                "prompt".to_string(),
                "gemini says prompt".to_string(),
                BackendType::GcpGemini
            )]
        );
    }
}
