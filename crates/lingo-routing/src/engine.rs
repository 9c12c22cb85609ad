//! The public dispatcher: owns the worker pool, the registry and the loader thread.

use lingo_core::{
    AnswerProvider, AssistantConfig, ConversationMemory, HandlerFactory, IgnoreLock as _,
    InMemoryConversation, PreferenceStore, Result, StaticPreference,
};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tokio::time::timeout as with_timeout;
use tracing::Instrument as _;

use crate::dispatch::pipeline::join_error_message;
use crate::dispatch::{
    DispatchPipeline, DispatchTask, ERROR_PREFIX, ProviderSet, QualityGate, TaughtPatterns,
};
use crate::matcher::{MatchOutcome, Matcher};
use crate::registry::{AppLauncher, HandlerLoader, LoadReport, LoadState, Registry};

/// Reply returned by [`DispatchEngine::dispatch_sync`] when the wait budget runs out.
pub const TIMEOUT_REPLY: &str = "Timeout: Không thể xử lý yêu cầu";

/// Collects collaborators before starting a [`DispatchEngine`].
pub struct EngineBuilder {
    config: AssistantConfig,
    factories: Vec<Arc<dyn HandlerFactory>>,
    providers: Vec<Arc<dyn AnswerProvider>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    memory: Option<Arc<dyn ConversationMemory>>,
    launcher: Option<Arc<dyn AppLauncher>>,
}

impl EngineBuilder {
    /// Builder with no factories, no providers and default collaborators.
    #[must_use]
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            config,
            factories: Vec::new(),
            providers: Vec::new(),
            preferences: None,
            memory: None,
            launcher: None,
        }
    }

    /// Adds a handler factory for the background loader.
    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn HandlerFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Adds several handler factories.
    #[must_use]
    pub fn factories(
        mut self,
        factories: impl IntoIterator<Item = Arc<dyn HandlerFactory>>,
    ) -> Self {
        self.factories.extend(factories);
        self
    }

    /// Adds an answering provider used for triggers and escalation.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn AnswerProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Adds several answering providers.
    #[must_use]
    pub fn providers(
        mut self,
        providers: impl IntoIterator<Item = Arc<dyn AnswerProvider>>,
    ) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Source of the preferred provider; defaults to no preference.
    #[must_use]
    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Conversation memory; defaults to an in-process ring buffer.
    #[must_use]
    pub fn memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Launcher used by the intrinsic application handler.
    #[must_use]
    pub fn launcher(mut self, launcher: Arc<dyn AppLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Starts the worker pool and the loader thread.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a thread cannot be spawned.
    pub fn build(self) -> Result<DispatchEngine> {
        let Self {
            config,
            factories,
            providers,
            preferences,
            memory,
            launcher,
        } = self;
        config.validate()?;

        let workers = config.dispatch.worker_threads;
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .thread_name("dispatch-worker")
            .enable_all()
            .build()?;

        let registry = Arc::new(launcher.map_or_else(Registry::new, Registry::with_launcher));
        let memory: Arc<dyn ConversationMemory> = memory.unwrap_or_else(|| {
            Arc::new(InMemoryConversation::new(config.dispatch.memory_turns))
        });
        let preferences: Arc<dyn PreferenceStore> =
            preferences.unwrap_or_else(|| Arc::new(StaticPreference(None)));
        let providers = Arc::new(ProviderSet::new(
            providers,
            preferences,
            config.dispatch.provider_timeout(),
        ));
        let taught = Arc::new(TaughtPatterns::new(&config.taught));
        let gate = QualityGate::new(&config.escalation)?;

        let (state, readiness) = watch::channel(LoadState::default());
        let matcher = Matcher::new(
            config.matching.clone(),
            Arc::clone(&registry),
            Arc::clone(&providers),
            readiness.clone(),
        );
        let pipeline = Arc::new(DispatchPipeline::new(
            matcher,
            Arc::clone(&registry),
            providers,
            Arc::clone(&taught),
            Arc::clone(&memory),
            gate,
            config.dispatch.history_turns,
        ));

        let factory_count = factories.len();
        let loader = HandlerLoader::new(Arc::clone(&registry), &config.loader)
            .with_factories(factories)
            .spawn(state)?;
        tracing::info!(
            "Dispatch engine started: {workers} workers, {factory_count} handler factories"
        );

        Ok(DispatchEngine {
            runtime: Some(runtime),
            pipeline,
            registry,
            taught,
            memory,
            readiness,
            loader: Mutex::new(Some(loader)),
            sync_timeout: config.dispatch.sync_timeout(),
        })
    }
}

/// Natural-language command dispatcher.
///
/// Every request runs on a fixed pool of worker threads and yields exactly one reply,
/// delivered to a callback or returned to a blocked caller.
pub struct DispatchEngine {
    runtime: Option<Runtime>,
    pipeline: Arc<DispatchPipeline>,
    registry: Arc<Registry>,
    taught: Arc<TaughtPatterns>,
    memory: Arc<dyn ConversationMemory>,
    readiness: watch::Receiver<LoadState>,
    loader: Mutex<Option<JoinHandle<LoadReport>>>,
    sync_timeout: Duration,
}

impl DispatchEngine {
    /// Starts building an engine from `config`.
    #[must_use]
    pub fn builder(config: AssistantConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Queues `text` and returns immediately. `callback` runs exactly once on a
    /// worker thread with the reply, including when the handler panics.
    pub fn dispatch_async<F>(&self, text: impl Into<String>, callback: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let task = DispatchTask::new(text);
        let Some(runtime) = self.runtime.as_ref() else {
            callback(format!("{ERROR_PREFIX}dispatcher is shutting down"));
            return;
        };

        let span = tracing::info_span!("dispatch", task = %task.id);
        let pipeline = Arc::clone(&self.pipeline);
        let worker = runtime.spawn(async move { pipeline.run(&task).await }.instrument(span));
        runtime.spawn(async move {
            let reply = match worker.await {
                Ok(reply) => reply,
                Err(error) => {
                    let message = join_error_message(error);
                    tracing::error!("Dispatch task failed: {message}");
                    format!("{ERROR_PREFIX}{message}")
                }
            };
            callback(reply);
        });
    }

    /// Dispatches `text` and blocks for at most `timeout`.
    ///
    /// Returns [`TIMEOUT_REPLY`] when the budget runs out; the request keeps running
    /// and its reply is discarded.
    pub fn dispatch_sync(&self, text: impl Into<String>, timeout: Duration) -> String {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.dispatch_async(text, move |reply| {
            if sender.send(reply).is_err() {
                tracing::debug!("Reply arrived after the caller stopped waiting");
            }
        });

        match receiver.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Dispatch timed out after {timeout:?}");
                TIMEOUT_REPLY.to_owned()
            }
            Err(RecvTimeoutError::Disconnected) => {
                format!("{ERROR_PREFIX}dispatch task was dropped")
            }
        }
    }

    /// [`Self::dispatch_sync`] with the configured timeout.
    pub fn dispatch(&self, text: impl Into<String>) -> String {
        self.dispatch_sync(text, self.sync_timeout)
    }

    /// Classifies `text` without running anything.
    ///
    /// Blocks the calling thread; must not be called from inside an async context.
    pub fn resolve(&self, text: &str) -> Option<MatchOutcome> {
        let runtime = self.runtime.as_ref()?;
        runtime.block_on(self.pipeline.matcher().resolve(text))
    }

    /// Current loader progress.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        *self.readiness.borrow()
    }

    /// Blocks until every handler tier has been attempted or `timeout` elapses.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let Some(runtime) = self.runtime.as_ref() else {
            return self.load_state().all_ready;
        };
        let mut readiness = self.readiness.clone();
        runtime.block_on(async move {
            with_timeout(timeout, readiness.wait_for(|state| state.all_ready))
                .await
                .is_ok_and(|result| result.is_ok())
        })
    }

    /// Waits for the loader thread and returns what it loaded. Only the first call
    /// gets the report.
    pub fn join_loader(&self) -> Option<LoadReport> {
        let handle = self.loader.lock_ignore_poison().take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                tracing::error!("Handler loader thread panicked");
                None
            }
        }
    }

    /// Registered handler names in alphabetical order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Registry shared with the loader thread.
    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Teaches a literal reply, checked before any matching from now on.
    pub fn teach(&self, pattern: &str, reply: &str) {
        self.taught.teach(pattern, reply);
    }

    /// Conversation memory shared by every request.
    #[must_use]
    pub fn memory(&self) -> Arc<dyn ConversationMemory> {
        Arc::clone(&self.memory)
    }
}

impl Drop for DispatchEngine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
