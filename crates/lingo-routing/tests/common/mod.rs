//! Common test utilities and helpers for lingo-routing tests
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use lingo_core::{
    AssistantConfig, Error, Handler, HandlerFactory, IgnoreLock as _, Invocation, Result,
};
use lingo_routing::{DispatchEngine, EngineBuilder};
use std::env;
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, fmt};

// ----------------------------------------------------------------------------
// Tracing initialization for tests
// ----------------------------------------------------------------------------

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // Another test binary already installed a subscriber
        }
    });
}

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------

/// Scriptable handler: echoes its parameter unless told otherwise.
#[derive(Clone, Default)]
pub struct StubHandler {
    reply: Option<String>,
    keywords: Vec<String>,
    patterns: Vec<String>,
    delay: Option<Duration>,
    panics: bool,
    seen: Arc<Mutex<Vec<Invocation>>>,
}

impl StubHandler {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_owned()),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|word| (*word).to_owned()).collect();
        self
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().map(|word| (*word).to_owned()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every invocation received so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.seen.lock_ignore_poison().clone()
    }
}

impl Handler for StubHandler {
    fn handle(&self, invocation: &Invocation) -> Result<String> {
        self.seen.lock_ignore_poison().push(invocation.clone());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.panics {
            panic!("handler exploded");
        }
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| invocation.parameter.clone()))
    }

    fn keywords(&self) -> Vec<String> {
        self.keywords.clone()
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }
}

// ----------------------------------------------------------------------------
// Factories
// ----------------------------------------------------------------------------

type Build = Box<dyn Fn() -> Result<Box<dyn Handler>> + Send + Sync>;

/// Factory backed by a closure.
pub struct FnFactory {
    name: String,
    build: Build,
}

impl FnFactory {
    pub fn new(
        name: &str,
        build: impl Fn() -> Result<Box<dyn Handler>> + Send + Sync + 'static,
    ) -> Arc<dyn HandlerFactory> {
        Arc::new(Self {
            name: name.to_owned(),
            build: Box::new(build),
        })
    }
}

impl HandlerFactory for FnFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Box<dyn Handler>> {
        (self.build)()
    }
}

/// Factory handing out clones of `handler`, so the test keeps a probe on it.
pub fn stub_factory(name: &str, handler: &StubHandler) -> Arc<dyn HandlerFactory> {
    let handler = handler.clone();
    FnFactory::new(name, move || Ok(Box::new(handler.clone())))
}

/// Factory that sleeps before handing out `handler`.
pub fn slow_factory(name: &str, handler: &StubHandler, delay: Duration) -> Arc<dyn HandlerFactory> {
    let handler = handler.clone();
    FnFactory::new(name, move || {
        thread::sleep(delay);
        Ok(Box::new(handler.clone()))
    })
}

pub fn failing_factory(name: &str) -> Arc<dyn HandlerFactory> {
    FnFactory::new(name, || Err(Error::Other("missing model file".to_owned())))
}

pub fn panicking_factory(name: &str) -> Arc<dyn HandlerFactory> {
    FnFactory::new(name, || panic!("constructor exploded"))
}

// ----------------------------------------------------------------------------
// Engines
// ----------------------------------------------------------------------------

/// Default configuration with a short sync timeout.
pub fn test_config() -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.dispatch.sync_timeout_ms = 5_000;
    config.dispatch.provider_timeout_ms = 2_000;
    config
}

pub fn builder() -> EngineBuilder {
    init_tracing();
    DispatchEngine::builder(test_config())
}

/// Builds the engine and waits for the loader to finish.
pub fn ready_engine(builder: EngineBuilder) -> DispatchEngine {
    let engine = builder.build().expect("engine builds");
    assert!(
        engine.wait_until_ready(Duration::from_secs(5)),
        "loader did not finish"
    );
    engine
}

/// Polls `condition` until it holds or `limit` elapses.
pub fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
