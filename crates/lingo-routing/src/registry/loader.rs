use lingo_core::{Error, HandlerFactory, LoaderConfig, Result};
use std::any::Any;
use std::collections::HashSet;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::watch;

use super::{HandlerDescriptor, Registry};

/// Loading priority of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadTier {
    /// Loaded first; basic readiness waits only for these
    Essential,
    /// Loaded right after the essential tier
    Important,
    /// Loaded in batches
    Supplementary,
    /// Not listed anywhere; loaded in batches after the supplementary tier
    Unclassified,
}

/// Static name-to-tier classification.
#[derive(Debug, Clone, Default)]
pub struct TierTable {
    essential: HashSet<String>,
    important: HashSet<String>,
    supplementary: HashSet<String>,
}

impl TierTable {
    /// Table built from the configured tier lists.
    #[must_use]
    pub fn from_config(config: &LoaderConfig) -> Self {
        let set = |names: &[String]| names.iter().cloned().collect::<HashSet<_>>();
        Self {
            essential: set(&config.essential),
            important: set(&config.important),
            supplementary: set(&config.supplementary),
        }
    }

    /// Tier for `name`; unlisted names are unclassified.
    #[must_use]
    pub fn classify(&self, name: &str) -> LoadTier {
        if self.essential.contains(name) {
            LoadTier::Essential
        } else if self.important.contains(name) {
            LoadTier::Important
        } else if self.supplementary.contains(name) {
            LoadTier::Supplementary
        } else {
            LoadTier::Unclassified
        }
    }
}

/// Readiness flags published by the loader. Both only ever go from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadState {
    /// The essential tier has been attempted
    pub basic_ready: bool,
    /// Every tier has been attempted
    pub all_ready: bool,
}

/// Outcome of a loader run.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Handlers registered, in insertion order
    pub loaded: Vec<String>,
    /// Handlers that failed to construct, with the reason
    pub failed: Vec<(String, String)>,
}

/// Sets `all_ready` when dropped, so readiness is published even if loading panics.
struct ReadyGuard<'state>(&'state watch::Sender<LoadState>);

impl Drop for ReadyGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| {
            state.basic_ready = true;
            state.all_ready = true;
        });
    }
}

/// Constructs handler factories in tier order and inserts them into the registry.
pub struct HandlerLoader {
    registry: Arc<Registry>,
    tiers: TierTable,
    batch_size: usize,
    factories: Vec<Arc<dyn HandlerFactory>>,
}

impl HandlerLoader {
    /// Loader populating `registry` in batches of `config.batch_size`.
    #[must_use]
    pub fn new(registry: Arc<Registry>, config: &LoaderConfig) -> Self {
        Self {
            registry,
            tiers: TierTable::from_config(config),
            batch_size: config.batch_size.max(1),
            factories: Vec::new(),
        }
    }

    /// Adds factories to load.
    #[must_use]
    pub fn with_factories(mut self, factories: Vec<Arc<dyn HandlerFactory>>) -> Self {
        self.factories.extend(factories);
        self
    }

    /// Runs the loader on a dedicated thread named `handler-loader`.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self, state: watch::Sender<LoadState>) -> io::Result<JoinHandle<LoadReport>> {
        thread::Builder::new()
            .name("handler-loader".to_owned())
            .spawn(move || self.run(&state))
    }

    /// Loads every factory on the current thread, publishing readiness through `state`.
    pub fn run(self, state: &watch::Sender<LoadState>) -> LoadReport {
        let guard = ReadyGuard(state);
        let started = Instant::now();
        let mut report = LoadReport::default();

        let mut by_tier: [Vec<Arc<dyn HandlerFactory>>; 4] = Default::default();
        for factory in &self.factories {
            let slot = match self.tiers.classify(factory.name()) {
                LoadTier::Essential => 0,
                LoadTier::Important => 1,
                LoadTier::Supplementary => 2,
                LoadTier::Unclassified => 3,
            };
            by_tier[slot].push(Arc::clone(factory));
        }
        let [essential, important, supplementary, unclassified] = by_tier;

        self.load_batch(&essential, &mut report);
        state.send_modify(|current| current.basic_ready = true);
        tracing::info!(
            "Essential handlers ready after {:?} ({} loaded)",
            started.elapsed(),
            report.loaded.len()
        );

        self.load_batch(&important, &mut report);

        let remaining: Vec<Arc<dyn HandlerFactory>> =
            supplementary.into_iter().chain(unclassified).collect();
        for batch in remaining.chunks(self.batch_size) {
            self.load_batch(batch, &mut report);
        }

        drop(guard);
        tracing::info!(
            "All handlers loaded after {:?}: {} ok, {} failed",
            started.elapsed(),
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    /// Constructs a batch concurrently, then registers the results on this thread.
    fn load_batch(&self, batch: &[Arc<dyn HandlerFactory>], report: &mut LoadReport) {
        if batch.is_empty() {
            return;
        }

        let results: Vec<(String, Result<HandlerDescriptor>)> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|factory| {
                    let name = factory.name().to_owned();
                    (name, scope.spawn(move || construct(factory.as_ref())))
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle.join().unwrap_or_else(|payload| {
                        Err(load_error(&name, &panic_message(payload.as_ref())))
                    });
                    (name, result)
                })
                .collect()
        });

        for (name, result) in results {
            match result {
                Ok(descriptor) => {
                    if self.registry.insert(descriptor) {
                        tracing::debug!("Loaded handler '{name}'");
                        report.loaded.push(name);
                    } else {
                        report.failed.push((name, "duplicate handler name".to_owned()));
                    }
                }
                Err(error) => {
                    tracing::warn!("Failed to load handler '{name}': {error}");
                    report.failed.push((name, error.to_string()));
                }
            }
        }
    }
}

fn construct(factory: &dyn HandlerFactory) -> Result<HandlerDescriptor> {
    let name = factory.name();
    match catch_unwind(AssertUnwindSafe(|| factory.load())) {
        Ok(Ok(handler)) => Ok(HandlerDescriptor::new(name, Arc::from(handler))),
        Ok(Err(error)) => Err(load_error(name, &error.to_string())),
        Err(payload) => Err(load_error(name, &panic_message(payload.as_ref()))),
    }
}

fn load_error(name: &str, reason: &str) -> Error {
    Error::HandlerLoad {
        name: name.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_owned())
}
