//! Handler registry shared between the loader and dispatch workers.
//!
//! The registry only grows: the loader thread inserts handlers as they finish
//! constructing, and every request matches against an immutable
//! [`RegistrySnapshot`] taken when it starts.

/// Built-in handlers available before any loading happens.
pub mod intrinsic;
/// Tiered background loading of handler factories.
pub mod loader;

use lingo_core::{Handler, IgnoreLock as _, Invocation, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex};

pub use intrinsic::{
    APPLICATION_HANDLER, AppLauncher, ApplicationHandler, HELP_HANDLER, HelpHandler,
    SystemLauncher, TIME_HANDLER, TimeHandler, is_launchable_name,
};
pub use loader::{HandlerLoader, LoadReport, LoadState, LoadTier, TierTable};

/// A named handler together with the vocabulary it advertises.
pub struct HandlerDescriptor {
    name: String,
    handler: Arc<dyn Handler>,
    keywords: BTreeSet<String>,
    patterns: Vec<String>,
    intrinsic: bool,
}

impl HandlerDescriptor {
    /// Wraps a loaded handler, lower-casing its advertised keywords and patterns.
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        let keywords = handler
            .keywords()
            .into_iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        let mut patterns: Vec<String> = Vec::new();
        for pattern in handler.patterns() {
            let pattern = pattern.trim().to_lowercase();
            if !pattern.is_empty() && !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }

        Self {
            name: name.into(),
            handler,
            keywords,
            patterns,
            intrinsic: false,
        }
    }

    #[must_use]
    fn intrinsic(mut self) -> Self {
        self.intrinsic = true;
        self
    }

    /// Registry key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased keywords declared by the handler.
    #[must_use]
    pub const fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// Example phrases declared by the handler.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether the handler is built in rather than loaded.
    #[must_use]
    pub const fn is_intrinsic(&self) -> bool {
        self.intrinsic
    }

    /// Keywords and patterns joined into one string for fuzzy comparison.
    #[must_use]
    pub fn vocabulary(&self) -> String {
        self.keywords
            .iter()
            .chain(self.patterns.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the handler on the calling thread.
    ///
    /// # Errors
    /// Propagates the handler's own error.
    pub fn invoke(&self, invocation: &Invocation) -> Result<String> {
        self.handler.handle(invocation)
    }
}

impl Debug for HandlerDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("keywords", &self.keywords)
            .field("patterns", &self.patterns)
            .field("intrinsic", &self.intrinsic)
            .finish_non_exhaustive()
    }
}

/// Process-wide mapping from handler name to descriptor.
pub struct Registry {
    entries: Mutex<HashMap<String, Arc<HandlerDescriptor>>>,
}

impl Registry {
    /// Creates a registry holding the intrinsic handlers, launching applications
    /// through the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self::with_launcher(Arc::new(SystemLauncher))
    }

    /// Creates a registry holding the intrinsic handlers with a custom launcher.
    #[must_use]
    pub fn with_launcher(launcher: Arc<dyn AppLauncher>) -> Self {
        let registry = Self {
            entries: Mutex::new(HashMap::new()),
        };
        let intrinsics: [(&str, Arc<dyn Handler>); 3] = [
            (TIME_HANDLER, Arc::new(TimeHandler)),
            (APPLICATION_HANDLER, Arc::new(ApplicationHandler::new(launcher))),
            (HELP_HANDLER, Arc::new(HelpHandler)),
        ];
        for (name, handler) in intrinsics {
            registry.insert(HandlerDescriptor::new(name, handler).intrinsic());
        }
        registry
    }

    /// Adds a descriptor unless its name is already taken.
    ///
    /// Returns `false` when an entry with the same name exists; the existing
    /// entry is kept.
    pub fn insert(&self, descriptor: HandlerDescriptor) -> bool {
        let mut entries = self.entries.lock_ignore_poison();
        if entries.contains_key(descriptor.name()) {
            tracing::warn!("Handler '{}' already registered, ignoring duplicate", descriptor.name());
            return false;
        }
        entries.insert(descriptor.name().to_owned(), Arc::new(descriptor));
        true
    }

    /// Copies the current entries for one request.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self.entries.lock_ignore_poison().clone(),
        }
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock_ignore_poison().contains_key(name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock_ignore_poison().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock_ignore_poison().is_empty()
    }

    /// Registered names in alphabetical order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock_ignore_poison().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of the registry taken at the start of a request.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    entries: HashMap<String, Arc<HandlerDescriptor>>,
}

impl RegistrySnapshot {
    /// Descriptor registered as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.entries.get(name)
    }

    /// Number of handlers in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by name, so scans are deterministic.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Arc<HandlerDescriptor>> {
        let mut descriptors: Vec<&Arc<HandlerDescriptor>> = self.entries.values().collect();
        descriptors.sort_by(|left, right| left.name().cmp(right.name()));
        descriptors
    }

    /// Loaded (non-intrinsic) entries ordered by name.
    #[must_use]
    pub fn loaded(&self) -> Vec<&Arc<HandlerDescriptor>> {
        self.sorted()
            .into_iter()
            .filter(|descriptor| !descriptor.is_intrinsic())
            .collect()
    }
}
