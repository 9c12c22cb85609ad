//! Six-tier classification of input text into a handler or provider.
//!
//! Tiers run in fixed precedence and the first hit wins:
//!
//! 1. intrinsic keywords (time, application launch)
//! 2. explicit provider triggers
//! 3. accent-free phrase rules
//! 4. domain keyword rules
//! 5. exact keywords advertised by loaded handlers
//! 6. fuzzy similarity against each handler's vocabulary, memoized
//!
//! Tiers 1 to 5 resolve with confidence 1.0.

/// Memo for fuzzy resolutions.
pub mod cache;

use lingo_core::{AnswerProvider, MatchingConfig};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::dispatch::{ProviderSet, strip_trigger};
use crate::registry::{
    APPLICATION_HANDLER, HandlerDescriptor, LoadState, Registry, RegistrySnapshot, TIME_HANDLER,
};
use crate::similarity::token_set_ratio;
use crate::text::{Tokens, contains_phrase, has_digit};

pub use cache::{CachedMatch, MatchCache, MatchKey};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    /// Built-in time, help or application handler
    Intrinsic,
    /// Input addressed a provider by name
    ProviderTrigger,
    /// Configured multi-word phrase
    Phrase,
    /// Configured domain keyword rule
    Domain,
    /// Keyword declared by a handler
    Keyword,
    /// Best pattern similarity above the threshold
    Fuzzy,
}

/// What a request resolved to.
#[derive(Clone)]
pub enum MatchTarget {
    /// A registered handler
    Handler(Arc<HandlerDescriptor>),
    /// An answering provider addressed by name
    Provider(Arc<dyn AnswerProvider>),
}

impl MatchTarget {
    /// Handler or provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Handler(descriptor) => descriptor.name(),
            Self::Provider(provider) => provider.name(),
        }
    }
}

impl Debug for MatchTarget {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(descriptor) => formatter
                .debug_tuple("Handler")
                .field(&descriptor.name())
                .finish(),
            Self::Provider(provider) => formatter
                .debug_tuple("Provider")
                .field(&provider.name())
                .finish(),
        }
    }
}

/// A resolved request.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Handler or provider to run
    pub target: MatchTarget,
    /// 1.0 for deterministic tiers, the similarity score for fuzzy matches
    pub confidence: f64,
    /// Text handed to the handler
    pub parameter: String,
    /// Tier that produced the match
    pub tier: MatchTier,
}

impl MatchOutcome {
    fn exact(
        descriptor: &Arc<HandlerDescriptor>,
        parameter: impl Into<String>,
        tier: MatchTier,
    ) -> Self {
        Self {
            target: MatchTarget::Handler(Arc::clone(descriptor)),
            confidence: 1.0,
            parameter: parameter.into(),
            tier,
        }
    }

    /// Name of the handler or provider.
    #[must_use]
    pub fn name(&self) -> &str {
        self.target.name()
    }
}

/// Classifies input against the registry, waiting briefly for essential handlers.
pub struct Matcher {
    config: MatchingConfig,
    registry: Arc<Registry>,
    providers: Arc<ProviderSet>,
    readiness: watch::Receiver<LoadState>,
    cache: MatchCache,
}

impl Matcher {
    /// Matcher over `registry` and `providers`, gated on `readiness` for the essential tier.
    #[must_use]
    pub fn new(
        config: MatchingConfig,
        registry: Arc<Registry>,
        providers: Arc<ProviderSet>,
        readiness: watch::Receiver<LoadState>,
    ) -> Self {
        let cache = MatchCache::new(config.cache_capacity, config.cache_ttl());
        Self {
            config,
            registry,
            providers,
            readiness,
            cache,
        }
    }

    /// Matching configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Memo of fuzzy-tier results.
    #[must_use]
    pub const fn cache(&self) -> &MatchCache {
        &self.cache
    }

    /// Resolves `text`, first giving the essential tier a bounded chance to finish loading.
    pub async fn resolve(&self, text: &str) -> Option<MatchOutcome> {
        self.await_basic_ready().await;
        let snapshot = self.registry.snapshot();
        self.classify(text, &snapshot)
    }

    async fn await_basic_ready(&self) {
        let mut readiness = self.readiness.clone();
        let ready = readiness.borrow().basic_ready;
        if ready {
            return;
        }
        let wait = self.config.basic_ready_wait();
        let waited = timeout(wait, readiness.wait_for(|state| state.basic_ready))
            .await
            .is_ok();
        if !waited {
            tracing::debug!(
                "Essential handlers not ready after {wait:?}, matching with what is loaded"
            );
        }
    }

    /// Runs every tier against one registry snapshot.
    #[must_use]
    pub fn classify(&self, text: &str, snapshot: &RegistrySnapshot) -> Option<MatchOutcome> {
        let tokens = Tokens::new(text);
        let outcome = self
            .intrinsic(&tokens, snapshot)
            .or_else(|| self.provider_trigger(text, &tokens))
            .or_else(|| self.phrase(text, snapshot))
            .or_else(|| self.domain(text, &tokens, snapshot))
            .or_else(|| Self::keyword(text, &tokens, snapshot))
            .or_else(|| self.fuzzy(text, &tokens, snapshot));

        match &outcome {
            Some(found) => tracing::debug!(
                "Matched '{}' via {:?} with confidence {:.2}",
                found.name(),
                found.tier,
                found.confidence
            ),
            None => tracing::debug!("No handler matched"),
        }
        outcome
    }

    fn intrinsic(&self, tokens: &Tokens, snapshot: &RegistrySnapshot) -> Option<MatchOutcome> {
        if tokens.contains_any(&self.config.time_keywords) {
            if let Some(time) = snapshot.get(TIME_HANDLER) {
                return Some(MatchOutcome::exact(time, "", MatchTier::Intrinsic));
            }
        }
        let application = snapshot.get(APPLICATION_HANDLER)?;
        tokens
            .after_first(&self.config.launch_keywords)
            .map(|name| MatchOutcome::exact(application, name, MatchTier::Intrinsic))
    }

    fn provider_trigger(&self, text: &str, tokens: &Tokens) -> Option<MatchOutcome> {
        self.providers
            .configured()
            .into_iter()
            .find_map(|provider| {
                let triggers = provider.triggers();
                tokens.contains_any(&triggers).then(|| MatchOutcome {
                    parameter: strip_trigger(text, &triggers),
                    target: MatchTarget::Provider(provider),
                    confidence: 1.0,
                    tier: MatchTier::ProviderTrigger,
                })
            })
    }

    fn phrase(&self, text: &str, snapshot: &RegistrySnapshot) -> Option<MatchOutcome> {
        self.config.phrase_rules.iter().find_map(|rule| {
            if !rule.phrases.iter().any(|phrase| contains_phrase(text, phrase)) {
                return None;
            }
            let descriptor = rule.handlers.iter().find_map(|name| snapshot.get(name))?;
            tracing::trace!("Phrase rule '{}' selected '{}'", rule.intent, descriptor.name());
            Some(MatchOutcome::exact(descriptor, text.trim(), MatchTier::Phrase))
        })
    }

    fn domain(
        &self,
        text: &str,
        tokens: &Tokens,
        snapshot: &RegistrySnapshot,
    ) -> Option<MatchOutcome> {
        self.config.domain_rules.iter().find_map(|rule| {
            let descriptor = snapshot.get(&rule.handler)?;
            let selected = tokens.contains_any(&rule.keywords)
                && (!rule.require_digit || has_digit(text));
            selected.then(|| MatchOutcome::exact(descriptor, text.trim(), MatchTier::Domain))
        })
    }

    fn keyword(text: &str, tokens: &Tokens, snapshot: &RegistrySnapshot) -> Option<MatchOutcome> {
        snapshot
            .loaded()
            .into_iter()
            .find(|descriptor| {
                descriptor
                    .keywords()
                    .iter()
                    .any(|keyword| tokens.contains(keyword))
            })
            .map(|descriptor| MatchOutcome::exact(descriptor, text.trim(), MatchTier::Keyword))
    }

    fn fuzzy(
        &self,
        text: &str,
        tokens: &Tokens,
        snapshot: &RegistrySnapshot,
    ) -> Option<MatchOutcome> {
        if tokens.is_empty() {
            return None;
        }

        let key = MatchKey::new(tokens.words(), snapshot.len());
        if let Some(hit) = self.cache.get(&key) {
            if let Some(descriptor) = snapshot.get(&hit.handler) {
                return Some(Self::fuzzy_outcome(descriptor, hit.confidence, text));
            }
        }

        let lowered = text.to_lowercase();
        let mut best: Option<(&Arc<HandlerDescriptor>, f64)> = None;
        for descriptor in snapshot.loaded() {
            let vocabulary = descriptor.vocabulary();
            if vocabulary.is_empty() {
                continue;
            }
            let score = token_set_ratio(&lowered, &vocabulary);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((descriptor, score));
            }
        }

        let (descriptor, score) = best.filter(|(_, score)| *score > self.config.fuzzy_threshold)?;
        self.cache.insert(
            key,
            CachedMatch {
                handler: descriptor.name().to_owned(),
                confidence: score,
            },
        );
        Some(Self::fuzzy_outcome(descriptor, score, text))
    }

    fn fuzzy_outcome(
        descriptor: &Arc<HandlerDescriptor>,
        confidence: f64,
        text: &str,
    ) -> MatchOutcome {
        MatchOutcome {
            target: MatchTarget::Handler(Arc::clone(descriptor)),
            confidence,
            parameter: text.trim().to_owned(),
            tier: MatchTier::Fuzzy,
        }
    }
}
