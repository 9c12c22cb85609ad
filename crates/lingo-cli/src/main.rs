//! Lingo CLI - line-oriented front end for the command dispatcher
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use lingo_core::{AssistantConfig, ConversationMemory, FilePreferences, InMemoryConversation};
use lingo_providers::providers_from_config;
use lingo_routing::DispatchEngine;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use lingo_cli::{Cli, handlers, logging, run_once, run_repl};

fn load_config(cli: &Cli) -> AssistantConfig {
    let loaded = cli.config.as_deref().map_or_else(
        AssistantConfig::load_or_create,
        AssistantConfig::load_from_file,
    );
    loaded.unwrap_or_else(|error| {
        tracing::warn!("Failed to load configuration: {error}");
        tracing::warn!("Using default configuration");
        AssistantConfig::default()
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_stderr)?;

    let config = load_config(&cli);
    let memory = Arc::new(InMemoryConversation::new(config.dispatch.memory_turns));
    let shared_memory = Arc::clone(&memory) as Arc<dyn ConversationMemory>;
    let providers = providers_from_config(&config);

    let mut builder = DispatchEngine::builder(config)
        .providers(providers)
        .memory(shared_memory)
        .factories(handlers::factories(&memory));
    match FilePreferences::default_location() {
        Ok(preferences) => builder = builder.preferences(Arc::new(preferences)),
        Err(error) => tracing::warn!("Provider preferences unavailable: {error}"),
    }
    let engine = builder.build()?;

    if !engine.wait_until_ready(Duration::from_millis(cli.warmup_ms)) {
        tracing::warn!("Handlers still loading after {}ms", cli.warmup_ms);
    }

    let stdout = io::stdout();
    match cli.once.as_deref() {
        Some(request) => run_once(&engine, request, stdout.lock()),
        None => run_repl(&engine, io::stdin().lock(), stdout.lock()),
    }
}
