//! Configuration types for dispatch, loading, matching and escalation settings.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var consulted for the `OpenAI` key when the config has none.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Env var consulted for the Gemini key when the config has none.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Complete assistant configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Worker pool and timeouts
    pub dispatch: DispatchConfig,
    /// Handler load tiers
    pub loader: LoaderConfig,
    /// Classification thresholds and vocabulary
    pub matching: MatchingConfig,
    /// Quality gate heuristics
    pub escalation: EscalationConfig,
    /// Literal replies checked before any matching
    pub taught: Vec<TaughtPattern>,
    /// API keys for escalation providers
    pub api_keys: ApiKeys,
}

/// Worker pool and timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of OS threads executing dispatch pipelines
    pub worker_threads: usize,
    /// Default wait budget for blocking dispatch
    pub sync_timeout_ms: u64,
    /// Conversation turns passed to providers and context-aware handlers
    pub history_turns: usize,
    /// Turns retained by the default in-process memory
    pub memory_turns: usize,
    /// Upper bound on a single provider call
    pub provider_timeout_ms: u64,
}

impl DispatchConfig {
    /// Bound on a blocking dispatch.
    #[must_use]
    pub const fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Bound on one provider call.
    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            sync_timeout_ms: 10_000,
            history_turns: 8,
            memory_turns: 200,
            provider_timeout_ms: 30_000,
        }
    }
}

/// Static tier classification for background handler loading.
///
/// Handlers not listed in any tier load last, after the supplementary ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Loaded first; basic readiness is signalled once these finish
    pub essential: Vec<String>,
    /// Loaded right after the essential tier
    pub important: Vec<String>,
    /// Loaded in small batches with everything unclassified
    pub supplementary: Vec<String>,
    /// Batch size for supplementary and unclassified handlers
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            essential: strings(&["calculator", "system_info"]),
            important: strings(&[
                "weather",
                "reminder",
                "nlp_processor",
                "chitchat",
                "app_launcher",
            ]),
            supplementary: strings(&["ai_enhancements", "work_assistant"]),
            batch_size: 2,
        }
    }
}

/// Phrases matched by substring against accent-stripped, lower-cased input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseRule {
    /// Intent label, used in logs
    pub intent: String,
    /// Candidate handler names, first registered one wins
    pub handlers: Vec<String>,
    /// Accent-free phrases
    pub phrases: Vec<String>,
}

/// Keyword trigger for one domain handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRule {
    /// Registry name of the handler
    pub handler: String,
    /// Tokens that select the handler
    pub keywords: Vec<String>,
    /// Also require a digit somewhere in the input
    #[serde(default)]
    pub require_digit: bool,
}

/// Classification thresholds and routing vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Fuzzy similarity must strictly exceed this to resolve a handler
    pub fuzzy_threshold: f64,
    /// Looser similarity used to propose suggestions
    pub suggestion_threshold: f64,
    /// Maximum number of suggested phrases
    pub max_suggestions: usize,
    /// How long a request waits for the essential tier before matching anyway
    pub basic_ready_wait_ms: u64,
    /// Maximum memoized fuzzy resolutions
    pub cache_capacity: u64,
    /// Lifetime of a memoized fuzzy resolution
    pub cache_ttl_secs: u64,
    /// Intrinsic keywords for the current time
    pub time_keywords: Vec<String>,
    /// Intrinsic keywords for launching an application
    pub launch_keywords: Vec<String>,
    /// Normalized phrase rules in precedence order
    pub phrase_rules: Vec<PhraseRule>,
    /// Domain rules in precedence order
    pub domain_rules: Vec<DomainRule>,
    /// Handler that receives recent conversation and goes through the quality gate
    pub language_handler: String,
}

impl MatchingConfig {
    /// How long matching waits for the essential tier.
    #[must_use]
    pub const fn basic_ready_wait(&self) -> Duration {
        Duration::from_millis(self.basic_ready_wait_ms)
    }

    /// Lifetime of a cached fuzzy match.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            suggestion_threshold: 0.6,
            max_suggestions: 3,
            basic_ready_wait_ms: 100,
            cache_capacity: 1024,
            cache_ttl_secs: 3600,
            time_keywords: strings(&["giờ", "thời gian", "time"]),
            launch_keywords: strings(&["mở", "khởi động", "chạy", "open", "launch"]),
            phrase_rules: vec![
                PhraseRule {
                    intent: "help".to_owned(),
                    handlers: strings(&["help"]),
                    phrases: strings(&[
                        "tro giup",
                        "huong dan",
                        "ban lam duoc gi",
                        "ban co the lam gi",
                        "help",
                    ]),
                },
                PhraseRule {
                    intent: "time".to_owned(),
                    handlers: strings(&["time"]),
                    phrases: strings(&["may gio", "gio roi", "bay gio la", "what time"]),
                },
                PhraseRule {
                    intent: "app_launch".to_owned(),
                    handlers: strings(&["app_launcher", "application"]),
                    phrases: strings(&[
                        "mo ung dung",
                        "khoi dong ung dung",
                        "chay ung dung",
                        "open app",
                        "launch app",
                    ]),
                },
                PhraseRule {
                    intent: "question".to_owned(),
                    handlers: strings(&["nlp_processor", "chitchat"]),
                    phrases: strings(&["cho toi hoi", "giai thich", "la gi", "what is", "explain"]),
                },
            ],
            domain_rules: vec![
                DomainRule {
                    handler: "reminder".to_owned(),
                    keywords: strings(&[
                        "nhắc",
                        "nhắc nhở",
                        "lịch",
                        "sự kiện",
                        "hẹn",
                        "reminder",
                        "calendar",
                    ]),
                    require_digit: false,
                },
                DomainRule {
                    handler: "system_info".to_owned(),
                    keywords: strings(&["hệ thống", "thông tin", "máy tính", "system"]),
                    require_digit: false,
                },
                DomainRule {
                    handler: "weather".to_owned(),
                    keywords: strings(&["thời tiết", "weather", "nhiệt độ", "độ ẩm", "dự báo"]),
                    require_digit: false,
                },
                DomainRule {
                    handler: "nlp_processor".to_owned(),
                    keywords: strings(&[
                        "hiểu",
                        "phân tích",
                        "ngôn ngữ",
                        "nlp",
                        "xử lý",
                        "lời nói",
                        "cảm xúc",
                        "ý định",
                        "xóa",
                        "hủy",
                        "delete",
                        "remove",
                    ]),
                    require_digit: false,
                },
                DomainRule {
                    handler: "calculator".to_owned(),
                    keywords: strings(&["cộng", "trừ", "nhân", "chia", "tính", "+", "-", "*", "/"]),
                    require_digit: true,
                },
            ],
            language_handler: "nlp_processor".to_owned(),
        }
    }
}

/// Heuristics deciding that a language-analysis answer is too poor to show.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Substrings marking an "I don't understand" answer (compared accent-free)
    pub not_understood: Vec<String>,
    /// Answers consisting of only one of these labels carry no information
    pub intent_labels: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            not_understood: strings(&[
                "khong hieu",
                "khong ro y",
                "i don't understand",
                "i do not understand",
                "not sure what you mean",
            ]),
            intent_labels: strings(&[
                "unknown",
                "greeting",
                "question",
                "command",
                "statement",
                "chitchat",
                "farewell",
            ]),
        }
    }
}

/// A literal reply that pre-empts matching when `pattern` occurs in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaughtPattern {
    /// Phrase looked for in the accent-free input
    pub pattern: String,
    /// Reply returned verbatim
    pub reply: String,
}

/// API keys and endpoints for escalation providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApiKeys {
    /// `OpenAI` (or compatible) API key
    pub openai_api_key: Option<String>,
    /// `OpenAI` model override
    pub openai_model: Option<String>,
    /// Base URL of an `OpenAI`-compatible endpoint
    pub openai_base: Option<String>,
    /// Google Gemini API key
    pub gemini_api_key: Option<String>,
    /// Gemini model override
    pub gemini_model: Option<String>,
}

impl AssistantConfig {
    /// Get the default config directory path (`~/.lingo`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".lingo"))
    }

    /// Get the default config file path (`~/.lingo/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults if missing
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(
            "Loaded config from {:?}: openai_api_key={}, gemini_api_key={}",
            path,
            if config.api_keys.openai_api_key.is_some() {
                "present"
            } else {
                "missing"
            },
            if config.api_keys.gemini_api_key.is_some() {
                "present"
            } else {
                "missing"
            }
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Lingo Assistant Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| Error::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Reject values the dispatcher cannot run with.
    ///
    /// # Errors
    /// Returns a configuration error naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.worker_threads == 0 {
            return Err(Error::Config(
                "dispatch.worker_threads must be at least 1".to_owned(),
            ));
        }
        if self.loader.batch_size == 0 {
            return Err(Error::Config("loader.batch_size must be at least 1".to_owned()));
        }
        for (field, value) in [
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            ("matching.suggestion_threshold", self.matching.suggestion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{field} must be within 0.0..=1.0")));
            }
        }
        Ok(())
    }

    /// Get API key for a provider, checking config first, then environment variables
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        let key = match provider {
            "chatgpt" | "openai" => self
                .api_keys
                .openai_api_key
                .clone()
                .or_else(|| env::var(ENV_OPENAI_API_KEY).ok()),
            "gemini" => self
                .api_keys
                .gemini_api_key
                .clone()
                .or_else(|| env::var(ENV_GEMINI_API_KEY).ok()),
            _ => None,
        };
        key.map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}
