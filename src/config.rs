//! Configuration loading for cardforge.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.cardforge/config.toml`)
//! 3. User config (`~/.cardforge/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional except the completion endpoint, which only
//! the `generate` command needs.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{MAX_INTERVAL_DAYS, MIN_EASE};
use crate::error::{CardError, Result};

/// Name of the per-user and per-project configuration directory.
pub const CONFIG_DIR_NAME: &str = ".cardforge";

/// Main configuration struct for cardforge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Completion backend configuration.
    pub llm: LlmConfig,
    /// Card generation limits.
    pub generation: GenerationConfig,
    /// Spaced-repetition parameters.
    pub scheduling: SchedulingConfig,
    /// Review sitting configuration.
    pub review: ReviewConfig,
    /// Card store configuration.
    pub storage: StorageConfig,
}

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Model name sent with every request.
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Whole-request timeout.
    pub timeout_seconds: u64,
}

impl LlmConfig {
    /// Check if a temperature value is usable (finite, in `[0.0, 2.0]`).
    pub fn is_valid_temperature(value: f64) -> bool {
        value.is_finite() && (0.0..=2.0).contains(&value)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            model: "local".to_string(),
            api_key: None,
            max_tokens: 512,
            temperature: 0.2,
            timeout_seconds: 60,
        }
    }
}

/// Card generation limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Longest accepted source text, in characters.
    pub max_source_chars: usize,
    pub min_cards: u32,
    pub max_cards: u32,
    /// Cards requested when the caller gives no count.
    pub default_cards: u32,
}

impl GenerationConfig {
    /// Clamp a requested card count into the configured range.
    pub fn clamp_count(&self, requested: Option<u32>) -> u32 {
        let min = self.min_cards.max(1);
        let max = self.max_cards.max(min);
        requested.unwrap_or(self.default_cards).clamp(min, max)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_source_chars: 20_000,
            min_cards: 1,
            max_cards: 50,
            default_cards: 10,
        }
    }
}

/// Spaced-repetition parameters.
///
/// The ease floor is not configurable; see [`MIN_EASE`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Ease given to freshly generated cards.
    pub initial_ease: f64,
    pub again_penalty: f64,
    pub hard_penalty: f64,
    /// Interval growth factor for `hard`.
    pub hard_multiplier: f64,
    pub easy_bonus: f64,
    /// Extra interval growth factor for `easy`, applied on top of the ease.
    pub easy_multiplier: f64,
    /// Upper bound on any interval.
    pub max_interval_days: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            again_penalty: 0.2,
            hard_penalty: 0.15,
            hard_multiplier: 1.2,
            easy_bonus: 0.15,
            easy_multiplier: 1.3,
            max_interval_days: 36_500,
        }
    }
}

/// Review sitting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReviewConfig {
    /// How many recently shown cards a sitting avoids repeating.
    pub recent_window: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { recent_window: 50 }
    }
}

/// Card store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. Defaults to `<cardforge home>/cards.sqlite3`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.cardforge/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.cardforge/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let path = cardforge_home()?.join("config.toml");
        Self::load_optional(&path)
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_config_dir(cwd).join("config.toml");
        Self::load_optional(&path)
    }

    /// Load a config file that may legitimately be absent.
    ///
    /// A file that exists but cannot be read or parsed is skipped with a
    /// warning.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| CardError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| CardError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("CARDFORGE_LLM_URL") {
            self.llm.api_url = Some(url);
        }

        if let Some(model) = non_empty_env("CARDFORGE_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(key) = non_empty_env("CARDFORGE_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }

        if let Ok(val) = env::var("CARDFORGE_LLM_TIMEOUT") {
            match val.parse::<u64>() {
                Ok(n) if n >= 1 => self.llm.timeout_seconds = n,
                _ => tracing::warn!(
                    "Invalid CARDFORGE_LLM_TIMEOUT value '{}'. \
                    Expected a positive number of seconds. Using '{}'.",
                    val,
                    self.llm.timeout_seconds
                ),
            }
        }

        if let Some(path) = non_empty_env("CARDFORGE_DATABASE") {
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(val) = env::var("CARDFORGE_MAX_CARDS") {
            let min = self.generation.min_cards.max(1);
            match val.parse::<u32>() {
                Ok(n) if n >= min => self.generation.max_cards = n,
                _ => tracing::warn!(
                    "Invalid CARDFORGE_MAX_CARDS value '{}'. \
                    Expected an integer >= {}. Using '{}'.",
                    val,
                    min,
                    self.generation.max_cards
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    ///
    /// # Limitation
    ///
    /// A higher layer cannot set a value back to its default to undo a lower
    /// layer's customization, because "not set in file" and "set to default"
    /// look the same after deserialization.
    fn merge(mut self, other: Config) -> Self {
        let default_llm = LlmConfig::default();
        if other.llm.api_url.is_some() {
            self.llm.api_url = other.llm.api_url;
        }
        if other.llm.model != default_llm.model {
            self.llm.model = other.llm.model;
        }
        if other.llm.api_key.is_some() {
            self.llm.api_key = other.llm.api_key;
        }
        if other.llm.max_tokens != default_llm.max_tokens {
            self.llm.max_tokens = other.llm.max_tokens;
        }
        if other.llm.temperature != default_llm.temperature {
            self.llm.temperature = other.llm.temperature;
        }
        if other.llm.timeout_seconds != default_llm.timeout_seconds {
            self.llm.timeout_seconds = other.llm.timeout_seconds;
        }

        let default_gen = GenerationConfig::default();
        if other.generation.max_source_chars != default_gen.max_source_chars {
            self.generation.max_source_chars = other.generation.max_source_chars;
        }
        if other.generation.min_cards != default_gen.min_cards {
            self.generation.min_cards = other.generation.min_cards;
        }
        if other.generation.max_cards != default_gen.max_cards {
            self.generation.max_cards = other.generation.max_cards;
        }
        if other.generation.default_cards != default_gen.default_cards {
            self.generation.default_cards = other.generation.default_cards;
        }

        let default_sched = SchedulingConfig::default();
        if other.scheduling.initial_ease != default_sched.initial_ease {
            self.scheduling.initial_ease = other.scheduling.initial_ease;
        }
        if other.scheduling.again_penalty != default_sched.again_penalty {
            self.scheduling.again_penalty = other.scheduling.again_penalty;
        }
        if other.scheduling.hard_penalty != default_sched.hard_penalty {
            self.scheduling.hard_penalty = other.scheduling.hard_penalty;
        }
        if other.scheduling.hard_multiplier != default_sched.hard_multiplier {
            self.scheduling.hard_multiplier = other.scheduling.hard_multiplier;
        }
        if other.scheduling.easy_bonus != default_sched.easy_bonus {
            self.scheduling.easy_bonus = other.scheduling.easy_bonus;
        }
        if other.scheduling.easy_multiplier != default_sched.easy_multiplier {
            self.scheduling.easy_multiplier = other.scheduling.easy_multiplier;
        }
        if other.scheduling.max_interval_days != default_sched.max_interval_days {
            self.scheduling.max_interval_days = other.scheduling.max_interval_days;
        }

        if other.review.recent_window != ReviewConfig::default().recent_window {
            self.review.recent_window = other.review.recent_window;
        }

        if other.storage.database_path.is_some() {
            self.storage.database_path = other.storage.database_path;
        }

        self
    }

    /// Reject values that would break the scheduler or generator.
    pub fn validate(&self) -> Result<()> {
        let gen = &self.generation;
        if gen.min_cards == 0 {
            return Err(CardError::config("generation.min_cards must be at least 1"));
        }
        if gen.min_cards > gen.max_cards {
            return Err(CardError::config(format!(
                "generation.min_cards ({}) exceeds generation.max_cards ({})",
                gen.min_cards, gen.max_cards
            )));
        }
        if gen.max_source_chars == 0 {
            return Err(CardError::config(
                "generation.max_source_chars must be positive",
            ));
        }

        let sched = &self.scheduling;
        if !sched.initial_ease.is_finite() || sched.initial_ease < MIN_EASE {
            return Err(CardError::config(format!(
                "scheduling.initial_ease must be at least {}",
                MIN_EASE
            )));
        }
        for (name, value) in [
            ("again_penalty", sched.again_penalty),
            ("hard_penalty", sched.hard_penalty),
            ("easy_bonus", sched.easy_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CardError::config(format!(
                    "scheduling.{} must be a non-negative number",
                    name
                )));
            }
        }
        for (name, value) in [
            ("hard_multiplier", sched.hard_multiplier),
            ("easy_multiplier", sched.easy_multiplier),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(CardError::config(format!(
                    "scheduling.{} must be at least 1.0",
                    name
                )));
            }
        }
        if sched.max_interval_days == 0 || sched.max_interval_days > MAX_INTERVAL_DAYS {
            return Err(CardError::config(format!(
                "scheduling.max_interval_days must be between 1 and {}",
                MAX_INTERVAL_DAYS
            )));
        }

        if self.llm.max_tokens == 0 {
            return Err(CardError::config("llm.max_tokens must be positive"));
        }
        if !LlmConfig::is_valid_temperature(self.llm.temperature) {
            return Err(CardError::config(
                "llm.temperature must be between 0.0 and 2.0",
            ));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(CardError::config("llm.timeout_seconds must be positive"));
        }

        if self.review.recent_window == 0 {
            return Err(CardError::config("review.recent_window must be at least 1"));
        }

        Ok(())
    }

    /// The database file to open, honoring `storage.database_path`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage
            .database_path
            .clone()
            .or_else(|| cardforge_home().map(|home| home.join("cards.sqlite3")))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the cardforge home directory.
///
/// Checks `CARDFORGE_HOME` first, then falls back to `~/.cardforge`. An empty
/// `CARDFORGE_HOME` is ignored; a relative one is canonicalized when it exists.
pub fn cardforge_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("CARDFORGE_HOME") {
        if home.is_empty() {
            tracing::warn!("CARDFORGE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("CARDFORGE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(CONFIG_DIR_NAME));
    }

    let fallback = env::temp_dir().join("cardforge");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// Find the directory holding project config for `cwd`.
///
/// The nearest existing `.cardforge/` in `cwd` or an ancestor wins; otherwise
/// `<cwd>/.cardforge`.
pub fn project_config_dir(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_DIR_NAME))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| cwd.join(CONFIG_DIR_NAME))
}
