// Configuration loading and parsing (assistant.toml, records.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assistant::BusyPolicy;
use crate::briefing::DEFAULT_CLINICIAN;
use crate::chat::store::DEFAULT_WELCOME;
use crate::chat::{KeywordReply, RevealPacing};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub typing: TypingConfig,
    /// Ordered keyword table. Empty means the built-in table.
    pub responses: Vec<KeywordReply>,
    pub records: RecordsConfig,
}

// ---------------------------------------------------------------------------
// assistant.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire assistant.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AssistantFile {
    assistant: AssistantConfig,
    typing: TypingConfig,
    #[serde(default)]
    responses: Vec<KeywordReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub clinician_name: String,
    pub welcome_message: String,
    #[serde(default)]
    pub busy_policy: BusyPolicy,
    /// Fixes fallback choice and typing jitter. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Replaces the built-in generic replies when present.
    #[serde(default)]
    pub fallbacks: Option<Vec<String>>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            clinician_name: DEFAULT_CLINICIAN.to_string(),
            welcome_message: DEFAULT_WELCOME.to_string(),
            busy_policy: BusyPolicy::default(),
            seed: None,
            fallbacks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TypingConfig {
    pub chat: RevealPacing,
    pub briefing: RevealPacing,
}

impl Default for TypingConfig {
    fn default() -> Self {
        TypingConfig {
            chat: RevealPacing::CHAT,
            briefing: RevealPacing::BRIEFING,
        }
    }
}

// ---------------------------------------------------------------------------
// records.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RecordsFile {
    records: RecordsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSourceKind {
    Mock,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    pub source: RecordSourceKind,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub simulated_latency_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for RecordsConfig {
    fn default() -> Self {
        RecordsConfig {
            source: RecordSourceKind::Mock,
            base_url: String::new(),
            simulated_latency_ms: 0,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/assistant.toml` and
/// `config/records.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- assistant.toml (required) ---
    let assistant_path = config_dir.join("assistant.toml");
    let assistant_text = read_file(&assistant_path)?;
    let assistant_file: AssistantFile =
        toml::from_str(&assistant_text).map_err(|e| ConfigError::ParseError {
            path: assistant_path.clone(),
            source: e,
        })?;

    // --- records.toml (required) ---
    let records_path = config_dir.join("records.toml");
    let records_text = read_file(&records_path)?;
    let records_file: RecordsFile =
        toml::from_str(&records_text).map_err(|e| ConfigError::ParseError {
            path: records_path.clone(),
            source: e,
        })?;

    let config = Config {
        assistant: assistant_file.assistant,
        typing: assistant_file.typing,
        responses: assistant_file.responses,
        records: records_file.records,
    };

    validate(&config)?;

    Ok(config)
}

/// Files read from `config/`, seeded from `defaults/` on first run.
const CONFIG_FILES: [&str; 2] = ["assistant.toml", "records.toml"];

/// Seed every missing file in `config/` from its counterpart in `defaults/`.
/// Existing files are left untouched. Returns the paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let missing: Vec<&str> = CONFIG_FILES
        .into_iter()
        .filter(|name| !config_dir.join(name).is_file())
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let defaults_dir = base_dir.join("defaults");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;

    let mut seeded = Vec::with_capacity(missing.len());
    for name in missing {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{} is missing and there is no {} to seed it from",
                    target.display(),
                    source.display()
                ),
            });
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot copy {} to {}: {e}", source.display(), target.display()),
        })?;
        seeded.push(target);
    }
    Ok(seeded)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Longest configurable typing delay.
const MAX_DELAY_MS: u64 = 60_000;
const MAX_PUNCTUATION_FACTOR: u32 = 100;

fn validate(config: &Config) -> Result<(), ConfigError> {
    let assistant = &config.assistant;
    if assistant.welcome_message.trim().is_empty() {
        return Err(invalid("assistant.welcome_message", "must not be empty"));
    }
    if assistant.clinician_name.trim().is_empty() {
        return Err(invalid("assistant.clinician_name", "must not be empty"));
    }
    if let Some(fallbacks) = &assistant.fallbacks {
        if fallbacks.is_empty() {
            return Err(invalid(
                "assistant.fallbacks",
                "must contain at least one reply when set",
            ));
        }
        if let Some(i) = fallbacks.iter().position(|f| f.trim().is_empty()) {
            return Err(invalid(
                format!("assistant.fallbacks[{i}]"),
                "must not be empty",
            ));
        }
    }

    for (name, pacing) in [
        ("typing.chat", &config.typing.chat),
        ("typing.briefing", &config.typing.briefing),
    ] {
        if !(1..=MAX_PUNCTUATION_FACTOR).contains(&pacing.punctuation_factor) {
            return Err(invalid(
                format!("{name}.punctuation_factor"),
                format!(
                    "must be between 1 and {MAX_PUNCTUATION_FACTOR}, got {}",
                    pacing.punctuation_factor
                ),
            ));
        }
        for (field, value) in [
            ("initial_delay_ms", pacing.initial_delay_ms),
            ("base_delay_ms", pacing.base_delay_ms),
            ("variable_delay_ms", pacing.variable_delay_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(invalid(
                    format!("{name}.{field}"),
                    format!("must be at most {MAX_DELAY_MS} ms, got {value}"),
                ));
            }
        }
    }

    for (i, row) in config.responses.iter().enumerate() {
        if row.keyword.is_empty() {
            return Err(invalid(format!("responses[{i}].keyword"), "must not be empty"));
        }
        if row.keyword != row.keyword.to_lowercase() {
            return Err(invalid(
                format!("responses[{i}].keyword"),
                format!("must be lower-case, got {:?}", row.keyword),
            ));
        }
        if row.reply.trim().is_empty() {
            return Err(invalid(format!("responses[{i}].reply"), "must not be empty"));
        }
    }

    let records = &config.records;
    if records.source == RecordSourceKind::Http
        && !(records.base_url.starts_with("http://") || records.base_url.starts_with("https://"))
    {
        return Err(invalid(
            "records.base_url",
            format!(
                "must start with http:// or https:// when source = \"http\", got {:?}",
                records.base_url
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: the workspace root holding `defaults/`, whether `cargo test`
    /// runs from the crate directory or the workspace root.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        cwd.ancestors()
            .find(|dir| dir.join("defaults").join("assistant.toml").exists())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| panic!("Cannot locate defaults/ directory from CWD {:?}", cwd))
    }

    /// Fresh temp dir with config/ populated from the shipped defaults.
    fn temp_config_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let root = project_root();
        for file in ["assistant.toml", "records.toml"] {
            fs::copy(root.join("defaults").join(file), config_dir.join(file)).unwrap();
        }
        tmp
    }

    fn rewrite(tmp: &Path, file: &str, from: &str, to: &str) {
        let path = tmp.join("config").join(file);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "{file} does not contain {from:?}");
        fs::write(&path, text.replacen(from, to, 1)).unwrap();
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_default_files() {
        let tmp = temp_config_dir("ataraxis_config_defaults");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.assistant.clinician_name, "Dr. Smith");
        assert_eq!(config.assistant.welcome_message, DEFAULT_WELCOME);
        assert_eq!(config.assistant.busy_policy, BusyPolicy::Reject);
        assert!(config.assistant.seed.is_none());
        assert!(config.assistant.fallbacks.is_none());

        assert_eq!(config.typing.chat, RevealPacing::CHAT);
        assert_eq!(config.typing.briefing, RevealPacing::BRIEFING);
        assert!(config.responses.is_empty());

        assert_eq!(config.records.source, RecordSourceKind::Mock);
        assert_eq!(config.records.base_url, "http://localhost:8000");
        assert_eq!(config.records.request_timeout_secs, 10);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_seeds_only_missing_known_files() {
        let tmp = std::env::temp_dir().join("ataraxis_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("assistant.toml"), "a").unwrap();
        fs::write(defaults.join("records.toml"), "b").unwrap();
        fs::write(defaults.join("secrets.toml.example"), "c").unwrap();

        // A pre-existing local edit must survive.
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/records.toml"), "local").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/assistant.toml")]);
        assert_eq!(
            fs::read_to_string(tmp.join("config/records.toml")).unwrap(),
            "local"
        );
        assert!(!tmp.join("config/secrets.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_any_directory_fails() {
        let tmp = std::env::temp_dir().join("ataraxis_config_empty");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_records_toml_is_reported() {
        let tmp = temp_config_dir("ataraxis_config_missing_records");
        fs::remove_file(tmp.join("config/records.toml")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("records.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = temp_config_dir("ataraxis_config_parse");
        fs::write(tmp.join("config/assistant.toml"), "[assistant\nname = ").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }), "{err}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn custom_policy_seed_and_responses() {
        let tmp = temp_config_dir("ataraxis_config_custom");
        rewrite(
            &tmp,
            "assistant.toml",
            "busy_policy = \"reject\"",
            "busy_policy = \"queue\"\nseed = 42\nfallbacks = [\"Could you say more?\"]",
        );
        let mut text = fs::read_to_string(tmp.join("config/assistant.toml")).unwrap();
        text.push_str(
            "\n[[responses]]\nkeyword = \"her2\"\nreply = \"HER2 status guides targeted therapy.\"\n\n\
             [[responses]]\nkeyword = \"stage\"\nreply = \"Staging follows AJCC.\"\n",
        );
        fs::write(tmp.join("config/assistant.toml"), text).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.assistant.busy_policy, BusyPolicy::Queue);
        assert_eq!(config.assistant.seed, Some(42));
        assert_eq!(
            config.assistant.fallbacks,
            Some(vec!["Could you say more?".to_string()])
        );
        let keywords: Vec<&str> = config.responses.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["her2", "stage"]);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_welcome_message() {
        let tmp = temp_config_dir("ataraxis_config_empty_welcome");
        rewrite(
            &tmp,
            "assistant.toml",
            &format!("welcome_message = \"{DEFAULT_WELCOME}\""),
            "welcome_message = \"   \"",
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "assistant.welcome_message");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_clinician_name() {
        let tmp = temp_config_dir("ataraxis_config_empty_clinician");
        rewrite(
            &tmp,
            "assistant.toml",
            "clinician_name = \"Dr. Smith\"",
            "clinician_name = \"\"",
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "assistant.clinician_name");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_punctuation_factor() {
        let tmp = temp_config_dir("ataraxis_config_zero_factor");
        rewrite(
            &tmp,
            "assistant.toml",
            "punctuation_factor = 5",
            "punctuation_factor = 0",
        );
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "typing.chat.punctuation_factor",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_oversized_typing_delays() {
        let tmp = temp_config_dir("ataraxis_config_huge_delay");
        rewrite(
            &tmp,
            "assistant.toml",
            "base_delay_ms = 30",
            "base_delay_ms = 4611686018427387903",
        );
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "typing.chat.base_delay_ms",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_oversized_punctuation_factor() {
        let tmp = temp_config_dir("ataraxis_config_huge_factor");
        rewrite(
            &tmp,
            "assistant.toml",
            "punctuation_factor = 5",
            "punctuation_factor = 1000",
        );
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "typing.chat.punctuation_factor",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_fallback_list() {
        let tmp = temp_config_dir("ataraxis_config_empty_fallbacks");
        rewrite(
            &tmp,
            "assistant.toml",
            "busy_policy = \"reject\"",
            "busy_policy = \"reject\"\nfallbacks = []",
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "assistant.fallbacks");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_upper_case_keyword() {
        let tmp = temp_config_dir("ataraxis_config_upper_keyword");
        let mut text = fs::read_to_string(tmp.join("config/assistant.toml")).unwrap();
        text.push_str("\n[[responses]]\nkeyword = \"HER2\"\nreply = \"x\"\n");
        fs::write(tmp.join("config/assistant.toml"), text).unwrap();

        expect_field(load_config_from(&tmp).unwrap_err(), "responses[0].keyword");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_reply() {
        let tmp = temp_config_dir("ataraxis_config_empty_reply");
        let mut text = fs::read_to_string(tmp.join("config/assistant.toml")).unwrap();
        text.push_str("\n[[responses]]\nkeyword = \"stage\"\nreply = \"\"\n");
        fs::write(tmp.join("config/assistant.toml"), text).unwrap();

        expect_field(load_config_from(&tmp).unwrap_err(), "responses[0].reply");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_http_source_without_scheme() {
        let tmp = temp_config_dir("ataraxis_config_bad_url");
        rewrite(&tmp, "records.toml", "source = \"mock\"", "source = \"http\"");
        rewrite(
            &tmp,
            "records.toml",
            "base_url = \"http://localhost:8000\"",
            "base_url = \"localhost:8000\"",
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "records.base_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn http_source_with_valid_url_loads() {
        let tmp = temp_config_dir("ataraxis_config_http");
        rewrite(&tmp, "records.toml", "source = \"mock\"", "source = \"http\"");
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.records.source, RecordSourceKind::Http);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(validate(&Config::default()).is_ok());
    }
}
