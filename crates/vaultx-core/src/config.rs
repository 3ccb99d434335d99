//! Configuration module for VaultX.
//!
//! One YAML file, one typed section per subsystem. Every section has defaults,
//! so a missing file or a partial file still yields a usable [`Config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `remote.api_base`.
pub const API_BASE_ENV: &str = "VAULTX_API_BASE";

/// Lowest PBKDF2 iteration count accepted anywhere: config validation,
/// key derivation and envelope headers all share this floor.
pub const MIN_ITERATIONS: u32 = 1_000;

/// bcrypt's accepted cost range.
pub const PASSWORD_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for VaultX.
///
/// Sections missing from the YAML file take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vault: VaultConfig,
    pub crypto: CryptoConfig,
    pub remote: RemoteConfig,
    pub mirror: MirrorConfig,
    pub logging: LoggingConfig,
}

/// Local vault storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Directory holding ciphertext blobs, named by their encrypted name.
    pub dir: PathBuf,
    /// SQLite metadata database.
    pub database: PathBuf,
}

/// Envelope encryption and account password settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// PBKDF2 iteration count written into new envelopes.
    pub iterations: u32,
    /// bcrypt cost for new account password hashes.
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

/// Remote metadata API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the metadata API, e.g. `https://vault.example.com`.
    pub api_base: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Local multi-directory mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Replica directories kept identical by the mirror.
    pub directories: Vec<PathBuf>,
    /// Quiet period per file name before a change is reconciled.
    pub debounce_ms: u64,
    /// How often the watch loop checks for settled changes.
    pub poll_interval_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Reads and parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but any failure yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// `config.yaml` under the user's configuration directory.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultx/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultx")
            .join("config.yaml")
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.remote.api_base = base;
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("vaultx")
}

impl Default for VaultConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            dir: data_dir.join("vault"),
            database: data_dir.join("vault.db"),
        }
    }
}

fn default_password_cost() -> u32 {
    10
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            iterations: 150_000,
            password_cost: default_password_cost(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3001".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            debounce_ms: 300,
            poll_interval_ms: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One problem reported by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"mirror.debounce_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Checks every section and collects all problems; empty means valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- crypto ---
        if self.crypto.iterations < MIN_ITERATIONS {
            errors.push(ValidationError {
                field: "crypto.iterations".into(),
                message: format!("must be at least {MIN_ITERATIONS}"),
            });
        }
        if !PASSWORD_COST_RANGE.contains(&self.crypto.password_cost) {
            errors.push(ValidationError {
                field: "crypto.password_cost".into(),
                message: format!(
                    "must be between {} and {}",
                    PASSWORD_COST_RANGE.start(),
                    PASSWORD_COST_RANGE.end()
                ),
            });
        }

        // --- remote ---
        let base = self.remote.api_base.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.api_base".into(),
                message: format!("must be an http(s) URL, got '{base}'"),
            });
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- mirror ---
        if self.mirror.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "mirror.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.mirror.poll_interval_ms == 0 {
            errors.push(ValidationError {
                field: "mirror.poll_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.mirror.poll_interval_ms > self.mirror.debounce_ms {
            errors.push(ValidationError {
                field: "mirror.poll_interval_ms".into(),
                message: format!(
                    "poll_interval_ms ({}) must not exceed debounce_ms ({})",
                    self.mirror.poll_interval_ms, self.mirror.debounce_ms
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Programmatic [`Config`] construction, mostly for tests and embedding.
///
/// Fields not set keep their [`Config::default`] value.
///
/// # Example
///
/// ```rust,no_run
/// use vaultx_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .vault_dir(PathBuf::from("/srv/vault"))
///     .mirror_directory(PathBuf::from("/mnt/usb/vault"))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Builder over the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- vault ---

    pub fn vault_dir(mut self, dir: PathBuf) -> Self {
        self.config.vault.dir = dir;
        self
    }

    pub fn vault_database(mut self, database: PathBuf) -> Self {
        self.config.vault.database = database;
        self
    }

    // --- crypto ---

    pub fn crypto_iterations(mut self, iterations: u32) -> Self {
        self.config.crypto.iterations = iterations;
        self
    }

    pub fn crypto_password_cost(mut self, cost: u32) -> Self {
        self.config.crypto.password_cost = cost;
        self
    }

    // --- remote ---

    pub fn remote_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.remote.api_base = base.into();
        self
    }

    pub fn remote_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.request_timeout_secs = seconds;
        self
    }

    // --- mirror ---

    /// Adds one replica directory.
    pub fn mirror_directory(mut self, dir: PathBuf) -> Self {
        self.config.mirror.directories.push(dir);
        self
    }

    pub fn mirror_debounce_ms(mut self, ms: u64) -> Self {
        self.config.mirror.debounce_ms = ms;
        self
    }

    pub fn mirror_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.mirror.poll_interval_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Returns the configuration without validating it.
    pub fn build(self) -> Config {
        self.config
    }

    /// Returns the configuration, or every validation error it has.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.vault.dir.ends_with("vaultx/vault"));
        assert!(cfg.vault.database.ends_with("vaultx/vault.db"));
        assert_eq!(cfg.crypto.iterations, 150_000);
        assert_eq!(cfg.remote.api_base, "http://localhost:3001");
        assert_eq!(cfg.remote.request_timeout_secs, 30);
        assert!(cfg.mirror.directories.is_empty());
        assert_eq!(cfg.mirror.debounce_ms, 300);
        assert_eq!(cfg.mirror.poll_interval_ms, 50);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
vault:
  dir: /srv/vault/blobs
  database: /srv/vault/vault.db
crypto:
  iterations: 200000
remote:
  api_base: https://vault.example.com
  request_timeout_secs: 10
mirror:
  directories:
    - /mnt/a
    - /mnt/b
  debounce_ms: 500
  poll_interval_ms: 100
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.vault.dir, PathBuf::from("/srv/vault/blobs"));
        assert_eq!(cfg.vault.database, PathBuf::from("/srv/vault/vault.db"));
        assert_eq!(cfg.crypto.iterations, 200_000);
        assert_eq!(cfg.remote.api_base, "https://vault.example.com");
        assert_eq!(cfg.remote.request_timeout_secs, 10);
        assert_eq!(
            cfg.mirror.directories,
            vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")]
        );
        assert_eq!(cfg.mirror.debounce_ms, 500);
        assert_eq!(cfg.mirror.poll_interval_ms, 100);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"crypto:\n  iterations: 5000\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.crypto.iterations, 5_000);
        assert_eq!(cfg.crypto.password_cost, 10);
        assert_eq!(cfg.mirror.debounce_ms, 300);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.crypto.iterations, 150_000);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Environment --

    #[test]
    fn env_override_replaces_api_base() {
        let mut cfg = Config::default();
        cfg.apply_overrides_from(|key| {
            (key == API_BASE_ENV).then(|| "https://override.example.com".to_string())
        });
        assert_eq!(cfg.remote.api_base, "https://override.example.com");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides_from(|_| Some("  ".to_string()));
        assert_eq!(cfg.remote.api_base, "http://localhost:3001");
    }

    // -- Validation --

    #[test]
    fn validate_catches_low_iterations() {
        let mut cfg = Config::default();
        cfg.crypto.iterations = 10;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "crypto.iterations"));
    }

    #[test]
    fn validate_catches_password_cost_out_of_range() {
        for cost in [3, 32] {
            let mut cfg = Config::default();
            cfg.crypto.password_cost = cost;
            let errors = cfg.validate();
            assert!(errors.iter().any(|e| e.field == "crypto.password_cost"));
        }
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_catches_bad_api_base() {
        let mut cfg = Config::default();
        cfg.remote.api_base = "ftp://example.com".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "remote.api_base"));
    }

    #[test]
    fn validate_catches_zero_mirror_timings() {
        let mut cfg = Config::default();
        cfg.mirror.debounce_ms = 0;
        cfg.mirror.poll_interval_ms = 0;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"mirror.debounce_ms".to_string()));
        assert!(fields.contains(&"mirror.poll_interval_ms".to_string()));
    }

    #[test]
    fn validate_catches_poll_interval_above_debounce() {
        let mut cfg = Config::default();
        cfg.mirror.poll_interval_ms = 1_000;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "mirror.poll_interval_ms" && e.message.contains("debounce_ms")));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "mirror.debounce_ms".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "mirror.debounce_ms: must be greater than 0");
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .vault_dir(PathBuf::from("/tmp/vault"))
            .vault_database(PathBuf::from("/tmp/vault.db"))
            .crypto_iterations(20_000)
            .remote_api_base("https://api.example.com")
            .remote_request_timeout_secs(5)
            .mirror_directory(PathBuf::from("/a"))
            .mirror_directory(PathBuf::from("/b"))
            .mirror_debounce_ms(400)
            .mirror_poll_interval_ms(40)
            .logging_level("warn")
            .build();

        assert_eq!(cfg.vault.dir, PathBuf::from("/tmp/vault"));
        assert_eq!(cfg.vault.database, PathBuf::from("/tmp/vault.db"));
        assert_eq!(cfg.crypto.iterations, 20_000);
        assert_eq!(cfg.remote.api_base, "https://api.example.com");
        assert_eq!(cfg.remote.request_timeout_secs, 5);
        assert_eq!(cfg.mirror.directories.len(), 2);
        assert_eq!(cfg.mirror.debounce_ms, 400);
        assert_eq!(cfg.mirror.poll_interval_ms, 40);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn build_validated_rejects_invalid_config() {
        let result = ConfigBuilder::new().mirror_debounce_ms(0).build_validated();
        let errors = result.expect_err("should fail validation");
        assert!(errors.iter().any(|e| e.field == "mirror.debounce_ms"));
    }

    #[test]
    fn build_validated_accepts_defaults() {
        assert!(ConfigBuilder::default().build_validated().is_ok());
    }

    #[test]
    fn config_serializes_to_yaml_and_back() {
        let cfg = ConfigBuilder::new()
            .mirror_directory(PathBuf::from("/mnt/a"))
            .build();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.mirror.directories, cfg.mirror.directories);
        assert_eq!(back.crypto.iterations, cfg.crypto.iterations);
    }
}
