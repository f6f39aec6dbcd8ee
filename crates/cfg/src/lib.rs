//! Configuring Signpost.
//!
//! Mirrors `cascade-cfg`'s approach: a TOML file, parsed with `serde`, using
//! `camino`'s UTF-8-only paths, validated once at load time rather than at
//! first use.

use std::fmt;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use domain::base::Name;
use serde::{Deserialize, Serialize};

//----------- Config ---------------------------------------------------------

/// Signpost's configuration, recognising every option of spec §6 plus the
/// ambient options every cascade-style daemon config carries (listen
/// addresses, logging, database path).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The control zone NOTIFYs and manifest/chunk queries are rooted under.
    pub control_zone: String,

    /// The algorithm used when no algorithm is given to `generate-key`.
    pub default_algorithm: DefaultAlgorithm,

    /// How often a KSK/ZSK is expected to roll, in seconds.
    pub key_rotation_interval_secs: u64,

    /// How many ZSKs should sit in `standby` per (zone, type) at a time.
    pub standby_key_count: u32,

    /// The maximum size, in bytes, of a single JSONCHUNK payload.
    pub jsonchunk_max_size: u32,

    /// How long a manifest remains fresh, in seconds, before a receiver must
    /// reject it as a potential replay.
    pub distribution_ttl_secs: u64,

    /// How long an installed key sits in `retired` before the KRS
    /// retirement worker moves it to `removed`, in seconds. Communicated to
    /// nodes via manifest metadata.
    pub retire_time_secs: u64,

    /// Path to the SQLite database file backing the catalog store.
    pub database_path: Utf8PathBuf,

    /// The admin HTTP API's listen address.
    pub admin_listen_addr: SocketAddr,

    /// How often the distribution garbage collector sweeps, in seconds.
    pub gc_interval_secs: u64,

    /// The grace period, in seconds, a completed distribution record is
    /// kept before the GC sweep deletes it.
    pub gc_grace_secs: u64,

    /// The KRS's own FQDN node identity, used to self-register in
    /// `node_identity` on first start and to identify itself in
    /// `query-kmreq` calls. Unused by the KDC daemon.
    pub node_id: Option<String>,

    /// The base URL of the KDC this KRS instance pulls manifests/chunks
    /// from and confirms distributions to. Unused by the KDC daemon.
    pub kdc_addr: Option<String>,

    /// How often the KRS retirement worker sweeps for retired installed
    /// keys past their grace period.
    pub retirement_sweep_interval_secs: u64,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_zone: "control.invalid.".into(),
            default_algorithm: DefaultAlgorithm::Ed25519,
            key_rotation_interval_secs: 60 * 60 * 24 * 30,
            standby_key_count: 1,
            jsonchunk_max_size: 60_000,
            distribution_ttl_secs: 300,
            retire_time_secs: 60 * 60 * 24,
            database_path: "signpost.db".into(),
            admin_listen_addr: "127.0.0.1:8080".parse().unwrap(),
            gc_interval_secs: 300,
            gc_grace_secs: 60 * 60,
            node_id: None,
            kdc_addr: None,
            retirement_sweep_interval_secs: 3600,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &camino::Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_owned(), e.to_string()))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| ConfigError::Parse(path.to_owned(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants not expressible by the type alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use std::str::FromStr;
        Name::<bytes::Bytes>::from_str(&self.control_zone).map_err(|_| {
            ConfigError::Validation(format!(
                "'control_zone' is not a valid FQDN: '{}'",
                self.control_zone
            ))
        })?;

        if self.standby_key_count == 0 {
            return Err(ConfigError::Validation(
                "'standby_key_count' must be at least 1".into(),
            ));
        }

        if self.jsonchunk_max_size == 0 {
            return Err(ConfigError::Validation(
                "'jsonchunk_max_size' must be greater than zero".into(),
            ));
        }

        if self.distribution_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "'distribution_ttl_secs' must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Set up the CLI with the flags this configuration recognises.
    pub fn setup_cli(cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the configuration file")
                .default_value("/etc/signpost/config.toml"),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultAlgorithm {
    Ed25519,
    #[serde(rename = "ECDSA-P256")]
    EcdsaP256,
    #[serde(rename = "ECDSA-P384")]
    EcdsaP384,
    #[serde(rename = "RSA-SHA256")]
    RsaSha256,
    #[serde(rename = "RSA-SHA512")]
    RsaSha512,
}

//----------- Logging ---------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub target: LogTarget,
    pub trace_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            target: LogTarget::Stderr,
            trace_targets: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogTarget {
    File { path: Utf8PathBuf },
    Syslog,
    Stdout,
    Stderr,
}

//----------- ConfigError ------------------------------------------------------

/// An error loading or validating the configuration.
#[derive(Clone, Debug)]
pub enum ConfigError {
    Io(camino::Utf8PathBuf, String),
    Parse(camino::Utf8PathBuf, String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "could not read '{path}': {err}"),
            ConfigError::Parse(path, err) => write!(f, "could not parse '{path}': {err}"),
            ConfigError::Validation(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
