//! Logging for Signpost.
//!
//! Grounded on `cascade::log::Logger`: a [`tracing_subscriber::reload`]
//! handle wraps an [`EnvFilter`] so the level can be changed without
//! restarting, with the primary target (file/stdout/stderr) chosen from
//! configuration.

use std::fmt;
use std::fs::OpenOptions;

use signpost_cfg::{LogLevel, LogTarget, LoggingConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// The state of Signpost's logger.
pub struct Logger {
    filter: Handle<EnvFilter, Registry>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// Launch the logger.
    ///
    /// ## Panics
    ///
    /// Panics if a global [`tracing`] subscriber has already been set.
    pub fn launch(config: &LoggingConfig) -> Result<&'static Logger, String> {
        let filter = make_env_filter(config)?;
        let (filter, filter_handle) = reload::Layer::new(filter);

        match &config.target {
            LogTarget::File { path } => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| format!("could not open log file '{path}': {e}"))?;
                let layer = FmtLayer::new().with_ansi(false).with_writer(file);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogTarget::Stdout => {
                let layer = FmtLayer::new()
                    .with_ansi(supports_color::on(supports_color::Stream::Stdout).is_some())
                    .with_writer(std::io::stdout);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogTarget::Stderr => {
                let layer = FmtLayer::new()
                    .with_ansi(supports_color::on(supports_color::Stream::Stderr).is_some())
                    .with_writer(std::io::stderr);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogTarget::Syslog => {
                // Syslog transport is ordinary process-supervision glue and
                // out of this subsystem's core; fall back to stderr.
                let layer = FmtLayer::new().with_ansi(false).with_writer(std::io::stderr);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
        }

        Ok(Box::leak(Box::new(Self {
            filter: filter_handle,
        })))
    }

    pub fn apply(&self, config: &LoggingConfig) -> Result<(), String> {
        self.filter
            .reload(make_env_filter(config)?)
            .map_err(|_| "could not reload the log filter".to_string())
    }
}

fn make_env_filter(config: &LoggingConfig) -> Result<EnvFilter, String> {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::from(config.level).into());
    for target in &config.trace_targets {
        filter = filter.add_directive(
            target
                .parse()
                .map_err(|_| format!("invalid trace target: '{target}'"))?,
        );
    }
    Ok(filter)
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}
