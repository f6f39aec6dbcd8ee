use std::fmt;
use std::net::SocketAddr;

use clap::Parser;
use clap::builder::PossibleValue;
use tracing::level_filters::LevelFilter;

use crate::client::SignpostApiClient;
use crate::commands::Command;

#[derive(Clone, Debug, Parser)]
#[command(version = env!("CARGO_PKG_VERSION"), disable_help_subcommand = true)]
pub struct Args {
    /// The Signpost daemon instance to connect to.
    #[arg(short = 's', long = "server", value_name = "IP:PORT", default_value = "127.0.0.1:8080", global = true)]
    pub server: SocketAddr,

    /// The minimum severity of messages to log.
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warning", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub async fn execute(self) -> Result<(), String> {
        let client = SignpostApiClient::new(format!("http://{}", self.server));
        self.command.execute(client).await
    }
}

//----------- LogLevel ---------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl clap::ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        &[LogLevel::Trace, LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error, LogLevel::Critical]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.as_str()))
    }
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
