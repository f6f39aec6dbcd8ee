//! Signpost's central command.
//!
//! Mirrors `cascade`'s [`Center`]: one struct, shared behind an `Arc`, that
//! every unit and every HTTP handler borrows to reach the database, the
//! configuration, the logger, and the channel used to talk to units.

use std::fmt;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::info;

use crate::comms::ApplicationCommand;
use crate::log::Logger;
use crate::metrics::Metrics;
use crate::transport;
use crate::units::notify_dispatch;
use signpost_cfg::Config;

/// Signpost's central command.
pub struct Center {
    /// The catalog database connection pool.
    pub pool: SqlitePool,

    /// The configuration in effect when the daemon started.
    pub config: Config,

    /// The logger.
    pub logger: &'static Logger,

    /// Prometheus metrics shared by every unit and handler.
    pub metrics: Arc<Metrics>,

    /// The manifest/chunk cache (spec §4.7).
    pub transport: transport::Cache,

    /// A channel to send units application commands, addressed by unit
    /// name ("GC", "TX", "NQ" — see [`crate::units`]).
    pub app_cmd_tx: mpsc::UnboundedSender<(String, ApplicationCommand)>,

    /// A bounded channel the `/notify` handler enqueues onto instead of
    /// processing a NOTIFY inline (spec §5, §9); drained by the "ND" unit.
    pub notify_tx: notify_dispatch::NotifySender,
}

impl fmt::Debug for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Center")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Center {
    /// Open the catalog database, running any pending migrations, and
    /// construct the central command around it.
    pub async fn new(
        config: Config,
        logger: &'static Logger,
        app_cmd_tx: mpsc::UnboundedSender<(String, ApplicationCommand)>,
        notify_tx: notify_dispatch::NotifySender,
    ) -> Result<Arc<Self>, CenterError> {
        let options = SqliteConnectOptions::new()
            .filename(config.database_path.as_std_path())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| CenterError::Database(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CenterError::Migration(e.to_string()))?;

        info!("Catalog database ready at '{}'", config.database_path);

        Ok(Arc::new(Self {
            pool,
            config,
            logger,
            metrics: Arc::new(Metrics::new()),
            transport: transport::Cache::new(),
            app_cmd_tx,
            notify_tx,
        }))
    }

    /// The subset of configuration [`crate::transport`] needs.
    pub fn control_params(&self) -> transport::ControlParams {
        transport::ControlParams {
            jsonchunk_max_size: self.config.jsonchunk_max_size,
            distribution_ttl_secs: self.config.distribution_ttl_secs,
            retire_time_secs: self.config.retire_time_secs,
        }
    }

    /// Send a command to a named unit, logging and ignoring the (rare)
    /// case where the unit has already terminated.
    pub fn send_to_unit(&self, unit: &str, command: ApplicationCommand) {
        if self
            .app_cmd_tx
            .send((unit.to_string(), command))
            .is_err()
        {
            tracing::debug!("Unit '{unit}' is no longer running; dropping command");
        }
    }
}

//----------- CenterError ------------------------------------------------------

#[derive(Debug)]
pub enum CenterError {
    Database(String),
    Migration(String),
}

impl fmt::Display for CenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CenterError::Database(m) => write!(f, "could not open the catalog database: {m}"),
            CenterError::Migration(m) => write!(f, "could not run catalog migrations: {m}"),
        }
    }
}

impl std::error::Error for CenterError {}
