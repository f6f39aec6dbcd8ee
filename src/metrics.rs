//! Maintaining and outputting metrics.
//!
//! Grounded on `cascade::metrics`: a [`Registry`] wrapped in a small struct,
//! built once at startup, with state-derived gauges refreshed on each
//! scrape rather than updated inline — the difference here is that our
//! state lives in the catalog database, so [`Metrics::assemble`] queries it
//! instead of locking an in-memory tree.

use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;
use sqlx::SqlitePool;

const PROMETHEUS_PREFIX: &str = "signpost";

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    keys_by_state: Family<KeyStateLabel, Gauge>,
    nodes_by_state: Family<NodeStateLabel, Gauge>,
    distributions_pending: Gauge,
    distributions_completed: Gauge,
    transactions_open: Gauge,
    zones_active: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(PROMETHEUS_PREFIX);

        let build_info = Info::new(vec![("version", env!("CARGO_PKG_VERSION").to_string())]);
        registry.register("build", "Signpost build information", build_info);

        let keys_by_state = Family::<KeyStateLabel, Gauge>::default();
        registry.register(
            "keys_by_state",
            "Number of keys currently in each lifecycle state",
            keys_by_state.clone(),
        );

        let nodes_by_state = Family::<NodeStateLabel, Gauge>::default();
        registry.register(
            "nodes_by_state",
            "Number of nodes currently in each health state",
            nodes_by_state.clone(),
        );

        let distributions_pending = Gauge::default();
        registry.register(
            "distributions_pending",
            "Number of distributions not yet confirmed by every recipient",
            distributions_pending.clone(),
        );

        let distributions_completed = Gauge::default();
        registry.register(
            "distributions_completed",
            "Number of distributions confirmed by every recipient",
            distributions_completed.clone(),
        );

        let transactions_open = Gauge::default();
        registry.register(
            "transactions_open",
            "Number of service-component transactions still open",
            transactions_open.clone(),
        );

        let zones_active = Gauge::default();
        registry.register("zones_active", "Number of active zones", zones_active.clone());

        Self {
            registry,
            keys_by_state,
            nodes_by_state,
            distributions_pending,
            distributions_completed,
            transactions_open,
            zones_active,
        }
    }

    /// Refresh the state-derived gauges from the catalog database and
    /// render the result in Prometheus text exposition format.
    pub async fn assemble(&self, pool: &SqlitePool) -> Result<String, sqlx::Error> {
        self.keys_by_state.clear();
        let key_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM keys GROUP BY state")
                .fetch_all(pool)
                .await?;
        for (state, count) in key_counts {
            self.keys_by_state
                .get_or_create(&KeyStateLabel { state })
                .set(count);
        }

        self.nodes_by_state.clear();
        let node_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM nodes GROUP BY state")
                .fetch_all(pool)
                .await?;
        for (state, count) in node_counts {
            self.nodes_by_state
                .get_or_create(&NodeStateLabel { state })
                .set(count);
        }

        let (pending,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM distributions WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;
        self.distributions_pending.set(pending);

        let (completed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM distributions WHERE status = 'completed'")
                .fetch_one(pool)
                .await?;
        self.distributions_completed.set(completed);

        let (open_tx,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM service_transactions WHERE state = 'open'")
                .fetch_one(pool)
                .await?;
        self.transactions_open.set(open_tx);

        let (zones,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM zones WHERE active = 1")
            .fetch_one(pool)
            .await?;
        self.zones_active.set(zones);

        let mut buffer = String::new();
        encode(&mut buffer, &self.registry).map_err(|_| sqlx::Error::Protocol(
            "could not encode metrics".into(),
        ))?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KeyStateLabel {
    state: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct NodeStateLabel {
    state: String,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry).map_err(|_| fmt::Error)?;
        f.write_str(&buffer)
    }
}
