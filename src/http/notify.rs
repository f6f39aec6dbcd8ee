//! `/notify`: the single endpoint both daemons answer for NOTIFY traffic
//! (spec §4.6 step 3, §4.8 step 7). A KDC only ever receives a node's
//! confirmation push (`node_id` set); a KRS only ever receives the KDC's
//! original distribution push (`node_id` absent) — so the two directions
//! share a route and are told apart by that one field.
//!
//! Neither direction is processed inline: a KRS's `node_id`-absent branch
//! fetches the manifest and its chunks over HTTP before confirming back,
//! and a slow or unreachable peer there would otherwise stall this
//! request's thread. Both branches are enqueued onto the bounded "ND" unit
//! (spec §5, §9) and this handler answers as soon as the enqueue succeeds.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::center::Center;
use crate::error::KdcError;
use crate::http::respond;
use signpost_api::dns::NotifyCommand;
use signpost_api::zone::ZoneResult;

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<NotifyCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ZoneResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: NotifyCommand) -> Result<ZoneResult, KdcError> {
    center
        .notify_tx
        .send(command)
        .await
        .map_err(|_| KdcError::TransportFailure("NOTIFY dispatch unit is not running".into()))?;
    Ok(ZoneResult::Unit {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::OnceLock;

    use signpost_api::dns::QType;

    static LOGGER: OnceLock<&'static crate::log::Logger> = OnceLock::new();

    async fn test_center() -> (Arc<Center>, crate::units::notify_dispatch::NotifyReceiver) {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let logger = *LOGGER.get_or_init(|| {
            crate::log::Logger::launch(&signpost_cfg::LoggingConfig {
                level: signpost_cfg::LogLevel::Warning,
                target: signpost_cfg::LogTarget::Stderr,
                trace_targets: Vec::new(),
            })
            .expect("logger launch")
        });

        let mut config = signpost_cfg::Config::default();
        let path = std::env::temp_dir().join(format!("signpost-notify-test-{}-{}.db", std::process::id(), COUNTER.fetch_add(1, Ordering::Relaxed)));
        config.database_path = camino::Utf8PathBuf::from_path_buf(path).expect("temp dir path is UTF-8");

        let (app_cmd_tx, app_cmd_rx) = tokio::sync::mpsc::unbounded_channel();
        std::mem::forget(app_cmd_rx);
        let (notify_tx, notify_rx) = crate::units::notify_dispatch::channel();
        let center = Center::new(config, logger, app_cmd_tx, notify_tx).await.expect("center construction");
        (center, notify_rx)
    }

    /// `run` must enqueue and return without itself performing a
    /// confirmation or a KRS fetch; the NOTIFY dispatch unit does that
    /// work off the request thread (spec §5, §9).
    #[tokio::test]
    async fn run_enqueues_instead_of_processing_inline() {
        let (center, mut notify_rx) = test_center().await;
        let command = NotifyCommand {
            qname: "deadbeef.notify.example.test.".to_string(),
            qtype: QType::Jsonmanifest,
            node_id: Some("n1.example.test.".to_string()),
        };

        let result = run(&center, command.clone()).await.unwrap();
        assert!(matches!(result, ZoneResult::Unit {}));

        let received = notify_rx.try_recv().expect("command was enqueued, not processed inline");
        assert_eq!(received.qname, command.qname);
        assert_eq!(received.node_id, command.node_id);
    }
}
