//! The "GC" unit: periodically sweeps completed distribution records past
//! their grace period (spec §4.6 step 8).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::center::Center;
use crate::comms::{ApplicationCommand, ReadySender};
use crate::distribution;

pub async fn run(center: Arc<Center>, mut cmd_rx: mpsc::UnboundedReceiver<ApplicationCommand>, ready_tx: ReadySender) {
    let _ = ready_tx.send(());
    let mut interval = tokio::time::interval(Duration::from_secs(center.config.gc_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => sweep(&center).await,
            command = cmd_rx.recv() => match command {
                Some(ApplicationCommand::RunNow) => sweep(&center).await,
                Some(ApplicationCommand::Reconfigure) => {
                    interval = tokio::time::interval(Duration::from_secs(center.config.gc_interval_secs.max(1)));
                }
                Some(ApplicationCommand::Terminate) | None => {
                    tracing::info!("Unit 'GC' shutting down");
                    return;
                }
            },
        }
    }
}

async fn sweep(center: &Arc<Center>) {
    match distribution::gc(center, center.config.gc_grace_secs as i64, false).await {
        Ok(n) if n > 0 => tracing::info!("GC purged {n} completed distribution record(s)"),
        Ok(_) => {}
        Err(e) => tracing::warn!("GC sweep failed: {e}"),
    }
}
