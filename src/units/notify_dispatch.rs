//! The "ND" unit: drains NOTIFYs the `/notify` handler enqueues instead of
//! processing inline, so the HTTP request thread never blocks on a node's
//! confirmation or (on a KRS) the two further HTTP round-trips a manifest
//! fetch takes (spec §5, §9).

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use signpost_api::dns::NotifyCommand;
use signpost_cfg::Config;

/// Bounded so a downstream stall applies backpressure to `/notify` callers
/// instead of letting the queue grow without limit.
const CHANNEL_CAPACITY: usize = 256;

pub type NotifySender = mpsc::Sender<NotifyCommand>;
pub type NotifyReceiver = mpsc::Receiver<NotifyCommand>;

/// Build the channel. The sender goes into [`crate::center::Center`] at
/// construction, same as `app_cmd_tx`; the receiver is handed to [`spawn`]
/// once a real pool and config exist.
pub fn channel() -> (NotifySender, NotifyReceiver) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Spawn the dedicated consumer task that drains `rx`.
pub fn spawn(pool: SqlitePool, config: Config, rx: NotifyReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(pool, config, rx))
}

async fn run(pool: SqlitePool, config: Config, mut rx: mpsc::Receiver<NotifyCommand>) {
    while let Some(command) = rx.recv().await {
        if let Err(e) = process(&pool, &config, command).await {
            tracing::warn!("NOTIFY dispatch failed: {e}");
        }
    }
    tracing::info!("Unit 'ND' shutting down");
}

async fn process(pool: &SqlitePool, config: &Config, command: NotifyCommand) -> Result<(), crate::error::KdcError> {
    match command.node_id {
        Some(node_id) => {
            let distribution_id = crate::dns::first_label(&command.qname).ok_or_else(|| {
                crate::error::KdcError::Validation(format!(
                    "confirmation qname '{}' has no label to use as a distribution id",
                    command.qname
                ))
            })?;
            crate::distribution::confirm(pool, distribution_id, &node_id).await?;
        }
        None => {
            crate::krs::receiver::handle_notify(pool, config, &command.qname).await?;
        }
    }
    Ok(())
}
