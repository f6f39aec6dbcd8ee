//! Spawning and supervising Signpost's background units (spec §5).
//!
//! Mirrors `cascade::manager::spawn`: each unit gets its own command
//! channel and a one-shot ready signal; the manager waits for every unit to
//! report ready before returning control to the daemon's main loop.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};

use crate::center::Center;
use crate::comms::{ApplicationCommand, Terminated};
use crate::units::{gc, notify_queue, tx_cleanup};

#[derive(Debug)]
pub enum Error {
    Terminated,
}

impl From<Terminated> for Error {
    fn from(_: Terminated) -> Self {
        Error::Terminated
    }
}

impl From<oneshot::error::RecvError> for Error {
    fn from(_: oneshot::error::RecvError) -> Self {
        Error::Terminated
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Terminated => Terminated.fmt(f),
        }
    }
}

/// Spawn every background unit, returning once each has signalled ready.
///
/// `unit_tx_slots` is filled in with each unit's command sender so that
/// `app_cmd_tx` messages addressed by name (see [`Center::send_to_unit`])
/// can be forwarded to the right place.
pub async fn spawn(
    center: &Arc<Center>,
    app_cmd_rx: mpsc::UnboundedReceiver<(String, ApplicationCommand)>,
    unit_tx_slots: &mut foldhash::HashMap<String, mpsc::UnboundedSender<ApplicationCommand>>,
) -> Result<(), Error> {
    let mut unit_ready_rxs = vec![];

    tracing::info!("Starting unit 'GC'");
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();
    unit_ready_rxs.push(ready_rx);
    tokio::spawn(gc::run(center.clone(), cmd_rx, ready_tx));
    unit_tx_slots.insert("GC".into(), cmd_tx);

    tracing::info!("Starting unit 'TX'");
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();
    unit_ready_rxs.push(ready_rx);
    tokio::spawn(tx_cleanup::run(center.clone(), cmd_rx, ready_tx));
    unit_tx_slots.insert("TX".into(), cmd_tx);

    tracing::info!("Starting unit 'NQ'");
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();
    unit_ready_rxs.push(ready_rx);
    tokio::spawn(notify_queue::run(center.clone(), cmd_rx, ready_tx));
    unit_tx_slots.insert("NQ".into(), cmd_tx);

    join_all(unit_ready_rxs).await;
    tracing::info!("All units report ready.");

    tokio::spawn(forward_app_cmds(app_cmd_rx, unit_tx_slots.clone()));

    Ok(())
}

/// Forward application commands addressed by unit name to that unit.
async fn forward_app_cmds(
    mut rx: mpsc::UnboundedReceiver<(String, ApplicationCommand)>,
    unit_txs: foldhash::HashMap<String, mpsc::UnboundedSender<ApplicationCommand>>,
) {
    while let Some((unit_name, command)) = rx.recv().await {
        if let Some(tx) = unit_txs.get(&unit_name) {
            tracing::debug!("Forwarding {command} to unit '{unit_name}'");
            let _ = tx.send(command);
        } else {
            tracing::debug!("Unrecognized unit: '{unit_name}'");
        }
    }
}
