//! Inter-unit plumbing shared by every background worker (spec §5).
//!
//! Each unit owns an unbounded [`mpsc`] receiver of [`ApplicationCommand`]s
//! and signals readiness once with a one-shot [`oneshot::Sender`]; the
//! manager collects those handles and forwards commands by unit name.

use std::fmt;

use tokio::sync::oneshot;

/// A command sent to a running unit.
#[derive(Debug, Clone)]
pub enum ApplicationCommand {
    /// Re-read configuration and apply any changes that can be applied
    /// without a restart (log level, GC interval).
    Reconfigure,
    /// Run the unit's sweep immediately instead of waiting for its timer.
    RunNow,
    /// Shut the unit down cleanly.
    Terminate,
}

impl fmt::Display for ApplicationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationCommand::Reconfigure => f.write_str("Reconfigure"),
            ApplicationCommand::RunNow => f.write_str("RunNow"),
            ApplicationCommand::Terminate => f.write_str("Terminate"),
        }
    }
}

/// A unit's ready signal, sent exactly once after its startup work (binding
/// sockets, running migrations) completes.
pub type ReadySender = oneshot::Sender<()>;

/// A unit terminated unexpectedly; its command channel or ready channel was
/// dropped before signalling completion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Terminated;

impl fmt::Display for Terminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a unit terminated unexpectedly")
    }
}

impl std::error::Error for Terminated {}

impl From<oneshot::error::RecvError> for Terminated {
    fn from(_: oneshot::error::RecvError) -> Self {
        Terminated
    }
}
