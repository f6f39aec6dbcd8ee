//! Signpost's background units (spec §5): small always-running loops,
//! each on its own interval, also reachable by name through
//! [`crate::center::Center::send_to_unit`].

pub mod gc;
pub mod notify_dispatch;
pub mod notify_queue;
pub mod tx_cleanup;
