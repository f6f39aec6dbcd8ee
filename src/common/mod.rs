//! Small helpers shared across modules: timestamps and distribution ids.

mod ids;

pub use ids::distribution_id_from_keytag;

/// The current Unix timestamp, in seconds. Every stored timestamp in the
/// catalog is in this form, matching `jiff::Timestamp::as_second`.
pub fn now() -> i64 {
    jiff::Timestamp::now().as_second()
}
