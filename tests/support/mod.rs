//! Shared harness for the end-to-end scenario tests (spec §8): a fresh
//! SQLite-backed [`Center`] per test, migrated the same way the daemon
//! migrates it on startup.

use std::sync::{Arc, OnceLock};

use signpost::center::Center;
use signpost_cfg::Config;

static LOGGER: OnceLock<&'static signpost::log::Logger> = OnceLock::new();

/// Build a `Center` backed by a throwaway SQLite file under the system
/// temp directory. Every test gets its own file so runs never interleave.
pub async fn center() -> Arc<Center> {
    let logger = *LOGGER.get_or_init(|| {
        signpost::log::Logger::launch(&signpost_cfg::LoggingConfig {
            level: signpost_cfg::LogLevel::Warning,
            target: signpost_cfg::LogTarget::Stderr,
            trace_targets: Vec::new(),
        })
        .expect("logger launch")
    });

    let mut config = Config::default();
    let path = std::env::temp_dir().join(format!("signpost-test-{}.db", unique_suffix()));
    config.database_path = camino::Utf8PathBuf::from_path_buf(path).expect("temp dir path is UTF-8");
    config.gc_grace_secs = 0;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    std::mem::forget(rx);
    let (notify_tx, notify_rx) = signpost::units::notify_dispatch::channel();
    std::mem::forget(notify_rx);
    Center::new(config, logger, tx, notify_tx).await.expect("center construction")
}

fn unique_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", std::process::id(), COUNTER.fetch_add(1, Ordering::Relaxed))
}
