//! The KRS daemon: runs on an edge signer node, answers `/notify` pushes
//! from the KDC, serves its own `/krs/*` debug surface, and retires
//! installed keys once their grace period passes (spec §4.8).

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use signpost::center::Center;
use signpost::krs;
use signpost::log::Logger;
use signpost::units::notify_dispatch;
use signpost::http;
use signpost_cfg::Config;

fn main() -> ExitCode {
    let cmd = clap::Command::new("krsd")
        .version(env!("CARGO_PKG_VERSION"))
        .next_line_help(true);
    let cmd = Config::setup_cli(cmd);
    let matches = cmd.get_matches();

    let config_path: &String = matches.get_one("config").expect("has a default value");
    let config_path = camino::Utf8Path::new(config_path);

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("krsd couldn't be configured: {error}");
            return ExitCode::FAILURE;
        }
    };

    if config.node_id.is_none() {
        eprintln!("krsd requires 'node_id' to be set in its configuration");
        return ExitCode::FAILURE;
    }

    let logger = match Logger::launch(&config.logging) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("krsd couldn't start logging: {error}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Couldn't start Tokio: {error}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config, logger))
}

async fn run(config: Config, logger: &'static Logger) -> ExitCode {
    let listen_addr = config.admin_listen_addr;
    let retirement_sweep_interval_secs = config.retirement_sweep_interval_secs;

    let (app_cmd_tx, _app_cmd_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = notify_dispatch::channel();
    let center = match Center::new(config, logger, app_cmd_tx, notify_tx).await {
        Ok(center) => center,
        Err(error) => {
            tracing::error!("Failed to initialise the catalog: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = krs::ensure_identity(&center.pool, &center.config).await {
        tracing::error!("Failed to establish this node's identity: {error}");
        return ExitCode::FAILURE;
    }

    let retirement = tokio::spawn(krs::retirement::run(center.pool.clone(), retirement_sweep_interval_secs));
    let notify_dispatch_task = notify_dispatch::spawn(center.pool.clone(), center.config.clone(), notify_rx);

    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!("Failed to bind the KRS HTTP API to {listen_addr}: {error}");
            retirement.abort();
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("krsd listening on {listen_addr}");

    let router = http::router(Arc::clone(&center));
    let server = tokio::spawn(async move { axum::serve(listener, router).await });

    let result = tokio::select! {
        res = server => {
            match res {
                Ok(Ok(())) => ExitCode::SUCCESS,
                Ok(Err(error)) => {
                    tracing::error!("KRS HTTP API server failed: {error}");
                    ExitCode::FAILURE
                }
                Err(error) => {
                    tracing::error!("KRS HTTP API server task panicked: {error}");
                    ExitCode::FAILURE
                }
            }
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(error) = res {
                tracing::error!("Listening for CTRL-C failed: {error}");
                ExitCode::FAILURE
            } else {
                tracing::info!("Received CTRL-C, shutting down");
                ExitCode::SUCCESS
            }
        }
    };

    retirement.abort();
    notify_dispatch_task.abort();
    result
}
