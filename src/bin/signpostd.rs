//! The KDC daemon: serves the admin HTTP API and runs the GC, TX-cleanup,
//! and NOTIFY-queue background units (spec §5, §6).

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use signpost::center::Center;
use signpost::comms::ApplicationCommand;
use signpost::log::Logger;
use signpost::units::notify_dispatch;
use signpost::{http, manager};
use signpost_cfg::Config;

fn main() -> ExitCode {
    let cmd = clap::Command::new("signpostd")
        .version(env!("CARGO_PKG_VERSION"))
        .next_line_help(true);
    let cmd = Config::setup_cli(cmd);
    let matches = cmd.get_matches();

    let config_path: &String = matches.get_one("config").expect("has a default value");
    let config_path = camino::Utf8Path::new(config_path);

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("signpostd couldn't be configured: {error}");
            return ExitCode::FAILURE;
        }
    };

    let logger = match Logger::launch(&config.logging) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("signpostd couldn't start logging: {error}");
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

    let (app_cmd_tx, app_cmd_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = notify_dispatch::channel();
    let center = match Center::new(config, logger, app_cmd_tx, notify_tx).await {
        Ok(center) => center,
        Err(error) => {
            tracing::error!("Failed to initialise the catalog: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut unit_txs: foldhash::HashMap<String, mpsc::UnboundedSender<ApplicationCommand>> = Default::default();
    if let Err(error) = manager::spawn(&center, app_cmd_rx, &mut unit_txs).await {
        tracing::error!("Failed to spawn units: {error}");
        return ExitCode::FAILURE;
    }
    let notify_dispatch_task = notify_dispatch::spawn(center.pool.clone(), center.config.clone(), notify_rx);

    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!("Failed to bind the admin HTTP API to {listen_addr}: {error}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("signpostd listening on {listen_addr}");

    let router = http::router(Arc::clone(&center));
    let server = tokio::spawn(async move { axum::serve(listener, router).await });

    let result = tokio::select! {
        res = server => {
            match res {
                Ok(Ok(())) => ExitCode::SUCCESS,
                Ok(Err(error)) => {
                    tracing::error!("Admin HTTP API server failed: {error}");
                    ExitCode::FAILURE
                }
                Err(error) => {
                    tracing::error!("Admin HTTP API server task panicked: {error}");
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

    for (_name, tx) in unit_txs {
        let _ = tx.send(ApplicationCommand::Terminate);
        tx.closed().await;
    }
    notify_dispatch_task.abort();

    result
}
