use clap::Parser;
use futures::prelude::*;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use tg_warehouse::tracing_err;
use tracing::{error, info, warn};

/// Exit code for the errors caused by the arguments of the command
const USER_ERROR_EXIT_CODE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if dotenvy::dotenv().is_err() {
        eprintln!("Dotenv config was not found, ignoring this...")
    }

    let cmd = tg_warehouse::Cmd::parse();

    let logging_task = tg_warehouse::init_logging();

    tg_warehouse::init_metrics();

    let main_fut = AssertUnwindSafe(async {
        let result = try_main(cmd).await;

        result.map(|()| ExitCode::SUCCESS).unwrap_or_else(|err| {
            error!(
                err = tracing_err(&err),
                error_id = err.id(),
                "Exitting with an error..."
            );
            if err.is_user_error() {
                ExitCode::from(USER_ERROR_EXIT_CODE)
            } else {
                ExitCode::FAILURE
            }
        })
    })
    .catch_unwind()
    .unwrap_or_else(|_| {
        error!("Exitting due to a panic...");
        ExitCode::FAILURE
    });

    // Dropping the main future in the middle of a write rolls back the
    // transaction, so the warehouse keeps the previous snapshot
    let exit_code = tokio::select! {
        exit_code = main_fut => exit_code,
        () = abort_signal() => ExitCode::FAILURE,
    };

    logging_task.shutdown().await;

    exit_code
}

async fn try_main(cmd: tg_warehouse::Cmd) -> tg_warehouse::Result {
    let config = tg_warehouse::Config::load_or_panic();
    tg_warehouse::run(config, cmd).await
}

async fn abort_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            err = tracing_err(&err),
            "Failed to wait for Ctrl+C, ignoring it..."
        );
        // Never resolve, so the main future finishes on its own
        future::pending::<()>().await;
    } else {
        info!("Ctrl+C received, cancelling...");
    }
}
