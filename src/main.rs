use anyhow::Result;
use clap::Parser;
use projtrack::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};
use tracing::{error, info};

fn main() -> Result<()> {
    let args = DaemonArgs::parse();

    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(DAEMON_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;

    let settings = args.settings().inspect_err(|e| {
        error!("Invalid configuration {e:?}");
    })?;

    let stats = single_thread_runtime()?
        .block_on(start_daemon(settings, args.verbose))
        .inspect_err(|e| {
            error!("Error running daemon {e:?}");
        })?;
    info!("Exiting {stats:?}");
    Ok(())
}
